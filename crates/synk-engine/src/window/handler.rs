use crate::error::Result;

use super::event::{Event, EventType};

/// Callback registered for one event kind.
///
/// Returning an error aborts the current drain and surfaces the error from `poll_events`.
type Listener = Box<dyn FnMut(&Event) -> Result<()>>;

/// Identifies a registered listener for later removal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    kind: EventType,
    listener: Listener,
}

/// Per-window synchronous publish/subscribe bus.
///
/// Dispatch only happens from the owning window's `poll_events`, on the calling thread.
/// Listeners cannot reach the handler while it dispatches (`&mut` borrow), so dispatch is
/// never re-entrant. The handler does not track the lifetime of anything a listener
/// captures; capture weak references (see `ModuleRef::downgrade`) for collaborators that can
/// die first.
#[derive(Default)]
pub struct EventHandler {
    entries: Vec<Entry>,
    next_id: u64,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for events of `kind`.
    ///
    /// Several listeners may share a kind; they run in registration order.
    pub fn add<F>(&mut self, kind: EventType, listener: F) -> ListenerId
    where
        F: FnMut(&Event) -> Result<()> + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        self.entries.push(Entry {
            id,
            kind,
            listener: Box::new(listener),
        });

        id
    }

    /// Unregisters a listener. Returns false when `id` is unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn listener_count(&self, kind: EventType) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Invokes every listener registered for the event's kind, in registration order.
    ///
    /// Stops at the first failing listener.
    pub(crate) fn dispatch(&mut self, event: &Event) -> Result<()> {
        let kind = event.kind();
        for entry in self.entries.iter_mut().filter(|e| e.kind == kind) {
            (entry.listener)(event)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandler")
            .field("listeners", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::{Error, UsageError};

    #[test]
    fn listeners_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut handler = EventHandler::new();

        for tag in ["a", "b", "c"] {
            let log = log.clone();
            handler.add(EventType::Closed, move |_| {
                log.borrow_mut().push(tag);
                Ok(())
            });
        }

        handler.dispatch(&Event::Closed).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn dispatch_filters_by_kind() {
        let hits = Rc::new(RefCell::new(0));
        let mut handler = EventHandler::new();
        {
            let hits = hits.clone();
            handler.add(EventType::Resized, move |_| {
                *hits.borrow_mut() += 1;
                Ok(())
            });
        }

        handler.dispatch(&Event::Moved { x: 1, y: 2 }).unwrap();
        handler.dispatch(&Event::Resized { width: 1, height: 1 }).unwrap();

        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn failing_listener_stops_dispatch() {
        let reached = Rc::new(RefCell::new(false));
        let mut handler = EventHandler::new();
        handler.add(EventType::Closed, |_| Err(UsageError::MissingLayout.into()));
        {
            let reached = reached.clone();
            handler.add(EventType::Closed, move |_| {
                *reached.borrow_mut() = true;
                Ok(())
            });
        }

        let err = handler.dispatch(&Event::Closed).unwrap_err();
        assert!(matches!(err, Error::Usage(UsageError::MissingLayout)));
        assert!(!*reached.borrow());
    }

    #[test]
    fn remove_unregisters_only_that_listener() {
        let mut handler = EventHandler::new();
        let a = handler.add(EventType::Closed, |_| Ok(()));
        let _b = handler.add(EventType::Closed, |_| Ok(()));

        assert!(handler.remove(a));
        assert!(!handler.remove(a));
        assert_eq!(handler.listener_count(EventType::Closed), 1);
    }
}
