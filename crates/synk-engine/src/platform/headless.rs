use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::error::PlatformError;
use crate::screen::Screen;
use crate::window::{Event, WindowConfig};

use super::{NativeWindow, Platform, SurfaceTarget};

#[derive(Debug)]
struct WindowState {
    title: String,
    position: (i32, i32),
    size: (u32, u32),
    queue: VecDeque<Event>,
}

#[derive(Debug, Default)]
struct Shared {
    screens: Vec<Screen>,
    fail_screens: bool,
    fail_next_window: Option<String>,
    windows: HashMap<u64, WindowState>,
    next_id: u64,
}

/// In-process platform with scripted screens and event queues.
///
/// Windows created here expose an offscreen surface, so graphics modules bound to them use
/// the headless device. Events are injected with [`push_event`](Self::push_event) and
/// delivered on the next `poll_events` of the matching window.
#[derive(Debug, Clone)]
pub struct HeadlessPlatform {
    shared: Rc<RefCell<Shared>>,
}

impl HeadlessPlatform {
    /// One 1920x1080 screen at the origin.
    pub fn new() -> Self {
        Self::with_screens(vec![Screen::new(0, 0, 1920, 1080)])
    }

    pub fn with_screens(screens: Vec<Screen>) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                screens,
                next_id: 1,
                ..Shared::default()
            })),
        }
    }

    /// Replaces the simulated display topology.
    pub fn set_screens(&mut self, screens: Vec<Screen>) {
        self.shared.borrow_mut().screens = screens;
    }

    /// Makes subsequent screen queries fail until turned off again.
    pub fn fail_screen_queries(&mut self, fail: bool) {
        self.shared.borrow_mut().fail_screens = fail;
    }

    /// Makes the next window allocation fail with `reason`.
    pub fn fail_next_window(&mut self, reason: impl Into<String>) {
        self.shared.borrow_mut().fail_next_window = Some(reason.into());
    }

    /// Queues `event` for window `id`, updating the simulated OS geometry.
    ///
    /// Returns false when no such window is alive.
    pub fn push_event(&self, id: u64, event: Event) -> bool {
        let mut shared = self.shared.borrow_mut();
        let Some(state) = shared.windows.get_mut(&id) else {
            return false;
        };

        match event {
            Event::Resized { width, height } => state.size = (width, height),
            Event::Moved { x, y } => state.position = (x, y),
            _ => {}
        }

        state.queue.push_back(event);
        true
    }

    /// Title last set on the native window.
    pub fn window_title(&self, id: u64) -> Option<String> {
        self.shared.borrow().windows.get(&id).map(|w| w.title.clone())
    }

    /// Number of native windows currently allocated.
    pub fn live_windows(&self) -> usize {
        self.shared.borrow().windows.len()
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for HeadlessPlatform {
    fn query_screens(&mut self) -> Result<Vec<Screen>, PlatformError> {
        let shared = self.shared.borrow();
        if shared.fail_screens {
            return Err(PlatformError::ScreenQuery(
                "simulated display query failure".into(),
            ));
        }
        Ok(shared.screens.clone())
    }

    fn create_window(
        &mut self,
        config: &WindowConfig,
    ) -> Result<Box<dyn NativeWindow>, PlatformError> {
        let mut shared = self.shared.borrow_mut();

        if let Some(reason) = shared.fail_next_window.take() {
            return Err(PlatformError::WindowCreation(reason));
        }

        let id = shared.next_id;
        shared.next_id += 1;

        shared.windows.insert(
            id,
            WindowState {
                title: config.title.clone(),
                position: config.video.desktop_position(),
                size: (config.video.width, config.video.height),
                queue: VecDeque::new(),
            },
        );

        log::debug!("headless window {id} created for '{}'", config.title);

        Ok(Box::new(HeadlessWindow {
            id,
            shared: self.shared.clone(),
        }))
    }
}

struct HeadlessWindow {
    id: u64,
    shared: Rc<RefCell<Shared>>,
}

impl HeadlessWindow {
    fn with_state<R>(&self, f: impl FnOnce(&WindowState) -> R) -> Option<R> {
        self.shared.borrow().windows.get(&self.id).map(f)
    }
}

impl NativeWindow for HeadlessWindow {
    fn id(&self) -> u64 {
        self.id
    }

    fn drain_events(&mut self, out: &mut Vec<Event>) {
        if let Some(state) = self.shared.borrow_mut().windows.get_mut(&self.id) {
            out.extend(state.queue.drain(..));
        }
    }

    fn set_title(&mut self, title: &str) {
        if let Some(state) = self.shared.borrow_mut().windows.get_mut(&self.id) {
            state.title = title.to_string();
        }
    }

    fn inner_size(&self) -> (u32, u32) {
        self.with_state(|s| s.size).unwrap_or((0, 0))
    }

    fn outer_position(&self) -> (i32, i32) {
        self.with_state(|s| s.position).unwrap_or((0, 0))
    }

    fn surface_target(&self) -> SurfaceTarget {
        let (width, height) = self.inner_size();
        SurfaceTarget::Offscreen { width, height }
    }
}

impl Drop for HeadlessWindow {
    fn drop(&mut self) {
        self.shared.borrow_mut().windows.remove(&self.id);
        log::debug!("headless window {} destroyed", self.id);
    }
}
