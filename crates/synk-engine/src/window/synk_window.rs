use std::collections::VecDeque;
use std::fmt;

use crate::error::{PlatformError, Result};
use crate::graphics::{ModuleKind, ModuleRef, ModuleSlot};
use crate::platform::{NativeWindow, Platform};

use super::event::Event;
use super::handler::EventHandler;
use super::settings::{VideoSettings, WindowConfig, WindowStyle};

/// A native window with deferred construction.
///
/// `open` only records the configuration; `build` allocates the OS window and may be retried
/// after a failure. Geometry and focus are cached from dispatched events. At most one module
/// (one graphics context) is bound per window, created on first `extract`. A module extracted
/// before `build` stays unbound until `build` attaches it to the new surface.
///
/// Dropping the window invalidates its module: handles still held elsewhere report
/// `ContextError::Lost` from then on.
pub struct SynkWindow {
    config: WindowConfig,
    native: Option<Box<dyn NativeWindow>>,

    title: String,
    position: (i32, i32),
    size: (u32, u32),
    is_open: bool,
    focused: bool,
    close_requested: bool,

    pending: VecDeque<Event>,
    drained: Vec<Event>,
    handler: EventHandler,
    module: Option<ModuleSlot>,
}

impl SynkWindow {
    /// Prepares a window without touching the OS.
    pub fn open(title: impl Into<String>, video: VideoSettings, style: WindowStyle) -> Self {
        Self::from_config(WindowConfig {
            title: title.into(),
            video,
            style,
        })
    }

    pub fn from_config(config: WindowConfig) -> Self {
        Self {
            title: config.title.clone(),
            position: config.video.desktop_position(),
            size: (config.video.width, config.video.height),
            config,
            native: None,
            is_open: false,
            focused: false,
            close_requested: false,
            pending: VecDeque::new(),
            drained: Vec::new(),
            handler: EventHandler::new(),
            module: None,
        }
    }

    /// Allocates the native window.
    ///
    /// Also attaches a module extracted earlier. On failure (of either step) the window stays
    /// unbuilt, the module stays unbound, and `build` can be called again. Building a built
    /// window does nothing.
    pub fn build(&mut self, platform: &mut dyn Platform) -> Result<()> {
        if self.native.is_some() {
            log::debug!("window '{}' already built", self.title);
            return Ok(());
        }

        let video = &self.config.video;
        if video.width == 0 || video.height == 0 {
            return Err(PlatformError::WindowCreation(format!(
                "window size must be non-zero (got {}x{})",
                video.width, video.height
            ))
            .into());
        }

        let mut config = self.config.clone();
        config.title.clone_from(&self.title);

        let native = platform.create_window(&config).inspect_err(|e| {
            log::warn!("window '{}' build failed: {e}", self.title);
        })?;

        if let Some(slot) = &self.module {
            // Dropping `native` on failure releases the OS window again.
            slot.attach(&native.surface_target()).inspect_err(|e| {
                log::warn!("window '{}': {} not attached: {e}", self.title, slot.name());
            })?;
            log::debug!("{} attached to window '{}'", slot.name(), self.title);
        }

        self.position = native.outer_position();
        self.size = native.inner_size();
        self.is_open = true;
        self.close_requested = false;

        log::info!(
            "window '{}' built ({}x{} at {:?})",
            self.title,
            self.size.0,
            self.size.1,
            self.position
        );

        self.native = Some(native);
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.native.is_some()
    }

    /// True from a successful `build` until a close request has been processed by `update`.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Returns the module of kind `M`, creating it on first use.
    ///
    /// Later calls return the same instance (`ModuleRef::ptr_eq` holds). On a built window the
    /// module is bound to the surface right away; otherwise `build` binds it.
    pub fn extract<M: ModuleKind>(&mut self) -> Result<ModuleRef<M>> {
        self.extract_with(M::Init::default())
    }

    /// Like [`extract`](Self::extract) with explicit creation parameters.
    ///
    /// `init` is only used when the module does not exist yet.
    pub fn extract_with<M: ModuleKind>(&mut self, init: M::Init) -> Result<ModuleRef<M>> {
        if let Some(slot) = &self.module {
            return slot.get::<M>();
        }

        let (slot, handle) = ModuleSlot::new(M::unbound(init));
        match &self.native {
            Some(native) => {
                slot.attach(&native.surface_target())?;
                log::debug!("{} bound to window '{}'", slot.name(), self.title);
            }
            None => log::debug!("{} waiting for window '{}'", slot.name(), self.title),
        }

        self.module = Some(slot);
        Ok(handle)
    }

    /// Drains pending OS events and dispatches them in arrival order.
    ///
    /// Returns as soon as the queue is empty. Each event first updates the cached state (and
    /// resizes the bound module's surface) and is then handed to listeners. When a listener
    /// fails, its error is returned and the remaining events wait for the next call.
    pub fn poll_events(&mut self) -> Result<()> {
        let Some(native) = self.native.as_mut() else {
            return Err(PlatformError::NotBuilt.into());
        };
        if !self.is_open {
            return Err(PlatformError::Closed.into());
        }

        native.drain_events(&mut self.drained);
        self.pending.extend(self.drained.drain(..));

        while let Some(event) = self.pending.pop_front() {
            self.apply(&event);
            self.handler.dispatch(&event)?;
        }
        Ok(())
    }

    fn apply(&mut self, event: &Event) {
        match *event {
            Event::Resized { width, height } => {
                self.size = (width, height);
                if let Some(module) = &self.module {
                    module.surface_resized(width, height);
                }
            }
            Event::Moved { x, y } => self.position = (x, y),
            Event::Closed => self.close_requested = true,
            Event::FocusChanged(focused) => self.focused = focused,
            _ => {}
        }
    }

    /// Applies deferred state changes. A requested close takes effect here.
    pub fn update(&mut self) {
        if self.close_requested && self.is_open {
            self.is_open = false;
            log::info!("window '{}' closed", self.title);
        }
    }

    /// Requests a close; observed by the next `update`.
    pub fn close(&mut self) {
        if self.native.is_some() {
            self.close_requested = true;
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        if let Some(native) = self.native.as_mut() {
            native.set_title(&self.title);
        }
    }

    /// Cached window origin in desktop space.
    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    /// Cached client-area size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn style(&self) -> WindowStyle {
        self.config.style
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Platform identifier of the native window, once built.
    pub fn native_id(&self) -> Option<u64> {
        self.native.as_ref().map(|n| n.id())
    }

    pub fn event_handler(&self) -> &EventHandler {
        &self.handler
    }

    pub fn event_handler_mut(&mut self) -> &mut EventHandler {
        &mut self.handler
    }
}

impl Drop for SynkWindow {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            module.invalidate();
        }
        if self.native.is_some() {
            log::debug!("window '{}' destroyed", self.title);
        }
    }
}

impl fmt::Debug for SynkWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynkWindow")
            .field("title", &self.title)
            .field("built", &self.is_built())
            .field("open", &self.is_open)
            .field("position", &self.position)
            .field("size", &self.size)
            .field("pending", &self.pending.len())
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::error::{ContextError, Error, UsageError};
    use crate::graphics::{ClearMask, GraphicsModule, Viewport};
    use crate::platform::{HeadlessPlatform, SurfaceTarget};
    use crate::screen::Screen;
    use crate::window::EventType;

    fn window(width: u32, height: u32) -> SynkWindow {
        let video = VideoSettings::new(Screen::new(100, 50, 1920, 1080), 10, 20, width, height);
        SynkWindow::open("test", video, WindowStyle::default())
    }

    fn built(platform: &mut HeadlessPlatform) -> SynkWindow {
        let mut w = window(640, 480);
        w.build(platform).unwrap();
        w
    }

    #[test]
    fn open_does_not_touch_the_platform() {
        let platform = HeadlessPlatform::new();
        let w = window(640, 480);

        assert!(!w.is_built());
        assert!(!w.is_open());
        assert_eq!(platform.live_windows(), 0);
        assert_eq!(w.position(), (110, 70));
    }

    #[test]
    fn failed_build_can_be_retried() {
        let mut platform = HeadlessPlatform::new();
        platform.fail_next_window("no more handles");
        let mut w = window(640, 480);

        let err = w.build(&mut platform).unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::WindowCreation(_))
        ));
        assert!(!w.is_built() && !w.is_open());

        w.build(&mut platform).unwrap();
        assert!(w.is_built() && w.is_open());
        assert_eq!(w.size(), (640, 480));

        // Building again is a no-op.
        w.build(&mut platform).unwrap();
        assert_eq!(platform.live_windows(), 1);
    }

    #[test]
    fn zero_sized_window_is_rejected() {
        let mut platform = HeadlessPlatform::new();
        let mut w = window(0, 480);
        assert!(w.build(&mut platform).is_err());
        assert_eq!(platform.live_windows(), 0);
    }

    /// Module whose surface binding fails while its shared flag is set.
    struct Fragile {
        fail: Rc<Cell<bool>>,
        attached: bool,
    }

    impl ModuleKind for Fragile {
        type Init = Rc<Cell<bool>>;
        const NAME: &'static str = "Fragile";

        fn unbound(fail: Rc<Cell<bool>>) -> Self {
            Self {
                fail,
                attached: false,
            }
        }

        fn attach(&mut self, _target: &SurfaceTarget) -> Result<()> {
            if self.fail.get() {
                return Err(ContextError::Creation("no adapter".into()).into());
            }
            self.attached = true;
            Ok(())
        }

        fn surface_resized(&mut self, _width: u32, _height: u32) {}

        fn invalidate(&mut self) {}
    }

    #[test]
    fn extract_before_build_binds_on_build() {
        let mut platform = HeadlessPlatform::new();
        let mut w = window(640, 480);

        let early = w.extract::<GraphicsModule>().unwrap();
        assert!(early.borrow().is_unbound());
        assert!(matches!(
            early.borrow_mut().clear_buffers(ClearMask::COLOR).unwrap_err(),
            Error::Context(ContextError::Unbound)
        ));

        w.build(&mut platform).unwrap();

        let late = w.extract::<GraphicsModule>().unwrap();
        assert!(ModuleRef::ptr_eq(&early, &late));

        let mut gm = late.borrow_mut();
        assert!(!gm.is_unbound());
        assert_eq!(gm.backend(), "headless");
        assert_eq!(gm.surface_size(), Some((640, 480)));
        gm.clear_buffers(ClearMask::COLOR).unwrap();
        gm.swap_buffers().unwrap();
        assert_eq!(gm.stats().frames_presented, 1);
    }

    #[test]
    fn failed_build_leaves_the_module_unbound() {
        let mut platform = HeadlessPlatform::new();
        platform.fail_next_window("no more handles");
        let mut w = window(640, 480);
        let module = w.extract::<GraphicsModule>().unwrap();

        assert!(w.build(&mut platform).is_err());
        assert!(module.borrow().is_unbound());
        assert!(!module.borrow().is_lost());

        w.build(&mut platform).unwrap();
        assert_eq!(module.borrow().surface_size(), Some((640, 480)));
    }

    #[test]
    fn failed_attach_keeps_the_window_unbuilt() {
        let mut platform = HeadlessPlatform::new();
        let mut w = window(640, 480);
        let fail = Rc::new(Cell::new(true));
        let module = w.extract_with::<Fragile>(fail.clone()).unwrap();

        let err = w.build(&mut platform).unwrap_err();
        assert!(matches!(err, Error::Context(ContextError::Creation(_))));
        assert!(!w.is_built() && !w.is_open());
        assert_eq!(platform.live_windows(), 0);
        assert!(!module.borrow().attached);

        fail.set(false);
        w.build(&mut platform).unwrap();
        assert!(w.is_open());
        assert!(module.borrow().attached);
    }

    #[test]
    fn extract_returns_the_same_module() {
        let mut platform = HeadlessPlatform::new();
        let mut w = built(&mut platform);

        let a = w.extract::<GraphicsModule>().unwrap();
        let b = w.extract::<GraphicsModule>().unwrap();
        assert!(ModuleRef::ptr_eq(&a, &b));
        assert_eq!(a.borrow().backend(), "headless");
    }

    #[test]
    fn resize_updates_cache_module_and_listener() {
        let mut platform = HeadlessPlatform::new();
        let mut w = built(&mut platform);
        let module = w.extract::<GraphicsModule>().unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        {
            let calls = calls.clone();
            let weak = module.downgrade();
            w.event_handler_mut().add(EventType::Resized, move |event| {
                let (width, height) = event.resized().unwrap_or_default();
                calls.borrow_mut().push((width, height));
                weak.with_mut(|gm| {
                    gm.set_viewport(Viewport::full(width, height));
                    Ok(())
                })
            });
        }

        let id = w.native_id().unwrap();
        assert!(platform.push_event(id, Event::Resized { width: 800, height: 600 }));
        w.poll_events().unwrap();

        assert_eq!(*calls.borrow(), vec![(800, 600)]);
        assert_eq!(w.size(), (800, 600));
        let gm = module.borrow();
        assert_eq!(gm.surface_size(), Some((800, 600)));
        assert_eq!(gm.viewport(), Viewport::new(0.0, 0.0, 800.0, 600.0));
    }

    #[test]
    fn close_is_deferred_until_update() {
        let mut platform = HeadlessPlatform::new();
        let mut w = built(&mut platform);
        let id = w.native_id().unwrap();

        platform.push_event(id, Event::Closed);
        w.poll_events().unwrap();
        assert!(w.is_open());

        w.update();
        assert!(!w.is_open());
        assert!(w.is_built());
        assert!(matches!(
            w.poll_events().unwrap_err(),
            Error::Platform(PlatformError::Closed)
        ));
    }

    #[test]
    fn programmatic_close_uses_the_same_path() {
        let mut platform = HeadlessPlatform::new();
        let mut w = built(&mut platform);

        w.close();
        assert!(w.is_open());
        w.update();
        assert!(!w.is_open());
    }

    #[test]
    fn failing_listener_keeps_remaining_events_queued() {
        let mut platform = HeadlessPlatform::new();
        let mut w = built(&mut platform);
        let id = w.native_id().unwrap();

        let failing = w.event_handler_mut().add(EventType::Moved, |event| {
            assert_eq!(event.moved(), Some((5, 6)));
            Err(UsageError::MissingLayout.into())
        });

        platform.push_event(id, Event::Moved { x: 5, y: 6 });
        platform.push_event(id, Event::FocusChanged(true));

        assert!(w.poll_events().is_err());
        assert_eq!(w.position(), (5, 6));
        assert!(!w.is_focused());

        w.event_handler_mut().remove(failing);
        w.poll_events().unwrap();
        assert!(w.is_focused());
    }

    #[test]
    fn poll_before_build_fails() {
        let mut w = window(640, 480);
        assert!(matches!(
            w.poll_events().unwrap_err(),
            Error::Platform(PlatformError::NotBuilt)
        ));
    }

    #[test]
    fn title_reaches_the_native_window() {
        let mut platform = HeadlessPlatform::new();
        let mut w = built(&mut platform);

        w.set_title("renamed");
        assert_eq!(w.title(), "renamed");
        assert_eq!(
            platform.window_title(w.native_id().unwrap()).as_deref(),
            Some("renamed")
        );
    }

    #[test]
    fn dropping_the_window_loses_the_module() {
        let mut platform = HeadlessPlatform::new();
        let mut w = built(&mut platform);
        let module = w.extract::<GraphicsModule>().unwrap();

        drop(w);

        assert_eq!(platform.live_windows(), 0);
        let mut gm = module.borrow_mut();
        assert!(gm.is_lost());
        assert!(matches!(
            gm.swap_buffers().unwrap_err(),
            Error::Context(ContextError::Lost)
        ));
    }
}
