use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{
    ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, StartCause, WindowEvent,
};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::monitor::MonitorHandle;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowButtons, WindowId};

use crate::error::PlatformError;
use crate::screen::Screen;
use crate::window::{ButtonState, Event, MouseButton, WheelDelta, WindowConfig, WindowStyle};

use super::{NativeWindow, Platform, SurfaceHandle, SurfaceTarget};

/// Work that needs an `ActiveEventLoop`, served inside the next pump iteration.
enum Request {
    Screens,
    CreateWindow(WindowAttributes),
}

/// Application handler fed to `pump_app_events`.
///
/// Window events are buffered here and handed out per window on `drain_events`.
#[derive(Default)]
struct Pump {
    requests: VecDeque<Request>,
    screens: Option<Vec<Screen>>,
    created: Option<Result<Window, String>>,
    events: Vec<(WindowId, WindowEvent)>,
}

impl Pump {
    fn serve(&mut self, event_loop: &ActiveEventLoop) {
        while let Some(request) = self.requests.pop_front() {
            match request {
                Request::Screens => {
                    let screens = event_loop
                        .available_monitors()
                        .map(screen_from_monitor)
                        .collect();
                    self.screens = Some(screens);
                }
                Request::CreateWindow(attrs) => {
                    let created = event_loop.create_window(attrs).map_err(|e| e.to_string());
                    self.created = Some(created);
                }
            }
        }
    }
}

impl ApplicationHandler for Pump {
    fn new_events(&mut self, event_loop: &ActiveEventLoop, _cause: StartCause) {
        self.serve(event_loop);
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.serve(event_loop);
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        self.events.push((window_id, event));
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.serve(event_loop);
    }
}

struct Shared {
    event_loop: EventLoop<()>,
    pump: Pump,
    exited: bool,
}

impl Shared {
    /// Runs one non-blocking iteration of the OS event loop.
    fn pump(&mut self) {
        if self.exited {
            return;
        }

        let Shared {
            event_loop,
            pump,
            exited,
        } = self;

        if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(Duration::ZERO), pump) {
            log::debug!("winit event loop exited with code {code}");
            *exited = true;
        }
    }
}

/// `winit`-backed platform.
///
/// Owns the process event loop. `winit` allows a single event loop per process, so create
/// one `WinitPlatform` early in `main` and keep it alive for the program's duration.
pub struct WinitPlatform {
    shared: Rc<RefCell<Shared>>,
}

impl WinitPlatform {
    pub fn new() -> Result<Self, PlatformError> {
        let event_loop =
            EventLoop::new().map_err(|e| PlatformError::EventLoop(e.to_string()))?;

        Ok(Self {
            shared: Rc::new(RefCell::new(Shared {
                event_loop,
                pump: Pump::default(),
                exited: false,
            })),
        })
    }
}

impl Platform for WinitPlatform {
    fn query_screens(&mut self) -> Result<Vec<Screen>, PlatformError> {
        let mut shared = self.shared.borrow_mut();
        shared.pump.requests.push_back(Request::Screens);
        shared.pump();

        shared.pump.screens.take().ok_or_else(|| {
            PlatformError::ScreenQuery("event loop did not service the monitor query".into())
        })
    }

    fn create_window(
        &mut self,
        config: &WindowConfig,
    ) -> Result<Box<dyn NativeWindow>, PlatformError> {
        let attrs = window_attributes(config);

        let created = {
            let mut shared = self.shared.borrow_mut();
            shared.pump.requests.push_back(Request::CreateWindow(attrs));
            shared.pump();
            shared.pump.created.take()
        };

        let window = match created {
            Some(Ok(window)) => window,
            Some(Err(e)) => return Err(PlatformError::WindowCreation(e)),
            None => {
                // Drop the unserved request so a retry starts clean.
                self.shared.borrow_mut().pump.requests.clear();
                return Err(PlatformError::WindowCreation(
                    "event loop did not service the window request".into(),
                ));
            }
        };

        log::info!("winit window created (id: {:?})", window.id());

        Ok(Box::new(WinitWindow {
            window: Arc::new(window),
            shared: self.shared.clone(),
        }))
    }
}

fn window_attributes(config: &WindowConfig) -> WindowAttributes {
    let style = config.style;
    let (x, y) = config.video.desktop_position();

    let mut buttons = WindowButtons::empty();
    if style.contains(WindowStyle::CLOSE) {
        buttons |= WindowButtons::CLOSE;
    }
    if style.contains(WindowStyle::MINIMIZABLE) {
        buttons |= WindowButtons::MINIMIZE;
    }
    if style.contains(WindowStyle::MAXIMIZABLE) {
        buttons |= WindowButtons::MAXIMIZE;
    }

    Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(config.video.width, config.video.height))
        .with_position(PhysicalPosition::new(x, y))
        .with_decorations(style.contains(WindowStyle::TITLE_BAR))
        .with_resizable(style.contains(WindowStyle::RESIZABLE))
        .with_enabled_buttons(buttons)
        .with_visible(true)
}

fn screen_from_monitor(monitor: MonitorHandle) -> Screen {
    let position = monitor.position();
    let size = monitor.size();

    Screen {
        x: position.x,
        y: position.y,
        width: size.width,
        height: size.height,
        name: monitor.name(),
        scale_factor: monitor.scale_factor(),
        refresh_rate_millihertz: monitor.refresh_rate_millihertz(),
    }
}

struct WinitWindow {
    window: Arc<Window>,
    shared: Rc<RefCell<Shared>>,
}

impl NativeWindow for WinitWindow {
    fn id(&self) -> u64 {
        u64::from(self.window.id())
    }

    fn drain_events(&mut self, out: &mut Vec<Event>) {
        let mut shared = self.shared.borrow_mut();
        shared.pump();

        let id = self.window.id();
        let mut others = Vec::new();

        for (window_id, event) in shared.pump.events.drain(..) {
            if window_id != id {
                others.push((window_id, event));
                continue;
            }
            if let Some(event) = translate_window_event(event) {
                out.push(event);
            }
        }

        shared.pump.events = others;
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    fn inner_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn outer_position(&self) -> (i32, i32) {
        // Wayland does not expose window positions.
        self.window
            .outer_position()
            .map(|p| (p.x, p.y))
            .unwrap_or((0, 0))
    }

    fn surface_target(&self) -> SurfaceTarget {
        let (width, height) = self.inner_size();
        let handle: SurfaceHandle = self.window.clone();
        SurfaceTarget::Window {
            handle,
            width,
            height,
        }
    }
}

impl Drop for WinitWindow {
    fn drop(&mut self) {
        let id = self.window.id();
        if let Ok(mut shared) = self.shared.try_borrow_mut() {
            shared.pump.events.retain(|(window_id, _)| *window_id != id);
        }
        log::debug!("winit window {id:?} released");
    }
}

fn translate_window_event(event: WindowEvent) -> Option<Event> {
    match event {
        WindowEvent::Resized(size) => Some(Event::Resized {
            width: size.width,
            height: size.height,
        }),

        WindowEvent::Moved(position) => Some(Event::Moved {
            x: position.x,
            y: position.y,
        }),

        WindowEvent::CloseRequested => Some(Event::Closed),

        WindowEvent::Focused(focused) => Some(Event::FocusChanged(focused)),

        WindowEvent::KeyboardInput { event, .. } => {
            let code = match event.physical_key {
                PhysicalKey::Code(code) => code as u32,
                // NativeKeyCode carries no stable numeric value.
                PhysicalKey::Unidentified(_) => 0,
            };
            Some(Event::Key {
                code,
                state: map_state(event.state),
                repeat: event.repeat,
            })
        }

        WindowEvent::CursorMoved { position, .. } => Some(Event::CursorMoved {
            x: position.x,
            y: position.y,
        }),

        WindowEvent::MouseInput { state, button, .. } => Some(Event::MouseButton {
            button: map_mouse_button(button),
            state: map_state(state),
        }),

        WindowEvent::MouseWheel { delta, .. } => {
            let delta = match delta {
                MouseScrollDelta::LineDelta(x, y) => WheelDelta::Line { x, y },
                MouseScrollDelta::PixelDelta(p) => WheelDelta::Pixel { x: p.x, y: p.y },
            };
            Some(Event::MouseWheel { delta })
        }

        WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
            Some(Event::ScaleFactorChanged { scale_factor })
        }

        _ => None,
    }
}

fn map_state(state: ElementState) -> ButtonState {
    match state {
        ElementState::Pressed => ButtonState::Pressed,
        ElementState::Released => ButtonState::Released,
    }
}

fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}
