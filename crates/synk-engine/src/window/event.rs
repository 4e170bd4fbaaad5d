use std::fmt;

/// Press/release state shared by keys and mouse buttons.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

/// Mouse wheel delta.
///
/// `Line` is "scroll lines" style input; `Pixel` is high precision touchpad input.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum WheelDelta {
    Line { x: f32, y: f32 },
    Pixel { x: f64, y: f64 },
}

/// Window event after translation from the platform.
///
/// Built during `SynkWindow::poll_events` and discarded once dispatched.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// New client-area size in physical pixels.
    Resized { width: u32, height: u32 },

    /// New window origin in desktop space.
    Moved { x: i32, y: i32 },

    /// The user (or the program) asked to close the window.
    Closed,

    FocusChanged(bool),

    Key {
        /// Stable platform key code (0 when unidentified).
        code: u32,
        state: ButtonState,
        /// True when generated by key repeat.
        repeat: bool,
    },

    /// Pointer position in physical pixels relative to the client area.
    CursorMoved { x: f64, y: f64 },

    MouseButton {
        button: MouseButton,
        state: ButtonState,
    },

    MouseWheel { delta: WheelDelta },

    ScaleFactorChanged { scale_factor: f64 },
}

/// Discriminant of [`Event`], used as the listener registration key.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EventType {
    Resized,
    Moved,
    Closed,
    FocusChanged,
    Key,
    CursorMoved,
    MouseButton,
    MouseWheel,
    ScaleFactorChanged,
}

impl Event {
    pub fn kind(&self) -> EventType {
        match self {
            Event::Resized { .. } => EventType::Resized,
            Event::Moved { .. } => EventType::Moved,
            Event::Closed => EventType::Closed,
            Event::FocusChanged(_) => EventType::FocusChanged,
            Event::Key { .. } => EventType::Key,
            Event::CursorMoved { .. } => EventType::CursorMoved,
            Event::MouseButton { .. } => EventType::MouseButton,
            Event::MouseWheel { .. } => EventType::MouseWheel,
            Event::ScaleFactorChanged { .. } => EventType::ScaleFactorChanged,
        }
    }

    /// Payload of a `Resized` event.
    pub fn resized(&self) -> Option<(u32, u32)> {
        match *self {
            Event::Resized { width, height } => Some((width, height)),
            _ => None,
        }
    }

    /// Payload of a `Moved` event.
    pub fn moved(&self) -> Option<(i32, i32)> {
        match *self {
            Event::Moved { x, y } => Some((x, y)),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
