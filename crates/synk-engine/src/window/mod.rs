//! Window lifecycle and event dispatch.
//!
//! A [`SynkWindow`] is opened from a title, [`VideoSettings`] and a [`WindowStyle`], built
//! against a [`Platform`](crate::platform::Platform), then polled once per frame. Events go
//! through the window's [`EventHandler`] after the window has updated its own cached state.

mod event;
mod handler;
mod settings;
mod synk_window;

pub use event::{ButtonState, Event, EventType, MouseButton, WheelDelta};
pub use handler::{EventHandler, ListenerId};
pub use settings::{VideoSettings, WindowConfig, WindowStyle};
pub use synk_window::SynkWindow;
