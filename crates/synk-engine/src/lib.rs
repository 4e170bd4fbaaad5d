//! Synk engine crate.
//!
//! Thin single-window runtime for real-time rendering: screen enumeration, frame timing,
//! native windows with pub/sub events, and a graphics context that owns buffers, vertex
//! arrays and shader programs.
//!
//! Everything OS- or GPU-specific sits behind the traits in [`platform`] and
//! [`graphics::device`], so the whole stack also runs headless.

pub mod error;
pub mod graphics;
pub mod logging;
pub mod platform;
pub mod screen;
pub mod time;
pub mod window;

pub use error::{Error, Result};
