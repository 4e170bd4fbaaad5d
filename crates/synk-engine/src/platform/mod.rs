//! OS seam: screen queries, native window allocation and event retrieval.
//!
//! `SynkWindow` only talks to these traits. Two implementations ship with the crate:
//! - `WinitPlatform` drives a real `winit` event loop without blocking
//! - `HeadlessPlatform` simulates screens and windows in-process (tests, CI, tools)

mod headless;
#[cfg(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "linux",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "android"
))]
mod winit;

use std::fmt;
use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::PlatformError;
use crate::screen::Screen;
use crate::window::{Event, WindowConfig};

pub use headless::HeadlessPlatform;
#[cfg(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "linux",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "android"
))]
pub use self::winit::WinitPlatform;

/// Window handle usable by a GPU backend to create a presentation surface.
pub trait WindowSurface: HasWindowHandle + HasDisplayHandle + Send + Sync {}

impl<T: HasWindowHandle + HasDisplayHandle + Send + Sync> WindowSurface for T {}

pub type SurfaceHandle = Arc<dyn WindowSurface>;

/// What a graphics module binds to.
#[derive(Clone)]
pub enum SurfaceTarget {
    /// A real OS window; the GPU backend presents into it.
    Window {
        handle: SurfaceHandle,
        width: u32,
        height: u32,
    },
    /// No OS surface; rendering is simulated in memory.
    Offscreen { width: u32, height: u32 },
}

impl SurfaceTarget {
    pub fn size(&self) -> (u32, u32) {
        match *self {
            SurfaceTarget::Window { width, height, .. }
            | SurfaceTarget::Offscreen { width, height } => (width, height),
        }
    }
}

impl fmt::Debug for SurfaceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceTarget::Window { width, height, .. } => f
                .debug_struct("Window")
                .field("width", width)
                .field("height", height)
                .finish_non_exhaustive(),
            SurfaceTarget::Offscreen { width, height } => f
                .debug_struct("Offscreen")
                .field("width", width)
                .field("height", height)
                .finish(),
        }
    }
}

/// Platform services used before and during window construction.
pub trait Platform {
    /// Lists attached screens in OS order.
    fn query_screens(&mut self) -> Result<Vec<Screen>, PlatformError>;

    /// Allocates a native window for `config`.
    fn create_window(
        &mut self,
        config: &WindowConfig,
    ) -> Result<Box<dyn NativeWindow>, PlatformError>;
}

/// An allocated OS window.
///
/// Dropping the value releases the OS resource.
pub trait NativeWindow {
    /// Stable identifier, unique within the platform instance.
    fn id(&self) -> u64;

    /// Moves every event currently queued for this window into `out`, in arrival order.
    ///
    /// Must not block waiting for new events.
    fn drain_events(&mut self, out: &mut Vec<Event>);

    fn set_title(&mut self, title: &str);

    /// Live client-area size in physical pixels.
    fn inner_size(&self) -> (u32, u32);

    /// Live window origin in desktop space.
    fn outer_position(&self) -> (i32, i32);

    /// Target a graphics module binds to.
    fn surface_target(&self) -> SurfaceTarget;
}
