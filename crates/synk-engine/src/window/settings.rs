use crate::screen::Screen;

/// Placement and size of a window, relative to the screen it is opened on.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSettings {
    /// Offset from the screen origin, in physical pixels.
    pub x: i32,
    pub y: i32,
    /// Client-area size, in physical pixels.
    pub width: u32,
    pub height: u32,
    pub screen: Screen,
}

impl VideoSettings {
    pub fn new(screen: Screen, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            screen,
        }
    }

    /// Centers a `width` x `height` client area on `screen`.
    pub fn centered(screen: Screen, width: u32, height: u32) -> Self {
        let x = (i64::from(screen.width) - i64::from(width)) / 2;
        let y = (i64::from(screen.height) - i64::from(height)) / 2;
        Self::new(screen, x.max(0) as i32, y.max(0) as i32, width, height)
    }

    /// Window origin in OS desktop space.
    pub fn desktop_position(&self) -> (i32, i32) {
        (
            self.screen.x.saturating_add(self.x),
            self.screen.y.saturating_add(self.y),
        )
    }
}

bitflags::bitflags! {
    /// Window capabilities, fixed at construction.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct WindowStyle: u8 {
        /// OS decorations (title bar and border).
        const TITLE_BAR   = 1 << 0;
        const CLOSE       = 1 << 1;
        const MINIMIZABLE = 1 << 2;
        const MAXIMIZABLE = 1 << 3;
        /// The user may resize the window by dragging its border.
        const RESIZABLE   = 1 << 4;
    }
}

impl Default for WindowStyle {
    fn default() -> Self {
        WindowStyle::TITLE_BAR | WindowStyle::CLOSE | WindowStyle::MINIMIZABLE
    }
}

/// Immutable window configuration.
///
/// Assembled once by `SynkWindow::open` and reused by every build attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub video: VideoSettings,
    pub style: WindowStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_membership_is_explicit() {
        let style = WindowStyle::TITLE_BAR | WindowStyle::RESIZABLE;
        assert!(style.contains(WindowStyle::RESIZABLE));
        assert!(!style.contains(WindowStyle::CLOSE));
        assert!(!style.contains(WindowStyle::TITLE_BAR | WindowStyle::CLOSE));
    }

    #[test]
    fn desktop_position_offsets_by_screen_origin() {
        let screen = Screen::new(1920, -100, 2560, 1440);
        let video = VideoSettings::new(screen, 40, 60, 1280, 720);
        assert_eq!(video.desktop_position(), (1960, -40));
    }

    #[test]
    fn centered_never_goes_negative() {
        let screen = Screen::new(0, 0, 800, 600);
        let video = VideoSettings::centered(screen, 1280, 720);
        assert_eq!((video.x, video.y), (0, 0));

        let video = VideoSettings::centered(Screen::new(0, 0, 1920, 1080), 1280, 720);
        assert_eq!((video.x, video.y), (320, 180));
    }
}
