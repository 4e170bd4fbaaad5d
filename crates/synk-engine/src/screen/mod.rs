//! Display enumeration.

use crate::platform::Platform;

/// Geometry of one attached display, in physical pixels.
///
/// Snapshot taken at query time; it does not track later topology changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Screen {
    /// Origin in OS desktop space. May be negative on multi-monitor layouts.
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub name: Option<String>,
    pub scale_factor: f64,
    pub refresh_rate_millihertz: Option<u32>,
}

impl Screen {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            name: None,
            scale_factor: 1.0,
            refresh_rate_millihertz: None,
        }
    }

    /// Returns true when the desktop-space point lies on this screen.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let dx = i64::from(x) - i64::from(self.x);
        let dy = i64::from(y) - i64::from(self.y);
        dx >= 0 && dy >= 0 && dx < i64::from(self.width) && dy < i64::from(self.height)
    }
}

/// Lists attached screens in OS enumeration order.
///
/// Never fails: display configuration is not essential to window creation, so a platform
/// query error is logged and an empty list returned. Nothing is cached; every call reflects
/// the current topology.
pub fn enumerate_screens<P: Platform + ?Sized>(platform: &mut P) -> Vec<Screen> {
    match platform.query_screens() {
        Ok(screens) => {
            log::debug!("{} screen(s) reported by the platform", screens.len());
            screens
        }
        Err(e) => {
            log::warn!("screen enumeration failed: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessPlatform;

    #[test]
    fn repeated_enumeration_is_stable() {
        let mut platform = HeadlessPlatform::with_screens(vec![
            Screen::new(0, 0, 1920, 1080),
            Screen::new(1920, -200, 2560, 1440),
        ]);

        let first = enumerate_screens(&mut platform);
        let second = enumerate_screens(&mut platform);

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn query_failure_yields_empty_list() {
        let mut platform = HeadlessPlatform::with_screens(vec![Screen::new(0, 0, 800, 600)]);
        platform.fail_screen_queries(true);

        assert!(enumerate_screens(&mut platform).is_empty());

        platform.fail_screen_queries(false);
        assert_eq!(enumerate_screens(&mut platform).len(), 1);
    }

    #[test]
    fn enumeration_reflects_topology_changes() {
        let mut platform = HeadlessPlatform::with_screens(vec![Screen::new(0, 0, 800, 600)]);
        assert_eq!(enumerate_screens(&mut platform).len(), 1);

        platform.set_screens(Vec::new());
        assert!(enumerate_screens(&mut platform).is_empty());
    }

    #[test]
    fn contains_handles_negative_origins() {
        let s = Screen::new(-1920, 0, 1920, 1080);
        assert!(s.contains(-1, 10));
        assert!(!s.contains(0, 10));
        assert!(!s.contains(-1920, 1080));
    }
}
