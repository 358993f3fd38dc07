//! Root layout state
//!
//! Narrow viewports force the sidebar collapsed, both at start and on every
//! resize. Widening never expands it again; only the sidebar's own toggle does.

/// Widths strictly below this collapse the sidebar
pub const MOBILE_BREAKPOINT: u32 = 768;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootLayout {
    screen_width: u32,
    sidebar_collapsed: bool,
}

impl RootLayout {
    /// Layout for an initial viewport width
    pub fn new(width: u32) -> Self {
        let mut layout = Self {
            screen_width: width,
            sidebar_collapsed: false,
        };
        layout.on_resize(width);
        layout
    }

    pub fn on_resize(&mut self, width: u32) {
        self.screen_width = width;
        if width < MOBILE_BREAKPOINT {
            self.sidebar_collapsed = true;
        }
    }

    /// Accept a collapse state requested by the sidebar
    pub fn toggle_sidebar(&mut self, collapsed: bool) {
        self.sidebar_collapsed = collapsed;
    }

    pub fn is_sidebar_collapsed(&self) -> bool {
        self.sidebar_collapsed
    }

    pub fn screen_width(&self) -> u32 {
        self.screen_width
    }

    pub fn is_mobile(&self) -> bool {
        self.screen_width < MOBILE_BREAKPOINT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_start_collapses() {
        let layout = RootLayout::new(500);
        assert!(layout.is_sidebar_collapsed());
        assert!(layout.is_mobile());
    }

    #[test]
    fn test_wide_resize_leaves_state_alone() {
        let mut layout = RootLayout::new(1024);
        assert!(!layout.is_sidebar_collapsed());
        layout.on_resize(1200);
        assert!(!layout.is_sidebar_collapsed());

        layout.toggle_sidebar(true);
        layout.on_resize(1200);
        assert!(layout.is_sidebar_collapsed());
    }

    #[test]
    fn test_never_auto_expands() {
        let mut layout = RootLayout::new(1200);
        layout.on_resize(600);
        assert!(layout.is_sidebar_collapsed());
        layout.on_resize(1400);
        assert!(layout.is_sidebar_collapsed());
        assert_eq!(layout.screen_width(), 1400);
    }

    #[test]
    fn test_breakpoint_is_exclusive() {
        assert!(!RootLayout::new(MOBILE_BREAKPOINT).is_sidebar_collapsed());
        assert!(RootLayout::new(MOBILE_BREAKPOINT - 1).is_sidebar_collapsed());
    }

    #[test]
    fn test_narrow_resize_overrides_manual_expand() {
        let mut layout = RootLayout::new(500);
        layout.toggle_sidebar(false);
        assert!(!layout.is_sidebar_collapsed());
        layout.on_resize(510);
        assert!(layout.is_sidebar_collapsed());
    }
}
