use std::collections::HashSet;
use winit::keyboard::NamedKey;

use crate::loader::SharedPages;
use crate::ui::render::{
    blit_scaled, continuous_layout, fill, min_scroll, paged_placement, strip_height, ScreenSize,
    BG_COLOR,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pixels scrolled per frame while an arrow key is held.
pub const SCROLL_STEP: f32 = 20.0;
/// Extra factor applied to wheel scrolling.
pub const WHEEL_MULTIPLIER: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// One page at a time, fit to the window.
    Paged,
    /// All pages stacked at window width.
    Continuous,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Paged => ViewMode::Continuous,
            ViewMode::Continuous => ViewMode::Paged,
        }
    }
}

/// Window-level side effect requested by a frame of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    None,
    Quit,
    ResizeWindow(u32, u32),
}

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

pub struct ViewerState {
    pub pages: SharedPages,
    pub current_page: usize,
    /// Vertical offset of the strip in continuous mode, always <= 0.
    pub scroll_y: f32,
    pub mode: ViewMode,
    /// Height of the whole strip at the current width, refreshed every frame.
    pub content_height: f32,
    pub screen: ScreenSize,

    // Track which keys are currently held
    pub keys_down: HashSet<NamedKey>,

    // Track keys that were just pressed this frame
    pub keys_pressed: HashSet<NamedKey>,
    pub chars_pressed: HashSet<char>,

    // Mouse wheel accumulator for this frame, in lines
    pub wheel_y: f32,
}

impl ViewerState {
    pub fn new(pages: SharedPages, screen: ScreenSize) -> Self {
        Self {
            pages,
            current_page: 0,
            scroll_y: 0.0,
            mode: ViewMode::Paged,
            content_height: 0.0,
            screen,
            keys_down: HashSet::new(),
            keys_pressed: HashSet::new(),
            chars_pressed: HashSet::new(),
            wheel_y: 0.0,
        }
    }

    pub fn is_key_pressed_named(&self, k: NamedKey) -> bool {
        self.keys_pressed.contains(&k)
    }

    pub fn is_char_pressed(&self, c: char) -> bool {
        self.chars_pressed.contains(&c)
    }

    pub fn is_key_down_named(&self, k: NamedKey) -> bool {
        self.keys_down.contains(&k)
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().unwrap().len()
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    fn go_to(&mut self, target: i64) {
        let count = self.page_count();
        if count == 0 {
            return;
        }
        let new_idx = target.clamp(0, count as i64 - 1) as usize;
        if new_idx != self.current_page {
            log::debug!("[nav] page {} -> {}", self.current_page, new_idx);
            self.current_page = new_idx;
        }
    }

    pub fn prev_page(&mut self) {
        self.go_to(self.current_page as i64 - 1);
    }

    pub fn next_page(&mut self) {
        self.go_to(self.current_page as i64 + 1);
    }

    pub fn first_page(&mut self) {
        self.go_to(0);
    }

    pub fn last_page(&mut self) {
        self.go_to(i64::MAX);
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        log::debug!("[mode] {:?}", self.mode);
    }

    pub fn refresh_content_height(&mut self) {
        let sizes = self.pages.lock().unwrap().sizes();
        self.content_height = strip_height(&sizes, self.screen);
    }

    fn clamp_scroll(&mut self) {
        self.scroll_y = self
            .scroll_y
            .clamp(min_scroll(self.content_height, self.screen), 0.0);
    }

    /// Move the strip by `dy` pixels (positive = towards the top). Continuous mode only.
    pub fn scroll_by(&mut self, dy: f32) {
        if self.mode != ViewMode::Continuous {
            return;
        }
        self.scroll_y += dy;
        self.clamp_scroll();
    }

    /// Adopt the size granted by the window system.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.screen = ScreenSize::new(width, height);
        self.refresh_content_height();
        self.clamp_scroll();
    }

    /// Native pixel size of the current page, if it is decoded.
    pub fn fit_window_size(&self) -> Option<(u32, u32)> {
        self.pages
            .lock()
            .unwrap()
            .get(self.current_page)
            .map(|p| p.size())
    }

    /// True while a held key needs frames at a steady cadence.
    pub fn is_scrolling(&self) -> bool {
        self.mode == ViewMode::Continuous
            && (self.is_key_down_named(NamedKey::ArrowUp)
                || self.is_key_down_named(NamedKey::ArrowDown))
    }

    /// Run the per-frame logic. Returns what the window should do next.
    pub fn update(&mut self) -> FrameAction {
        // ------------------------------------------------------------------
        // Quit
        // ------------------------------------------------------------------
        if self.is_key_pressed_named(NamedKey::Escape) || self.is_char_pressed('q') {
            return FrameAction::Quit;
        }

        let mut action = FrameAction::None;

        // ------------------------------------------------------------------
        // Navigation
        // ------------------------------------------------------------------
        if self.is_key_pressed_named(NamedKey::ArrowLeft)
            || self.is_key_pressed_named(NamedKey::Space)
        {
            self.prev_page();
        }
        if self.is_key_pressed_named(NamedKey::ArrowRight) {
            self.next_page();
        }
        if self.is_key_pressed_named(NamedKey::Home) {
            self.first_page();
        } else if self.is_key_pressed_named(NamedKey::End) {
            self.last_page();
        }

        if self.is_char_pressed('l') {
            self.toggle_mode();
        }

        // ------------------------------------------------------------------
        // Scrolling (continuous mode only)
        // ------------------------------------------------------------------
        self.refresh_content_height();
        if self.mode == ViewMode::Continuous {
            if self.is_key_down_named(NamedKey::ArrowUp) {
                self.scroll_by(SCROLL_STEP);
            }
            if self.is_key_down_named(NamedKey::ArrowDown) {
                self.scroll_by(-SCROLL_STEP);
            }
            if self.wheel_y != 0.0 {
                self.scroll_by(self.wheel_y * SCROLL_STEP * WHEEL_MULTIPLIER);
            }
        }
        // Decoding and resizes change the strip under us.
        self.clamp_scroll();

        // ------------------------------------------------------------------
        // Fit window to page
        // ------------------------------------------------------------------
        if self.is_char_pressed('s') {
            if let Some((w, h)) = self.fit_window_size() {
                action = FrameAction::ResizeWindow(w, h);
            }
        }

        // Clear per-frame input state
        self.keys_pressed.clear();
        self.chars_pressed.clear();
        self.wheel_y = 0.0;

        action
    }

    /// Render into the softbuffer framebuffer (u32 per pixel, 0x00RRGGBB).
    pub fn render(&mut self, frame: &mut [u32], fb_w: u32, fb_h: u32) {
        fill(frame, BG_COLOR);
        self.screen = ScreenSize::new(fb_w, fb_h);

        match self.mode {
            ViewMode::Paged => {
                let page = self.pages.lock().unwrap().get(self.current_page);
                let Some(page) = page else { return };
                let p = paged_placement(self.current_page, page.size(), self.screen);
                blit_scaled(
                    frame, fb_w, fb_h,
                    &page.rgba_bytes, page.width, page.height,
                    p.x, p.y, p.scale,
                );
            }
            ViewMode::Continuous => {
                let slots = self.pages.lock().unwrap().snapshot();
                let sizes: Vec<Option<(u32, u32)>> =
                    slots.iter().map(|s| s.as_ref().map(|p| p.size())).collect();
                let layout = continuous_layout(&sizes, self.screen, self.scroll_y);
                self.content_height = layout.content_height;

                for p in &layout.visible {
                    if let Some(page) = &slots[p.index] {
                        blit_scaled(
                            frame, fb_w, fb_h,
                            &page.rgba_bytes, page.width, page.height,
                            p.x, p.y, p.scale,
                        );
                    }
                }
            }
        }
    }
}
