use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::Key;
use winit::window::{Window, WindowId};
use softbuffer::Surface;

use crate::loader::UserEvent;
use crate::ui::render::frame_len;
use crate::ui::state::{FrameAction, ViewerState};

pub mod render;
pub mod state;

pub const WINDOW_TITLE: &str = "CBZ Viewer";
pub const INITIAL_SIZE: LogicalSize<u32> = LogicalSize::new(450, 800);

/// Frame pacing while a scroll key is held.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Pixel wheel deltas are converted to lines at this rate.
const PIXELS_PER_LINE: f64 = 40.0;

// ---------------------------------------------------------------------------
// Application handler (winit 0.30 style)
// ---------------------------------------------------------------------------

pub struct App {
    pub state: ViewerState,
    pub window: Option<Arc<Window>>,
    pub context: Option<softbuffer::Context<Arc<Window>>>,
    pub surface: Option<Surface<Arc<Window>, Arc<Window>>>,
    pub next_redraw: Option<Instant>,
    /// Set when the app stopped because of an unrecoverable error.
    pub failed: bool,
}

impl App {
    pub fn new(state: ViewerState) -> Self {
        Self {
            state,
            window: None,
            context: None,
            surface: None,
            next_redraw: None,
            failed: false,
        }
    }

    fn request_redraw(&self) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, msg: &str) {
        log::error!("{}", msg);
        self.failed = true;
        event_loop.exit();
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(INITIAL_SIZE)
            .with_resizable(true);

        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => return self.fail(event_loop, &format!("Failed to create window: {}", e)),
        };
        let context = match softbuffer::Context::new(Arc::clone(&window)) {
            Ok(c) => c,
            Err(e) => return self.fail(event_loop, &format!("Failed to create context: {}", e)),
        };
        let mut surface = match Surface::new(&context, Arc::clone(&window)) {
            Ok(s) => s,
            Err(e) => return self.fail(event_loop, &format!("Failed to create surface: {}", e)),
        };

        let size = window.inner_size();
        if let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) {
            if let Err(e) = surface.resize(w, h) {
                log::warn!("Failed to size surface: {}", e);
            }
        }
        self.state.resize(size.width, size.height);

        window.request_redraw();
        self.window = Some(window);
        self.context = Some(context);
        self.surface = Some(surface);
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::PageReady(idx) => {
                if self.state.pages.lock().unwrap().is_failed(idx) {
                    log::debug!("page {} will stay empty", idx + 1);
                }
                self.request_redraw();
            }
            UserEvent::DecodeFinished => {
                {
                    let store = self.state.pages.lock().unwrap();
                    log::debug!("{}/{} pages ready", store.decoded_count(), store.len());
                }
                self.request_redraw();
            }
            UserEvent::ArchiveLost(msg) => {
                self.fail(event_loop, &msg);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(PhysicalSize { width, height }) => {
                let w = width.max(1);
                let h = height.max(1);
                if let (Some(surface), Some(nw), Some(nh)) =
                    (self.surface.as_mut(), NonZeroU32::new(w), NonZeroU32::new(h))
                {
                    if let Err(e) = surface.resize(nw, nh) {
                        log::warn!("Failed to resize surface: {}", e);
                    }
                }
                self.state.resize(w, h);
                self.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                match &event.logical_key {
                    Key::Named(named) => {
                        if pressed {
                            if !event.repeat {
                                self.state.keys_pressed.insert(*named);
                            }
                            self.state.keys_down.insert(*named);
                        } else {
                            self.state.keys_down.remove(named);
                        }
                    }
                    Key::Character(s) => {
                        if let Some(c) = s.chars().next() {
                            if pressed && !event.repeat {
                                self.state.chars_pressed.insert(c.to_ascii_lowercase());
                            }
                        }
                    }
                    _ => {}
                }
                self.request_redraw();
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => {
                        (y / PIXELS_PER_LINE) as f32
                    }
                };
                self.state.wheel_y += y;
                self.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                let Some(window) = self.window.clone() else { return };

                match self.state.update() {
                    FrameAction::Quit => {
                        event_loop.exit();
                        return;
                    }
                    FrameAction::ResizeWindow(w, h) => {
                        log::debug!("Resizing window to {}x{}", w, h);
                        // The granted size arrives later as a Resized event
                        let _ = window.request_inner_size(PhysicalSize::new(w, h));
                    }
                    FrameAction::None => {}
                }

                if let Some(ref mut surface) = self.surface {
                    let size = window.inner_size();
                    let fb_w = size.width.max(1);
                    let fb_h = size.height.max(1);
                    match surface.buffer_mut() {
                        Ok(mut buffer) => {
                            // Stale buffer from before a resize; the Resized event redraws
                            if buffer.len() != frame_len(fb_w, fb_h) {
                                log::debug!("Skipping frame: buffer is not {}x{}", fb_w, fb_h);
                            } else {
                                self.state.render(&mut buffer, fb_w, fb_h);
                                if let Err(e) = buffer.present() {
                                    log::warn!("Failed to present frame: {}", e);
                                }
                            }
                        }
                        Err(e) => log::warn!("Failed to get frame buffer: {}", e),
                    }
                }

                // Keep frames coming only while scrolling with held keys
                self.next_redraw = if self.state.is_scrolling() {
                    Some(Instant::now() + FRAME_INTERVAL)
                } else {
                    None
                };
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(when) = self.next_redraw {
            if Instant::now() >= when {
                self.next_redraw = None;
                self.request_redraw();
            } else {
                event_loop.set_control_flow(ControlFlow::WaitUntil(when));
            }
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }
}
