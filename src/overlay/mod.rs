//! Live log overlay
//!
//! A bounded ring of recent records plus a renderer that draws the visible
//! tail onto a [`Canvas`] each frame. Producers push through a cloneable
//! [`OverlayHandle`]; a single render loop owns the [`LogOverlay`].

mod buffer;
mod palette;
mod render;
mod terminal;

pub use buffer::{OverlayBuffer, OverlayEntry};
pub use palette::{palette, Palette};
pub use render::{draw_entries, Canvas, OverlayLayout};
pub use terminal::{TerminalCanvas, TerminalSession, CELL_WIDTH};

use std::io;
use std::sync::Arc;

use crossterm::event::KeyEvent;

use crate::config::OverlayConfig;

/// Category used for the overlay's own entries
pub const SYSTEM_CATEGORY: &str = "system";

/// Lifecycle of the overlay surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    /// Canvas acquisition failed; rendering does nothing
    Uninitialized,
    /// Canvas acquired; every render draws a frame
    Ready,
}

/// Producer-side handle onto the overlay ring
#[derive(Debug, Clone)]
pub struct OverlayHandle {
    buffer: Arc<OverlayBuffer>,
}

impl OverlayHandle {
    /// Append a record stamped with the current local time
    pub fn add_log(&self, category: &str, message: &str) {
        self.buffer.push(OverlayEntry::new(category, message));
    }

    /// Drop every record and leave a single "Log cleared" entry
    pub fn clear(&self) {
        self.buffer
            .reset_with(OverlayEntry::new(SYSTEM_CATEGORY, "Log cleared"));
    }
}

/// The overlay: ring buffer, layout and (if acquired) the canvas
pub struct LogOverlay<C: Canvas> {
    config: OverlayConfig,
    layout: OverlayLayout,
    buffer: Arc<OverlayBuffer>,
    canvas: Option<C>,
}

impl<C: Canvas> LogOverlay<C> {
    /// Acquire a canvas with `acquire` and set up the overlay
    ///
    /// The buffer is seeded with a "Log window initialized" entry either way.
    /// Acquisition failure is reported and leaves the overlay
    /// [`OverlayState::Uninitialized`]; records are still buffered.
    pub fn open<F>(config: OverlayConfig, acquire: F) -> Self
    where
        F: FnOnce(&OverlayConfig) -> io::Result<C>,
    {
        let layout = OverlayLayout::from_config(&config);
        let buffer = Arc::new(OverlayBuffer::new(config.max_lines));

        buffer.push(OverlayEntry::new(SYSTEM_CATEGORY, "Log window initialized"));

        let canvas = match acquire(&config) {
            Ok(canvas) => Some(canvas),
            Err(e) => {
                tracing::warn!("Failed to initialize log window '{}': {}", config.window_name, e);
                None
            }
        };

        Self {
            config,
            layout,
            buffer,
            canvas,
        }
    }

    pub fn state(&self) -> OverlayState {
        if self.canvas.is_some() {
            OverlayState::Ready
        } else {
            OverlayState::Uninitialized
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn layout(&self) -> &OverlayLayout {
        &self.layout
    }

    /// Get a handle for producer threads
    pub fn handle(&self) -> OverlayHandle {
        OverlayHandle {
            buffer: Arc::clone(&self.buffer),
        }
    }

    pub fn add_log(&self, category: &str, message: &str) {
        self.buffer.push(OverlayEntry::new(category, message));
    }

    /// Draw the most recent records that fit and present the frame
    ///
    /// The configured layout is shrunk to the canvas's current size, so the
    /// newest record is always on screen. Drawing errors are reported and the
    /// frame is skipped.
    pub fn render(&mut self) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };

        let layout = match canvas.size() {
            Ok(size) => self.layout.fitted(size),
            Err(e) => {
                tracing::warn!("Error reading log window size: {}", e);
                self.layout
            }
        };

        let visible = self.buffer.tail(layout.visible_lines());
        if let Err(e) = draw_entries(canvas, &layout, palette(), &visible) {
            tracing::warn!("Error rendering log window: {}", e);
        }
    }

    pub fn clear(&self) {
        self.handle().clear();
    }

    /// Keyboard hook; the overlay has no key bindings of its own
    pub fn process_key(&mut self, _key: KeyEvent) {}

    /// Snapshot of the buffered records, oldest first
    pub fn entries(&self) -> Vec<OverlayEntry> {
        self.buffer.all_entries()
    }

    pub fn canvas(&self) -> Option<&C> {
        self.canvas.as_ref()
    }

    /// Take back the canvas, e.g. to restore the terminal
    pub fn into_canvas(self) -> Option<C> {
        self.canvas
    }
}
