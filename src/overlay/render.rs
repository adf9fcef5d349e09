//! Overlay drawing
//!
//! The renderer works in canvas units (pixels for a windowed canvas) and
//! draws through the [`Canvas`] capability, so the graphics backend stays
//! swappable.

use std::io;

use ratatui::style::Color;

use crate::config::OverlayConfig;

use super::buffer::OverlayEntry;
use super::palette::Palette;

/// Drawing capability supplied by the graphics backend
pub trait Canvas {
    /// Drawable area in canvas units, as (width, height)
    fn size(&self) -> io::Result<(u32, u32)>;

    /// Start a new frame filled with `color`
    fn fill(&mut self, color: Color) -> io::Result<()>;

    /// Draw `text` with its baseline at (`x`, `y`)
    fn draw_text(&mut self, x: u32, y: u32, text: &str, color: Color) -> io::Result<()>;

    /// Show the finished frame
    fn present(&mut self) -> io::Result<()>;
}

/// Geometry of the overlay canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLayout {
    pub width: u32,
    pub height: u32,
    pub line_height: u32,
    /// Baseline of the first line
    pub first_baseline: u32,
    /// No baseline may reach `height - bottom_margin`
    pub bottom_margin: u32,
    pub timestamp_x: u32,
    pub category_x: u32,
    pub message_x: u32,
}

impl OverlayLayout {
    pub fn from_config(config: &OverlayConfig) -> Self {
        let line_height = config.line_height.max(1);
        Self {
            width: config.width,
            height: config.height,
            line_height,
            first_baseline: line_height,
            bottom_margin: 10,
            timestamp_x: 10,
            category_x: 100,
            message_x: 240,
        }
    }

    /// This layout shrunk to fit a canvas of `size`
    ///
    /// Surfaces smaller than the configured canvas (a short terminal) keep
    /// the newest lines on screen by showing fewer of them.
    pub fn fitted(&self, (width, height): (u32, u32)) -> Self {
        Self {
            width: self.width.min(width),
            height: self.height.min(height),
            ..*self
        }
    }

    /// Lowest baseline (exclusive) that still fits above the margin
    fn baseline_limit(&self) -> u32 {
        self.height.saturating_sub(self.bottom_margin)
    }

    /// How many lines fit on the canvas
    pub fn visible_lines(&self) -> usize {
        let limit = self.baseline_limit();
        if self.first_baseline >= limit {
            return 0;
        }
        ((limit - self.first_baseline - 1) / self.line_height + 1) as usize
    }
}

impl Default for OverlayLayout {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}

/// Draw `entries` top to bottom (oldest first) and present the frame
///
/// Stops at the bottom margin; callers pass at most
/// [`OverlayLayout::visible_lines`] entries. Columns starting at or past the
/// canvas width are not drawn.
pub fn draw_entries<C: Canvas + ?Sized>(
    canvas: &mut C,
    layout: &OverlayLayout,
    palette: &Palette,
    entries: &[OverlayEntry],
) -> io::Result<()> {
    canvas.fill(palette.background)?;

    let limit = layout.baseline_limit();
    let mut y = layout.first_baseline;
    for entry in entries {
        if y >= limit {
            break;
        }

        let columns = [
            (layout.timestamp_x, entry.timestamp.clone(), palette.timestamp),
            (
                layout.category_x,
                format!("[{}]", entry.category.to_uppercase()),
                palette.category_color(&entry.category),
            ),
            (layout.message_x, entry.message.clone(), palette.message),
        ];
        for (x, text, color) in columns {
            if x < layout.width {
                canvas.draw_text(x, y, &text, color)?;
            }
        }

        y += layout.line_height;
    }

    canvas.present()
}

/// Canvas recording draw calls, for tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct TextCall {
        pub x: u32,
        pub y: u32,
        pub text: String,
        pub color: Color,
    }

    #[derive(Debug, Default)]
    pub struct RecordingCanvas {
        pub frame: Vec<TextCall>,
        pub presented: Vec<Vec<TextCall>>,
        pub fills: usize,
        /// Fail on this draw call index of each frame
        pub fail_at: Option<usize>,
        /// Reported size; unbounded when `None`
        pub size: Option<(u32, u32)>,
    }

    impl Canvas for RecordingCanvas {
        fn size(&self) -> io::Result<(u32, u32)> {
            Ok(self.size.unwrap_or((u32::MAX, u32::MAX)))
        }

        fn fill(&mut self, _color: Color) -> io::Result<()> {
            self.fills += 1;
            self.frame.clear();
            Ok(())
        }

        fn draw_text(&mut self, x: u32, y: u32, text: &str, color: Color) -> io::Result<()> {
            if self.fail_at == Some(self.frame.len()) {
                return Err(io::Error::new(io::ErrorKind::Other, "backend lost"));
            }
            self.frame.push(TextCall {
                x,
                y,
                text: text.to_string(),
                color,
            });
            Ok(())
        }

        fn present(&mut self) -> io::Result<()> {
            self.presented.push(std::mem::take(&mut self.frame));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingCanvas;
    use super::*;

    fn entry(category: &str, message: &str) -> OverlayEntry {
        OverlayEntry {
            timestamp: "12:00:00".to_string(),
            category: category.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_default_layout_visible_lines() {
        // Baselines 20, 40, ... 580 stay above 600 - 10
        assert_eq!(OverlayLayout::default().visible_lines(), 29);
    }

    #[test]
    fn test_visible_lines_edge_cases() {
        let mut layout = OverlayLayout::default();
        layout.height = 30;
        assert_eq!(layout.visible_lines(), 0);
        layout.height = 31;
        assert_eq!(layout.visible_lines(), 1);
        layout.height = 120;
        assert_eq!(layout.visible_lines(), 5);
    }

    #[test]
    fn test_draws_three_columns() {
        let mut canvas = RecordingCanvas::default();
        let layout = OverlayLayout::default();
        let palette = Palette::dark();

        draw_entries(&mut canvas, &layout, &palette, &[entry("sensors", "lidar ok")]).unwrap();

        let frame = &canvas.presented[0];
        assert_eq!(frame.len(), 3);
        assert_eq!((frame[0].x, frame[0].y), (10, 20));
        assert_eq!(frame[0].text, "12:00:00");
        assert_eq!(frame[0].color, palette.timestamp);
        assert_eq!((frame[1].x, frame[1].text.as_str()), (100, "[SENSORS]"));
        assert_eq!(frame[1].color, Color::Rgb(0, 255, 0));
        assert_eq!((frame[2].x, frame[2].text.as_str()), (240, "lidar ok"));
        assert_eq!(frame[2].color, palette.message);
    }

    #[test]
    fn test_stops_at_bottom_margin() {
        let mut canvas = RecordingCanvas::default();
        let mut layout = OverlayLayout::default();
        layout.height = 120;
        let entries: Vec<_> = (0..10).map(|i| entry("sync", &format!("m{}", i))).collect();

        draw_entries(&mut canvas, &layout, &Palette::dark(), &entries).unwrap();

        let frame = &canvas.presented[0];
        assert_eq!(frame.len(), 5 * 3);
        assert_eq!(frame.last().unwrap().y, 100);
    }

    #[test]
    fn test_fitted_to_smaller_canvas() {
        let layout = OverlayLayout::default().fitted((800, 480));
        assert_eq!((layout.width, layout.height), (800, 480));
        assert_eq!(layout.line_height, 20);
        assert_eq!(layout.visible_lines(), 23);

        let unchanged = OverlayLayout::default().fitted((u32::MAX, u32::MAX));
        assert_eq!(unchanged, OverlayLayout::default());
    }

    #[test]
    fn test_columns_past_width_are_skipped() {
        let mut canvas = RecordingCanvas::default();
        let mut layout = OverlayLayout::default();
        layout.width = 200;

        draw_entries(&mut canvas, &layout, &Palette::dark(), &[entry("sync", "offset 12 us")]).unwrap();

        let frame = &canvas.presented[0];
        let xs: Vec<u32> = frame.iter().map(|call| call.x).collect();
        assert_eq!(xs, vec![10, 100]);
        assert!(frame.iter().all(|call| call.text != "offset 12 us"));
    }

    #[test]
    fn test_error_propagates_to_caller() {
        let mut canvas = RecordingCanvas {
            fail_at: Some(1),
            ..RecordingCanvas::default()
        };
        let result = draw_entries(
            &mut canvas,
            &OverlayLayout::default(),
            &Palette::dark(),
            &[entry("system", "boot")],
        );
        assert!(result.is_err());
        assert!(canvas.presented.is_empty());
    }
}
