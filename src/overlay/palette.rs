//! Overlay colors
//!
//! Fixed category-to-color table plus the colors of the fixed columns and the
//! background. Unknown categories fall back to a neutral grey.

use ratatui::style::Color;

/// Colors used when drawing the overlay
#[derive(Debug, Clone)]
pub struct Palette {
    /// Canvas background
    pub background: Color,
    /// Timestamp column
    pub timestamp: Color,
    /// Message column
    pub message: Color,
    /// Category column for categories missing from the table
    pub default_category: Color,
    categories: Vec<(&'static str, Color)>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    /// Dark palette (default)
    pub fn dark() -> Self {
        Self {
            background: Color::Rgb(20, 20, 20),
            timestamp: Color::Rgb(150, 150, 150),
            message: Color::Rgb(220, 220, 220),
            default_category: Color::Rgb(200, 200, 200),
            categories: vec![
                ("system", Color::Rgb(255, 255, 255)),
                ("sensors", Color::Rgb(0, 255, 0)),
                ("sync", Color::Rgb(255, 255, 0)),
                ("control", Color::Rgb(255, 165, 0)),
                ("performance", Color::Rgb(255, 0, 128)),
            ],
        }
    }

    /// Get the color for a category
    pub fn category_color(&self, category: &str) -> Color {
        self.categories
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, color)| *color)
            .unwrap_or(self.default_category)
    }
}

/// Global palette instance
static PALETTE: std::sync::OnceLock<Palette> = std::sync::OnceLock::new();

/// Get the shared palette
pub fn palette() -> &'static Palette {
    PALETTE.get_or_init(Palette::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_categories() {
        let palette = Palette::dark();
        assert_eq!(palette.category_color("system"), Color::Rgb(255, 255, 255));
        assert_eq!(palette.category_color("sensors"), Color::Rgb(0, 255, 0));
        assert_eq!(palette.category_color("sync"), Color::Rgb(255, 255, 0));
        assert_eq!(palette.category_color("control"), Color::Rgb(255, 165, 0));
        assert_eq!(palette.category_color("performance"), Color::Rgb(255, 0, 128));
    }

    #[test]
    fn test_unknown_category_is_neutral() {
        let palette = Palette::dark();
        assert_eq!(palette.category_color("lidar"), palette.default_category);
        assert_eq!(palette.category_color("SYSTEM"), palette.default_category);
    }

    #[test]
    fn test_global_palette() {
        assert_eq!(palette().background, Color::Rgb(20, 20, 20));
    }
}
