//! Color palette for the UI.

use ratatui::style::Color;

/// Theme colors for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,      // Focused borders, key hints
    pub danger: Color,      // Error banner
    pub success: Color,     // Comparison output accents
    pub warning: Color,     // Warning banner, status messages
    pub text: Color,        // Primary text
    pub text_dim: Color,    // Dimmed text, placeholders
    pub inactive: Color,    // Unfocused borders
    pub header: Color,      // Box titles
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-inspired palette, readable on dark terminals
        Self {
            accent: Color::Rgb(250, 179, 135),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(249, 226, 175),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(137, 180, 250),
        }
    }
}
