//! Theme definitions for the TUI.

use super::log::LineKind;
use ratatui::style::Color;

/// A color theme for the TUI.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Theme name
    pub name: &'static str,

    // Base colors
    pub bg: Color,
    pub fg: Color,

    // Log colors
    /// Inbound device data
    pub data_color: Color,
    /// Echoed commands
    pub command_color: Color,
    /// Session info lines
    pub info_color: Color,
    /// Session error lines
    pub error_color: Color,
    /// Connected indicator
    pub success_color: Color,

    // UI element colors
    pub border: Color,
    pub selection: Color,
    pub inactive: Color,
    pub accent: Color,
}

impl Theme {
    /// Dark theme (default)
    pub const fn dark() -> Self {
        Self {
            name: "dark",
            bg: Color::Rgb(30, 30, 46),
            fg: Color::Rgb(205, 214, 244),
            data_color: Color::Rgb(166, 227, 161),
            command_color: Color::Rgb(137, 180, 250),
            info_color: Color::Rgb(249, 226, 175),
            error_color: Color::Rgb(243, 139, 168),
            success_color: Color::Rgb(166, 227, 161),
            border: Color::Rgb(88, 91, 112),
            selection: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(108, 112, 134),
            accent: Color::Rgb(203, 166, 247),
        }
    }

    pub const fn light() -> Self {
        Self {
            name: "light",
            bg: Color::Rgb(239, 241, 245),
            fg: Color::Rgb(76, 79, 105),
            data_color: Color::Rgb(64, 160, 43),
            command_color: Color::Rgb(30, 102, 245),
            info_color: Color::Rgb(223, 142, 29),
            error_color: Color::Rgb(210, 15, 57),
            success_color: Color::Rgb(64, 160, 43),
            border: Color::Rgb(172, 176, 190),
            selection: Color::Rgb(204, 208, 218),
            inactive: Color::Rgb(140, 143, 161),
            accent: Color::Rgb(136, 57, 239),
        }
    }

    pub const fn nord() -> Self {
        Self {
            name: "nord",
            bg: Color::Rgb(46, 52, 64),
            fg: Color::Rgb(216, 222, 233),
            data_color: Color::Rgb(163, 190, 140),
            command_color: Color::Rgb(129, 161, 193),
            info_color: Color::Rgb(235, 203, 139),
            error_color: Color::Rgb(191, 97, 106),
            success_color: Color::Rgb(163, 190, 140),
            border: Color::Rgb(76, 86, 106),
            selection: Color::Rgb(67, 76, 94),
            inactive: Color::Rgb(107, 112, 137),
            accent: Color::Rgb(180, 142, 173),
        }
    }

    /// Get theme by name
    pub fn by_name(name: &str) -> Option<&'static Theme> {
        THEMES.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn line_color(&self, kind: LineKind) -> Color {
        match kind {
            LineKind::Data => self.data_color,
            LineKind::Command => self.command_color,
            LineKind::Info => self.info_color,
            LineKind::Error => self.error_color,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Available themes
pub static THEMES: &[Theme] = &[Theme::dark(), Theme::light(), Theme::nord()];
