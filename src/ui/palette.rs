// Colors for the light and dark themes

use ratatui::style::Color;

use crate::models::{Sender, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub accent: Color,
    pub user: Color,
    pub assistant: Color,
    pub error: Color,
}

impl Palette {
    pub const fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                background: Color::Rgb(250, 250, 250),
                foreground: Color::Rgb(33, 33, 33),
                muted: Color::Rgb(120, 120, 120),
                accent: Color::Rgb(25, 118, 210),
                user: Color::Rgb(21, 101, 192),
                assistant: Color::Rgb(46, 125, 50),
                error: Color::Rgb(198, 40, 40),
            },
            Theme::Dark => Self {
                background: Color::Rgb(30, 30, 30),
                foreground: Color::Rgb(230, 230, 230),
                muted: Color::Rgb(140, 140, 140),
                accent: Color::Rgb(100, 181, 246),
                user: Color::Rgb(144, 202, 249),
                assistant: Color::Rgb(129, 199, 132),
                error: Color::Rgb(239, 154, 154),
            },
        }
    }

    pub const fn sender(&self, sender: Sender) -> Color {
        match sender {
            Sender::User => self.user,
            Sender::Assistant => self.assistant,
            Sender::Error => self.error,
        }
    }
}
