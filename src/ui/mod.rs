pub mod palette;
pub mod widgets;

use crate::app::{App, Dialog};
use palette::Palette;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::{Line, Text},
    widgets::{Block, Paragraph, Wrap},
    Frame,
};

/// Tallest the input box grows before its content scrolls.
pub const MAX_INPUT_LINES: u16 = 6;

/// Columns available to input text inside the bordered box.
pub const fn input_text_width(frame_width: u16) -> u16 {
    frame_width.saturating_sub(2)
}

/// The input buffer one row per `\n`, keeping a trailing empty row.
pub fn input_text(buffer: &str) -> Text<'_> {
    Text::from(buffer.split('\n').map(Line::raw).collect::<Vec<_>>())
}

/// Rows `text` fills at `width` columns under the word wrap every paragraph
/// here is drawn with. `width` must exclude any borders.
pub fn wrapped_height<'a>(text: impl Into<Text<'a>>, width: u16) -> usize {
    Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .line_count(width.max(1))
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let palette = Palette::for_theme(app.theme);
    let area = frame.area();

    frame.render_widget(
        Block::default().style(
            Style::default()
                .bg(palette.background)
                .fg(palette.foreground),
        ),
        area,
    );

    // Text lines plus two border lines
    let input_height = app.input_height.clamp(1, MAX_INPUT_LINES) + 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),               // Chat history
            Constraint::Length(1),            // Status line
            Constraint::Length(input_height), // Input field
            Constraint::Length(1),            // Bottom keymap bar
        ])
        .split(area);

    widgets::render_chat_history(frame, app, &palette, chunks[0]);
    widgets::render_status_bar(frame, app, &palette, chunks[1]);
    widgets::render_input_field(frame, app, &palette, chunks[2]);
    widgets::render_bottom_bar(frame, app, &palette, chunks[3]);

    if app.show_help {
        widgets::render_help_window(frame, &palette, area);
    }

    match &app.dialog {
        Some(Dialog::ConfirmClear) => widgets::render_confirm_dialog(frame, &palette, area),
        Some(Dialog::Alert(text)) => widgets::render_alert(frame, text, &palette, area),
        None => {}
    }
}
