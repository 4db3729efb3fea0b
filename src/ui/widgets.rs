use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::palette::Palette;
use super::{input_text, wrapped_height};
use crate::app::{App, Focus};
use crate::controller::CLEAR_PROMPT;
use crate::models::Sender;

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_popup(
    frame: &mut Frame,
    title: &str,
    lines: Vec<Line<'_>>,
    border: Style,
    palette: &Palette,
    area: Rect,
) {
    let paragraph = Paragraph::new(lines)
        .style(Style::default().bg(palette.background).fg(palette.foreground))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {title} "))
                .border_style(border),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

pub fn render_help_window(frame: &mut Frame, palette: &Palette, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let help_text = vec![
        Line::from(Span::styled("Chat:", bold)),
        Line::from("  Enter         - Send message"),
        Line::from("  Shift+Enter   - New line (Alt+Enter also works)"),
        Line::from("  Ctrl+L        - Clear conversation"),
        Line::from("  Ctrl+T        - Toggle light/dark theme"),
        Line::from(""),
        Line::from(Span::styled("Navigation:", bold)),
        Line::from("  Tab           - Switch focus input/history"),
        Line::from("  Up/Down       - Scroll history (history focus)"),
        Line::from("  PgUp/PgDn     - Scroll history"),
        Line::from("  Home/End      - Jump to start/end"),
        Line::from(""),
        Line::from(Span::styled("General:", bold)),
        Line::from("  Ctrl+H        - Show/hide this help"),
        Line::from("  Ctrl+C twice  - Quit"),
        Line::from("  Ctrl+Q        - Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Ctrl+H or Esc to close",
            Style::default().fg(palette.muted),
        )),
    ];

    render_popup(
        frame,
        "Help",
        help_text,
        Style::default().fg(palette.accent),
        palette,
        centered(area, 56, 21),
    );
}

pub fn render_confirm_dialog(frame: &mut Frame, palette: &Palette, area: Rect) {
    let lines = vec![
        Line::from(CLEAR_PROMPT),
        Line::from(""),
        Line::from(Span::styled(
            "y / Enter: clear    n / Esc: cancel",
            Style::default().fg(palette.muted),
        )),
    ];

    render_popup(
        frame,
        "Clear conversation",
        lines,
        Style::default().fg(palette.accent),
        palette,
        centered(area, 48, 7),
    );
}

pub fn render_alert(frame: &mut Frame, text: &str, palette: &Palette, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(text.to_string(), Style::default().fg(palette.error))),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to dismiss",
            Style::default().fg(palette.muted),
        )),
    ];

    render_popup(
        frame,
        "Error",
        lines,
        Style::default().fg(palette.error),
        palette,
        centered(area, 48, 7),
    );
}

pub fn render_bottom_bar(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let (text, style) = if app.exit_pending {
        (
            "Press Ctrl+C again to exit, Esc to cancel",
            Style::default().fg(palette.error).add_modifier(Modifier::BOLD),
        )
    } else {
        (
            "Enter: Send | Ctrl+L: Clear | Ctrl+T: Theme | Ctrl+H: Help",
            Style::default().fg(palette.muted),
        )
    };

    let bar = Paragraph::new(text).alignment(Alignment::Center).style(style);

    frame.render_widget(bar, area);
}

pub fn render_status_bar(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let (send_state, send_color) = if app.send_enabled() {
        ("● ready", palette.assistant)
    } else {
        ("○ waiting for reply", palette.muted)
    };

    let status = Line::from(vec![
        Span::styled(
            format!("{} ", app.theme.icon()),
            Style::default().fg(palette.accent),
        ),
        Span::styled(send_state, Style::default().fg(send_color).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  {}", app.server_label),
            Style::default().fg(palette.muted),
        ),
    ]);

    frame.render_widget(Paragraph::new(status).alignment(Alignment::Right), area);
}

pub fn render_chat_history(frame: &mut Frame, app: &mut App, palette: &Palette, area: Rect) {
    let mut lines = Vec::new();

    for message in &app.messages {
        let color = palette.sender(message.sender);

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(
                message.sender.label(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", message.sent_at.format("%H:%M")),
                Style::default().fg(palette.muted),
            ),
        ]));

        let body_style = Style::default().fg(if message.sender == Sender::Error {
            palette.error
        } else {
            palette.foreground
        });
        for content_line in message.lines() {
            lines.push(Line::from(Span::styled(content_line.to_string(), body_style)));
        }
    }

    if app.typing_indicator() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Assistant is typing...",
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        )));
    }

    // One column goes to the left border
    let chat_history = Paragraph::new(lines).wrap(Wrap { trim: false });
    let total_visual_lines = chat_history.line_count(area.width.saturating_sub(1).max(1));

    let visible_height = area.height as usize;
    let max_scroll = total_visual_lines.saturating_sub(visible_height);
    let actual_scroll = app.scroll_offset.min(max_scroll);

    // Sync the clamped scroll back to the app state
    if app.scroll_offset != actual_scroll {
        app.scroll_offset = actual_scroll;
    }

    let border_style = if app.focus == Focus::History {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.background)
    };

    let chat_history = chat_history
        .block(Block::default().borders(Borders::LEFT).border_style(border_style))
        .scroll((u16::try_from(actual_scroll).unwrap_or(u16::MAX), 0));

    frame.render_widget(chat_history, area);
}

pub fn render_input_field(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let (text, text_style) = if app.input_buffer.is_empty() {
        (
            Text::from("Type your message..."),
            Style::default().fg(palette.muted),
        )
    } else {
        (
            input_text(&app.input_buffer),
            Style::default().fg(palette.foreground),
        )
    };

    let border_color = if app.focus == Focus::Input {
        palette.accent
    } else {
        palette.muted
    };

    // Keep the caret line visible once the box stops growing
    let inner_height = usize::from(area.height.saturating_sub(2));
    let needed = wrapped_height(text.clone(), area.width.saturating_sub(2));
    let overflow = u16::try_from(needed.saturating_sub(inner_height)).unwrap_or(u16::MAX);

    let input = Paragraph::new(text)
        .style(text_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(if app.send_enabled() { " Message " } else { " Message (waiting) " })
                .border_style(Style::default().fg(border_color)),
        )
        .wrap(Wrap { trim: false })
        .scroll((overflow, 0));

    frame.render_widget(input, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_fits_inside_area() {
        let area = Rect::new(0, 0, 30, 10);
        let popup = centered(area, 48, 7);
        assert_eq!(popup.width, 30);
        assert_eq!(popup.height, 7);
        assert_eq!(popup.x, 0);
        assert_eq!(popup.y, 1);
    }

    #[test]
    fn test_centered_in_large_area() {
        let popup = centered(Rect::new(0, 0, 100, 40), 48, 7);
        assert_eq!(popup, Rect::new(26, 16, 48, 7));
    }
}
