use crate::models::{Message, Theme};
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    History,
}

/// A modal that swallows all other input until answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    ConfirmClear,
    Alert(String),
}

/// Everything the screen is drawn from.
#[derive(Debug)]
pub struct App {
    pub should_quit: bool,
    pub messages: Vec<Message>,
    pub input_buffer: String,
    /// Visible input lines, kept in sync by `auto_resize`.
    pub input_height: u16,
    pub scroll_offset: usize,
    pub focus: Focus,
    pub theme: Theme,
    pub dialog: Option<Dialog>,
    pub show_help: bool,
    /// Set while a chat request is in flight. Drives the typing indicator.
    pub is_loading: bool,
    /// Set from a confirmed clear until the server answers it.
    pub clear_pending: bool,
    pub exit_pending: bool,
    pub server_label: String,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            messages: Vec::new(),
            input_buffer: String::new(),
            input_height: 1,
            scroll_offset: 0,
            focus: Focus::Input,
            theme: Theme::default(),
            dialog: None,
            show_help: false,
            is_loading: false,
            clear_pending: false,
            exit_pending: false,
            server_label: String::new(),
        }
    }

    pub const fn quit(&mut self) {
        self.should_quit = true;
    }

    pub const fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Sending waits for both the last reply and any pending clear.
    pub const fn send_enabled(&self) -> bool {
        !self.is_loading && !self.clear_pending
    }

    pub const fn typing_indicator(&self) -> bool {
        self.is_loading
    }

    pub const fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::History,
            Focus::History => Focus::Input,
        };
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.scroll_to_bottom();
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.scroll_offset = 0;
    }

    pub fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.input_height = 1;
    }

    /// Lines the input buffer occupies when drawn at `width` columns.
    pub fn input_lines_needed(&self, width: u16) -> usize {
        ui::wrapped_height(ui::input_text(&self.input_buffer), width).max(1)
    }

    /// Fits `input_height` to the buffer, never below one line or above
    /// `max_lines`.
    pub fn auto_resize(&mut self, width: u16, max_lines: u16) {
        let needed = self.input_lines_needed(width);
        let max_lines = max_lines.max(1);
        self.input_height = u16::try_from(needed).unwrap_or(u16::MAX).clamp(1, max_lines);
    }

    pub const fn scroll_up(&mut self, amount: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
    }

    pub const fn scroll_down(&mut self, amount: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(amount);
    }

    pub const fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub const fn scroll_to_bottom(&mut self) {
        // The renderer clamps this to the real maximum
        self.scroll_offset = usize::MAX;
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
