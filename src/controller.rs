//! Chat client controller.
//!
//! Binds what the user does (typed text, key presses) to calls against a
//! [`ChatBackend`] and renders the outcome into [`App`]. Each network-bound
//! action is split in two so the event loop can run the request on a task:
//! a `begin_*` half that updates the view and hands back what to send, and a
//! `finish_*` half that applies the result.

use std::sync::Arc;

use crate::api::{ApiError, ChatBackend};
use crate::app::{App, Dialog, Focus};
use crate::models::{AppConfig, Message, Sender, Theme};
use crate::storage::{PreferenceStore, THEME_KEY};
use crate::ui::MAX_INPUT_LINES;

/// Shown when a chat request could not reach the server at all.
pub const NETWORK_ERROR_TEXT: &str =
    "Network error: could not reach the server. Please try again.";

pub const CLEAR_PROMPT: &str = "Clear the whole conversation? This cannot be undone.";

/// A chat request that has been rendered but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub message: String,
}

/// A confirmed clear that still has to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingClear;

pub struct ChatController<B, S> {
    backend: Arc<B>,
    prefs: S,
    greeting: String,
    pub app: App,
}

impl<B, S> ChatController<B, S>
where
    B: ChatBackend + 'static,
    S: PreferenceStore,
{
    /// Applies the persisted theme and seeds the greeting.
    pub fn new(backend: Arc<B>, prefs: S, config: &AppConfig) -> Self {
        let mut app = App::new();
        app.theme = prefs
            .get(THEME_KEY)
            .and_then(|value| value.parse::<Theme>().ok())
            .unwrap_or_default();
        app.server_label.clone_from(&config.server_url);
        app.push_message(Message::new(Sender::Assistant, config.greeting.as_str()));

        Self {
            backend,
            prefs,
            greeting: config.greeting.clone(),
            app,
        }
    }

    pub fn backend(&self) -> Arc<B> {
        Arc::clone(&self.backend)
    }

    /// Renders `text` as a user message and returns the request to send.
    ///
    /// Returns `None`, changing nothing, when the text is blank or the send
    /// control is disabled.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingSend> {
        if !self.app.send_enabled() {
            return None;
        }

        let message = text.trim();
        if message.is_empty() {
            return None;
        }

        self.app.push_message(Message::new(Sender::User, message));
        self.app.clear_input();
        self.app.is_loading = true;

        tracing::info!(chars = message.chars().count(), "chat request dispatched");

        Some(PendingSend {
            message: message.to_string(),
        })
    }

    /// Submits whatever is in the input box.
    pub fn begin_submit_input(&mut self) -> Option<PendingSend> {
        let text = self.app.input_buffer.clone();
        self.begin_submit(&text)
    }

    pub fn finish_submit(&mut self, result: Result<String, ApiError>) {
        self.app.is_loading = false;

        let message = match result {
            Ok(reply) => {
                tracing::info!("chat reply received");
                Message::new(Sender::Assistant, reply.replace("\r\n", "\n"))
            }
            Err(ApiError::Network(detail)) => {
                tracing::warn!(%detail, "chat request failed to complete");
                Message::new(Sender::Error, NETWORK_ERROR_TEXT)
            }
            Err(e) => {
                tracing::warn!(status = ?e.status(), error = %e, "chat request returned an error");
                Message::new(Sender::Error, format!("Sorry, something went wrong: {e}"))
            }
        };

        self.app.push_message(message);
        self.app.focus = Focus::Input;
    }

    /// Both halves of a submit around one awaited request.
    #[cfg(test)]
    pub async fn submit(&mut self, text: &str) {
        if let Some(pending) = self.begin_submit(text) {
            let result = self.backend.send_message(&pending.message).await;
            self.finish_submit(result);
        }
    }

    /// Opens the clear-conversation confirmation. Refused while another
    /// modal is up, a reply is outstanding or an earlier clear is unanswered.
    pub fn request_clear(&mut self) {
        if self.app.dialog.is_some() || self.app.is_loading || self.app.clear_pending {
            tracing::debug!("clear request ignored");
            return;
        }
        self.app.dialog = Some(Dialog::ConfirmClear);
    }

    /// Closes the confirmation; an accepted one yields the clear to send.
    pub fn answer_confirm(&mut self, accepted: bool) -> Option<PendingClear> {
        if self.app.dialog != Some(Dialog::ConfirmClear) {
            return None;
        }
        self.app.dialog = None;

        if accepted {
            tracing::info!("clear conversation confirmed");
            self.app.clear_pending = true;
            Some(PendingClear)
        } else {
            None
        }
    }

    pub fn finish_clear(&mut self, result: Result<(), ApiError>) {
        self.app.clear_pending = false;

        match result {
            Ok(()) => {
                tracing::info!("conversation cleared");
                self.app.clear_messages();
                self.app
                    .push_message(Message::new(Sender::Assistant, self.greeting.as_str()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "clear request failed");
                self.app.dialog = Some(Dialog::Alert(format!(
                    "Failed to clear the conversation: {e}"
                )));
            }
        }
    }

    /// Clears the conversation if `confirm` accepts the prompt.
    #[cfg(test)]
    pub async fn clear_with<F>(&mut self, confirm: F)
    where
        F: FnOnce(&str) -> bool,
    {
        self.request_clear();
        let accepted = confirm(CLEAR_PROMPT);
        if self.answer_confirm(accepted).is_some() {
            let result = self.backend.clear().await;
            self.finish_clear(result);
        }
    }

    pub fn dismiss_alert(&mut self) {
        if matches!(self.app.dialog, Some(Dialog::Alert(_))) {
            self.app.dialog = None;
        }
    }

    /// Flips the theme and persists it. A failed write keeps the new theme
    /// on screen for this session.
    pub fn toggle_theme(&mut self) -> Theme {
        let theme = self.app.theme.toggled();
        self.app.theme = theme;

        if let Err(e) = self.prefs.set(THEME_KEY, theme.as_str()) {
            tracing::warn!(error = %e, %theme, "failed to persist theme");
        } else {
            tracing::debug!(%theme, "theme toggled");
        }

        theme
    }

    /// Fits the input box to its content at `width` columns.
    pub fn auto_resize(&mut self, width: u16) {
        self.app.auto_resize(width, MAX_INPUT_LINES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockChatBackend;
    use crate::storage::MemoryPreferences;
    use mockall::Sequence;

    fn config() -> AppConfig {
        AppConfig::default()
    }

    fn controller(
        backend: MockChatBackend,
    ) -> ChatController<MockChatBackend, MemoryPreferences> {
        ChatController::new(Arc::new(backend), MemoryPreferences::default(), &config())
    }

    /// Messages after the seeded greeting.
    fn transcript(c: &ChatController<MockChatBackend, MemoryPreferences>) -> Vec<(Sender, &str)> {
        c.app.messages[1..]
            .iter()
            .map(|m| (m.sender, m.content.as_str()))
            .collect()
    }

    #[test]
    fn test_new_seeds_greeting_and_default_theme() {
        let c = controller(MockChatBackend::new());
        assert_eq!(c.app.messages.len(), 1);
        assert_eq!(c.app.messages[0].sender, Sender::Assistant);
        assert_eq!(c.app.messages[0].content, config().greeting);
        assert_eq!(c.app.theme, Theme::Light);
        assert_eq!(c.app.server_label, config().server_url);
    }

    #[test]
    fn test_new_reads_persisted_theme() {
        let mut prefs = MemoryPreferences::default();
        prefs.set(THEME_KEY, "dark").unwrap();
        let c = ChatController::new(Arc::new(MockChatBackend::new()), prefs, &config());
        assert_eq!(c.app.theme, Theme::Dark);
    }

    #[test]
    fn test_new_ignores_unknown_theme_value() {
        let mut prefs = MemoryPreferences::default();
        prefs.set(THEME_KEY, "sepia").unwrap();
        let c = ChatController::new(Arc::new(MockChatBackend::new()), prefs, &config());
        assert_eq!(c.app.theme, Theme::Light);
    }

    #[tokio::test]
    async fn test_blank_submit_is_dropped() {
        let mut backend = MockChatBackend::new();
        backend.expect_send_message().times(0);
        let mut c = controller(backend);

        for text in ["", "   ", "\n\t "] {
            c.app.input_buffer = text.to_string();
            c.submit(text).await;
        }

        assert!(transcript(&c).is_empty());
        assert!(c.app.send_enabled());
        assert!(!c.app.typing_indicator());
        // Input is left alone
        assert_eq!(c.app.input_buffer, "\n\t ");
    }

    #[test]
    fn test_begin_submit_renders_and_disables_send() {
        let mut c = controller(MockChatBackend::new());
        c.app.input_buffer = "  Hello\nthere  ".to_string();
        c.auto_resize(40);
        assert_eq!(c.app.input_height, 2);

        let pending = c.begin_submit_input().unwrap();

        assert_eq!(pending.message, "Hello\nthere");
        assert_eq!(transcript(&c), vec![(Sender::User, "Hello\nthere")]);
        assert!(c.app.input_buffer.is_empty());
        assert_eq!(c.app.input_height, 1);
        assert!(c.app.typing_indicator());
        assert!(!c.app.send_enabled());
    }

    #[test]
    fn test_second_submit_while_in_flight_is_ignored() {
        let mut c = controller(MockChatBackend::new());
        assert!(c.begin_submit("first").is_some());
        assert!(c.begin_submit("second").is_none());
        assert_eq!(transcript(&c), vec![(Sender::User, "first")]);
    }

    #[tokio::test]
    async fn test_submit_success() {
        let mut backend = MockChatBackend::new();
        backend
            .expect_send_message()
            .withf(|message| message == "Hello")
            .times(1)
            .returning(|_| Ok("Hi there!".to_string()));
        let mut c = controller(backend);
        c.app.focus = Focus::History;

        c.submit("Hello").await;

        assert_eq!(
            transcript(&c),
            vec![(Sender::User, "Hello"), (Sender::Assistant, "Hi there!")]
        );
        assert!(!c.app.typing_indicator());
        assert!(c.app.send_enabled());
        assert_eq!(c.app.focus, Focus::Input);
    }

    #[tokio::test]
    async fn test_submit_reply_keeps_line_breaks() {
        let mut backend = MockChatBackend::new();
        backend
            .expect_send_message()
            .returning(|_| Ok("one\r\ntwo".to_string()));
        let mut c = controller(backend);

        c.submit("lines please").await;

        let reply = c.app.messages.last().unwrap();
        assert_eq!(reply.lines().collect::<Vec<_>>(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_submit_http_error() {
        let mut backend = MockChatBackend::new();
        backend.expect_send_message().returning(|_| {
            Err(ApiError::Http {
                status: 500,
                message: "overloaded".to_string(),
            })
        });
        let mut c = controller(backend);

        c.submit("test").await;

        assert_eq!(
            transcript(&c),
            vec![
                (Sender::User, "test"),
                (Sender::Error, "Sorry, something went wrong: overloaded")
            ]
        );
        assert!(c.app.send_enabled());
    }

    #[tokio::test]
    async fn test_submit_application_error() {
        let mut backend = MockChatBackend::new();
        backend
            .expect_send_message()
            .returning(|_| Err(ApiError::Application("rate limited".to_string())));
        let mut c = controller(backend);

        c.submit("test").await;

        let last = c.app.messages.last().unwrap();
        assert_eq!(last.sender, Sender::Error);
        assert_eq!(last.content, "Sorry, something went wrong: rate limited");
        assert!(c.app.send_enabled());
    }

    #[tokio::test]
    async fn test_submit_network_error() {
        let mut backend = MockChatBackend::new();
        backend
            .expect_send_message()
            .returning(|_| Err(ApiError::Network("connection refused".to_string())));
        let mut c = controller(backend);

        c.submit("test").await;

        assert_eq!(
            transcript(&c),
            vec![(Sender::User, "test"), (Sender::Error, NETWORK_ERROR_TEXT)]
        );
        assert!(!c.app.typing_indicator());
        assert!(c.app.send_enabled());
        assert_eq!(c.app.focus, Focus::Input);
    }

    #[test]
    fn test_toggle_theme_persists() {
        let mut c = controller(MockChatBackend::new());

        assert_eq!(c.toggle_theme(), Theme::Dark);
        assert_eq!(c.prefs.get(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(c.app.theme, Theme::Dark);

        assert_eq!(c.toggle_theme(), Theme::Light);
        assert_eq!(c.prefs.get(THEME_KEY).as_deref(), Some("light"));
        assert_eq!(c.app.theme, Theme::Light);
    }

    #[tokio::test]
    async fn test_clear_confirmed() {
        let mut seq = Sequence::new();
        let mut backend = MockChatBackend::new();
        backend
            .expect_send_message()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|m| Ok(format!("echo {m}")));
        backend
            .expect_clear()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        let mut c = controller(backend);
        c.submit("one").await;
        c.submit("two").await;
        assert_eq!(c.app.messages.len(), 5);

        c.clear_with(|prompt| {
            assert_eq!(prompt, CLEAR_PROMPT);
            true
        })
        .await;

        assert_eq!(c.app.messages.len(), 1);
        assert_eq!(c.app.messages[0].content, config().greeting);
        assert!(c.app.dialog.is_none());
    }

    #[tokio::test]
    async fn test_clear_declined() {
        let mut backend = MockChatBackend::new();
        backend.expect_clear().times(0);
        backend
            .expect_send_message()
            .returning(|_| Ok("hi".to_string()));
        let mut c = controller(backend);
        c.submit("hello").await;

        c.clear_with(|_| false).await;

        assert_eq!(
            transcript(&c),
            vec![(Sender::User, "hello"), (Sender::Assistant, "hi")]
        );
        assert!(c.app.dialog.is_none());
    }

    #[tokio::test]
    async fn test_clear_failure_raises_alert() {
        let mut backend = MockChatBackend::new();
        backend.expect_clear().returning(|| {
            Err(ApiError::Http {
                status: 500,
                message: "Internal Server Error".to_string(),
            })
        });
        let mut c = controller(backend);

        c.clear_with(|_| true).await;

        assert_eq!(c.app.messages.len(), 1);
        assert_eq!(
            c.app.dialog,
            Some(Dialog::Alert(
                "Failed to clear the conversation: Internal Server Error".to_string()
            ))
        );

        c.dismiss_alert();
        assert!(c.app.dialog.is_none());
    }

    #[test]
    fn test_clear_refused_while_reply_in_flight() {
        let mut c = controller(MockChatBackend::new());
        assert!(c.begin_submit("hello").is_some());

        c.request_clear();
        assert!(c.app.dialog.is_none());
        assert!(c.answer_confirm(true).is_none());

        c.finish_submit(Ok("late reply".to_string()));
        assert_eq!(
            transcript(&c),
            vec![(Sender::User, "hello"), (Sender::Assistant, "late reply")]
        );

        c.request_clear();
        assert_eq!(c.app.dialog, Some(Dialog::ConfirmClear));
    }

    #[test]
    fn test_second_clear_while_pending_is_refused() {
        let mut c = controller(MockChatBackend::new());
        c.request_clear();
        assert_eq!(c.answer_confirm(true), Some(PendingClear));
        assert!(c.app.clear_pending);

        c.request_clear();
        assert!(c.app.dialog.is_none());
        assert!(c.answer_confirm(true).is_none());
        // Nothing may be sent until the clear lands
        assert!(c.begin_submit("too early").is_none());

        c.finish_clear(Ok(()));
        assert!(!c.app.clear_pending);
        assert_eq!(c.app.messages.len(), 1);
        assert_eq!(c.app.messages[0].content, config().greeting);
        assert!(c.app.send_enabled());
    }

    #[test]
    fn test_failed_clear_releases_pending() {
        let mut c = controller(MockChatBackend::new());
        c.request_clear();
        assert!(c.answer_confirm(true).is_some());

        c.finish_clear(Err(ApiError::Network("refused".to_string())));
        assert!(!c.app.clear_pending);
        assert!(c.app.send_enabled());
        assert!(matches!(c.app.dialog, Some(Dialog::Alert(_))));
    }

    #[test]
    fn test_answer_without_prompt_does_nothing() {
        let mut c = controller(MockChatBackend::new());
        assert!(c.answer_confirm(true).is_none());

        c.app.dialog = Some(Dialog::Alert("x".to_string()));
        c.request_clear();
        assert!(c.answer_confirm(true).is_none());
        assert_eq!(c.app.dialog, Some(Dialog::Alert("x".to_string())));
    }
}
