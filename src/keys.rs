use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::api::ChatBackend;
use crate::app::{App, Dialog, Focus};
use crate::controller::{ChatController, PendingClear, PendingSend};
use crate::storage::PreferenceStore;

/// Network work a key press started. The event loop runs it on a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Send(PendingSend),
    Clear(PendingClear),
}

/// Routes one key press: open modals first, then the help window, then the
/// main bindings. `input_width` is the text width inside the input box.
pub fn handle_key<B, S>(
    controller: &mut ChatController<B, S>,
    key: KeyEvent,
    input_width: u16,
) -> KeyAction
where
    B: ChatBackend + 'static,
    S: PreferenceStore,
{
    if let Some(action) = handle_dialog_keys(controller, key) {
        return action;
    }
    if handle_help_keys(&mut controller.app, key) {
        return KeyAction::None;
    }
    handle_keyboard_input(controller, key, input_width)
}

/// Keys while a modal is open. A modal swallows every key.
fn handle_dialog_keys<B, S>(controller: &mut ChatController<B, S>, key: KeyEvent) -> Option<KeyAction>
where
    B: ChatBackend + 'static,
    S: PreferenceStore,
{
    match controller.app.dialog {
        Some(Dialog::ConfirmClear) => {
            let answer = match key.code {
                KeyCode::Char('y' | 'Y') | KeyCode::Enter => Some(true),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => Some(false),
                _ => None,
            };
            let action = answer
                .and_then(|accepted| controller.answer_confirm(accepted))
                .map_or(KeyAction::None, KeyAction::Clear);
            Some(action)
        }
        Some(Dialog::Alert(_)) => {
            controller.dismiss_alert();
            Some(KeyAction::None)
        }
        None => None,
    }
}

const fn handle_help_keys(app: &mut App, key: KeyEvent) -> bool {
    if !app.show_help {
        return false;
    }

    match key.code {
        KeyCode::Char('h') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.toggle_help();
        }
        KeyCode::Esc => {
            app.show_help = false;
        }
        _ => {}
    }
    true
}

fn handle_keyboard_input<B, S>(
    controller: &mut ChatController<B, S>,
    key: KeyEvent,
    input_width: u16,
) -> KeyAction
where
    B: ChatBackend + 'static,
    S: PreferenceStore,
{
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => {
            if controller.app.exit_pending {
                controller.app.quit();
            } else {
                controller.app.exit_pending = true;
            }
            return KeyAction::None;
        }
        KeyCode::Esc if controller.app.exit_pending => {
            controller.app.exit_pending = false;
            return KeyAction::None;
        }
        // Any other key cancels pending exit and is processed normally
        _ => controller.app.exit_pending = false,
    }

    match key.code {
        KeyCode::Char('q') if ctrl => controller.app.quit(),
        KeyCode::Char('h') if ctrl => controller.app.toggle_help(),
        KeyCode::Char('t') if ctrl => {
            controller.toggle_theme();
        }
        KeyCode::Char('l') if ctrl => controller.request_clear(),
        KeyCode::Tab => controller.app.toggle_focus(),

        KeyCode::Up if controller.app.focus == Focus::History => controller.app.scroll_up(1),
        KeyCode::Down if controller.app.focus == Focus::History => controller.app.scroll_down(1),
        KeyCode::PageUp => controller.app.scroll_up(10),
        KeyCode::PageDown => controller.app.scroll_down(10),
        KeyCode::Home => controller.app.scroll_to_top(),
        KeyCode::End => controller.app.scroll_to_bottom(),

        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            edit_input(controller, input_width, |buffer| buffer.push('\n'));
        }
        KeyCode::Enter => {
            return controller
                .begin_submit_input()
                .map_or(KeyAction::None, KeyAction::Send);
        }
        KeyCode::Backspace => edit_input(controller, input_width, |buffer| {
            buffer.pop();
        }),
        KeyCode::Char(c) if !ctrl => edit_input(controller, input_width, |buffer| buffer.push(c)),
        _ => {}
    }

    KeyAction::None
}

/// Typing always lands in the input box and refits it.
fn edit_input<B, S>(
    controller: &mut ChatController<B, S>,
    input_width: u16,
    edit: impl FnOnce(&mut String),
) where
    B: ChatBackend + 'static,
    S: PreferenceStore,
{
    controller.app.focus = Focus::Input;
    edit(&mut controller.app.input_buffer);
    controller.auto_resize(input_width);
}
