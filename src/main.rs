mod api;
mod app;
mod config;
mod controller;
mod events;
mod keys;
mod models;
mod storage;
mod ui;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, Event, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{backend::Backend, prelude::*};
use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use api::{ChatBackend, HttpBackend};
use controller::{ChatController, PendingClear, PendingSend};
use events::AppEvent;
use keys::KeyAction;
use storage::{FilePreferences, PreferenceStore};

type Controller = ChatController<HttpBackend, FilePreferences>;

/// Logs go to a file; the terminal belongs to the UI.
fn init_tracing() -> Result<()> {
    let log_path = config::get_log_path()?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = config::load_config()?;
    let backend = Arc::new(HttpBackend::from_config(&config)?);
    let prefs = FilePreferences::open(config::get_preferences_path()?);
    let mut controller = ChatController::new(backend, prefs, &config);

    tracing::info!(server = %config.server_url, profile = ?config.profile, "starting chatterm");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    // Shift+Enter is only distinguishable with the enhanced keyboard protocol
    let enhanced_keys = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced_keys {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();

    let res = run_app(&mut terminal, &mut controller, &tx, &mut rx);

    // Restore terminal
    if enhanced_keys {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "chatterm exited with an error");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn handle_app_event<B, S>(controller: &mut ChatController<B, S>, event: AppEvent)
where
    B: ChatBackend + 'static,
    S: PreferenceStore,
{
    match event {
        AppEvent::ReplyReceived(result) => controller.finish_submit(result),
        AppEvent::ClearFinished(result) => controller.finish_clear(result),
    }
}

fn dispatch_send<B: ChatBackend + 'static>(
    backend: Arc<B>,
    pending: PendingSend,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let result = backend.send_message(&pending.message).await;
        let _ = tx.send(AppEvent::ReplyReceived(result));
    });
}

fn dispatch_clear<B: ChatBackend + 'static>(
    backend: Arc<B>,
    _pending: PendingClear,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let result = backend.clear().await;
        let _ = tx.send(AppEvent::ClearFinished(result));
    });
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    controller: &mut Controller,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
    event_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, &mut controller.app))?;

        // Apply finished requests first
        while let Ok(app_event) = event_rx.try_recv() {
            handle_app_event(controller, app_event);
        }

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let input_width = ui::input_text_width(terminal.size()?.width);

                    match keys::handle_key(controller, key, input_width) {
                        KeyAction::Send(pending) => {
                            dispatch_send(controller.backend(), pending, event_tx);
                        }
                        KeyAction::Clear(pending) => {
                            dispatch_clear(controller.backend(), pending, event_tx);
                        }
                        KeyAction::None => {}
                    }
                }
                Event::Resize(width, _) => controller.auto_resize(ui::input_text_width(width)),
                _ => {}
            }
        }

        if controller.app.should_quit {
            break;
        }
    }
    Ok(())
}
