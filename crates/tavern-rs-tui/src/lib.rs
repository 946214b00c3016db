//! Library entry point for the Tavern TUI.
//!
//! Provides a reusable [`run`] function that drives a pre-configured
//! [`Orchestrator`] from a Ratatui terminal UI. Every network transition runs
//! on a spawned task and reports back over a channel, so the UI keeps
//! redrawing while a request is outstanding.

mod app;
mod event;
mod ui;

use app::App;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyCode, KeyEvent,
    KeyEventKind, KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use event::AppEvent;
use log::{debug, info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::future::Future;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tavern_rs_core::{Orchestrator, SelectOutcome};
use tavern_rs_protocol::CharacterId;
use tokio::sync::mpsc;

/// Startup options for [`run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Character to select first instead of the first listed one.
    pub initial_character: Option<CharacterId>,
}

/// Run the terminal UI until the user quits or logs out.
pub async fn run(orchestrator: Arc<Orchestrator>, options: RunOptions) -> anyhow::Result<()> {
    let mut app = App::new();
    if !orchestrator.is_authenticated() {
        warn!("starting without a valid credential");
        app.push_status("not signed in; chats will not be saved");
    }

    let mut terminal = setup_terminal()?;
    let (tx, mut rx) = mpsc::channel(256);
    spawn_input_handler(tx.clone());
    spawn_tick(tx.clone());
    spawn_bootstrap(orchestrator.clone(), options.initial_character, tx.clone());

    let result = async {
        loop {
            app.sync(orchestrator.snapshot());
            terminal.draw(|frame| ui::draw(frame, &mut app))?;

            let Some(event) = rx.recv().await else { break };
            if handle_app_event(event, &orchestrator, &mut app, &tx) {
                break;
            }
        }
        anyhow::Ok(())
    }
    .await;

    restore_terminal(&mut terminal)?;
    result
}

/// Dispatch a UI event and return true when the app should exit.
fn handle_app_event(
    event: AppEvent,
    orchestrator: &Arc<Orchestrator>,
    app: &mut App,
    sender: &mpsc::Sender<AppEvent>,
) -> bool {
    match event {
        AppEvent::Input(key) => return handle_input(key, orchestrator, app, sender),
        AppEvent::Scroll(delta) => {
            if delta < 0 {
                app.scroll_up(delta.unsigned_abs());
            } else {
                app.scroll_down(delta.unsigned_abs());
            }
        }
        AppEvent::Tick => app.tick(),
        AppEvent::Characters(Ok(count)) => {
            debug!("characters loaded (count={})", count);
            if count == 0 {
                app.push_status("no characters available");
            }
        }
        AppEvent::Characters(Err(err)) => {
            app.push_status(format!("failed to load characters: {err}"));
        }
        AppEvent::Selected {
            character_id,
            outcome,
        } => app.push_status(app::select_status(&character_id, &outcome)),
        AppEvent::Started(Ok(outcome)) => app.push_status(app::start_status(&outcome)),
        AppEvent::Started(Err(err)) => app.push_status(app::start_error_status(&err)),
        AppEvent::Sent(result) => {
            app.enable_auto_scroll();
            app.push_status(app::send_status(&result));
        }
        AppEvent::Edited(result) => app.push_status(app::edit_status(&result)),
        AppEvent::PastSessions { character_id, load } => {
            if app.view.active.as_deref() == Some(character_id.as_str()) {
                app.push_status(app::past_status(&load));
            }
        }
        AppEvent::LoggedOut(outcome) => {
            info!("{}", app::logout_status(&outcome));
            return true;
        }
    }
    false
}

/// Handle keyboard input and dispatch actions.
fn handle_input(
    key: KeyEvent,
    orchestrator: &Arc<Orchestrator>,
    app: &mut App,
    sender: &mpsc::Sender<AppEvent>,
) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return true;
    }
    if key.code == KeyCode::Esc {
        if app.viewer.is_some() {
            app.close_viewer();
            return false;
        }
        if app.editing.is_some() {
            app.cancel_edit();
            app.push_status("edit cancelled");
            return false;
        }
        return true;
    }

    if app.viewer.is_some() {
        match key.code {
            KeyCode::Up => app.viewer_up(),
            KeyCode::Down => app.viewer_down(),
            KeyCode::Enter => {
                if let Some(session) = app.selected_past() {
                    if orchestrator.select_past_session(session) {
                        app.push_status("past session restored");
                    } else {
                        app.push_status("session cannot be restored");
                    }
                }
                app.close_viewer();
            }
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Tab | KeyCode::BackTab if app.editing.is_none() => {
            let step = if key.code == KeyCode::BackTab { -1 } else { 1 };
            if let Some(character_id) = app.neighbor_character(step) {
                spawn_select(orchestrator.clone(), character_id, sender.clone());
            }
        }
        KeyCode::Char('n') if ctrl => {
            let orchestrator = orchestrator.clone();
            spawn_task(sender.clone(), async move {
                AppEvent::Started(orchestrator.start_new_chat().await)
            });
        }
        KeyCode::Char('l') if ctrl => {
            let orchestrator = orchestrator.clone();
            spawn_task(sender.clone(), async move {
                AppEvent::Started(orchestrator.clear_chat().await)
            });
        }
        KeyCode::Char('p') if ctrl => {
            let Some(character_id) = app.view.active.clone() else {
                app.push_status("select a character first");
                return false;
            };
            app.open_viewer();
            app.push_status("loading past sessions");
            let orchestrator = orchestrator.clone();
            spawn_task(sender.clone(), async move {
                let load = orchestrator.load_past_sessions(&character_id).await;
                AppEvent::PastSessions { character_id, load }
            });
        }
        KeyCode::Char('e') if ctrl => {
            if !app.begin_edit() {
                app.push_status("no saved message to edit");
            }
        }
        KeyCode::Char('o') if ctrl => {
            app.push_status("logging out");
            let orchestrator = orchestrator.clone();
            spawn_task(sender.clone(), async move {
                AppEvent::LoggedOut(orchestrator.logout().await)
            });
        }
        KeyCode::PageUp => app.scroll_up(5),
        KeyCode::PageDown => app.scroll_down(5),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Home => app.scroll_to_top(),
        KeyCode::End => app.enable_auto_scroll(),
        KeyCode::Enter => {
            if app.editing.is_some() {
                if let Some(message) = app.take_edit() {
                    app.push_status("saving edit");
                    let orchestrator = orchestrator.clone();
                    spawn_task(sender.clone(), async move {
                        AppEvent::Edited(orchestrator.edit_message(message).await)
                    });
                }
            } else {
                let text = app.input.clone();
                app.push_status("sending");
                let orchestrator = orchestrator.clone();
                spawn_task(sender.clone(), async move {
                    AppEvent::Sent(orchestrator.send_message(&text).await)
                });
            }
        }
        KeyCode::Backspace => {
            app.input.pop();
            sync_draft(orchestrator, app);
        }
        KeyCode::Char(ch) if !ctrl => {
            app.input.push(ch);
            sync_draft(orchestrator, app);
        }
        _ => {}
    }
    false
}

/// The orchestrator owns the draft; the edit buffer never reaches it.
fn sync_draft(orchestrator: &Orchestrator, app: &App) {
    if app.editing.is_none() {
        orchestrator.set_draft(app.input.clone());
    }
}

/// Run a future on the runtime and forward its event to the UI loop.
fn spawn_task<F>(sender: mpsc::Sender<AppEvent>, task: F)
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let _ = sender.send(task.await).await;
    });
}

fn spawn_select(
    orchestrator: Arc<Orchestrator>,
    character_id: CharacterId,
    sender: mpsc::Sender<AppEvent>,
) {
    debug!("selecting character (character_id={})", character_id);
    spawn_task(sender, async move {
        let outcome = orchestrator.select_character(&character_id).await;
        AppEvent::Selected {
            character_id,
            outcome,
        }
    });
}

/// Load characters, then select the requested or first character.
fn spawn_bootstrap(
    orchestrator: Arc<Orchestrator>,
    initial_character: Option<CharacterId>,
    sender: mpsc::Sender<AppEvent>,
) {
    tokio::spawn(async move {
        let selection = match initial_character {
            Some(character_id) => match orchestrator.refresh_characters().await {
                Ok(characters) => {
                    let _ = sender.send(AppEvent::Characters(Ok(characters.len()))).await;
                    let outcome = orchestrator.select_character(&character_id).await;
                    Some((character_id, outcome))
                }
                Err(err) => {
                    let _ = sender.send(AppEvent::Characters(Err(err))).await;
                    None
                }
            },
            None => match orchestrator.bootstrap().await {
                Ok(outcome) => {
                    let count = orchestrator.characters().len();
                    let _ = sender.send(AppEvent::Characters(Ok(count))).await;
                    outcome.and_then(|outcome| selected_pair(&orchestrator, outcome))
                }
                Err(err) => {
                    let _ = sender.send(AppEvent::Characters(Err(err))).await;
                    None
                }
            },
        };
        if let Some((character_id, outcome)) = selection {
            let _ = sender
                .send(AppEvent::Selected {
                    character_id,
                    outcome,
                })
                .await;
        }
    });
}

fn selected_pair(
    orchestrator: &Orchestrator,
    outcome: SelectOutcome,
) -> Option<(CharacterId, SelectOutcome)> {
    orchestrator
        .active_character()
        .map(|character_id| (character_id, outcome))
}

/// Poll crossterm for keyboard and mouse input.
fn spawn_input_handler(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        const MOUSE_SCROLL_LINES: i16 = 3;
        loop {
            if let Ok(true) = crossterm::event::poll(Duration::from_millis(30)) {
                while let Ok(true) = crossterm::event::poll(Duration::from_millis(0)) {
                    let Ok(event) = crossterm::event::read() else {
                        break;
                    };
                    let forwarded = match event {
                        CrosstermEvent::Key(key) => Some(AppEvent::Input(key)),
                        CrosstermEvent::Mouse(mouse) => match mouse.kind {
                            MouseEventKind::ScrollUp => Some(AppEvent::Scroll(-MOUSE_SCROLL_LINES)),
                            MouseEventKind::ScrollDown => Some(AppEvent::Scroll(MOUSE_SCROLL_LINES)),
                            _ => None,
                        },
                        _ => None,
                    };
                    if let Some(event) = forwarded
                        && sender.send(event).await.is_err()
                    {
                        return;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    });
}

/// Spawn a periodic tick event generator.
fn spawn_tick(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            if sender.send(AppEvent::Tick).await.is_err() {
                return;
            }
        }
    });
}

/// Configure terminal in raw mode with alternate screen.
fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    debug!("setting up terminal");
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal state on exit.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    debug!("restoring terminal");
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
