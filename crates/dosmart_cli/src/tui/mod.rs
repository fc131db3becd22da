//! Full-screen board. The event loop owns the stores; requests run as spawned
//! tasks and report back over a channel.

pub mod app;
pub mod ui;

use app::{App, AppEvent, Effect};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use dosmart_core::api::HttpGateway;
use dosmart_core::config::Config;
use dosmart_core::error::AppError;
use dosmart_core::session_store::SessionStore;
use dosmart_core::storage::SharedStore;
use dosmart_core::task_store::TaskStore;
use ratatui::{Terminal, backend::CrosstermBackend, style::Color};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn io_error(err: io::Error) -> AppError {
    AppError::io(err.to_string())
}

pub async fn run(
    config: Config,
    storage: SharedStore,
    gateway: Arc<HttpGateway>,
) -> Result<(), AppError> {
    let session = SessionStore::restore(storage.clone())?;
    let tasks = if config.mirror_tasks {
        TaskStore::with_mirror(storage)
    } else {
        TaskStore::new()
    };
    let mut app = App::new(session, tasks);
    let accent = ui::accent_color(config.theme());
    info!(base_url = gateway.base_url(), "starting board");

    enable_raw_mode().map_err(io_error)?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(io_error(err));
    }
    let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => terminal,
        Err(err) => {
            let _ = disable_raw_mode();
            return Err(io_error(err));
        }
    };

    let result = run_app(&mut terminal, &mut app, accent, gateway).await;

    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    accent: Color,
    gateway: Arc<HttpGateway>,
) -> Result<(), AppError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    for effect in app.start() {
        dispatch(effect, &gateway, &event_tx);
    }

    while !app.should_quit {
        terminal
            .draw(|frame| ui::draw(frame, app, accent))
            .map_err(io_error)?;

        while let Ok(event) = event_rx.try_recv() {
            for effect in app.apply(event) {
                dispatch(effect, &gateway, &event_tx);
            }
        }

        if event::poll(POLL_INTERVAL).map_err(io_error)?
            && let Event::Key(key) = event::read().map_err(io_error)?
            && key.kind == KeyEventKind::Press
        {
            for effect in app.handle_key(key) {
                dispatch(effect, &gateway, &event_tx);
            }
        }

        tokio::task::yield_now().await;
    }

    Ok(())
}

fn dispatch(
    effect: Effect,
    gateway: &Arc<HttpGateway>,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let gateway = Arc::clone(gateway);
    let event_tx = event_tx.clone();
    match effect {
        Effect::Session { ticket, request } => {
            debug!(op = ?ticket.op, "dispatching session request");
            tokio::spawn(async move {
                let outcome = request.execute(&*gateway).await;
                let _ = event_tx.send(AppEvent::Session { ticket, outcome });
            });
        }
        Effect::Tasks {
            ticket,
            request,
            token,
        } => {
            debug!(op = %ticket.op, "dispatching task request");
            tokio::spawn(async move {
                let outcome = request.execute(&*gateway, &token).await;
                let _ = event_tx.send(AppEvent::Tasks { ticket, outcome });
            });
        }
    }
}
