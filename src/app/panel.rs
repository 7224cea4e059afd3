use super::draw::draw;
use super::keys::{handle_key, KeyOutcome};
use crate::api::{ApiError, ChatHistoryEntry, ControlApi, HttpControlApi, PanelSettings};
use crate::config::AppConfig;
use crate::log_debug;
use crate::session::{
    spawn_chat_job, ChatEvent, ChatEventKind, ControllerSettings, Effect, PollEvent, Poller,
    SessionController,
};
use crate::terminal_restore::TerminalRestoreGuard;
use anyhow::{Context, Result};
use crossbeam_channel::{never, select, tick, unbounded, Sender};
use crossterm::event::{self, Event};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Results of the one-time loads done when the panel opens.
enum StartupEvent {
    Logs(Result<Vec<String>, ApiError>),
    History(Result<Vec<ChatHistoryEntry>, ApiError>),
    Settings(Result<PanelSettings, ApiError>),
}

/// Open the terminal panel and run until the user quits.
pub fn run_panel(config: &AppConfig) -> Result<()> {
    let api: Arc<dyn ControlApi> = Arc::new(
        HttpControlApi::new(
            &config.base_url,
            config.request_timeout(),
            config.chat_timeout(),
        )
        .context("failed to build HTTP client")?,
    );
    let mut controller = SessionController::new(ControllerSettings::from_config(config));

    let mut stdout = io::stdout();
    let guard = TerminalRestoreGuard::enter(&mut stdout).context("failed to prepare terminal")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &mut controller, api, config);

    drop(terminal);
    guard.restore();
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut SessionController,
    api: Arc<dyn ControlApi>,
    config: &AppConfig,
) -> Result<()> {
    let (startup_tx, mut startup_rx) = unbounded();
    let loader = spawn_startup_loader(Arc::clone(&api), startup_tx)?;

    let (poll_tx, poll_rx) = unbounded();
    let poller = Poller::spawn(
        Arc::clone(&api),
        config.status_interval(),
        config.heartbeat_interval(),
        poll_tx,
    )?;

    let input_stop = Arc::new(AtomicBool::new(false));
    let (input_tx, input_rx) = unbounded();
    let input = spawn_input_reader(Arc::clone(&input_stop), input_tx)?;

    let (chat_tx, chat_rx) = unbounded::<ChatEvent>();
    let ticker = tick(config.typing_interval());
    let mut workers = Workers::default();

    terminal.draw(|frame| draw(frame, controller))?;
    let mut startup_done = false;
    let result = loop {
        select! {
            recv(poll_rx) -> event => match event {
                Ok(PollEvent::Status(result)) => controller.on_status(result, Instant::now()),
                Ok(PollEvent::Heartbeat(result)) => controller.on_heartbeat(result),
                Err(_) => break Ok(()),
            },
            recv(chat_rx) -> event => {
                if let Ok(event) = event {
                    controller.on_chat_event(event);
                }
            }
            recv(startup_rx) -> event => match event {
                Ok(StartupEvent::Logs(result)) => controller.hydrate_logs(result),
                Ok(StartupEvent::History(result)) => controller.hydrate_history(result),
                Ok(StartupEvent::Settings(result)) => controller.set_model_name(result),
                Err(_) => startup_done = true,
            },
            recv(input_rx) -> event => match event {
                Ok(Event::Key(key)) => match handle_key(controller, key) {
                    KeyOutcome::Quit => break Ok(()),
                    KeyOutcome::Continue(effects) => {
                        dispatch(effects, controller, &api, &chat_tx, &mut workers);
                    }
                },
                Ok(Event::Resize(_, _)) => controller.request_redraw(),
                Ok(_) => {}
                Err(_) => break Ok(()),
            },
            recv(ticker) -> _ => {
                controller.tick(Instant::now());
                workers.reap();
            }
        }
        if startup_done {
            // Loader finished; stop selecting on the closed channel.
            startup_rx = never();
            startup_done = false;
        }
        if controller.take_redraw_request() {
            if let Err(err) = terminal.draw(|frame| draw(frame, controller)) {
                break Err(err.into());
            }
        }
    };

    input_stop.store(true, Ordering::Relaxed);
    controller.shutdown();
    poller.shutdown();
    let _ = input.join();
    let _ = loader.join();
    workers.detach();
    result
}

/// Turn controller effects into background requests.
fn dispatch(
    effects: Vec<Effect>,
    controller: &mut SessionController,
    api: &Arc<dyn ControlApi>,
    chat_tx: &Sender<ChatEvent>,
    workers: &mut Workers,
) {
    for effect in effects {
        match effect {
            Effect::Command(action) => {
                tracing::info!(action = action.label(), "command sent");
                let api = Arc::clone(api);
                let spawned = thread::Builder::new()
                    .name("sortpanel-command".into())
                    .spawn(move || {
                        if let Err(err) = api.command(action) {
                            log_debug(&format!("{} command failed: {err}", action.label()));
                        }
                    });
                match spawned {
                    Ok(handle) => workers.push(handle),
                    Err(err) => log_debug(&format!("failed to spawn command worker: {err}")),
                }
            }
            Effect::Chat {
                reply,
                message,
                cancel,
            } => match spawn_chat_job(Arc::clone(api), reply, message, cancel, chat_tx.clone()) {
                Ok(handle) => workers.push(handle),
                Err(err) => controller.on_chat_event(ChatEvent {
                    reply,
                    kind: ChatEventKind::Failed(err.to_string()),
                }),
            },
        }
    }
}

fn spawn_startup_loader(
    api: Arc<dyn ControlApi>,
    events: Sender<StartupEvent>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("sortpanel-startup".into())
        .spawn(move || {
            let _ = events.send(StartupEvent::Settings(api.settings()));
            let _ = events.send(StartupEvent::Logs(api.logs()));
            let _ = events.send(StartupEvent::History(api.chat_history()));
        })
        .context("failed to spawn startup loader")
}

/// Forward terminal events until `stop` is set or reading fails.
fn spawn_input_reader(stop: Arc<AtomicBool>, events: Sender<Event>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("sortpanel-input".into())
        .spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                match event::poll(INPUT_POLL_INTERVAL) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(err) => {
                        log_debug(&format!("terminal poll failed: {err}"));
                        break;
                    }
                }
                match event::read() {
                    Ok(event) => {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        log_debug(&format!("terminal read failed: {err}"));
                        break;
                    }
                }
            }
        })
        .context("failed to spawn input reader")
}

/// Handles of command and chat workers still running.
#[derive(Default)]
struct Workers {
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    fn reap(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) =
            self.handles.drain(..).partition(JoinHandle::is_finished);
        self.handles = running;
        for handle in done {
            if handle.join().is_err() {
                log_debug("worker thread panicked");
            }
        }
    }

    /// Chat workers may sit on a slow body until their timeout; let them finish unobserved.
    fn detach(&mut self) {
        self.reap();
        if !self.handles.is_empty() {
            log_debug(&format!("{} workers still running at exit", self.handles.len()));
        }
        self.handles.clear();
    }
}
