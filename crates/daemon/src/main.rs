//! wless Daemon
//!
//! Host process for the wless focus core.
//!
//! Responsibilities:
//! - Load configuration and set up logging
//! - Read display-server events (JSON lines on stdin)
//! - Feed them into the focus core
//! - Apply the resulting actions through the configured runtime
//! - Exit when the core asks to terminate or input ends

mod config;

use anyhow::Result;
use config::{Config, RuntimeOutput};
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wless_core_focus::{Action, Desktop, Event};
use wless_runtime::{read_events, HeadlessRuntime, JsonRuntime, Runtime};

/// Events that the daemon event loop processes.
#[derive(Debug)]
enum DaemonEvent {
    /// An event from the display server.
    Runtime(Event),
    /// The event stream reached EOF or failed.
    InputClosed,
    /// Shutdown signal.
    Shutdown,
}

/// Whether the event loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Application state: the focus core and the runtime it drives.
struct AppState<R: Runtime> {
    desktop: Desktop,
    runtime: R,
}

impl<R: Runtime> AppState<R> {
    fn new(desktop: Desktop, runtime: R) -> Self {
        Self { desktop, runtime }
    }

    fn handle_event(&mut self, event: DaemonEvent) -> Flow {
        match event {
            DaemonEvent::Runtime(event) => {
                let consumed = self.desktop.handle_event(event);
                debug!("Event consumed: {}", consumed);
                self.apply_actions()
            }
            DaemonEvent::InputClosed => {
                info!("Event stream closed");
                Flow::Stop
            }
            DaemonEvent::Shutdown => Flow::Stop,
        }
    }

    /// Apply every queued action in order. Runtime failures are logged and
    /// skipped.
    fn apply_actions(&mut self) -> Flow {
        let mut flow = Flow::Continue;

        for action in self.desktop.drain_actions() {
            if let Err(e) = self.runtime.apply(&action) {
                warn!("Failed to apply {:?}: {}", action, e);
            }
            if action == Action::Terminate {
                flow = Flow::Stop;
            }
        }

        flow
    }
}

/// Spawn a named thread that reads JSON-lines events from `reader` and
/// forwards them to the event loop, followed by `InputClosed`.
fn spawn_reader_thread<R: BufRead + Send + 'static>(
    name: &str,
    reader: R,
    sender: mpsc::Sender<DaemonEvent>,
) -> Result<std::thread::JoinHandle<()>> {
    let thread_name = name.to_string();
    std::thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let result = read_events(reader, |event| {
                sender.blocking_send(DaemonEvent::Runtime(event)).is_ok()
            });
            match result {
                Ok(count) => debug!("Read {} event(s)", count),
                Err(e) => error!("Failed to read events: {}", e),
            }
            // Channel may already be closed if the daemon is shutting down
            let _ = sender.blocking_send(DaemonEvent::InputClosed);
        })
        .map_err(|e| anyhow::anyhow!("Failed to spawn {} thread: {}", thread_name, e))
}

/// Map a configured log level to a tracing level, defaulting to INFO.
fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

async fn run<R: Runtime>(
    desktop: Desktop,
    runtime: R,
    mut event_rx: mpsc::Receiver<DaemonEvent>,
) -> Result<()> {
    let mut state = AppState::new(desktop, runtime);

    while let Some(event) = event_rx.recv().await {
        if state.handle_event(event) == Flow::Stop {
            break;
        }
    }

    info!(
        "wless shutting down ({} window(s), {} output(s))",
        state.desktop.windows().len(),
        state.desktop.outputs().len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (needed for log level)
    let config = Config::load().unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {}. Using defaults.", e);
        Config::default()
    });

    // stdout carries actions, so logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_log_level(&config.behavior.log_level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("wless starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let keymap = config.keymap();
    let policy = config.policy();
    info!(
        "Configuration loaded: {} key binding(s), policy {:?}, runtime {:?}",
        keymap.len(),
        policy,
        config.runtime.output
    );
    let desktop = Desktop::new(keymap, policy);

    let (event_tx, event_rx) = mpsc::channel::<DaemonEvent>(100);

    let stdin = std::io::BufReader::new(std::io::stdin());
    let _reader = spawn_reader_thread("stdin-events", stdin, event_tx.clone())?;

    // Install Ctrl+C handler so terminal kill triggers graceful shutdown
    {
        let shutdown_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Ctrl+C received, initiating shutdown...");
                let _ = shutdown_tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }
    drop(event_tx);

    match config.runtime.output {
        RuntimeOutput::Json => run(desktop, JsonRuntime::new(std::io::stdout()), event_rx).await,
        RuntimeOutput::Headless => run(desktop, HeadlessRuntime::new(), event_rx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use wless_core_focus::{FocusPolicy, OutputInfo, Rect, WindowInfo};
    use wless_runtime::RecordingRuntime;

    fn state() -> AppState<RecordingRuntime> {
        let desktop = Desktop::new(Config::default().keymap(), FocusPolicy::default());
        AppState::new(desktop, RecordingRuntime::new())
    }

    fn attach(monitor: u64) -> DaemonEvent {
        DaemonEvent::Runtime(Event::OutputAttached(OutputInfo::new(
            monitor,
            "HDMI-A-1",
            Rect::new(0, 0, 1280, 720),
        )))
    }

    #[test]
    fn test_actions_reach_runtime_in_order() {
        let mut state = state();
        assert_eq!(state.handle_event(attach(1)), Flow::Continue);
        assert_eq!(
            state.handle_event(DaemonEvent::Runtime(Event::WindowMapped(WindowInfo::new(4)))),
            Flow::Continue
        );

        assert_eq!(
            state.runtime.take(),
            vec![
                Action::SetWindowBounds {
                    surface: 4,
                    bounds: Rect::new(0, 0, 1280, 720)
                },
                Action::SetDisplayTarget {
                    monitor: 1,
                    window: Some(4)
                },
                Action::RaiseToFront { surface: 4 },
                Action::SetInputFocus {
                    window: Some(4),
                    previous: None
                },
            ]
        );
    }

    #[test]
    fn test_last_output_detach_stops_loop() {
        let mut state = state();
        state.handle_event(attach(1));
        let flow = state.handle_event(DaemonEvent::Runtime(Event::OutputDetached { monitor: 1 }));
        assert_eq!(flow, Flow::Stop);
        assert_eq!(state.runtime.take().last(), Some(&Action::Terminate));
    }

    #[test]
    fn test_input_closed_and_shutdown_stop_loop() {
        let mut state = state();
        assert_eq!(state.handle_event(DaemonEvent::InputClosed), Flow::Stop);
        assert_eq!(state.handle_event(DaemonEvent::Shutdown), Flow::Stop);
        assert!(state.runtime.take().is_empty());
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("TRACE"), Level::TRACE);
        assert_eq!(parse_log_level("warn"), Level::WARN);
        assert_eq!(parse_log_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_reader_thread_forwards_events_then_closes() {
        let input = "{\"type\":\"window_mapped\",\"surface\":1}\nbogus\n{\"type\":\"window_destroyed\",\"surface\":1}\n";
        let (tx, mut rx) = mpsc::channel::<DaemonEvent>(10);

        let handle = spawn_reader_thread("test-reader", Cursor::new(input), tx).unwrap();
        handle.join().unwrap();

        assert!(matches!(
            rx.try_recv(),
            Ok(DaemonEvent::Runtime(Event::WindowMapped(_)))
        ));
        assert!(matches!(
            rx.try_recv(),
            Ok(DaemonEvent::Runtime(Event::WindowDestroyed { surface: 1 }))
        ));
        assert!(matches!(rx.try_recv(), Ok(DaemonEvent::InputClosed)));
    }

    #[test]
    fn test_reader_thread_stops_on_channel_close() {
        let (tx, rx) = mpsc::channel::<DaemonEvent>(10);
        drop(rx);

        let input = "{\"type\":\"window_mapped\",\"surface\":1}\n{\"type\":\"window_mapped\",\"surface\":2}\n";
        let handle = spawn_reader_thread("test-close", Cursor::new(input), tx).unwrap();
        assert!(handle.join().is_ok());
    }

    #[tokio::test]
    async fn test_run_exits_on_quit_binding() {
        use wless_core_focus::{KeyState, Keysym, Modifiers};

        let (tx, rx) = mpsc::channel::<DaemonEvent>(10);
        let desktop = Desktop::new(Config::default().keymap(), FocusPolicy::default());

        tx.send(attach(1)).await.unwrap();
        tx.send(DaemonEvent::Runtime(Event::Key {
            modifiers: Modifiers::LOGO | Modifiers::SHIFT,
            keysym: Keysym::ESCAPE,
            state: KeyState::Pressed,
        }))
        .await
        .unwrap();
        // Never reached: the loop stops at Terminate while tx is still open
        tx.send(attach(2)).await.unwrap();

        run(desktop, RecordingRuntime::new(), rx).await.unwrap();
    }
}
