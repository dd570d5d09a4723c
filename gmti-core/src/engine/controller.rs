use std::{path::Path, process::ExitStatus, time::Duration};

use gmti_config::EngineCommandConfig;
use gmti_model::EngineState;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Child,
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, error, info, trace, warn};

use super::spec::CommandSpec;
use crate::{
    error::LaunchError,
    events::{ConsoleEventKind, EventBus},
};

/// Upper bound on waiting for trailing output after the engine exits. A
/// grandchild that inherited the pipes must not hold up the exit report.
const OUTPUT_DRAIN_WINDOW: Duration = Duration::from_millis(500);

/// Messages from the tasks that watch a launched engine.
#[derive(Debug)]
pub enum EngineSignal {
    Output { generation: u64, line: String },
    Exited { generation: u64, report: ExitReport },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    /// `None` when the process died from a signal or could not be waited on.
    pub code: Option<i32>,
    pub success: bool,
    /// The exit followed a stop request.
    pub requested: bool,
    /// The grace window ran out and the engine was killed.
    pub forced: bool,
}

impl ExitReport {
    fn new(
        status: std::io::Result<ExitStatus>,
        requested: bool,
        forced: bool,
    ) -> Self {
        let (code, success) = match status {
            Ok(status) => (status.code(), status.success()),
            Err(err) => {
                warn!(error = %err, "failed to collect engine exit status");
                (None, false)
            }
        };
        Self {
            code,
            success,
            requested,
            forced,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Launched { pid: Option<u32> },
    /// An engine is already up; nothing was launched.
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopping,
    AlreadyStopped,
    AlreadyStopping,
}

#[derive(Debug)]
struct RunningEngine {
    pid: Option<u32>,
    stop_tx: Option<oneshot::Sender<()>>,
}

/// Owns the engine state machine.
///
/// `start` and `stop` only request work. Process exit is observed by a
/// supervisor task and arrives as an [`EngineSignal`] on the receiver
/// returned from [`EngineController::new`]; feed those back through
/// [`EngineController::handle_signal`] to complete transitions.
#[derive(Debug)]
pub struct EngineController {
    state: EngineState,
    generation: u64,
    running: Option<RunningEngine>,
    command: EngineCommandConfig,
    stop_grace: Duration,
    signals: mpsc::UnboundedSender<EngineSignal>,
    bus: EventBus,
}

impl EngineController {
    pub fn new(
        command: EngineCommandConfig,
        stop_grace: Duration,
        bus: EventBus,
    ) -> (Self, mpsc::UnboundedReceiver<EngineSignal>) {
        let (signals, signal_rx) = mpsc::unbounded_channel();
        let controller = Self {
            state: EngineState::Stopped,
            generation: 0,
            running: None,
            command,
            stop_grace,
            signals,
            bus,
        };
        (controller, signal_rx)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().and_then(|r| r.pid)
    }

    /// Launch counter; bumps once per spawn attempt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn launch_spec(&self, workspace_root: &Path) -> CommandSpec {
        CommandSpec::engine(&self.command).current_dir(workspace_root)
    }

    /// Must be called from within a tokio runtime.
    pub fn start(
        &mut self,
        workspace_root: &Path,
    ) -> Result<StartOutcome, LaunchError> {
        if !self.state.can_start() {
            self.bus.info("Server already running.");
            return Ok(StartOutcome::AlreadyRunning);
        }
        if workspace_root.as_os_str().is_empty() {
            self.bus
                .error("Set the project root before starting the engine.");
            return Err(LaunchError::MissingWorkspaceRoot);
        }
        if !workspace_root.is_dir() {
            self.bus.error(format!(
                "Project root {} is not a directory.",
                workspace_root.display()
            ));
            return Err(LaunchError::InvalidWorkspaceRoot {
                path: workspace_root.to_path_buf(),
            });
        }

        self.transition(EngineState::Starting);
        self.generation += 1;
        let generation = self.generation;
        let spec = self.launch_spec(workspace_root);

        let mut command = spec.to_command();
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                error!(command = %spec, error = %source, "engine spawn failed");
                self.transition(EngineState::Stopped);
                self.bus.error(format!(
                    "Failed to start simulator server ({source}). \
                     Is Rust/Cargo installed?"
                ));
                return Err(LaunchError::Spawn {
                    program: spec.program,
                    source,
                });
            }
        };

        let pid = child.id();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            let signals = self.signals.clone();
            readers.push(forward_lines(stdout, generation, signals));
        }
        if let Some(stderr) = child.stderr.take() {
            let signals = self.signals.clone();
            readers.push(forward_lines(stderr, generation, signals));
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(supervise(
            child,
            pid,
            generation,
            self.stop_grace,
            stop_rx,
            readers,
            self.signals.clone(),
        ));

        self.running = Some(RunningEngine {
            pid,
            stop_tx: Some(stop_tx),
        });
        info!(?pid, generation, command = %spec, "engine launched");
        self.bus.info("Simulator server starting...");
        self.transition(EngineState::Running);
        Ok(StartOutcome::Launched { pid })
    }

    pub fn stop(&mut self) -> StopOutcome {
        match self.state {
            EngineState::Stopped => {
                self.bus.info("Server already stopped.");
                StopOutcome::AlreadyStopped
            }
            EngineState::Stopping => {
                self.bus.info("Server is already stopping.");
                StopOutcome::AlreadyStopping
            }
            EngineState::Starting | EngineState::Running => {
                self.transition(EngineState::Stopping);
                if let Some(running) = self.running.as_mut()
                    && let Some(stop_tx) = running.stop_tx.take()
                {
                    let _ = stop_tx.send(());
                }
                info!(pid = ?self.pid(), "engine stop requested");
                StopOutcome::Stopping
            }
        }
    }

    /// Apply one supervisor message. Returns the exit report when it ended
    /// the current engine.
    pub fn handle_signal(
        &mut self,
        signal: EngineSignal,
    ) -> Option<ExitReport> {
        match signal {
            EngineSignal::Output { generation, line } => {
                if generation == self.generation {
                    self.bus
                        .publish_kind(ConsoleEventKind::EngineOutput { line });
                } else {
                    trace!(generation, "dropping output from retired engine");
                }
                None
            }
            EngineSignal::Exited { generation, report } => {
                if generation != self.generation || self.running.is_none() {
                    debug!(generation, "ignoring exit of retired engine");
                    return None;
                }
                self.running = None;
                match self.state {
                    EngineState::Stopping => {
                        info!(
                            code = ?report.code,
                            forced = report.forced,
                            "engine stopped"
                        );
                        self.transition(EngineState::Stopped);
                        self.bus.publish_kind(ConsoleEventKind::EngineExited {
                            code: report.code,
                            forced: report.forced,
                        });
                    }
                    EngineState::Running | EngineState::Starting => {
                        warn!(
                            code = ?report.code,
                            "engine exited unexpectedly"
                        );
                        self.transition(EngineState::Stopped);
                        self.bus.publish_kind(ConsoleEventKind::ProcessCrash {
                            code: report.code,
                        });
                    }
                    EngineState::Stopped => {}
                }
                Some(report)
            }
        }
    }

    fn transition(&mut self, next: EngineState) {
        let from = self.state;
        if !from.can_transition_to(next) {
            error!(%from, to = %next, "illegal engine transition ignored");
            return;
        }
        self.state = next;
        debug!(%from, to = %next, "engine state changed");
        self.bus.publish_kind(ConsoleEventKind::EngineStateChanged {
            from,
            to: next,
        });
    }
}

/// Forward output lines until EOF. Bytes that are not UTF-8 are replaced
/// rather than ending the reader: a closed pipe would kill the engine on its
/// next write.
fn forward_lines<R>(
    reader: R,
    generation: u64,
    signals: mpsc::UnboundedSender<EngineSignal>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(256);
        let mut forwarding = true;
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    debug!(generation, error = %err, "engine output closed");
                    break;
                }
            }
            if !forwarding {
                continue;
            }
            let text = String::from_utf8_lossy(&buf);
            let line = text.trim_end();
            if line.is_empty() {
                continue;
            }
            let signal = EngineSignal::Output {
                generation,
                line: line.to_string(),
            };
            if signals.send(signal).is_err() {
                // Keep draining so the engine never writes into a closed
                // pipe.
                forwarding = false;
            }
        }
    })
}

/// Waits for the engine to exit on its own or for a stop request. A dropped
/// stop sender counts as a request, so losing the controller stops the
/// engine.
async fn supervise(
    mut child: Child,
    pid: Option<u32>,
    generation: u64,
    grace: Duration,
    mut stop_rx: oneshot::Receiver<()>,
    readers: Vec<JoinHandle<()>>,
    signals: mpsc::UnboundedSender<EngineSignal>,
) {
    let report = tokio::select! {
        status = child.wait() => ExitReport::new(status, false, false),
        _ = &mut stop_rx => {
            let (status, forced) = terminate(&mut child, pid, grace).await;
            ExitReport::new(status, true, forced)
        }
    };

    let drained = timeout(OUTPUT_DRAIN_WINDOW, async {
        for reader in readers {
            let _ = reader.await;
        }
    })
    .await;
    if drained.is_err() {
        debug!(?pid, "engine output still open after exit");
    }

    let _ = signals.send(EngineSignal::Exited { generation, report });
}

async fn terminate(
    child: &mut Child,
    pid: Option<u32>,
    grace: Duration,
) -> (std::io::Result<ExitStatus>, bool) {
    if let Some(status) = request_exit(child, pid, grace).await {
        return (status, false);
    }
    if let Err(err) = child.start_kill() {
        debug!(error = %err, "kill after exit");
    }
    (child.wait().await, true)
}

/// TERM, then wait out the grace window. `None` means the engine is still
/// up and has been sent KILL.
#[cfg(unix)]
async fn request_exit(
    child: &mut Child,
    pid: Option<u32>,
    grace: Duration,
) -> Option<std::io::Result<ExitStatus>> {
    let pid = pid?;
    send_signal(pid, "TERM").await;
    match timeout(grace, child.wait()).await {
        Ok(status) => Some(status),
        Err(_) => {
            warn!(
                pid,
                grace_ms = grace.as_millis() as u64,
                "engine ignored TERM; escalating to KILL"
            );
            send_signal(pid, "KILL").await;
            None
        }
    }
}

#[cfg(not(unix))]
async fn request_exit(
    _child: &mut Child,
    _pid: Option<u32>,
    _grace: Duration,
) -> Option<std::io::Result<ExitStatus>> {
    None
}

/// Signal the engine's process group, falling back to the single pid.
#[cfg(unix)]
async fn send_signal(pid: u32, signal: &str) {
    use tokio::process::Command;

    let group = Command::new("kill")
        .arg(format!("-{signal}"))
        .arg("--")
        .arg(format!("-{pid}"))
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false);
    if group {
        return;
    }
    if let Err(err) = Command::new("kill")
        .arg(format!("-{signal}"))
        .arg(pid.to_string())
        .status()
        .await
    {
        warn!(pid, signal, error = %err, "failed to signal engine");
    }
}
