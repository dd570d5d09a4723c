//! The console's single control task.
//!
//! Every piece of operator-visible state lives in [`ConsoleState`] and is
//! touched only by [`Console::run`]. Process watchers, HTTP completions and
//! the poll ticker run on their own tasks and report back over channels;
//! callers drive the console through a [`ConsoleHandle`].

mod state;

pub use state::{ConsoleState, ConsoleView, Parameter};

use std::{path::PathBuf, time::Duration};

use gmti_config::{ConsoleConfig, catalog};
use gmti_model::{EngineState, RunConfiguration};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    engine::{EngineController, EngineSignal, StartOutcome},
    error::{ConsoleClosed, TransportError},
    events::{ConsoleEvent, ConsoleEventKind, EventBus},
    telemetry::{
        ApplyOutcome, FetchOutcome, SubmissionPayload, SubmissionReceipt,
        TelemetryClient,
    },
};

const COMMAND_CAPACITY: usize = 64;

#[derive(Debug)]
pub enum ConsoleCommand {
    SetWorkspaceRoot(PathBuf),
    RefreshScenarios,
    /// Select by file name (`urban.yaml`) or scenario name (`urban`).
    SelectScenario(String),
    ClearScenario,
    SetParameter(Parameter),
    StartEngine,
    StopEngine,
    /// Submit the working configuration to the running engine.
    RunScenario,
    /// Poll every given period, or the configured one.
    StartPolling(Option<Duration>),
    StopPolling,
    Inspect(oneshot::Sender<ConsoleView>),
    /// Stop polling and the engine, then end the control task.
    Shutdown,
}

#[derive(Debug)]
struct SubmissionOutcome {
    id: u64,
    result: Result<SubmissionReceipt, TransportError>,
}

#[derive(Debug)]
pub struct Console {
    state: ConsoleState,
    config: ConsoleConfig,
    bus: EventBus,
    engine: EngineController,
    engine_rx: mpsc::UnboundedReceiver<EngineSignal>,
    telemetry: TelemetryClient,
    telemetry_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    submission_tx: mpsc::UnboundedSender<SubmissionOutcome>,
    submission_rx: mpsc::UnboundedReceiver<SubmissionOutcome>,
    commands: mpsc::Receiver<ConsoleCommand>,
    commands_open: bool,
    auto_poll: bool,
    shutting_down: bool,
}

impl Console {
    /// Build the console and its handle. Subscribe through the handle before
    /// calling [`Console::run`] to see every event.
    pub fn new(config: ConsoleConfig, bus: EventBus) -> (Self, ConsoleHandle) {
        let (engine, engine_rx) = EngineController::new(
            config.engine.clone(),
            config.stop_grace,
            bus.clone(),
        );
        let (telemetry, telemetry_rx) = TelemetryClient::new(
            config.endpoints.clone(),
            config.submit_timeout,
        );
        let (submission_tx, submission_rx) = mpsc::unbounded_channel();
        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);

        let console = Self {
            state: ConsoleState::default(),
            config,
            bus: bus.clone(),
            engine,
            engine_rx,
            telemetry,
            telemetry_rx,
            submission_tx,
            submission_rx,
            commands,
            commands_open: true,
            auto_poll: true,
            shutting_down: false,
        };
        let handle = ConsoleHandle {
            commands: command_tx,
            bus,
        };
        (console, handle)
    }

    /// Start polling when the engine launches and stop when it exits.
    /// Enabled by default.
    pub fn with_auto_poll(mut self, enabled: bool) -> Self {
        self.auto_poll = enabled;
        self
    }

    pub async fn run(mut self) {
        if let Some(root) = self.config.workspace_root.clone() {
            self.set_workspace_root(root);
        }
        info!("console control task started");

        loop {
            tokio::select! {
                command = self.commands.recv(), if self.commands_open => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => {
                            self.commands_open = false;
                            self.begin_shutdown();
                        }
                    }
                }
                Some(signal) = self.engine_rx.recv() => {
                    self.handle_engine_signal(signal);
                }
                Some(outcome) = self.telemetry_rx.recv() => {
                    self.handle_fetch(outcome);
                }
                Some(outcome) = self.submission_rx.recv() => {
                    self.handle_submission(outcome);
                }
            }

            let stopped = self.engine.state() == EngineState::Stopped;
            if self.shutting_down && stopped {
                break;
            }
        }

        info!("console control task finished");
    }

    fn handle_command(&mut self, command: ConsoleCommand) {
        match command {
            ConsoleCommand::SetWorkspaceRoot(root) => {
                self.set_workspace_root(root)
            }
            ConsoleCommand::RefreshScenarios => self.refresh_scenarios(),
            ConsoleCommand::SelectScenario(name) => self.select_scenario(&name),
            ConsoleCommand::ClearScenario => self.state.clear_selection(),
            ConsoleCommand::SetParameter(parameter) => {
                self.state.set_parameter(parameter)
            }
            ConsoleCommand::StartEngine => self.start_engine(),
            ConsoleCommand::StopEngine => {
                self.engine.stop();
            }
            ConsoleCommand::RunScenario => self.run_scenario(),
            ConsoleCommand::StartPolling(period) => {
                let period = period.unwrap_or(self.config.poll_interval);
                self.telemetry.start_polling(period);
            }
            ConsoleCommand::StopPolling => {
                self.telemetry.stop_polling();
            }
            ConsoleCommand::Inspect(reply) => {
                let _ = reply.send(self.view());
            }
            ConsoleCommand::Shutdown => self.begin_shutdown(),
        }
    }

    fn set_workspace_root(&mut self, root: PathBuf) {
        info!(root = %root.display(), "workspace root selected");
        self.state.workspace_root = Some(root);
        self.state.clear_selection();
        self.refresh_scenarios();
    }

    fn refresh_scenarios(&mut self) {
        let Some(root) = self.state.workspace_root.as_deref() else {
            self.bus.warn("Set the project root before loading scenarios.");
            return;
        };
        let listing = gmti_config::ScenarioCatalog::new(root)
            .scan(&RunConfiguration::default());
        if listing.missing {
            self.bus.warn(format!(
                "Scenario directory not found: {}",
                listing.directory.display()
            ));
        }
        self.state.catalog = listing;
    }

    fn select_scenario(&mut self, name: &str) {
        let Some(path) = self
            .state
            .catalog
            .find(name)
            .map(|d| d.path().to_path_buf())
        else {
            self.bus.warn(format!("Scenario {name} is not in the catalog."));
            return;
        };

        // Fields the file leaves out keep the operator's current values.
        match catalog::parse(&path, &self.state.run) {
            Some(descriptor) => {
                let message = format!("Loaded scenario {}", descriptor.name());
                self.state.select(descriptor);
                self.bus.info(message);
            }
            None => self.bus.warn(format!(
                "Failed to read scenario file {}",
                path.display()
            )),
        }
    }

    fn start_engine(&mut self) {
        let root = self.state.workspace_root.clone().unwrap_or_default();
        match self.engine.start(&root) {
            Ok(StartOutcome::Launched { .. }) => {
                if self.auto_poll {
                    self.telemetry.start_polling(self.config.poll_interval);
                }
            }
            Ok(StartOutcome::AlreadyRunning) => {}
            Err(err) => warn!(error = %err, "engine launch failed"),
        }
    }

    fn run_scenario(&mut self) {
        if !self.engine.state().accepts_submissions() {
            self.bus
                .info("Start the simulator engine before running scenarios.");
            return;
        }

        let payload = SubmissionPayload::from_run(&self.state.run);
        self.bus.info(format!(
            "Submitting offline configuration (taps={}, range={}, doppler={}).",
            payload.taps, payload.range_bins, payload.doppler_bins
        ));
        let id = self.state.begin_submission();
        debug!(id, seed = payload.seed, "submission issued");

        let submission = self.telemetry.submission(payload);
        let results = self.submission_tx.clone();
        tokio::spawn(async move {
            let result = submission.await;
            let _ = results.send(SubmissionOutcome { id, result });
        });
    }

    fn begin_shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        self.telemetry.stop_polling();
        if self.engine.state().can_stop() {
            self.engine.stop();
        }
    }

    fn handle_engine_signal(&mut self, signal: EngineSignal) {
        if self.engine.handle_signal(signal).is_some() && self.auto_poll {
            // Responses to requests made against the dead engine are moot.
            self.telemetry.stop_polling();
            self.state
                .telemetry
                .retire_through(self.telemetry.last_issued());
        }
    }

    fn handle_fetch(&mut self, outcome: FetchOutcome) {
        let FetchOutcome { sequence, result } = outcome;
        match self.state.telemetry.apply(sequence, &result) {
            ApplyOutcome::Applied => {
                if let Ok(snapshot) = result {
                    self.bus.publish_kind(ConsoleEventKind::TelemetryApplied {
                        sequence,
                        snapshot,
                    });
                }
            }
            ApplyOutcome::Stale => {}
            ApplyOutcome::Failed => {
                if let Err(err) = result {
                    debug!(sequence, error = %err, "telemetry fetch failed");
                    self.bus.publish_kind(ConsoleEventKind::TelemetryFailed {
                        sequence,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    fn handle_submission(&mut self, outcome: SubmissionOutcome) {
        let SubmissionOutcome { id, result } = outcome;
        if !self.state.settle_submission(id) {
            debug!(id, "dropping superseded submission result");
            return;
        }
        match result {
            Ok(receipt) => {
                info!(id, status = ?receipt.status, "submission accepted");
                self.bus.publish_kind(ConsoleEventKind::SubmissionAccepted {
                    id,
                    receipt,
                });
            }
            Err(err) => {
                warn!(id, error = %err, "submission failed");
                self.bus.publish_kind(ConsoleEventKind::SubmissionFailed {
                    id,
                    message: err.to_string(),
                });
            }
        }
    }

    fn view(&self) -> ConsoleView {
        ConsoleView {
            workspace_root: self.state.workspace_root.clone(),
            scenarios: self.state.catalog.descriptors.clone(),
            scenario_dir_missing: self.state.catalog.missing,
            selected: self.state.selected.clone(),
            run: self.state.run.clone(),
            engine: self.engine.state(),
            engine_pid: self.engine.pid(),
            latest: self.state.telemetry.latest().cloned(),
            highest_applied: self.state.telemetry.highest_applied(),
            pending_submission: self.state.pending_submission(),
            polling: self.telemetry.is_polling(),
            poll_period: self.telemetry.poll_period(),
        }
    }
}

/// Cloneable front door to a running [`Console`].
#[derive(Debug, Clone)]
pub struct ConsoleHandle {
    commands: mpsc::Sender<ConsoleCommand>,
    bus: EventBus,
}

impl ConsoleHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.bus.subscribe()
    }

    pub async fn send(
        &self,
        command: ConsoleCommand,
    ) -> Result<(), ConsoleClosed> {
        self.commands.send(command).await.map_err(|_| ConsoleClosed)
    }

    pub async fn inspect(&self) -> Result<ConsoleView, ConsoleClosed> {
        let (reply, view) = oneshot::channel();
        self.send(ConsoleCommand::Inspect(reply)).await?;
        view.await.map_err(|_| ConsoleClosed)
    }

    pub async fn set_workspace_root(
        &self,
        root: impl Into<PathBuf>,
    ) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::SetWorkspaceRoot(root.into())).await
    }

    /// Re-read the descriptor directory under the current root.
    pub async fn refresh_scenarios(&self) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::RefreshScenarios).await
    }

    pub async fn clear_scenario(&self) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::ClearScenario).await
    }

    pub async fn select_scenario(
        &self,
        name: impl Into<String>,
    ) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::SelectScenario(name.into())).await
    }

    pub async fn set_parameter(
        &self,
        parameter: Parameter,
    ) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::SetParameter(parameter)).await
    }

    pub async fn start_engine(&self) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::StartEngine).await
    }

    pub async fn stop_engine(&self) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::StopEngine).await
    }

    pub async fn run_scenario(&self) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::RunScenario).await
    }

    pub async fn start_polling(
        &self,
        period: Option<Duration>,
    ) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::StartPolling(period)).await
    }

    pub async fn stop_polling(&self) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::StopPolling).await
    }

    pub async fn shutdown(&self) -> Result<(), ConsoleClosed> {
        self.send(ConsoleCommand::Shutdown).await
    }
}
