//! Long-running console sessions driven from the command line.

use std::{path::PathBuf, pin::pin, time::Duration};

use anyhow::{Context, Result, bail};
use clap::Args;
use gmti_config::{ConsoleConfig, ScenarioCatalog};
use gmti_core::{
    Console, ConsoleEvent, ConsoleEventKind, ConsoleHandle, EventBus,
    Parameter, SubmissionPayload, TelemetryClient, sparkline,
};
use gmti_model::{EngineState, RunConfiguration};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info};

/// Hand edits applied on top of the selected scenario. Out-of-range values
/// are clamped to the operator bounds.
#[derive(Debug, Clone, Default, Args)]
pub struct Tuning {
    #[arg(long)]
    pub taps: Option<u64>,
    #[arg(long)]
    pub range_bins: Option<u64>,
    #[arg(long)]
    pub doppler_bins: Option<u64>,
    #[arg(long)]
    pub frequency: Option<f64>,
    #[arg(long)]
    pub noise: Option<f64>,
    /// Fixed seed; omitted or 0 draws a random one
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Tuning {
    pub fn parameters(&self) -> Vec<Parameter> {
        [
            self.taps.map(Parameter::Taps),
            self.range_bins.map(Parameter::RangeBins),
            self.doppler_bins.map(Parameter::DopplerBins),
            self.frequency.map(Parameter::Frequency),
            self.noise.map(Parameter::Noise),
            self.seed.map(Parameter::Seed),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub scenario: Option<String>,
    pub parameters: Vec<Parameter>,
    /// Applied snapshots to wait for. `0` runs until Ctrl-C.
    pub ticks: u64,
    /// Submit after this delay rather than on the first snapshot.
    pub submit_delay_ms: Option<u64>,
    pub width: usize,
}

/// Prints console events, collapsing repeated telemetry failures into one
/// line until the message changes.
#[derive(Debug)]
struct EventPrinter {
    last_failure: Option<String>,
    width: usize,
}

impl EventPrinter {
    fn new(width: usize) -> Self {
        Self {
            last_failure: None,
            width,
        }
    }

    fn print(&mut self, event: &ConsoleEvent) {
        match &event.kind {
            ConsoleEventKind::TelemetryFailed { message, .. } => {
                if self.last_failure.as_deref() == Some(message.as_str()) {
                    return;
                }
                self.last_failure = Some(message.clone());
                println!("{event}");
            }
            ConsoleEventKind::TelemetryApplied { snapshot, .. } => {
                self.last_failure = None;
                println!("{event}");
                println!("{}", sparkline(Some(snapshot), self.width));
            }
            _ => println!("{event}"),
        }
    }
}

/// Launch the engine, submit the working configuration once, and stream
/// telemetry until `ticks` snapshots arrive, the engine stops, or Ctrl-C.
pub async fn run(config: ConsoleConfig, options: RunOptions) -> Result<()> {
    let (console, handle) = Console::new(config, EventBus::default());
    let mut events = handle.subscribe();
    let task = tokio::spawn(console.run());
    let mut printer = EventPrinter::new(options.width);

    if let Some(name) = &options.scenario {
        handle.select_scenario(name.clone()).await?;
    }
    for parameter in &options.parameters {
        handle.set_parameter(*parameter).await?;
    }
    handle.start_engine().await?;

    let submit_delay = options.submit_delay_ms.map(Duration::from_millis);
    let mut submit_timer = pin!(async move {
        match submit_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
    });
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());

    let mut submitted = false;
    let mut applied = 0u64;
    let mut engine_lost = false;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted, shutting down");
                break;
            }
            _ = &mut submit_timer, if !submitted => {
                submitted = true;
                handle.run_scenario().await?;
            }
            received = events.recv() => {
                let event = match received {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "event printer lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                printer.print(&event);

                match &event.kind {
                    ConsoleEventKind::TelemetryApplied { .. } => {
                        applied += 1;
                        if !submitted && options.submit_delay_ms.is_none() {
                            submitted = true;
                            handle.run_scenario().await?;
                        }
                        if options.ticks > 0 && applied >= options.ticks {
                            break;
                        }
                    }
                    ConsoleEventKind::EngineStateChanged {
                        to: EngineState::Stopped,
                        ..
                    } => {
                        engine_lost = true;
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    finish(&handle, events, task, &mut printer).await?;
    if engine_lost {
        bail!("engine stopped after {applied} telemetry snapshot(s)");
    }
    Ok(())
}

/// Poll an engine that somebody else launched. Counts every settled poll,
/// applied or failed, toward `ticks`.
pub async fn watch(
    config: ConsoleConfig,
    ticks: u64,
    interval_ms: Option<u64>,
    width: usize,
) -> Result<()> {
    let (console, handle) = Console::new(config, EventBus::default());
    let console = console.with_auto_poll(false);
    let mut events = handle.subscribe();
    let task = tokio::spawn(console.run());
    let mut printer = EventPrinter::new(width);

    handle
        .start_polling(interval_ms.map(Duration::from_millis))
        .await?;
    if let Some(period) = handle.inspect().await?.poll_period {
        info!(period_ms = period.as_millis() as u64, "watching telemetry");
    }

    let mut ctrl_c = pin!(tokio::signal::ctrl_c());
    let mut settled = 0u64;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            received = events.recv() => {
                let event = match received {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                printer.print(&event);
                if matches!(
                    event.kind,
                    ConsoleEventKind::TelemetryApplied { .. }
                        | ConsoleEventKind::TelemetryFailed { .. }
                ) {
                    settled += 1;
                    if ticks > 0 && settled >= ticks {
                        break;
                    }
                }
            }
        }
    }

    finish(&handle, events, task, &mut printer).await
}

/// One-shot submission to an already running engine.
pub async fn submit(
    config: ConsoleConfig,
    root: Option<PathBuf>,
    scenario: Option<String>,
    parameters: Vec<Parameter>,
) -> Result<()> {
    let mut run = match (&root, &scenario) {
        (Some(root), Some(name)) => {
            let listing =
                ScenarioCatalog::new(root).scan(&RunConfiguration::default());
            if listing.missing {
                bail!(
                    "Scenario directory not found: {}",
                    listing.directory.display()
                );
            }
            let descriptor = listing
                .find(name)
                .with_context(|| format!("no scenario named '{name}'"))?;
            println!("Loaded scenario {}", descriptor.name());
            RunConfiguration::from_descriptor(descriptor)
        }
        _ => RunConfiguration::default(),
    };
    for parameter in parameters {
        parameter.apply(&mut run);
    }

    let (client, _fetches) =
        TelemetryClient::new(config.endpoints.clone(), config.submit_timeout);
    let payload = SubmissionPayload::from_run(&run);
    println!(
        "Submitting offline configuration (taps={}, range={}, doppler={}).",
        payload.taps, payload.range_bins, payload.doppler_bins
    );

    match client.submit_configuration(&payload).await {
        Ok(receipt) => {
            println!("Scenario submitted successfully ({receipt}).");
            Ok(())
        }
        Err(err) => bail!("Failed to submit scenario: {err}"),
    }
}

/// Ask the console to shut down, then print whatever it says on the way out.
async fn finish(
    handle: &ConsoleHandle,
    mut events: broadcast::Receiver<ConsoleEvent>,
    mut task: JoinHandle<()>,
    printer: &mut EventPrinter,
) -> Result<()> {
    // No new ticks while the engine winds down.
    if handle.stop_polling().await.is_err() || handle.shutdown().await.is_err()
    {
        debug!("console already closed");
    }
    loop {
        tokio::select! {
            joined = &mut task => {
                joined.context("console task panicked")?;
                break;
            }
            received = events.recv() => match received {
                Ok(event) => printer.print(&event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    (&mut task).await.context("console task panicked")?;
                    break;
                }
            },
        }
    }
    while let Ok(event) = events.try_recv() {
        printer.print(&event);
    }
    Ok(())
}
