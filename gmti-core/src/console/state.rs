use std::{path::PathBuf, time::Duration};

use gmti_config::CatalogListing;
use gmti_model::{
    EngineState, RunConfiguration, ScenarioDescriptor, TelemetrySnapshot,
};

use crate::telemetry::TelemetryTracker;

/// One operator edit to the working configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parameter {
    Taps(u64),
    RangeBins(u64),
    DopplerBins(u64),
    Frequency(f64),
    Noise(f64),
    Seed(u64),
}

impl Parameter {
    /// Write the edit into `run`, clamped to the operator bounds.
    pub fn apply(self, run: &mut RunConfiguration) {
        match self {
            Parameter::Taps(v) => run.set_taps(v),
            Parameter::RangeBins(v) => run.set_range_bins(v),
            Parameter::DopplerBins(v) => run.set_doppler_bins(v),
            Parameter::Frequency(v) => run.set_frequency(v),
            Parameter::Noise(v) => run.set_noise(v),
            Parameter::Seed(v) => run.set_seed(v),
        }
    }
}

/// Everything the console holds between messages. Owned by the control
/// task and never shared.
#[derive(Debug, Default)]
pub struct ConsoleState {
    pub workspace_root: Option<PathBuf>,
    pub catalog: CatalogListing,
    pub selected: Option<ScenarioDescriptor>,
    pub run: RunConfiguration,
    pub telemetry: TelemetryTracker,
    pending_submission: Option<u64>,
    next_submission_id: u64,
}

impl ConsoleState {
    pub fn set_parameter(&mut self, parameter: Parameter) {
        parameter.apply(&mut self.run);
    }

    pub fn select(&mut self, descriptor: ScenarioDescriptor) {
        self.run = RunConfiguration::from_descriptor(&descriptor);
        self.selected = Some(descriptor);
        self.invalidate_submission();
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.run.clear_scenario();
        self.invalidate_submission();
    }

    /// Allocate an id for a new submission. Any earlier one stops counting.
    pub fn begin_submission(&mut self) -> u64 {
        self.next_submission_id += 1;
        self.pending_submission = Some(self.next_submission_id);
        self.next_submission_id
    }

    /// Returns whether `id` was the pending submission; clears it if so.
    pub fn settle_submission(&mut self, id: u64) -> bool {
        if self.pending_submission == Some(id) {
            self.pending_submission = None;
            true
        } else {
            false
        }
    }

    pub fn invalidate_submission(&mut self) {
        self.pending_submission = None;
    }

    pub fn pending_submission(&self) -> Option<u64> {
        self.pending_submission
    }
}

/// Read-only copy of console state handed out to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleView {
    pub workspace_root: Option<PathBuf>,
    pub scenarios: Vec<ScenarioDescriptor>,
    pub scenario_dir_missing: bool,
    pub selected: Option<ScenarioDescriptor>,
    pub run: RunConfiguration,
    pub engine: EngineState,
    pub engine_pid: Option<u32>,
    pub latest: Option<TelemetrySnapshot>,
    pub highest_applied: u64,
    pub pending_submission: Option<u64>,
    pub polling: bool,
    /// Ticker period after the minimum was applied.
    pub poll_period: Option<Duration>,
}
