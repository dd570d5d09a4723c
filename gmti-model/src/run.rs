use crate::{bounds::ParameterBounds, scenario::ScenarioDescriptor};

/// The operator's working configuration.
///
/// Fields are private so every write goes through a clamping setter; the
/// bounds invariant holds no matter where a value came from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunConfiguration {
    taps: u32,
    range_bins: u32,
    doppler_bins: u32,
    frequency: f64,
    noise: f64,
    seed: u64,
    scenario: Option<String>,
    description: Option<String>,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            taps: 4,
            range_bins: 2048,
            doppler_bins: 256,
            frequency: 32.0,
            noise: 0.03,
            seed: 0,
            scenario: None,
            description: None,
        }
    }
}

impl RunConfiguration {
    /// Seed a working configuration from a selected descriptor.
    pub fn from_descriptor(descriptor: &ScenarioDescriptor) -> Self {
        Self {
            taps: descriptor.taps(),
            range_bins: descriptor.range_bins(),
            doppler_bins: descriptor.doppler_bins(),
            frequency: descriptor.frequency(),
            noise: descriptor.noise(),
            seed: descriptor.seed(),
            scenario: Some(descriptor.scenario_name()),
            description: descriptor.description().map(str::to_string),
        }
    }

    pub fn taps(&self) -> u32 {
        self.taps
    }

    pub fn range_bins(&self) -> u32 {
        self.range_bins
    }

    pub fn doppler_bins(&self) -> u32 {
        self.doppler_bins
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn noise(&self) -> f64 {
        self.noise
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_taps(&mut self, taps: u64) {
        self.taps = ParameterBounds::OPERATOR.taps.clamp(taps);
    }

    pub fn set_range_bins(&mut self, bins: u64) {
        self.range_bins = ParameterBounds::OPERATOR.range_bins.clamp(bins);
    }

    pub fn set_doppler_bins(&mut self, bins: u64) {
        self.doppler_bins = ParameterBounds::OPERATOR.doppler_bins.clamp(bins);
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = ParameterBounds::OPERATOR.frequency.clamp(frequency);
    }

    pub fn set_noise(&mut self, noise: f64) {
        self.noise = ParameterBounds::OPERATOR.noise.clamp(noise);
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Drop scenario metadata, leaving a hand-tuned configuration.
    pub fn clear_scenario(&mut self) {
        self.scenario = None;
        self.description = None;
    }
}
