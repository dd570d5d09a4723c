use std::path::{Path, PathBuf};

use crate::bounds::ParameterBounds;

/// Raw field values pulled out of a descriptor file, before clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorFields {
    pub taps: u64,
    pub range_bins: u64,
    pub doppler_bins: u64,
    pub frequency: f64,
    pub noise: f64,
    pub seed: u64,
    pub description: Option<String>,
}

/// A reusable run configuration read from one descriptor file.
///
/// Descriptors are immutable: a changed file is re-parsed into a new value.
/// Numeric fields are clamped into [`ParameterBounds::OPERATOR`] on
/// construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScenarioDescriptor {
    path: PathBuf,
    name: String,
    taps: u32,
    range_bins: u32,
    doppler_bins: u32,
    frequency: f64,
    noise: f64,
    seed: u64,
    description: Option<String>,
}

impl ScenarioDescriptor {
    pub fn new(path: impl Into<PathBuf>, fields: DescriptorFields) -> Self {
        let path = path.into();
        let bounds = ParameterBounds::OPERATOR;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let description = fields
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Self {
            name,
            taps: bounds.taps.clamp(fields.taps),
            range_bins: bounds.range_bins.clamp(fields.range_bins),
            doppler_bins: bounds.doppler_bins.clamp(fields.doppler_bins),
            frequency: bounds.frequency.clamp(fields.frequency),
            noise: bounds.noise.clamp(fields.noise),
            seed: fields.seed,
            description,
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name: the file name including its extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name submitted to the engine: the file name without its extension.
    pub fn scenario_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
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

    /// `0` means "no seed chosen"; one is generated at submission time.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
