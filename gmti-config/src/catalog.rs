//! Scenario descriptor discovery and parsing.
//!
//! Descriptors are flat `name: value` text files. Each recognised field is
//! matched on its own, anchored at the start of a line, so field order does
//! not matter and unknown lines are ignored. Anything missing or unparsable
//! falls back to the caller's defaults instead of rejecting the file: a
//! partial descriptor still lands in the catalog.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use gmti_model::{DescriptorFields, RunConfiguration, ScenarioDescriptor};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::constants::{SCENARIO_EXTENSION, SCENARIO_SUBDIR};

static TAPS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^taps:[ \t]*(\d+)").expect("taps regex should compile")
});
static RANGE_BINS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^range_bins:[ \t]*(\d+)")
        .expect("range_bins regex should compile")
});
static DOPPLER_BINS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^doppler_bins:[ \t]*(\d+)")
        .expect("doppler_bins regex should compile")
});
static FREQUENCY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^frequency:[ \t]*([+-]?\d+(?:\.\d+)?)")
        .expect("frequency regex should compile")
});
static NOISE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^noise:[ \t]*([+-]?\d+(?:\.\d+)?)")
        .expect("noise regex should compile")
});
static SEED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^seed:[ \t]*(\d+)").expect("seed regex should compile")
});
static DESCRIPTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^description:[ \t]*(.+)$")
        .expect("description regex should compile")
});

/// Result of enumerating a descriptor directory.
#[derive(Debug, Clone, Default)]
pub struct CatalogListing {
    pub directory: PathBuf,
    pub descriptors: Vec<ScenarioDescriptor>,
    /// Set when the directory did not exist. The listing is then empty.
    pub missing: bool,
}

impl CatalogListing {
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Find a descriptor by display name (`urban.yaml`) or scenario name
    /// (`urban`).
    pub fn find(&self, name: &str) -> Option<&ScenarioDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.name() == name || d.scenario_name() == name)
    }
}

/// Descriptor catalog rooted at an operator-selected workspace.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    workspace_root: PathBuf,
}

impl ScenarioCatalog {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    /// `<workspace_root>/simulator/configs`
    pub fn directory(&self) -> PathBuf {
        self.workspace_root.join(SCENARIO_SUBDIR)
    }

    pub fn scan(&self, defaults: &RunConfiguration) -> CatalogListing {
        list(&self.directory(), defaults)
    }
}

/// Enumerate and parse every descriptor in `directory`, sorted by file name.
pub fn list(directory: &Path, defaults: &RunConfiguration) -> CatalogListing {
    let mut listing = CatalogListing {
        directory: directory.to_path_buf(),
        ..Default::default()
    };

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                directory = %directory.display(),
                error = %err,
                "scenario directory not found"
            );
            listing.missing = true;
            return listing;
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_descriptor_extension(path))
        .collect();
    paths.sort();

    for path in paths {
        match parse(&path, defaults) {
            Some(descriptor) => listing.descriptors.push(descriptor),
            None => {
                warn!(path = %path.display(), "skipping unreadable descriptor")
            }
        }
    }

    debug!(
        directory = %directory.display(),
        count = listing.descriptors.len(),
        "scenario catalog populated"
    );
    listing
}

fn has_descriptor_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == SCENARIO_EXTENSION)
}

/// Read and parse one descriptor. Unreadable or empty files yield `None`.
pub fn parse(
    path: &Path,
    defaults: &RunConfiguration,
) -> Option<ScenarioDescriptor> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!(
                path = %path.display(),
                error = %err,
                "descriptor read failed"
            );
            return None;
        }
    };
    if contents.trim().is_empty() {
        return None;
    }
    Some(parse_str(&contents, path, defaults))
}

/// Parse descriptor text. Fields that are absent or fail to parse take their
/// value from `defaults`; the seed defaults to `0` and the description to
/// absent.
pub fn parse_str(
    contents: &str,
    path: &Path,
    defaults: &RunConfiguration,
) -> ScenarioDescriptor {
    let fields = DescriptorFields {
        taps: capture(&TAPS_PATTERN, contents, "taps")
            .unwrap_or(u64::from(defaults.taps())),
        range_bins: capture(&RANGE_BINS_PATTERN, contents, "range_bins")
            .unwrap_or(u64::from(defaults.range_bins())),
        doppler_bins: capture(&DOPPLER_BINS_PATTERN, contents, "doppler_bins")
            .unwrap_or(u64::from(defaults.doppler_bins())),
        frequency: capture(&FREQUENCY_PATTERN, contents, "frequency")
            .unwrap_or(defaults.frequency()),
        noise: capture(&NOISE_PATTERN, contents, "noise")
            .unwrap_or(defaults.noise()),
        seed: capture(&SEED_PATTERN, contents, "seed").unwrap_or(0),
        description: DESCRIPTION_PATTERN
            .captures(contents)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string()),
    };
    ScenarioDescriptor::new(path, fields)
}

fn capture<T: FromStr>(
    pattern: &Regex,
    contents: &str,
    field: &str,
) -> Option<T> {
    let raw = pattern.captures(contents)?.get(1)?.as_str();
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(field, raw, "descriptor value out of range, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> RunConfiguration {
        RunConfiguration::default()
    }

    #[test]
    fn parses_documented_example() {
        let text = "taps: 6\nrange_bins: 1024\nfrequency: 12.5\n\
                    description: urban clutter test";
        let d = parse_str(text, Path::new("urban.yaml"), &defaults());
        assert_eq!(d.taps(), 6);
        assert_eq!(d.range_bins(), 1024);
        assert_eq!(d.doppler_bins(), 256);
        assert_eq!(d.frequency(), 12.5);
        assert_eq!(d.noise(), 0.03);
        assert_eq!(d.seed(), 0);
        assert_eq!(d.description(), Some("urban clutter test"));
    }

    #[test]
    fn field_order_is_irrelevant() {
        let forward = "taps: 3\nnoise: 0.2\nseed: 99\n";
        let reverse = "seed: 99\nnoise: 0.2\ntaps: 3\n";
        let a = parse_str(forward, Path::new("a.yaml"), &defaults());
        let b = parse_str(reverse, Path::new("a.yaml"), &defaults());
        assert_eq!(a, b);
        assert_eq!(a.seed(), 99);
    }

    #[test]
    fn fields_must_start_the_line() {
        let text = "  taps: 9\n# frequency: 99.0\n";
        let d = parse_str(text, Path::new("a.yaml"), &defaults());
        assert_eq!(d.taps(), 4);
        assert_eq!(d.frequency(), 32.0);
    }

    #[test]
    fn signed_float_is_accepted_then_clamped() {
        let text = "frequency: -5.5\nnoise: +0.25\n";
        let d = parse_str(text, Path::new("a.yaml"), &defaults());
        assert_eq!(d.frequency(), 1.0);
        assert_eq!(d.noise(), 0.25);
    }

    #[test]
    fn seed_overflow_falls_back_to_unset() {
        let text = "seed: 99999999999999999999999\n";
        let d = parse_str(text, Path::new("a.yaml"), &defaults());
        assert_eq!(d.seed(), 0);
    }

    #[test]
    fn full_width_seed_is_kept() {
        let text = format!("seed: {}\n", u64::MAX);
        let d = parse_str(&text, Path::new("a.yaml"), &defaults());
        assert_eq!(d.seed(), u64::MAX);
    }

    #[test]
    fn value_must_follow_on_the_same_line() {
        let text = "taps:\n12\n";
        let d = parse_str(text, Path::new("a.yaml"), &defaults());
        assert_eq!(d.taps(), 4);
    }

    #[test]
    fn defaults_come_from_the_working_configuration() {
        let mut working = RunConfiguration::default();
        working.set_taps(16);
        working.set_noise(0.1);
        let d = parse_str("range_bins: 512\n", Path::new("a.yaml"), &working);
        assert_eq!(d.taps(), 16);
        assert_eq!(d.noise(), 0.1);
        assert_eq!(d.range_bins(), 512);
    }
}
