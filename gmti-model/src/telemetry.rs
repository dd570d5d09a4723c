/// One telemetry sample set as served by the engine.
///
/// Snapshots are replaced wholesale; nothing ever edits one in place.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetrySnapshot {
    pub profile: Vec<f64>,
    pub detection_count: i64,
}

impl TelemetrySnapshot {
    pub fn new(profile: Vec<f64>, detection_count: i64) -> Self {
        Self {
            profile,
            detection_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.profile.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_without_samples_is_still_empty() {
        assert!(TelemetrySnapshot::default().is_empty());
        assert!(TelemetrySnapshot::new(Vec::new(), 4).is_empty());
        assert!(!TelemetrySnapshot::new(vec![0.0], 0).is_empty());
    }
}
