use gmti_model::TelemetrySnapshot;
use tracing::{debug, trace};

use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The snapshot replaced the retained one.
    Applied,
    /// Older than something already applied, or from a retired range.
    Stale,
    /// The fetch failed; the retained snapshot is untouched.
    Failed,
}

/// Last-write-wins by request sequence number.
///
/// Completion order and wall-clock time play no part: a response is applied
/// only if its sequence number beats every number applied before it.
#[derive(Debug, Default, Clone)]
pub struct TelemetryTracker {
    highest_applied: u64,
    /// Sequence numbers at or below this are discarded outright.
    retired_through: u64,
    latest: Option<TelemetrySnapshot>,
    failures: u64,
}

impl TelemetryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(
        &mut self,
        sequence: u64,
        result: &Result<TelemetrySnapshot, TransportError>,
    ) -> ApplyOutcome {
        if sequence <= self.retired_through {
            trace!(sequence, "dropping telemetry from retired range");
            return ApplyOutcome::Stale;
        }
        match result {
            Ok(_) if sequence <= self.highest_applied => {
                debug!(
                    sequence,
                    highest = self.highest_applied,
                    "discarding out-of-order telemetry"
                );
                ApplyOutcome::Stale
            }
            Ok(snapshot) => {
                self.highest_applied = sequence;
                self.latest = Some(snapshot.clone());
                ApplyOutcome::Applied
            }
            Err(_) => {
                self.failures += 1;
                ApplyOutcome::Failed
            }
        }
    }

    /// Discard every response with a sequence number up to `sequence`,
    /// including ones still in flight.
    pub fn retire_through(&mut self, sequence: u64) {
        self.retired_through = self.retired_through.max(sequence);
    }

    pub fn latest(&self) -> Option<&TelemetrySnapshot> {
        self.latest.as_ref()
    }

    pub fn highest_applied(&self) -> u64 {
        self.highest_applied
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}
