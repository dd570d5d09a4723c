//! Telemetry polling, ordering and configuration submission.

mod client;
mod tracker;
mod wire;

pub use client::{FetchOutcome, TelemetryClient};
pub use tracker::{ApplyOutcome, TelemetryTracker};
pub use wire::{
    SubmissionPayload, SubmissionReceipt, parse_snapshot, random_seed,
};
