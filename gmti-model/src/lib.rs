//! Core data model definitions shared across the GMTI console crates.
#![allow(missing_docs)]

pub mod bounds;
pub mod engine;
pub mod run;
pub mod scenario;
pub mod telemetry;

// Intentionally curated re-exports for downstream consumers.
pub use bounds::{FloatRange, IntRange, ParameterBounds};
pub use engine::EngineState;
pub use run::RunConfiguration;
pub use scenario::{DescriptorFields, ScenarioDescriptor};
pub use telemetry::TelemetrySnapshot;
