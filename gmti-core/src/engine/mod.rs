//! Engine child-process lifecycle.

mod controller;
mod spec;

pub use controller::{
    EngineController, EngineSignal, ExitReport, StartOutcome, StopOutcome,
};
pub use spec::CommandSpec;
