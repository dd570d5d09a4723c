//! Engine lifecycle and telemetry synchronization for the GMTI operator
//! console.
//!
//! - [`engine`]: launches the simulator engine in server mode, captures its
//!   output and stops it with a bounded grace window.
//! - [`telemetry`]: polls the engine's telemetry endpoint, keeps only the
//!   newest response by sequence number and submits run configurations.
//! - [`render`]: turns a telemetry snapshot into a drawable waveform.
//! - [`console`]: the single control task tying these together.
#![allow(missing_docs)]

pub mod console;
pub mod engine;
pub mod error;
pub mod events;
pub mod render;
pub mod telemetry;

pub use console::{
    Console, ConsoleCommand, ConsoleHandle, ConsoleView, Parameter,
};
pub use engine::{CommandSpec, EngineController, StartOutcome, StopOutcome};
pub use error::{
    ConsoleClosed, LaunchError, TelemetryParseError, TransportError,
};
pub use events::{ConsoleEvent, ConsoleEventKind, EventBus, LogLevel};
pub use render::{Drawable, Viewport, Waveform, render, sparkline};
pub use telemetry::{
    SubmissionPayload, SubmissionReceipt, TelemetryClient, TelemetryTracker,
};
