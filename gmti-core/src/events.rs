//! Operator-facing notifications and the bus that fans them out.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use gmti_model::{EngineState, TelemetrySnapshot};
use tokio::sync::broadcast;

use crate::telemetry::SubmissionReceipt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// What happened. Every kind renders to one human-readable log message.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEventKind {
    Log {
        level: LogLevel,
        message: String,
    },
    EngineStateChanged {
        from: EngineState,
        to: EngineState,
    },
    /// One line of merged engine stdout/stderr.
    EngineOutput {
        line: String,
    },
    /// Engine exited after an operator stop.
    EngineExited {
        code: Option<i32>,
        forced: bool,
    },
    /// Engine exited while nobody asked it to.
    ProcessCrash {
        code: Option<i32>,
    },
    TelemetryApplied {
        sequence: u64,
        snapshot: TelemetrySnapshot,
    },
    TelemetryFailed {
        sequence: u64,
        message: String,
    },
    SubmissionAccepted {
        id: u64,
        receipt: SubmissionReceipt,
    },
    SubmissionFailed {
        id: u64,
        message: String,
    },
}

/// Timestamped notification. `Display` yields `[<RFC 3339>] <message>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleEvent {
    pub at: DateTime<Utc>,
    pub kind: ConsoleEventKind,
}

impl ConsoleEvent {
    pub fn now(kind: ConsoleEventKind) -> Self {
        Self {
            at: Utc::now(),
            kind,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::now(ConsoleEventKind::Log {
            level,
            message: message.into(),
        })
    }

    pub fn message(&self) -> String {
        match &self.kind {
            ConsoleEventKind::Log { message, .. } => message.clone(),
            ConsoleEventKind::EngineStateChanged { from, to } => {
                format!("Engine {from} -> {to}")
            }
            ConsoleEventKind::EngineOutput { line } => line.clone(),
            ConsoleEventKind::EngineExited { forced: true, .. } => {
                "Simulator server stopped (killed after grace period).".into()
            }
            ConsoleEventKind::EngineExited { .. } => {
                "Simulator server stopped.".into()
            }
            ConsoleEventKind::ProcessCrash { code: Some(code) } => {
                format!("Simulator exited unexpectedly with code {code}.")
            }
            ConsoleEventKind::ProcessCrash { code: None } => {
                "Simulator exited unexpectedly.".into()
            }
            ConsoleEventKind::TelemetryApplied { snapshot, .. } => format!(
                "Telemetry: {} detections, {} bins.",
                snapshot.detection_count,
                snapshot.profile.len()
            ),
            ConsoleEventKind::TelemetryFailed { message, .. } => {
                format!("Telemetry error: {message}")
            }
            ConsoleEventKind::SubmissionAccepted { receipt, .. } => {
                format!("Scenario submitted successfully ({receipt}).")
            }
            ConsoleEventKind::SubmissionFailed { message, .. } => {
                format!("Failed to submit scenario: {message}")
            }
        }
    }
}

impl fmt::Display for ConsoleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.message()
        )
    }
}

/// In-process fan-out of [`ConsoleEvent`]s. Publishing never blocks and
/// never fails; with no subscribers the event is dropped.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ConsoleEvent>,
    capacity: usize,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ConsoleEvent) {
        tracing::trace!(event = %event, "console event");
        let _ = self.sender.send(event);
    }

    pub fn publish_kind(&self, kind: ConsoleEventKind) {
        self.publish(ConsoleEvent::now(kind));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(ConsoleEvent::info(message));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.publish(ConsoleEvent::warn(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(ConsoleEvent::error(message));
    }
}
