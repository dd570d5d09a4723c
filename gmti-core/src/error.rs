//! Failure taxonomy for engine control and engine HTTP traffic.
//!
//! None of these end the console. Callers turn them into operator log lines
//! and keep the last good state.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// The engine process could not be launched.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no workspace root selected")]
    MissingWorkspaceRoot,
    #[error("workspace root {path} is not a directory")]
    InvalidWorkspaceRoot { path: PathBuf },
    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A request to the engine did not produce a usable answer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("request to {url} timed out after {}ms", .timeout.as_millis())]
    Timeout { url: String, timeout: Duration },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed response from {url}")]
    Malformed {
        url: String,
        #[source]
        source: TelemetryParseError,
    },
}

impl TransportError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }
        TransportError::Request {
            url: url.to_string(),
            message: root_cause(&err),
        }
    }
}

fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

/// Telemetry body that is not the shape the console reads.
#[derive(Debug, Error)]
pub enum TelemetryParseError {
    #[error("body is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

/// The console task is gone; no more commands can be delivered.
#[derive(Debug, Error)]
#[error("console task has stopped")]
pub struct ConsoleClosed;
