//! Resolved console settings.

use std::{path::PathBuf, time::Duration};

use url::Url;

use crate::constants::{
    DEFAULT_ENGINE_ARGS, DEFAULT_ENGINE_PROGRAM, DEFAULT_ENGINE_URL,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_STOP_GRACE_MS, DEFAULT_SUBMIT_TIMEOUT_MS,
    SUBMISSION_PATH, TELEMETRY_PATH,
};

/// Fully resolved settings the console runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    /// Directory the engine is launched from and descriptors are read under.
    /// `None` until the operator (or a config layer) picks one.
    pub workspace_root: Option<PathBuf>,
    pub endpoints: EngineEndpoints,
    /// Telemetry tick period.
    pub poll_interval: Duration,
    /// How long a graceful stop may take before the engine is killed.
    pub stop_grace: Duration,
    pub submit_timeout: Duration,
    pub engine: EngineCommandConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            workspace_root: None,
            endpoints: EngineEndpoints::default(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            stop_grace: Duration::from_millis(DEFAULT_STOP_GRACE_MS),
            submit_timeout: Duration::from_millis(DEFAULT_SUBMIT_TIMEOUT_MS),
            engine: EngineCommandConfig::default(),
        }
    }
}

/// The engine's HTTP interface, derived from one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEndpoints {
    base: Url,
}

impl Default for EngineEndpoints {
    fn default() -> Self {
        Self::parse(DEFAULT_ENGINE_URL)
            .expect("default engine url should parse")
    }
}

impl EngineEndpoints {
    /// Accepts only `http`/`https` URLs that can carry a path.
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        let mut base = Url::parse(raw.trim())?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(EndpointError::Scheme(base.scheme().to_string()));
        }
        if base.cannot_be_a_base() {
            return Err(EndpointError::NotABase);
        }
        // join() replaces the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `GET` target for telemetry snapshots.
    pub fn telemetry_url(&self) -> Url {
        self.join(TELEMETRY_PATH)
    }

    /// `POST` target for run configurations.
    pub fn submission_url(&self) -> Url {
        self.join(SUBMISSION_PATH)
    }

    fn join(&self, segment: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        url
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid engine url")]
    Parse(#[from] url::ParseError),
    #[error("unsupported engine url scheme '{0}'")]
    Scheme(String),
    #[error("engine url cannot carry a path")]
    NotABase,
}

/// Program and arguments that launch the engine in server mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommandConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for EngineCommandConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_ENGINE_PROGRAM.to_string(),
            args: DEFAULT_ENGINE_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
