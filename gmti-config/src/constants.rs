//! Fixed names and defaults shared by the loader and the catalog.

/// Descriptor directory, relative to the workspace root.
pub const SCENARIO_SUBDIR: &str = "simulator/configs";
/// Extension descriptor files must carry.
pub const SCENARIO_EXTENSION: &str = "yaml";

pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:9000";
pub const TELEMETRY_PATH: &str = "payload";
pub const SUBMISSION_PATH: &str = "ingest-config";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const MIN_POLL_INTERVAL_MS: u64 = 50;
pub const DEFAULT_STOP_GRACE_MS: u64 = 2_000;
pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_ENGINE_PROGRAM: &str = "cargo";
pub const DEFAULT_ENGINE_ARGS: &[&str] =
    &["run", "--bin", "simulator", "--", "--serve"];

pub const DEFAULT_CONFIG_FILE: &str = "gmti-console.toml";

/// Environment keys read by [`crate::ConfigLoader`].
pub mod env_keys {
    pub const CONFIG_PATH: &str = "GMTI_CONFIG_PATH";
    pub const WORKSPACE_ROOT: &str = "GMTI_WORKSPACE_ROOT";
    pub const ENGINE_URL: &str = "GMTI_ENGINE_URL";
    pub const POLL_INTERVAL_MS: &str = "GMTI_POLL_INTERVAL_MS";
    pub const STOP_GRACE_MS: &str = "GMTI_STOP_GRACE_MS";
    pub const SUBMIT_TIMEOUT_MS: &str = "GMTI_SUBMIT_TIMEOUT_MS";
    pub const ENGINE_PROGRAM: &str = "GMTI_ENGINE_PROGRAM";
    pub const ENGINE_ARGS: &str = "GMTI_ENGINE_ARGS";
}
