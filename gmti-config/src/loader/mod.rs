//! Layered console settings.
//!
//! Resolution order, lowest to highest precedence:
//! 1) built-in defaults,
//! 2) a TOML file (`$GMTI_CONFIG_PATH`, else `gmti-console.toml` in the
//!    working directory),
//! 3) the process environment, after a `.env` file has been folded into it.
//!
//! Unusable values never abort the load. They become [`ConfigWarnings`] and
//! the lower layer's value stands.

pub mod error;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::debug;

use self::error::ConfigLoadError;
use crate::{
    constants::{DEFAULT_CONFIG_FILE, MIN_POLL_INTERVAL_MS, env_keys},
    models::{ConsoleConfig, EngineEndpoints},
    validation::{ConfigWarnings, parse_millis},
};

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: ConsoleConfig,
    pub warnings: ConfigWarnings,
    /// TOML file that contributed, if any.
    pub source: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load from disk and the real process environment.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };
        debug!(env_file_loaded, "environment file processed");

        self.load_with_env(EnvConfig::gather())
    }

    /// Load with an explicit environment snapshot. The process environment
    /// is not consulted.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file, source) = self.load_file_config(&env)?;
        let mut warnings = ConfigWarnings::default();
        let mut config = ConsoleConfig::default();

        if let Some(file) = file {
            apply_file(&mut config, file, &mut warnings);
        }
        apply_env(&mut config, &env, &mut warnings);

        Ok(ConfigLoad {
            config,
            warnings,
            source,
        })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let configured = (&self.options.config_path, &env.config_path);
        let (path, explicit) = match configured {
            (Some(path), _) => (path.clone(), true),
            (None, Some(path)) => (path.clone(), true),
            (None, None) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let file = read_file_config(&path)?;
        debug!(path = %path.display(), "console configuration file loaded");
        Ok((Some(file), Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Shape of `gmti-console.toml`. Every key is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub workspace_root: Option<PathBuf>,
    pub engine_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub stop_grace_ms: Option<u64>,
    pub submit_timeout_ms: Option<u64>,
    pub engine: FileEngineConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileEngineConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
}

/// Raw environment values, captured once so loading is deterministic.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub workspace_root: Option<String>,
    pub engine_url: Option<String>,
    pub poll_interval_ms: Option<String>,
    pub stop_grace_ms: Option<String>,
    pub submit_timeout_ms: Option<String>,
    pub engine_program: Option<String>,
    pub engine_args: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            config_path: get(env_keys::CONFIG_PATH).map(PathBuf::from),
            workspace_root: get(env_keys::WORKSPACE_ROOT),
            engine_url: get(env_keys::ENGINE_URL),
            poll_interval_ms: get(env_keys::POLL_INTERVAL_MS),
            stop_grace_ms: get(env_keys::STOP_GRACE_MS),
            submit_timeout_ms: get(env_keys::SUBMIT_TIMEOUT_MS),
            engine_program: get(env_keys::ENGINE_PROGRAM),
            engine_args: get(env_keys::ENGINE_ARGS),
        }
    }
}

fn apply_file(
    config: &mut ConsoleConfig,
    file: FileConfig,
    warnings: &mut ConfigWarnings,
) {
    if let Some(root) = file.workspace_root {
        config.workspace_root = Some(root);
    }
    if let Some(raw) = file.engine_url {
        apply_engine_url(config, "engine_url", &raw, warnings);
    }
    if let Some(ms) = file.poll_interval_ms {
        apply_poll_interval(config, "poll_interval_ms", ms, warnings);
    }
    if let Some(ms) = file.stop_grace_ms {
        apply_duration(&mut config.stop_grace, "stop_grace_ms", ms, warnings);
    }
    if let Some(ms) = file.submit_timeout_ms {
        apply_duration(
            &mut config.submit_timeout,
            "submit_timeout_ms",
            ms,
            warnings,
        );
    }
    if let Some(program) = file.engine.program {
        apply_program(config, "engine.program", program, warnings);
    }
    if let Some(args) = file.engine.args {
        config.engine.args = args;
    }
}

fn apply_env(
    config: &mut ConsoleConfig,
    env: &EnvConfig,
    warnings: &mut ConfigWarnings,
) {
    if let Some(root) = &env.workspace_root {
        config.workspace_root = Some(PathBuf::from(root.trim()));
    }
    if let Some(raw) = &env.engine_url {
        apply_engine_url(config, env_keys::ENGINE_URL, raw, warnings);
    }
    if let Some(raw) = &env.poll_interval_ms
        && let Some(ms) =
            parse_millis(env_keys::POLL_INTERVAL_MS, raw, warnings)
    {
        apply_poll_interval(config, env_keys::POLL_INTERVAL_MS, ms, warnings);
    }
    if let Some(raw) = &env.stop_grace_ms
        && let Some(ms) = parse_millis(env_keys::STOP_GRACE_MS, raw, warnings)
    {
        config.stop_grace = Duration::from_millis(ms);
    }
    if let Some(raw) = &env.submit_timeout_ms
        && let Some(ms) =
            parse_millis(env_keys::SUBMIT_TIMEOUT_MS, raw, warnings)
    {
        config.submit_timeout = Duration::from_millis(ms);
    }
    if let Some(program) = &env.engine_program {
        apply_program(
            config,
            env_keys::ENGINE_PROGRAM,
            program.clone(),
            warnings,
        );
    }
    if let Some(args) = &env.engine_args {
        config.engine.args =
            args.split_whitespace().map(str::to_string).collect();
    }
}

fn apply_engine_url(
    config: &mut ConsoleConfig,
    key: &str,
    raw: &str,
    warnings: &mut ConfigWarnings,
) {
    match EngineEndpoints::parse(raw) {
        Ok(endpoints) => config.endpoints = endpoints,
        Err(err) => warnings.push_with_hint(
            format!(
                "{key}='{raw}' rejected ({err}); keeping {}",
                config.endpoints.base()
            ),
            "Use an http:// or https:// base such as http://127.0.0.1:9000",
        ),
    }
}

fn apply_poll_interval(
    config: &mut ConsoleConfig,
    key: &str,
    ms: u64,
    warnings: &mut ConfigWarnings,
) {
    if ms < MIN_POLL_INTERVAL_MS {
        warnings.push_with_hint(
            format!(
                "{key}={ms} is below the {MIN_POLL_INTERVAL_MS} ms floor; \
                 using the floor"
            ),
            "Very short intervals flood the engine with overlapping requests",
        );
        config.poll_interval = Duration::from_millis(MIN_POLL_INTERVAL_MS);
    } else {
        config.poll_interval = Duration::from_millis(ms);
    }
}

fn apply_duration(
    target: &mut Duration,
    key: &str,
    ms: u64,
    warnings: &mut ConfigWarnings,
) {
    if ms == 0 {
        warnings.push(format!(
            "{key} must be greater than zero; keeping default"
        ));
    } else {
        *target = Duration::from_millis(ms);
    }
}

fn apply_program(
    config: &mut ConsoleConfig,
    key: &str,
    program: String,
    warnings: &mut ConfigWarnings,
) {
    let program = program.trim().to_string();
    if program.is_empty() {
        warnings.push(format!(
            "{key} is blank; keeping '{}'",
            config.engine.program
        ));
    } else {
        config.engine.program = program;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn blank_values_count_as_unset() {
        let env = env(&[(env_keys::ENGINE_URL, "   ")]);
        assert!(env.engine_url.is_none());
    }

    #[test]
    fn engine_args_split_on_whitespace() {
        let mut config = ConsoleConfig::default();
        let mut warnings = ConfigWarnings::default();
        apply_env(
            &mut config,
            &env(&[(env_keys::ENGINE_ARGS, "run  --bin sim\t--serve")]),
            &mut warnings,
        );
        assert_eq!(config.engine.args, vec!["run", "--bin", "sim", "--serve"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn poll_interval_is_floored() {
        let mut config = ConsoleConfig::default();
        let mut warnings = ConfigWarnings::default();
        apply_poll_interval(&mut config, "poll_interval_ms", 5, &mut warnings);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn bad_url_keeps_previous_endpoint() {
        let mut config = ConsoleConfig::default();
        let mut warnings = ConfigWarnings::default();
        apply_engine_url(&mut config, "engine_url", "ftp://x", &mut warnings);
        assert_eq!(config.endpoints, EngineEndpoints::default());
        assert!(warnings.items[0].message.contains("ftp://x"));
    }

    #[test]
    fn blank_program_is_ignored() {
        let mut config = ConsoleConfig::default();
        let mut warnings = ConfigWarnings::default();
        apply_program(
            &mut config,
            "engine.program",
            "  ".into(),
            &mut warnings,
        );
        assert_eq!(config.engine.program, "cargo");
        assert_eq!(warnings.len(), 1);
    }
}
