//! Layering of defaults, TOML file and environment.

use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use gmti_config::{ConfigLoadError, ConfigLoader, EnvConfig};

fn env(pairs: &[(&str, &str)]) -> EnvConfig {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    EnvConfig::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn file_values_are_overridden_by_environment() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("console.toml");
    fs::write(
        &path,
        r#"
workspace_root = "/srv/gmti"
engine_url = "http://10.0.0.5:9100"
poll_interval_ms = 250
stop_grace_ms = 800

[engine]
program = "simulator"
args = ["--serve"]
"#,
    )?;

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(env(&[("GMTI_POLL_INTERVAL_MS", "400")]))?;

    let config = load.config;
    assert_eq!(config.workspace_root, Some(PathBuf::from("/srv/gmti")));
    assert_eq!(
        config.endpoints.telemetry_url().as_str(),
        "http://10.0.0.5:9100/payload"
    );
    assert_eq!(config.poll_interval, Duration::from_millis(400));
    assert_eq!(config.stop_grace, Duration::from_millis(800));
    assert_eq!(config.submit_timeout, Duration::from_secs(5));
    assert_eq!(config.engine.program, "simulator");
    assert_eq!(config.engine.args, vec!["--serve"]);
    assert!(load.warnings.is_empty());
    assert_eq!(load.source, Some(path));
    Ok(())
}

#[test]
fn bad_environment_values_warn_and_keep_lower_layers() -> anyhow::Result<()> {
    let load = ConfigLoader::new().load_with_env(env(&[
        ("GMTI_ENGINE_URL", "gopher://old"),
        ("GMTI_STOP_GRACE_MS", "forever"),
        ("GMTI_SUBMIT_TIMEOUT_MS", "0"),
    ]))?;

    assert_eq!(load.warnings.len(), 3);
    assert_eq!(load.config.stop_grace, Duration::from_millis(2000));
    assert_eq!(load.config.submit_timeout, Duration::from_millis(5000));
    assert_eq!(
        load.config.endpoints.base().as_str(),
        "http://127.0.0.1:9000/"
    );
    Ok(())
}

#[test]
fn explicit_missing_file_is_an_error() {
    let err = ConfigLoader::new()
        .load_with_env(env(&[("GMTI_CONFIG_PATH", "/nonexistent/gmti.toml")]))
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn unknown_keys_are_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("console.toml");
    fs::write(&path, "poll_interval = 10\n")?;

    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(EnvConfig::default())
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::Parse { .. }));
    Ok(())
}
