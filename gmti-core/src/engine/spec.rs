use std::{fmt, path::PathBuf, process::Stdio};

use gmti_config::EngineCommandConfig;
use tokio::process::Command;

/// Abstract command representation so launch plans can be checked without
/// spawning anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cwd) = &self.cwd {
            write!(f, "(in {}) ", cwd.display())?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// The engine in server mode, as configured.
    pub fn engine(config: &EngineCommandConfig) -> Self {
        Self::new(config.program.clone()).args(config.args.iter().cloned())
    }

    /// Build the child command with piped output and no stdin. The child is
    /// killed if its handle is dropped.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if !self.env.is_empty() {
            cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_command_runs_simulator_server() {
        let spec = CommandSpec::engine(&EngineCommandConfig::default())
            .current_dir("/work/gmti");
        assert_eq!(spec.program, "cargo");
        assert_eq!(spec.args, ["run", "--bin", "simulator", "--", "--serve"]);
        assert_eq!(
            spec.to_string(),
            "(in /work/gmti) cargo run --bin simulator -- --serve"
        );
    }

    #[test]
    fn builder_accumulates_env() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("true")
            .env("RUST_LOG", "debug");
        assert_eq!(
            spec.env,
            vec![("RUST_LOG".to_string(), "debug".to_string())]
        );
        assert_eq!(spec.cwd, None);
    }
}
