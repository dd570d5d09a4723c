use std::fmt;

/// Lifecycle state of the engine child process.
///
/// Only [`EngineState::can_transition_to`] decides which changes are legal;
/// the process controller is the single owner allowed to apply them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EngineState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl EngineState {
    pub fn can_transition_to(self, next: EngineState) -> bool {
        use EngineState::*;
        matches!(
            (self, next),
            (Stopped, Starting)
                | (Starting, Running)
                | (Starting, Stopped)
                | (Running, Stopping)
                | (Running, Stopped)
                | (Stopping, Stopped)
        )
    }

    /// Start is offered only when nothing is running.
    pub fn can_start(self) -> bool {
        matches!(self, EngineState::Stopped)
    }

    pub fn can_stop(self) -> bool {
        matches!(self, EngineState::Running)
    }

    /// Submissions need a live engine to receive them.
    pub fn accepts_submissions(self) -> bool {
        matches!(self, EngineState::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Stopped => "stopped",
            EngineState::Starting => "starting",
            EngineState::Running => "running",
            EngineState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
