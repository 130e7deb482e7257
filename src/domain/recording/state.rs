//! Recording session state machine

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Recording,
    Stopped,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Stopped => "stopped",
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Recording => 1,
            Self::Stopped => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Recording,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: SessionState,
    pub action: String,
}

/// Lock-free holder for a session's state.
///
/// State machine:
///   IDLE -> RECORDING (start)
///   RECORDING -> STOPPED (stop)
///   IDLE -> STOPPED (output could not be opened)
///
/// STOPPED is terminal.
#[derive(Debug, Default)]
pub struct SessionStateCell {
    state: AtomicU8,
}

impl SessionStateCell {
    /// Create a cell in idle state
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Idle.to_u8()),
        }
    }

    /// Get the current state
    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        self.get() == SessionState::Recording
    }

    /// Transition from IDLE to RECORDING
    pub fn start_recording(&self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionState::Idle, SessionState::Recording, "start recording")
    }

    /// Transition from RECORDING to STOPPED
    pub fn stop_recording(&self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionState::Recording, SessionState::Stopped, "stop recording")
    }

    /// Transition from IDLE straight to STOPPED
    pub fn abort(&self) -> Result<(), InvalidStateTransition> {
        self.transition(SessionState::Idle, SessionState::Stopped, "abort")
    }

    fn transition(
        &self,
        from: SessionState,
        to: SessionState,
        action: &str,
    ) -> Result<(), InvalidStateTransition> {
        self.state
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| InvalidStateTransition {
                current_state: SessionState::from_u8(current),
                action: action.to_string(),
            })
    }
}
