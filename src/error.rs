//! Setup errors
//!
//! Gameplay never fails: a missed shot or an invalid target is a normal
//! outcome of the grapple state machine. The only hard failures are a
//! malformed rig or unusable configuration, detected once while building the
//! simulation.

use std::fmt;

/// Error raised while loading or validating a scene
#[derive(Debug)]
pub enum SetupError {
    /// The grapple start anchor must be mounted on the player body
    StartAnchorNotOnPlayer,
    /// The grapple end anchor must live in world space, not on the player
    EndAnchorOnPlayer,
    /// A tuning value is out of range
    InvalidTuning(String),
    /// A platform or solid description is unusable
    InvalidScene(String),
    /// Scene or tuning file could not be read
    Io(std::io::Error),
    /// Scene or tuning JSON could not be parsed
    Parse(serde_json::Error),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::StartAnchorNotOnPlayer => {
                write!(f, "grapple start anchor must be a child of the player")
            }
            SetupError::EndAnchorOnPlayer => {
                write!(f, "grapple end anchor must not be a child of the player")
            }
            SetupError::InvalidTuning(msg) => write!(f, "invalid tuning: {}", msg),
            SetupError::InvalidScene(msg) => write!(f, "invalid scene: {}", msg),
            SetupError::Io(err) => write!(f, "failed to read file: {}", err),
            SetupError::Parse(err) => write!(f, "failed to parse JSON: {}", err),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Io(err) => Some(err),
            SetupError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SetupError {
    fn from(err: std::io::Error) -> Self {
        SetupError::Io(err)
    }
}

impl From<serde_json::Error> for SetupError {
    fn from(err: serde_json::Error) -> Self {
        SetupError::Parse(err)
    }
}
