//! CLI-specific error types and mappings.
//!
//! Library errors are folded into `CliError` so `main` can pick an exit code.

use surfmgr_core::{ProfileError, SettingsError};
use surfmgr_runtime::SessionError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Anything without a more specific category.
    #[error("{0}")]
    Core(String),

    /// Argument validation error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error (settings file, profiles, directories).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A process could not be stopped.
    #[error("Process error: {0}")]
    Process(String),

    /// A backup, restore or reset finished unsuccessfully.
    #[error("{0}")]
    Transfer(String),

    /// The user interrupted the operation.
    #[error("Cancelled")]
    Cancelled,
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    /// - 130: Terminated by Ctrl-C
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Core(_) | Self::Transfer(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Process(_) => 71,  // EX_OSERR
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Cancelled => 130,
        }
    }
}

impl From<ProfileError> for CliError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(_) => Self::Arguments(err.to_string()),
            ProfileError::Read { .. } | ProfileError::Parse { .. } | ProfileError::MissingName(_) => {
                Self::Config(err.to_string())
            }
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Io { .. } => Self::Io(err.to_string()),
            SessionError::NotFound(_)
            | SessionError::AlreadyExists(_)
            | SessionError::InvalidName { .. } => Self::Arguments(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn exit_codes_follow_sysexits() {
        assert_eq!(CliError::Arguments("x".into()).exit_code(), 2);
        assert_eq!(CliError::Process("x".into()).exit_code(), 71);
        assert_eq!(CliError::Io("x".into()).exit_code(), 74);
        assert_eq!(CliError::Config("x".into()).exit_code(), 78);
        assert_eq!(CliError::Transfer("x".into()).exit_code(), 1);
        assert_eq!(CliError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn unknown_profile_is_an_argument_error() {
        let err: CliError = ProfileError::NotFound("ghost".into()).into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn broken_profile_is_a_config_error() {
        let err: CliError = ProfileError::MissingName(PathBuf::from("a.json")).into();
        assert_eq!(err.exit_code(), 78);
    }
}
