use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type HalResult<T> = Result<T, HalError>;
pub type SpoofResult<T> = Result<T, SpoofError>;

#[derive(Error, Debug)]
pub enum HalError {
    #[error("Privileged shell unavailable ({program}): {reason}")]
    SessionUnavailable { program: String, reason: String },

    #[error("Failed to write command to shell: {0}")]
    CommandWriteFailure(#[source] io::Error),

    #[error("Failed to read shell output: {0}")]
    CommandReadFailure(String),

    #[error("Command timed out: {program} after {timeout_secs}s")]
    CommandTimeout { program: String, timeout_secs: u64 },

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("nix errno: {0}")]
    Nix(#[from] nix::errno::Errno),

    #[error("UTF-8 decode error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum SpoofError {
    #[error(transparent)]
    Hal(#[from] HalError),

    #[error("No address-holding file found on this device")]
    TargetNotFound,

    #[error("Precondition unmet: {0}")]
    PreconditionUnmet(String),

    #[error("No backup found at {}; refusing to restore", .0.display())]
    BackupMissing(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing --yes-i-know flag. Experimental operations may corrupt device configuration!")]
    MissingRiskAcknowledgement,

    #[error("Missing required typed confirmation for experimental operations.")]
    MissingExperimentalConfirmation,

    #[error("Configuration error: {0}")]
    Config(String),
}
