//! CLI error handling

use std::fmt;

use libstage_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(libstage_errors::ConfigError),
    /// Staging or verification error
    Stage(libstage_errors::Error),
    /// Invalid command arguments
    InvalidArguments(String),
    /// Staged tree no longer matches its manifest
    Drift { paths: usize },
    /// I/O error
    Io(std::io::Error),
}

fn write_user_facing(f: &mut fmt::Formatter<'_>, e: &dyn UserFacingError) -> fmt::Result {
    write!(f, "{}", e.user_message())?;
    if let Some(code) = e.user_code() {
        write!(f, "\n  Code: {code}")?;
    }
    if let Some(hint) = e.user_hint() {
        write!(f, "\n  Hint: {hint}")?;
    }
    if e.is_retryable() {
        write!(f, "\n  Retry: safe to retry this operation.")?;
    }
    Ok(())
}

impl CliError {
    /// Stable code for JSON output
    pub fn code(&self) -> Option<&'static str> {
        match self {
            CliError::Config(e) => e.user_code(),
            CliError::Stage(e) => e.user_code(),
            CliError::InvalidArguments(_) => Some("cli.invalid_arguments"),
            CliError::Drift { .. } => Some("verify.drift"),
            CliError::Io(_) => Some("cli.io"),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => {
                write!(f, "Configuration error: ")?;
                write_user_facing(f, e)
            }
            CliError::Stage(e) => write_user_facing(f, e),
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Drift { paths } => {
                write!(f, "{paths} staged path(s) differ from metadata.txt")?;
                write!(f, "\n  Hint: Rerun `libstage stage` for this module.")
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Stage(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<libstage_errors::ConfigError> for CliError {
    fn from(e: libstage_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<libstage_errors::Error> for CliError {
    fn from(e: libstage_errors::Error) -> Self {
        match e {
            libstage_errors::Error::Config(config) => CliError::Config(config),
            other => CliError::Stage(other),
        }
    }
}

impl From<libstage_errors::StagingError> for CliError {
    fn from(e: libstage_errors::StagingError) -> Self {
        CliError::Stage(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
