// Error taxonomy for the provisioning pipeline

use crate::models::Flag;
use thiserror::Error;

/// Errors raised by the pipeline itself.
///
/// Everything else travels as `anyhow::Error`; `main` downcasts to this type
/// to pick an exit code.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("this installer must be run as root (try: sudo hostprep)")]
    Privilege,

    #[error("command `{command}` failed with {}", describe_code(.code))]
    ExternalCommand { command: String, code: Option<i32> },

    #[error("failed to launch `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{command}` produced no usable output")]
    MissingOutput { command: String },

    #[error("invalid storage target '{name}': {reason}")]
    InvalidStorageTarget { name: String, reason: String },

    #[error("{0} was already recorded")]
    FlagAlreadySet(Flag),

    #[error("{0} was read before any stage recorded it")]
    FlagUnset(Flag),

    #[error("stage '{stage}' reads {flag} but no earlier stage produces it")]
    FlagOrder { stage: String, flag: Flag },

    #[error("{flag} is produced by both '{first}' and '{second}'")]
    DuplicateProducer {
        flag: Flag,
        first: String,
        second: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

impl ProvisionError {
    /// Process exit code for this error.
    /// Command failures propagate the tool's own status.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProvisionError::Privilege
            | ProvisionError::Config(_)
            | ProvisionError::InvalidStorageTarget { .. } => 1,
            ProvisionError::ExternalCommand { code, .. } => match code {
                Some(code) if *code != 0 => *code,
                _ => 1,
            },
            // Shell convention for a command that could not be run
            ProvisionError::Spawn { .. } => 127,
            _ => 2,
        }
    }
}
