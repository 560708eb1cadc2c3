//! Error types for container serving

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while serving a container.
#[derive(Error, Debug)]
pub enum Error {
    /// The runtime executable could not be invoked at all
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// The command line that was attempted
        command: String,
        /// Why the spawn failed
        #[source]
        source: std::io::Error,
    },

    /// The runtime ran but printed no container id
    #[error("`{command}` did not report a container id ({detail})")]
    Launch {
        /// The `run` command line
        command: String,
        /// Runtime stderr, or the exit status when stderr was empty
        detail: String,
    },

    /// Could not attach to the container's output streams
    #[error("failed to attach to container {container_id}: {reason}")]
    Attach {
        /// The container that could not be attached
        container_id: String,
        /// Why the attach failed
        reason: String,
    },

    /// Cleanup kill failed. Only ever logged.
    #[error("failed to kill container {container_id}: {reason}")]
    Kill {
        /// The container the kill was aimed at
        container_id: String,
        /// Why the kill failed
        reason: String,
    },

    /// Preflight check could not reach the runtime daemon
    #[error("{runtime} is not available: {detail}")]
    RuntimeUnavailable {
        /// The runtime binary that was probed
        runtime: String,
        /// What the probe reported
        detail: String,
    },

    /// Interrupt handlers could not be registered
    #[error("failed to install interrupt handler: {reason}")]
    SignalHandler {
        /// The underlying reason
        reason: String,
    },

    /// An explicitly given project root does not exist
    #[error("project root {} is not a directory", path.display())]
    ProjectRoot {
        /// The rejected path
        path: PathBuf,
    },

    /// A config file exists but cannot be parsed
    #[error("invalid config file {}: {source}", path.display())]
    Config {
        /// The offending file
        path: PathBuf,
        /// The parse error
        #[source]
        source: serde_yaml::Error,
    },

    /// A config file parses but holds a value that cannot be used
    #[error("invalid config file {}: {reason}", path.display())]
    InvalidConfig {
        /// The offending file
        path: PathBuf,
        /// Which setting is wrong
        reason: String,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a launch failure from the runtime's stderr and exit code.
    pub fn launch(command: impl Into<String>, stderr: &str, exit_code: Option<i32>) -> Self {
        let stderr = stderr.trim();
        let detail = if !stderr.is_empty() {
            stderr.to_string()
        } else {
            match exit_code {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            }
        };
        Self::Launch {
            command: command.into(),
            detail,
        }
    }

    /// Build an attach failure.
    pub fn attach(container_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Attach {
            container_id: container_id.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
