use std::time::Duration;
use thiserror::Error;

/// ssh and scp exit with 255 when the connection itself failed.
pub const SSH_CONNECTION_FAILURE: i32 = 255;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command on {host} failed with {}: {command}{}", describe_status(.status), stderr_suffix(.stderr))]
    CommandFailed {
        host: String,
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Command on {host} timed out after {limit:?}: {command}")]
    Timeout {
        host: String,
        command: String,
        limit: Duration,
    },

    #[error("Failed to stream data to {host}: {source}")]
    Stream {
        host: String,
        #[source]
        source: std::io::Error,
    },
}

impl RemoteError {
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            RemoteError::CommandFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Connection-level failures that may succeed on a second attempt.
    pub fn is_transient(&self) -> bool {
        self.exit_status() == Some(SSH_CONNECTION_FAILURE)
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "no exit status".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" ({trimmed})")
    }
}
