//! Unified error type for soundforged.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for the CLI to derive a process exit code via [`Error::exit_code`].

/// Unified error type covering all failure modes in soundforged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// User input or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// A dispatched job failed its post-run checks.
    #[error("Job error [{job}]: {message}")]
    Job {
        /// Label of the job that failed.
        job: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) => 2,
            Error::Tool { .. } | Error::Probe(_) => 3,
            Error::Job { .. } => 4,
            Error::Io { .. } | Error::Internal(_) => 1,
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Job`].
    pub fn job(job: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Job {
            job: job.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
