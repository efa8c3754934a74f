//! Fatal errors that decide the process exit code.
//!
//! Everything else travels as a plain [`anyhow::Error`] and exits with
//! [`EXIT_FAILURE`].

use thiserror::Error;

/// Exit code for a missing required tool and for any untyped failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum Fatal {
    /// A tool needed by the requested stage was not found on this host.
    #[error(
        "the {tool} utility is required but missing!\n\
         To install this utility on your system check the tool's documentation."
    )]
    MissingTool { tool: String },

    /// An external command ran and reported failure.
    #[error("{program} failed with exit code {code}")]
    CommandFailed { program: String, code: i32 },

    /// An external command was terminated without an exit code.
    #[error("{program} was terminated by a signal")]
    CommandKilled { program: String },
}

impl Fatal {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed { code, .. } => *code,
            Self::MissingTool { .. } | Self::CommandKilled { .. } => EXIT_FAILURE,
        }
    }
}

/// Pick the exit code for an error chain: the first [`Fatal`] in the chain
/// wins, anything else is [`EXIT_FAILURE`].
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Fatal>())
        .map_or(EXIT_FAILURE, Fatal::exit_code)
}
