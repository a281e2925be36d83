use thiserror::Error;

/// Errors that can abort an incident session.
///
/// Only start-up configuration problems are fatal. Everything the agent can
/// hit at runtime (unknown channel, out-of-range cursor, exhausted scan) is
/// surfaced as an ordinary result value so the session can continue.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(String),

    // Field is not named `source`: thiserror reserves that name for the
    // error-source accessor.
    #[error(
        "Source '{source_name}' assigns {assigned} signal positions but the evidence \
         corpus supplies only {supplied} entries"
    )]
    SignalCountMismatch {
        source_name: String,
        assigned: usize,
        supplied: usize,
    },

    #[error("Source '{source_name}' pins signal position {position} outside corpus size {total}")]
    SignalPositionOutOfRange {
        source_name: String,
        position: usize,
        total: usize,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
