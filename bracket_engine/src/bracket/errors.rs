//! Bracket error types.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::db::timeouts::TimeoutError;

/// Input that cannot be applied to the bracket. Nothing is mutated when one
/// of these is returned, so the caller may correct the input and retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Tied scores and no manual pick
    #[error("Scores are tied {score1}-{score2}: pick a winner or correct the scores")]
    NoWinner { score1: u32, score2: u32 },

    /// The resolved winner is a placeholder rather than a team
    #[error("'{0}' cannot win a match: pick a winner or correct the scores")]
    SentinelWinner(String),

    /// Neither side of a bye match holds a real team
    #[error("No valid team to advance from this match")]
    NoValidTeam,

    /// Both sides of a bye match hold real teams and no pick was made
    #[error("Both sides hold a team: pick which one advances")]
    AmbiguousBye,

    /// Score does not fit the stored column
    #[error("Score {0} is out of range")]
    ScoreOutOfRange(u32),

    /// Entrant name collides with a slot placeholder
    #[error("Entrant name '{0}' is reserved")]
    ReservedName(String),

    /// Slot count is not a power of two of at least 2
    #[error("Invalid slot count {0}: must be a power of two and at least 2")]
    InvalidSlotCount(usize),
}

/// Write step of a multi-write operation.
///
/// Multi-write operations are not atomic. When a later step fails the
/// earlier ones stay applied; re-running the whole operation is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    /// Delete the previous match set
    ClearBracket,
    /// Insert the freshly generated match set
    InsertMatches,
    /// Persist score, winner and status on the edited match
    RecordResult,
    /// Write the winner into the parent slot
    AdvanceWinner,
    /// Return the edited match to scheduled
    ClearResult,
    /// Put `TBD` back into the parent slot
    RetractWinner,
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SagaStep::ClearBracket => "clear bracket",
            SagaStep::InsertMatches => "insert matches",
            SagaStep::RecordResult => "record result",
            SagaStep::AdvanceWinner => "advance winner",
            SagaStep::ClearResult => "clear result",
            SagaStep::RetractWinner => "retract winner",
        };
        f.write_str(name)
    }
}

/// Broad classification used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input, retryable after correction
    Validation,
    /// Storage failure, reported as a blocking notice
    Persistence,
    /// Bracket missing or malformed, fall back to setup
    DataIntegrity,
}

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Match not found: {0}")]
    MatchNotFound(String),

    #[error("No bracket has been generated")]
    EmptyBracket,

    #[error("Bracket is inconsistent: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Storage(String),

    /// A step failed after earlier steps of the same operation were written
    #[error("Step '{step}' failed after earlier writes were applied: {source}")]
    PartialWrite {
        step: SagaStep,
        source: Box<BracketError>,
    },
}

impl BracketError {
    /// Wrap a failure of `step` that happened after earlier writes succeeded
    pub fn partial(step: SagaStep, source: BracketError) -> Self {
        BracketError::PartialWrite {
            step,
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::Validation(_) => ErrorKind::Validation,
            BracketError::MatchNotFound(_)
            | BracketError::EmptyBracket
            | BracketError::Integrity(_) => ErrorKind::DataIntegrity,
            BracketError::Database(_)
            | BracketError::Timeout(_)
            | BracketError::Storage(_)
            | BracketError::PartialWrite { .. } => ErrorKind::Persistence,
        }
    }

    /// Get a client-safe error message
    ///
    /// Storage details (SQL errors, connection strings) are not exposed.
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) | BracketError::Storage(_) => {
                "Storage is unavailable, please retry".to_string()
            }
            BracketError::PartialWrite { step, .. } => {
                format!("Saving stopped at step '{step}'; repeat the action to finish it")
            }
            _ => self.to_string(),
        }
    }
}

impl From<TimeoutError> for BracketError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => BracketError::Timeout(duration),
            TimeoutError::Database(e) => BracketError::Database(e),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
