use crate::store::StoreError;
use crate::types::{RoomStatus, RoundResults};

pub type GameResult<T> = Result<T, GameError>;

/// Errors surfaced to host and player clients
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Cannot {action} while room is {status:?}")]
    StateConflict {
        action: &'static str,
        status: RoomStatus,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    Persistence(StoreError),

    /// The round was scored but the batch could not be committed.
    /// `results` is the computed leaderboard, returned best-effort.
    #[error("Scoring failed after {attempts} attempts: {source}")]
    ScoringFailed {
        attempts: u32,
        source: StoreError,
        results: Box<RoundResults>,
    },
}

impl GameError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Stable code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::StateConflict { .. } => "STATE_CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
            Self::ScoringFailed { .. } => "SCORING_FAILED",
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::ScoringFailed { .. })
    }
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Persistence(other),
        }
    }
}
