//! Durable store collaborator.
//!
//! The game core only talks to storage through [`Store`]. [`MemoryStore`]
//! keeps everything in process and is what the server binary runs with.

mod memory;

use crate::types::*;
use async_trait::async_trait;

pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new room; fails with `Conflict` if the code is taken
    async fn create_room(&self, room: Room) -> StoreResult<Room>;

    async fn get_room(&self, code: &str) -> StoreResult<Option<Room>>;

    async fn update_room_status(&self, code: &str, status: RoomStatus) -> StoreResult<()>;

    /// Returns the new round number
    async fn increment_round(&self, code: &str) -> StoreResult<u32>;

    /// Returns false when the player was already a member
    async fn add_player_to_room(&self, code: &str, player_id: &str) -> StoreResult<bool>;

    /// Create the player, or return the existing one unchanged
    async fn upsert_player(&self, id: &str, name: &str) -> StoreResult<Player>;

    /// Players in the order of `ids`; unknown ids are skipped
    async fn get_players(&self, ids: &[PlayerId]) -> StoreResult<Vec<Player>>;

    /// Fails with `Conflict` if the room already has a question for that round
    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question>;

    async fn get_question(&self, room_id: &str, round_number: u32)
        -> StoreResult<Option<Question>>;

    /// Open the room's next round as one atomic write: store the question
    /// (keeping one that already exists for that round), advance
    /// `current_round` to `question.round_number`, and set ANSWERING.
    /// Fails with `Conflict` unless `question.round_number` is exactly
    /// `current_round + 1`.
    async fn begin_round(&self, code: &str, question: NewQuestion)
        -> StoreResult<(Room, Question)>;

    /// Update the text of the author's existing answer, or create one.
    /// Authorless answers always create a new record.
    async fn upsert_answer(
        &self,
        question_id: &str,
        author_id: Option<&str>,
        text: &str,
    ) -> StoreResult<Answer>;

    /// Answers in creation order
    async fn get_answers(&self, question_id: &str) -> StoreResult<Vec<Answer>>;

    /// Append the score events and apply the cumulative deltas as one atomic batch
    async fn record_round_scores(
        &self,
        events: &[ScoreEvent],
        deltas: &[(PlayerId, u32)],
    ) -> StoreResult<()>;

    /// All score events for a room in insertion order
    async fn get_score_events(&self, room_id: &str) -> StoreResult<Vec<ScoreEvent>>;
}
