mod answer;
pub mod ballot;
pub mod guard;
pub mod ledger;
mod room;
pub mod scoring;
mod snapshot;
mod stats;
mod vote;

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::llm::QuestionSource;
use crate::protocol::ServerMessage;
use crate::store::Store;
use crate::types::*;
use ballot::BallotBook;
use guard::ScoringGuard;
use ledger::VoteLedger;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

pub use vote::CastVoteOutcome;

/// A message for every connection subscribed to one room
#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub room_code: RoomCode,
    pub message: ServerMessage,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub ledger: VoteLedger,
    pub ballots: BallotBook,
    pub scoring_guard: ScoringGuard,
    pub questions: Arc<QuestionSource>,
    pub config: Arc<GameConfig>,
    /// Per-room phase gate: submissions share it, transitions take it exclusively
    phase_gates: Arc<RwLock<HashMap<RoomId, Arc<RwLock<()>>>>>,
    /// Broadcast channel for room events (phase changes, results)
    pub broadcast: broadcast::Sender<RoomEvent>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, questions: QuestionSource, config: GameConfig) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            store,
            ledger: VoteLedger::new(),
            ballots: BallotBook::new(),
            scoring_guard: ScoringGuard::new(),
            questions: Arc::new(questions),
            config: Arc::new(config),
            phase_gates: Arc::new(RwLock::new(HashMap::new())),
            broadcast: tx,
        }
    }

    /// In-memory store, fallback questions and default config
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(crate::store::MemoryStore::new()),
            QuestionSource::fallback_only(),
            GameConfig::default(),
        )
    }

    /// Send a message to every connection in a room
    pub fn broadcast_to_room(&self, room_code: &str, message: ServerMessage) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.broadcast.send(RoomEvent {
            room_code: room_code.to_string(),
            message,
        });
    }

    /// The room's phase gate. ENDED rooms have none and never get one back.
    async fn phase_gate(&self, room: &Room, action: &'static str) -> GameResult<Arc<RwLock<()>>> {
        let ended = || GameError::StateConflict {
            action,
            status: RoomStatus::Ended,
        };
        if room.status == RoomStatus::Ended {
            return Err(ended());
        }
        if let Some(gate) = self.phase_gates.read().await.get(&room.id) {
            return Ok(gate.clone());
        }

        let mut gates = self.phase_gates.write().await;
        // end_room marks the room ENDED before it drops the gate
        if self.require_room(&room.code).await?.status == RoomStatus::Ended {
            return Err(ended());
        }
        Ok(gates.entry(room.id.clone()).or_default().clone())
    }

    async fn drop_phase_gate(&self, room_id: &str) {
        self.phase_gates.write().await.remove(room_id);
    }

    #[cfg(test)]
    pub(crate) async fn phase_gate_count(&self) -> usize {
        self.phase_gates.read().await.len()
    }

    /// Load a room or fail with NotFound
    pub async fn require_room(&self, code: &str) -> GameResult<Room> {
        self.store
            .get_room(code)
            .await?
            .ok_or_else(|| GameError::not_found("room", code))
    }

    /// The question of the room's current round, if one exists
    pub async fn current_question(&self, room: &Room) -> GameResult<Option<Question>> {
        if room.current_round == 0 {
            return Ok(None);
        }
        Ok(self
            .store
            .get_question(&room.id, room.current_round)
            .await?)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory()
    }
}
