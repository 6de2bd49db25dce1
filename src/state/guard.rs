use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Holds the committed results of one round once scoring succeeded
pub type ScoringSlot = Arc<Mutex<Option<RoundResults>>>;

/// Serializes scoring per (room, round).
///
/// Whoever holds a slot's lock is the only one allowed to score that round.
/// A slot that still holds `None` after the lock is released means the last
/// attempt failed and the round may be scored again.
#[derive(Clone, Default)]
pub struct ScoringGuard {
    slots: Arc<RwLock<HashMap<(RoomId, u32), ScoringSlot>>>,
}

impl ScoringGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn slot(&self, room_id: &str, round_number: u32) -> ScoringSlot {
        let key = (room_id.to_string(), round_number);
        if let Some(slot) = self.slots.read().await.get(&key) {
            return slot.clone();
        }
        self.slots.write().await.entry(key).or_default().clone()
    }

    /// Committed results for a round, if it was scored
    pub async fn results(&self, room_id: &str, round_number: u32) -> Option<RoundResults> {
        let slot = self
            .slots
            .read()
            .await
            .get(&(room_id.to_string(), round_number))
            .cloned()?;
        let results = slot.lock().await;
        results.clone()
    }

    pub async fn clear_room(&self, room_id: &str) {
        self.slots.write().await.retain(|(room, _), _| room != room_id);
    }
}
