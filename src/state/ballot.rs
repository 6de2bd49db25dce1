//! Published ballots.
//!
//! Players vote by opaque option id. The mapping from option id to
//! [`VoteTarget`] never leaves the server, so a ballot does not tell a
//! player which option is the real answer.

use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct BallotBook {
    ballots: Arc<RwLock<HashMap<(RoomId, QuestionId), Vec<BallotOption>>>>,
}

impl BallotBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the ballot for a question, replacing any earlier one
    pub async fn publish(
        &self,
        room_id: &str,
        question_id: &str,
        options: Vec<BallotOption>,
    ) -> Vec<BallotOption> {
        self.ballots
            .write()
            .await
            .insert((room_id.to_string(), question_id.to_string()), options.clone());
        options
    }

    pub async fn options(&self, room_id: &str, question_id: &str) -> Vec<BallotOption> {
        self.ballots
            .read()
            .await
            .get(&(room_id.to_string(), question_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// The target behind an option id of this question's ballot
    pub async fn resolve(
        &self,
        room_id: &str,
        question_id: &str,
        option_id: &str,
    ) -> Option<VoteTarget> {
        self.ballots
            .read()
            .await
            .get(&(room_id.to_string(), question_id.to_string()))?
            .iter()
            .find(|o| o.option_id == option_id)
            .map(|o| o.target.clone())
    }

    pub async fn clear_room(&self, room_id: &str) {
        self.ballots
            .write()
            .await
            .retain(|(room, _), _| room != room_id);
    }
}
