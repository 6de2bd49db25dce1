use super::AppState;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;

impl AppState {
    /// Submit or replace a player's bluff for the current question
    pub async fn submit_answer(
        &self,
        code: &str,
        author_id: &str,
        text: &str,
    ) -> GameResult<Answer> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::validation("Answer must not be empty"));
        }
        let length = text.chars().count();
        if length > self.config.max_answer_chars {
            return Err(GameError::validation(format!(
                "Answer is too long ({} > {} characters)",
                length, self.config.max_answer_chars
            )));
        }

        let room = self.require_room(code).await?;
        let gate = self.phase_gate(&room, "submit an answer").await?;
        let _shared = gate.read().await;

        let room = self.require_room(code).await?;
        if room.status != RoomStatus::Answering {
            return Err(GameError::StateConflict {
                action: "submit an answer",
                status: room.status,
            });
        }
        if !room.has_player(author_id) {
            return Err(GameError::validation(format!(
                "Player {} is not in room {}",
                author_id, code
            )));
        }

        let question = self
            .current_question(&room)
            .await?
            .ok_or_else(|| GameError::not_found("question", format!("round {}", room.current_round)))?;

        let answer = self
            .store
            .upsert_answer(&question.id, Some(author_id), text)
            .await?;

        tracing::info!(
            "Answer from {} for room {} round {}",
            author_id,
            code,
            room.current_round
        );

        let submitted = self.store.get_answers(&question.id).await?.len();
        self.broadcast_to_room(
            code,
            ServerMessage::AnswerSubmitted {
                player_id: author_id.to_string(),
                submitted,
                player_count: room.players.len(),
            },
        );

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::room_with_players;
    use super::*;

    async fn answering_room(state: &AppState) -> Room {
        let (room, _) = room_with_players(state, &["Alice", "Bob"]).await;
        state.start_round(&room.code).await.unwrap();
        state.require_room(&room.code).await.unwrap()
    }

    #[tokio::test]
    async fn test_submit_answer_trims_text() {
        let state = AppState::in_memory();
        let room = answering_room(&state).await;

        let answer = state
            .submit_answer(&room.code, "alice", "  Lyon  ")
            .await
            .unwrap();
        assert_eq!(answer.text, "Lyon");
        assert_eq!(answer.author_id.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_resubmission_keeps_one_answer() {
        let state = AppState::in_memory();
        let room = answering_room(&state).await;

        let first = state.submit_answer(&room.code, "alice", "Lyon").await.unwrap();
        let second = state.submit_answer(&room.code, "alice", "Nice").await.unwrap();
        assert_eq!(first.id, second.id);

        let question = state.current_question(&room).await.unwrap().unwrap();
        let answers = state.store.get_answers(&question.id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].text, "Nice");
    }

    #[tokio::test]
    async fn test_rejects_empty_and_long_answers() {
        let state = AppState::in_memory();
        let room = answering_room(&state).await;

        assert!(matches!(
            state.submit_answer(&room.code, "alice", "   ").await,
            Err(GameError::Validation(_))
        ));

        let long = "x".repeat(state.config.max_answer_chars + 1);
        assert!(matches!(
            state.submit_answer(&room.code, "alice", &long).await,
            Err(GameError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_non_member() {
        let state = AppState::in_memory();
        let room = answering_room(&state).await;

        assert!(matches!(
            state.submit_answer(&room.code, "mallory", "Lyon").await,
            Err(GameError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_outside_answering() {
        let state = AppState::in_memory();
        let (room, _) = room_with_players(&state, &["Alice", "Bob"]).await;

        assert!(matches!(
            state.submit_answer(&room.code, "alice", "Lyon").await,
            Err(GameError::StateConflict {
                status: RoomStatus::Lobby,
                ..
            })
        ));

        state.start_round(&room.code).await.unwrap();
        state.start_voting(&room.code).await.unwrap();
        assert!(matches!(
            state.submit_answer(&room.code, "alice", "Lyon").await,
            Err(GameError::StateConflict {
                status: RoomStatus::Voting,
                ..
            })
        ));
    }
}
