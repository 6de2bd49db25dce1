use super::{Store, StoreError, StoreResult};
use crate::types::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process store backed by locked tables
#[derive(Clone, Default)]
pub struct MemoryStore {
    rooms: Arc<RwLock<HashMap<RoomCode, Room>>>,
    players: Arc<RwLock<HashMap<PlayerId, Player>>>,
    questions: Arc<RwLock<HashMap<QuestionId, Question>>>,
    answers: Arc<RwLock<Vec<Answer>>>,
    score_events: Arc<RwLock<Vec<ScoreEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_room(&self, room: Room) -> StoreResult<Room> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.code) {
            return Err(StoreError::Conflict(format!(
                "room code {} is taken",
                room.code
            )));
        }
        rooms.insert(room.code.clone(), room.clone());
        Ok(room)
    }

    async fn get_room(&self, code: &str) -> StoreResult<Option<Room>> {
        Ok(self.rooms.read().await.get(code).cloned())
    }

    async fn update_room_status(&self, code: &str, status: RoomStatus) -> StoreResult<()> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::not_found("room", code))?;
        room.status = status;
        Ok(())
    }

    async fn increment_round(&self, code: &str) -> StoreResult<u32> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::not_found("room", code))?;
        room.current_round += 1;
        Ok(room.current_round)
    }

    async fn add_player_to_room(&self, code: &str, player_id: &str) -> StoreResult<bool> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::not_found("room", code))?;
        if room.has_player(player_id) {
            return Ok(false);
        }
        room.players.push(player_id.to_string());
        Ok(true)
    }

    async fn upsert_player(&self, id: &str, name: &str) -> StoreResult<Player> {
        let mut players = self.players.write().await;
        let player = players.entry(id.to_string()).or_insert_with(|| Player {
            id: id.to_string(),
            name: name.to_string(),
            total_score: 0,
        });
        Ok(player.clone())
    }

    async fn get_players(&self, ids: &[PlayerId]) -> StoreResult<Vec<Player>> {
        let players = self.players.read().await;
        Ok(ids.iter().filter_map(|id| players.get(id).cloned()).collect())
    }

    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let mut questions = self.questions.write().await;
        if questions
            .values()
            .any(|q| q.room_id == question.room_id && q.round_number == question.round_number)
        {
            return Err(StoreError::Conflict(format!(
                "room {} already has a question for round {}",
                question.room_id, question.round_number
            )));
        }

        let question = Question {
            id: ulid::Ulid::new().to_string(),
            room_id: question.room_id,
            round_number: question.round_number,
            text: question.text,
            correct_answer: question.correct_answer,
            alternatives: question.alternatives,
            alternate_spellings: question.alternate_spellings,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        questions.insert(question.id.clone(), question.clone());
        Ok(question)
    }

    async fn get_question(
        &self,
        room_id: &str,
        round_number: u32,
    ) -> StoreResult<Option<Question>> {
        Ok(self
            .questions
            .read()
            .await
            .values()
            .find(|q| q.room_id == room_id && q.round_number == round_number)
            .cloned())
    }

    async fn begin_round(
        &self,
        code: &str,
        question: NewQuestion,
    ) -> StoreResult<(Room, Question)> {
        // Lock order: rooms, then questions
        let mut rooms = self.rooms.write().await;
        let mut questions = self.questions.write().await;

        let room = rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::not_found("room", code))?;
        if room.id != question.room_id || question.round_number != room.current_round + 1 {
            return Err(StoreError::Conflict(format!(
                "room {} is at round {}, cannot begin round {}",
                code, room.current_round, question.round_number
            )));
        }

        let existing = questions
            .values()
            .find(|q| q.room_id == question.room_id && q.round_number == question.round_number)
            .cloned();
        let question = match existing {
            Some(existing) => existing,
            None => {
                let created = Question {
                    id: ulid::Ulid::new().to_string(),
                    room_id: question.room_id,
                    round_number: question.round_number,
                    text: question.text,
                    correct_answer: question.correct_answer,
                    alternatives: question.alternatives,
                    alternate_spellings: question.alternate_spellings,
                    created_at: chrono::Utc::now().to_rfc3339(),
                };
                questions.insert(created.id.clone(), created.clone());
                created
            }
        };

        room.current_round = question.round_number;
        room.status = RoomStatus::Answering;
        Ok((room.clone(), question))
    }

    async fn upsert_answer(
        &self,
        question_id: &str,
        author_id: Option<&str>,
        text: &str,
    ) -> StoreResult<Answer> {
        if !self.questions.read().await.contains_key(question_id) {
            return Err(StoreError::not_found("question", question_id));
        }

        let mut answers = self.answers.write().await;
        if let Some(author) = author_id {
            if let Some(existing) = answers
                .iter_mut()
                .find(|a| a.question_id == question_id && a.author_id.as_deref() == Some(author))
            {
                existing.text = text.to_string();
                return Ok(existing.clone());
            }
        }

        let answer = Answer {
            id: ulid::Ulid::new().to_string(),
            question_id: question_id.to_string(),
            author_id: author_id.map(str::to_string),
            text: text.to_string(),
            vote_count: 0,
        };
        answers.push(answer.clone());
        Ok(answer)
    }

    async fn get_answers(&self, question_id: &str) -> StoreResult<Vec<Answer>> {
        Ok(self
            .answers
            .read()
            .await
            .iter()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn record_round_scores(
        &self,
        events: &[ScoreEvent],
        deltas: &[(PlayerId, u32)],
    ) -> StoreResult<()> {
        // Lock order: players, then score_events
        let mut players = self.players.write().await;
        let mut score_events = self.score_events.write().await;

        // Validate the whole batch before touching anything
        if let Some((missing, _)) = deltas.iter().find(|(id, _)| !players.contains_key(id)) {
            return Err(StoreError::not_found("player", missing.clone()));
        }
        if let Some(dup) = events
            .iter()
            .find(|e| score_events.iter().any(|existing| existing.id == e.id))
        {
            return Err(StoreError::Conflict(format!(
                "score event {} already recorded",
                dup.id
            )));
        }

        for (id, delta) in deltas {
            if let Some(player) = players.get_mut(id) {
                player.total_score = player.total_score.saturating_add(u64::from(*delta));
            }
        }
        score_events.extend(events.iter().cloned());
        Ok(())
    }

    async fn get_score_events(&self, room_id: &str) -> StoreResult<Vec<ScoreEvent>> {
        Ok(self
            .score_events
            .read()
            .await
            .iter()
            .filter(|e| e.room_id == room_id)
            .cloned()
            .collect())
    }
}
