use super::AppState;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::store::StoreError;
use crate::types::*;
use rand::Rng;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;
const MAX_CODE_ATTEMPTS: usize = 16;

/// Generate a random short code (5 characters)
fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Check if a status transition is valid
pub fn is_valid_transition(from: RoomStatus, to: RoomStatus) -> bool {
    use RoomStatus::*;

    match (from, to) {
        (Lobby, Answering) => true,
        (Answering, Voting) => true,
        (Voting, Results) => true,
        // Next round
        (Results, Answering) => true,

        // Any live room can be ended
        (Ended, _) => false,
        (_, Ended) => true,

        _ => false,
    }
}

/// Statuses reachable from `from`
pub fn valid_transitions(from: RoomStatus) -> Vec<RoomStatus> {
    use RoomStatus::*;
    [Lobby, Answering, Voting, Results, Ended]
        .into_iter()
        .filter(|to| is_valid_transition(from, *to))
        .collect()
}

pub(super) fn ensure_transition(
    room: &Room,
    to: RoomStatus,
    action: &'static str,
) -> GameResult<()> {
    if is_valid_transition(room.status, to) {
        Ok(())
    } else {
        Err(GameError::StateConflict {
            action,
            status: room.status,
        })
    }
}

impl AppState {
    /// Create a room hosted by `host_id` with a fresh join code
    pub async fn create_room(
        &self,
        host_id: &str,
        host_name: &str,
        categories: Vec<String>,
    ) -> GameResult<Room> {
        if host_id.trim().is_empty() {
            return Err(GameError::validation("Host id is required"));
        }
        self.store.upsert_player(host_id, host_name).await?;

        let categories: Vec<String> = categories
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        for _ in 0..MAX_CODE_ATTEMPTS {
            let room = Room {
                id: ulid::Ulid::new().to_string(),
                code: generate_room_code(),
                status: RoomStatus::Lobby,
                current_round: 0,
                categories: categories.clone(),
                host_id: host_id.to_string(),
                players: Vec::new(),
                created_at: chrono::Utc::now().to_rfc3339(),
            };

            match self.store.create_room(room).await {
                Ok(room) => {
                    tracing::info!(
                        "Created room {} for host {} with categories {:?}",
                        room.code,
                        host_id,
                        room.categories
                    );
                    return Ok(room);
                }
                // Collision - try again
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(GameError::Persistence(StoreError::Conflict(
            "could not allocate a free room code".to_string(),
        )))
    }

    /// Join a room, creating the player on first sight. Joining twice is a no-op.
    pub async fn join_room(
        &self,
        code: &str,
        player_id: &str,
        name: &str,
    ) -> GameResult<(Room, Player)> {
        let player_id = player_id.trim();
        let name = name.trim();
        if player_id.is_empty() {
            return Err(GameError::validation("Player id is required"));
        }
        if name.is_empty() {
            return Err(GameError::validation("Player name is required"));
        }

        let room = self.require_room(code).await?;
        if room.status == RoomStatus::Ended {
            return Err(GameError::StateConflict {
                action: "join",
                status: room.status,
            });
        }

        let player = self.store.upsert_player(player_id, name).await?;
        let added = self.store.add_player_to_room(code, player_id).await?;
        let room = self.require_room(code).await?;

        if added {
            tracing::info!("Player {} ({}) joined room {}", name, player_id, code);
            self.broadcast_to_room(
                code,
                ServerMessage::PlayerJoined {
                    player: player.clone(),
                    player_count: room.players.len(),
                },
            );
        } else {
            tracing::debug!("Player {} is already in room {}", player_id, code);
        }

        Ok((room, player))
    }

    /// LOBBY → ANSWERING (first round) or RESULTS → ANSWERING (next round)
    pub async fn start_round(&self, code: &str) -> GameResult<Question> {
        let room = self.require_room(code).await?;
        self.ensure_round_can_start(&room)?;

        // Providers may take seconds; generate before taking the gate
        let generated = self.questions.next_question(&room.categories).await;

        let gate = self.phase_gate(&room, "start a round").await?;
        let _exclusive = gate.write().await;

        // Re-read under the gate so concurrent starts see each other
        let room = self.require_room(code).await?;
        self.ensure_round_can_start(&room)?;

        let round_number = room.current_round + 1;
        let (_, question) = self
            .store
            .begin_round(
                code,
                NewQuestion {
                    room_id: room.id.clone(),
                    round_number,
                    text: generated.question,
                    correct_answer: generated.answer,
                    alternatives: generated.alternatives,
                    alternate_spellings: generated.alternate_spellings,
                },
            )
            .await?;

        tracing::info!(
            "Room {} started round {}: {:?}",
            code,
            round_number,
            question.text
        );

        self.broadcast_to_room(
            code,
            ServerMessage::RoundStarted {
                round_number,
                question: question.text.clone(),
            },
        );
        self.broadcast_phase(code, RoomStatus::Answering, round_number);

        Ok(question)
    }

    fn ensure_round_can_start(&self, room: &Room) -> GameResult<()> {
        ensure_transition(room, RoomStatus::Answering, "start a round")?;
        if room.players.len() < self.config.min_players {
            return Err(GameError::validation(format!(
                "Need at least {} players to start",
                self.config.min_players
            )));
        }
        Ok(())
    }

    /// ANSWERING → VOTING. Returns the ballot with its targets.
    pub async fn start_voting(&self, code: &str) -> GameResult<Vec<BallotOption>> {
        let room = self.require_room(code).await?;
        let gate = self.phase_gate(&room, "start voting").await?;
        let _exclusive = gate.write().await;

        let room = self.require_room(code).await?;
        ensure_transition(&room, RoomStatus::Voting, "start voting")?;

        let question = self
            .current_question(&room)
            .await?
            .ok_or_else(|| GameError::not_found("question", format!("round {}", room.current_round)))?;

        let answers = self.store.get_answers(&question.id).await?;
        let ballot = self
            .ballots
            .publish(
                &room.id,
                &question.id,
                super::snapshot::build_ballot(&question, &answers),
            )
            .await;

        self.ledger
            .open_question(&room.id, &question.id, room.players.iter().cloned())
            .await;
        self.store
            .update_room_status(code, RoomStatus::Voting)
            .await?;

        tracing::info!(
            "Room {} voting on round {} with {} answers",
            code,
            room.current_round,
            answers.len()
        );

        self.broadcast_to_room(
            code,
            ServerMessage::VotingStarted {
                ballot: ballot.iter().map(BallotOption::entry).collect(),
            },
        );
        self.broadcast_phase(code, RoomStatus::Voting, room.current_round);

        Ok(ballot)
    }

    /// VOTING → RESULTS, scoring the round exactly once.
    /// Calling it again for an already scored round returns the same results.
    pub async fn show_results(&self, code: &str) -> GameResult<RoundResults> {
        let room = self.require_room(code).await?;
        let gate = self.phase_gate(&room, "show results").await?;
        let _exclusive = gate.write().await;

        let room = self.require_room(code).await?;
        match room.status {
            RoomStatus::Voting => {}
            RoomStatus::Results => {
                if let Some(results) = self
                    .scoring_guard
                    .results(&room.id, room.current_round)
                    .await
                {
                    return Ok(results);
                }
                // Scored before a restart: rebuild from the score ledger
                let board = self.get_leaderboard(code).await?;
                let question = self.current_question(&room).await?;
                return Ok(RoundResults {
                    room_id: room.id.clone(),
                    round_number: room.current_round,
                    question_id: question.as_ref().map(|q| q.id.clone()).unwrap_or_default(),
                    correct_answer: question.map(|q| q.correct_answer).unwrap_or_default(),
                    entries: board.entries,
                    most_fooled_answer: None,
                });
            }
            status => {
                return Err(GameError::StateConflict {
                    action: "show results",
                    status,
                })
            }
        }

        let results = self.score_current_round(&room).await?;

        self.store
            .update_room_status(code, RoomStatus::Results)
            .await?;

        tracing::info!(
            "Room {} round {} results: {} awards",
            code,
            room.current_round,
            results.events().count()
        );

        self.broadcast_to_room(
            code,
            ServerMessage::Results {
                results: results.clone(),
            },
        );
        self.broadcast_phase(code, RoomStatus::Results, room.current_round);

        Ok(results)
    }

    /// Commit the current round's score once; later callers get the cached results
    async fn score_current_round(&self, room: &Room) -> GameResult<RoundResults> {
        let slot = self
            .scoring_guard
            .slot(&room.id, room.current_round)
            .await;
        let mut committed = slot.lock().await;
        if let Some(results) = committed.as_ref() {
            tracing::debug!(
                "Round {} of room {} already scored",
                room.current_round,
                room.code
            );
            return Ok(results.clone());
        }

        let question = self
            .current_question(room)
            .await?
            .ok_or_else(|| GameError::not_found("question", format!("round {}", room.current_round)))?;
        let answers = self.store.get_answers(&question.id).await?;
        let votes = self.ledger.all_votes_for(&room.id, &question.id).await;
        let players = self.store.get_players(&room.players).await?;

        let score = super::scoring::score_round(
            &self.config.scoring,
            &super::scoring::ScoringInput {
                room_id: &room.id,
                question: &question,
                answers: &answers,
                votes: &votes,
                players: &players,
            },
        );

        let attempts = self.config.score_commit_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self
                .store
                .record_round_scores(&score.events, &score.deltas)
                .await
            {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        "Score commit attempt {}/{} for room {} failed: {}",
                        attempt,
                        attempts,
                        room.code,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        if let Some(source) = last_error {
            tracing::error!(
                "Giving up on scoring round {} of room {}: {}",
                room.current_round,
                room.code,
                source
            );
            return Err(GameError::ScoringFailed {
                attempts,
                source,
                results: Box::new(score.results),
            });
        }

        *committed = Some(score.results.clone());
        Ok(score.results)
    }

    /// Any live status → ENDED, dropping the room's in-process state
    pub async fn end_room(&self, code: &str) -> GameResult<()> {
        let room = self.require_room(code).await?;
        {
            let gate = self.phase_gate(&room, "end the room").await?;
            let _exclusive = gate.write().await;

            let room = self.require_room(code).await?;
            ensure_transition(&room, RoomStatus::Ended, "end the room")?;
            self.store
                .update_room_status(code, RoomStatus::Ended)
                .await?;
        }

        self.ledger.clear_room(&room.id).await;
        self.ballots.clear_room(&room.id).await;
        self.scoring_guard.clear_room(&room.id).await;
        self.drop_phase_gate(&room.id).await;

        tracing::info!("Room {} ended", code);
        self.broadcast_phase(code, RoomStatus::Ended, room.current_round);
        Ok(())
    }

    fn broadcast_phase(&self, code: &str, status: RoomStatus, round_number: u32) {
        self.broadcast_to_room(
            code,
            ServerMessage::Phase {
                status,
                round_number,
                server_now: chrono::Utc::now().to_rfc3339(),
                valid_transitions: valid_transitions(status),
            },
        );
    }
}
