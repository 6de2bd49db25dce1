use super::AppState;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;

/// What happened when a vote was cast
#[derive(Debug, Clone, PartialEq)]
pub struct CastVoteOutcome {
    /// The voter's previous target, if this was a revote
    pub replaced: Option<VoteTarget>,
    /// True when this vote was the last one outstanding
    pub voting_complete: bool,
    /// Round results when this vote closed the round
    pub results: Option<RoundResults>,
}

/// How the voter names what they vote for
enum Choice<'a> {
    Target(VoteTarget),
    /// Opaque option id from the published ballot
    BallotOption(&'a str),
}

impl AppState {
    /// Record a vote for the current question. The last outstanding vote
    /// moves the room to RESULTS.
    pub async fn cast_vote(
        &self,
        code: &str,
        voter_id: &str,
        target: VoteTarget,
    ) -> GameResult<CastVoteOutcome> {
        self.vote(code, voter_id, Choice::Target(target)).await
    }

    /// Vote by an option id of the current round's ballot
    pub async fn cast_ballot_vote(
        &self,
        code: &str,
        voter_id: &str,
        option_id: &str,
    ) -> GameResult<CastVoteOutcome> {
        self.vote(code, voter_id, Choice::BallotOption(option_id))
            .await
    }

    async fn vote(
        &self,
        code: &str,
        voter_id: &str,
        choice: Choice<'_>,
    ) -> GameResult<CastVoteOutcome> {
        let room = self.require_room(code).await?;
        let gate = self.phase_gate(&room, "cast a vote").await?;

        let (replaced, complete) = {
            let _shared = gate.read().await;

            let room = self.require_room(code).await?;
            if room.status != RoomStatus::Voting {
                return Err(GameError::StateConflict {
                    action: "cast a vote",
                    status: room.status,
                });
            }
            if !room.has_player(voter_id) {
                return Err(GameError::validation(format!(
                    "Player {} is not in room {}",
                    voter_id, code
                )));
            }

            let question = self
                .current_question(&room)
                .await?
                .ok_or_else(|| GameError::not_found("question", format!("round {}", room.current_round)))?;
            let target = match choice {
                Choice::Target(target) => target,
                Choice::BallotOption(option_id) => self
                    .ballots
                    .resolve(&room.id, &question.id, option_id)
                    .await
                    .ok_or_else(|| GameError::not_found("ballot option", option_id))?,
            };
            self.validate_target(&question, voter_id, &target).await?;

            let outcome = self
                .ledger
                .record_vote(&room.id, &question.id, voter_id, target)
                .await;

            tracing::info!("Vote from {} in room {}", voter_id, code);
            let votes = self.ledger.all_votes_for(&room.id, &question.id).await.len();
            self.broadcast_to_room(
                code,
                ServerMessage::VoteCast {
                    player_id: voter_id.to_string(),
                    votes,
                    player_count: room.players.len(),
                },
            );

            (outcome.replaced, outcome.complete)
        };

        let Some(complete) = complete else {
            return Ok(CastVoteOutcome {
                replaced,
                voting_complete: false,
                results: None,
            });
        };

        // Shared gate released above; show_results needs it exclusively
        tracing::info!(
            "All votes in for question {} of room {}",
            complete.question_id,
            code
        );
        let results = self.show_results(code).await?;

        Ok(CastVoteOutcome {
            replaced,
            voting_complete: true,
            results: Some(results),
        })
    }

    async fn validate_target(
        &self,
        question: &Question,
        voter_id: &str,
        target: &VoteTarget,
    ) -> GameResult<()> {
        match target {
            VoteTarget::Correct => Ok(()),
            VoteTarget::Decoy(index) => {
                if *index < question.alternatives.len() {
                    Ok(())
                } else {
                    Err(GameError::validation(format!("Unknown decoy {}", index)))
                }
            }
            VoteTarget::Answer(answer_id) => {
                let answers = self.store.get_answers(&question.id).await?;
                let answer = answers
                    .iter()
                    .find(|a| &a.id == answer_id)
                    .ok_or_else(|| GameError::not_found("answer", answer_id.clone()))?;
                if answer.author_id.as_deref() == Some(voter_id) {
                    return Err(GameError::validation("Cannot vote for your own answer"));
                }
                Ok(())
            }
        }
    }
}
