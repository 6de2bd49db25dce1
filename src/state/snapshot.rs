use super::AppState;
use crate::error::GameResult;
use crate::types::*;

/// Voting options: the real answer, the decoys, and every submitted answer
/// that does not already match the truth. Sorted by text so the real answer
/// does not stand out by position, and each one gets a fresh opaque id.
pub(super) fn build_ballot(question: &Question, answers: &[Answer]) -> Vec<BallotOption> {
    let mut ballot = vec![(VoteTarget::Correct, question.correct_answer.clone())];

    ballot.extend(
        question
            .alternatives
            .iter()
            .enumerate()
            .map(|(index, text)| (VoteTarget::Decoy(index), text.clone())),
    );

    ballot.extend(
        answers
            .iter()
            .filter(|a| !question.is_correct(&a.text))
            .map(|a| (VoteTarget::Answer(a.id.clone()), a.text.clone())),
    );

    ballot.sort_by_key(|(_, text)| normalize(text));
    ballot
        .into_iter()
        .map(|(target, text)| BallotOption {
            option_id: ulid::Ulid::new().to_string(),
            target,
            text,
        })
        .collect()
}

impl AppState {
    /// Everything a host screen needs to render the room right now
    pub async fn get_room_snapshot(&self, code: &str) -> GameResult<RoomSnapshot> {
        let room = self.require_room(code).await?;
        let players = self.store.get_players(&room.players).await?;
        let question = self.current_question(&room).await?;

        let (answers, votes, ballot) = match &question {
            Some(question) => {
                let tallies = self.ledger.tallies_for(&room.id, &question.id).await;
                let answers: Vec<Answer> = self
                    .store
                    .get_answers(&question.id)
                    .await?
                    .into_iter()
                    .map(|mut answer| {
                        answer.vote_count = tallies
                            .get(&VoteTarget::Answer(answer.id.clone()))
                            .copied()
                            .unwrap_or(0);
                        answer
                    })
                    .collect();
                let votes = self.ledger.all_votes_for(&room.id, &question.id).await;
                let ballot = self.ballots.options(&room.id, &question.id).await;
                (answers, votes, ballot)
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        Ok(RoomSnapshot {
            room,
            players,
            question,
            answers,
            votes,
            ballot,
        })
    }

    /// What a player may see: nothing that identifies the real answer until
    /// the round is revealed
    pub async fn get_player_snapshot(&self, code: &str) -> GameResult<PlayerSnapshot> {
        let full = self.get_room_snapshot(code).await?;
        let revealed = matches!(full.room.status, RoomStatus::Results | RoomStatus::Ended);

        let reveal = match (&full.question, revealed) {
            (Some(question), true) => Some(RoundReveal {
                question: question.clone(),
                answers: full.answers.clone(),
                votes: full.votes.clone(),
            }),
            _ => None,
        };

        Ok(PlayerSnapshot {
            question: full.question.map(|q| q.text),
            answers_submitted: full.answers.len(),
            votes_cast: full.votes.len(),
            ballot: full.ballot.iter().map(BallotOption::entry).collect(),
            reveal,
            room: full.room,
            players: full.players,
        })
    }
}
