//! In-process vote ledger.
//!
//! The single source of truth for who voted for what. Votes upsert per
//! (question, voter): a revote replaces the previous target and the tallies
//! are adjusted in the same write. When every eligible voter has a vote the
//! ledger reports [`VotingComplete`] exactly once for that question.

use crate::types::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Emitted when the last eligible voter of a question casts their vote
#[derive(Debug, Clone, PartialEq)]
pub struct VotingComplete {
    pub room_id: RoomId,
    pub question_id: QuestionId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VoteOutcome {
    /// The target this vote replaced, if the voter had voted before
    pub replaced: Option<VoteTarget>,
    pub complete: Option<VotingComplete>,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    target: VoteTarget,
    seq: u64,
}

#[derive(Debug, Default)]
struct QuestionVotes {
    eligible: HashSet<PlayerId>,
    votes: HashMap<PlayerId, LedgerEntry>,
    tallies: HashMap<VoteTarget, u32>,
    completed: bool,
}

impl QuestionVotes {
    fn is_complete(&self) -> bool {
        !self.eligible.is_empty() && self.eligible.iter().all(|v| self.votes.contains_key(v))
    }
}

#[derive(Debug, Default)]
struct LedgerInner {
    rooms: HashMap<RoomId, HashMap<QuestionId, QuestionVotes>>,
    next_seq: u64,
}

#[derive(Clone, Default)]
pub struct VoteLedger {
    inner: Arc<RwLock<LedgerInner>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the voters whose votes complete this question.
    /// Votes already recorded are kept.
    pub async fn open_question(
        &self,
        room_id: &str,
        question_id: &str,
        eligible: impl IntoIterator<Item = PlayerId>,
    ) {
        let mut inner = self.inner.write().await;
        let question = inner
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .entry(question_id.to_string())
            .or_default();
        question.eligible = eligible.into_iter().collect();
        question.completed = false;
    }

    /// Upsert a voter's target. Missing ids make this a no-op.
    pub async fn record_vote(
        &self,
        room_id: &str,
        question_id: &str,
        voter_id: &str,
        target: VoteTarget,
    ) -> VoteOutcome {
        if room_id.is_empty() || question_id.is_empty() || voter_id.is_empty() {
            tracing::warn!("Ignoring vote with missing ids");
            return VoteOutcome::default();
        }

        let mut inner = self.inner.write().await;
        inner.next_seq += 1;
        let seq = inner.next_seq;

        let question = inner
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .entry(question_id.to_string())
            .or_default();

        let replaced = question
            .votes
            .insert(
                voter_id.to_string(),
                LedgerEntry {
                    target: target.clone(),
                    seq,
                },
            )
            .map(|previous| previous.target);

        if let Some(old) = &replaced {
            if let Some(count) = question.tallies.get_mut(old) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    question.tallies.remove(old);
                }
            }
        }
        *question.tallies.entry(target).or_insert(0) += 1;

        tracing::debug!(
            "Recorded vote: {} on question {} (replaced: {})",
            voter_id,
            question_id,
            replaced.is_some()
        );

        let complete = if !question.completed && question.is_complete() {
            question.completed = true;
            Some(VotingComplete {
                room_id: room_id.to_string(),
                question_id: question_id.to_string(),
            })
        } else {
            None
        };

        VoteOutcome { replaced, complete }
    }

    pub async fn has_voted(&self, room_id: &str, question_id: &str, voter_id: &str) -> bool {
        self.get_vote(room_id, question_id, voter_id).await.is_some()
    }

    pub async fn get_vote(
        &self,
        room_id: &str,
        question_id: &str,
        voter_id: &str,
    ) -> Option<VoteTarget> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(room_id)?
            .get(question_id)?
            .votes
            .get(voter_id)
            .map(|entry| entry.target.clone())
    }

    /// Every live vote for a question, ordered by the time it was last cast
    pub async fn all_votes_for(&self, room_id: &str, question_id: &str) -> Vec<CastVote> {
        let inner = self.inner.read().await;
        let Some(question) = inner.rooms.get(room_id).and_then(|r| r.get(question_id)) else {
            return Vec::new();
        };

        let mut entries: Vec<_> = question.votes.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        entries
            .into_iter()
            .map(|(voter_id, entry)| CastVote {
                voter_id: voter_id.clone(),
                target: entry.target.clone(),
            })
            .collect()
    }

    /// Vote counts per target
    pub async fn tallies_for(&self, room_id: &str, question_id: &str) -> HashMap<VoteTarget, u32> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(room_id)
            .and_then(|r| r.get(question_id))
            .map(|q| q.tallies.clone())
            .unwrap_or_default()
    }

    /// Drop everything recorded for a room
    pub async fn clear_room(&self, room_id: &str) {
        if self.inner.write().await.rooms.remove(room_id).is_some() {
            tracing::info!("Cleared vote ledger for room {}", room_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(id: &str) -> VoteTarget {
        VoteTarget::Answer(id.to_string())
    }

    #[tokio::test]
    async fn test_one_entry_per_voter() {
        let ledger = VoteLedger::new();
        ledger.record_vote("r1", "q1", "alice", answer("a1")).await;
        ledger.record_vote("r1", "q1", "alice", answer("a2")).await;
        let outcome = ledger
            .record_vote("r1", "q1", "alice", VoteTarget::Correct)
            .await;

        assert_eq!(outcome.replaced, Some(answer("a2")));
        let votes = ledger.all_votes_for("r1", "q1").await;
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].target, VoteTarget::Correct);
    }

    #[tokio::test]
    async fn test_tallies_follow_revotes() {
        let ledger = VoteLedger::new();
        ledger.record_vote("r1", "q1", "alice", answer("a1")).await;
        ledger.record_vote("r1", "q1", "bob", answer("a1")).await;
        ledger.record_vote("r1", "q1", "alice", answer("a2")).await;

        let tallies = ledger.tallies_for("r1", "q1").await;
        assert_eq!(tallies.get(&answer("a1")), Some(&1));
        assert_eq!(tallies.get(&answer("a2")), Some(&1));
        assert_eq!(tallies.values().sum::<u32>(), 2);
    }

    #[tokio::test]
    async fn test_lookups() {
        let ledger = VoteLedger::new();
        assert!(!ledger.has_voted("r1", "q1", "alice").await);
        assert_eq!(ledger.get_vote("r1", "q1", "alice").await, None);

        ledger.record_vote("r1", "q1", "alice", VoteTarget::Decoy(1)).await;

        assert!(ledger.has_voted("r1", "q1", "alice").await);
        assert_eq!(
            ledger.get_vote("r1", "q1", "alice").await,
            Some(VoteTarget::Decoy(1))
        );
        // Scoped by question and room
        assert!(!ledger.has_voted("r1", "q2", "alice").await);
        assert!(!ledger.has_voted("r2", "q1", "alice").await);
    }

    #[tokio::test]
    async fn test_missing_ids_are_ignored() {
        let ledger = VoteLedger::new();
        let outcome = ledger.record_vote("r1", "", "alice", VoteTarget::Correct).await;
        assert_eq!(outcome, VoteOutcome::default());
        let outcome = ledger.record_vote("r1", "q1", "", VoteTarget::Correct).await;
        assert_eq!(outcome, VoteOutcome::default());
        assert!(ledger.all_votes_for("r1", "q1").await.is_empty());
    }

    #[tokio::test]
    async fn test_completion_emitted_once() {
        let ledger = VoteLedger::new();
        ledger
            .open_question("r1", "q1", ["alice".to_string(), "bob".to_string()])
            .await;

        let first = ledger.record_vote("r1", "q1", "alice", answer("b")).await;
        assert!(first.complete.is_none());

        let second = ledger.record_vote("r1", "q1", "bob", answer("a")).await;
        assert_eq!(
            second.complete,
            Some(VotingComplete {
                room_id: "r1".to_string(),
                question_id: "q1".to_string(),
            })
        );

        // Revotes after completion do not fire again
        let third = ledger.record_vote("r1", "q1", "bob", VoteTarget::Correct).await;
        assert!(third.complete.is_none());
    }

    #[tokio::test]
    async fn test_ineligible_voters_do_not_complete() {
        let ledger = VoteLedger::new();
        ledger.open_question("r1", "q1", ["alice".to_string()]).await;

        let outcome = ledger.record_vote("r1", "q1", "latecomer", answer("x")).await;
        assert!(outcome.complete.is_none());

        let outcome = ledger.record_vote("r1", "q1", "alice", answer("x")).await;
        assert!(outcome.complete.is_some());
    }

    #[tokio::test]
    async fn test_votes_keep_cast_order() {
        let ledger = VoteLedger::new();
        ledger.record_vote("r1", "q1", "carol", answer("a")).await;
        ledger.record_vote("r1", "q1", "alice", answer("b")).await;
        ledger.record_vote("r1", "q1", "bob", answer("c")).await;

        let voters: Vec<_> = ledger
            .all_votes_for("r1", "q1")
            .await
            .into_iter()
            .map(|v| v.voter_id)
            .collect();
        assert_eq!(voters, vec!["carol", "alice", "bob"]);
    }

    #[tokio::test]
    async fn test_clear_room_only_touches_that_room() {
        let ledger = VoteLedger::new();
        ledger.record_vote("r1", "q1", "alice", VoteTarget::Correct).await;
        ledger.record_vote("r2", "q9", "alice", VoteTarget::Correct).await;

        ledger.clear_room("r1").await;

        assert!(ledger.all_votes_for("r1", "q1").await.is_empty());
        assert_eq!(ledger.all_votes_for("r2", "q9").await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_votes_from_same_voter() {
        let ledger = VoteLedger::new();
        let mut handles = Vec::new();
        for i in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .record_vote("r1", "q1", "alice", VoteTarget::Decoy(i % 3))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(ledger.all_votes_for("r1", "q1").await.len(), 1);
        let tallies = ledger.tallies_for("r1", "q1").await;
        assert_eq!(tallies.values().sum::<u32>(), 1);
    }
}
