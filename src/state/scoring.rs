//! Round scoring.
//!
//! [`score_round`] is pure: it turns one question's answers and votes into
//! score events and a leaderboard. Committing the result is done by
//! `AppState::show_results`.

use crate::config::ScoringConfig;
use crate::types::*;
use std::collections::HashMap;

pub struct ScoringInput<'a> {
    pub room_id: &'a str,
    pub question: &'a Question,
    pub answers: &'a [Answer],
    /// Votes in cast order
    pub votes: &'a [CastVote],
    /// Room members in join order
    pub players: &'a [Player],
}

/// Computed but not yet committed round score
#[derive(Debug, Clone, PartialEq)]
pub struct RoundScore {
    pub events: Vec<ScoreEvent>,
    /// Per-player points for the round, in player order
    pub deltas: Vec<(PlayerId, u32)>,
    pub results: RoundResults,
}

pub fn score_round(config: &ScoringConfig, input: &ScoringInput<'_>) -> RoundScore {
    let question = input.question;

    let author_of: HashMap<&str, &str> = input
        .answers
        .iter()
        .filter_map(|a| a.author_id.as_deref().map(|author| (a.id.as_str(), author)))
        .collect();
    let answer_by_id: HashMap<&str, &Answer> =
        input.answers.iter().map(|a| (a.id.as_str(), a)).collect();

    let mut deltas: HashMap<&str, u32> = input
        .players
        .iter()
        .map(|p| (p.id.as_str(), 0))
        .collect();

    let now = chrono::Utc::now().to_rfc3339();
    let mut events = Vec::new();
    let mut award = |player_id: &str, points: u32, kind: ScoreKind| -> bool {
        let Some(delta) = deltas.get_mut(player_id) else {
            tracing::debug!("Skipping {:?} award for non-member {}", kind, player_id);
            return false;
        };
        *delta = delta.saturating_add(points);
        events.push(ScoreEvent {
            id: ulid::Ulid::new().to_string(),
            player_id: player_id.to_string(),
            room_id: input.room_id.to_string(),
            round_number: question.round_number,
            points,
            kind,
            created_at: now.clone(),
        });
        true
    };

    let mut fooled_counts: HashMap<&str, u32> = HashMap::new();
    // (answer id, count) of the first answer to reach the current maximum
    let mut most_fooled: Option<(&str, u32)> = None;

    for vote in input.votes {
        let voter = vote.voter_id.as_str();
        match &vote.target {
            VoteTarget::Correct => {
                award(voter, config.correct_guess_points, ScoreKind::CorrectGuess);
            }
            VoteTarget::Decoy(_) => {}
            VoteTarget::Answer(answer_id) => {
                let Some(answer) = answer_by_id.get(answer_id.as_str()) else {
                    tracing::warn!("Vote by {} targets unknown answer {}", voter, answer_id);
                    continue;
                };
                let author = author_of.get(answer_id.as_str()).copied();

                if author == Some(voter) {
                    tracing::warn!("Ignoring self vote by {}", voter);
                    continue;
                }

                if question.is_correct(&answer.text) {
                    award(voter, config.correct_guess_points, ScoreKind::CorrectGuess);
                } else if let Some(author) = author {
                    if award(author, config.fooling_points, ScoreKind::FooledPlayer) {
                        let count = fooled_counts.entry(answer.id.as_str()).or_insert(0);
                        *count += 1;
                        if most_fooled.map_or(true, |(_, max)| *count > max) {
                            most_fooled = Some((answer.id.as_str(), *count));
                        }
                    }
                }
            }
        }
    }

    let mut most_fooled_answer = None;
    if let Some((answer_id, count)) = most_fooled {
        if count >= config.most_fooled_threshold {
            if let Some(author) = author_of.get(answer_id).copied() {
                if award(author, config.most_fooled_bonus, ScoreKind::MostFooledBonus) {
                    most_fooled_answer = Some(answer_id.to_string());
                }
            }
        }
    }

    let mut entries: Vec<LeaderboardEntry> = input
        .players
        .iter()
        .map(|p| {
            let points = deltas.get(p.id.as_str()).copied().unwrap_or(0);
            LeaderboardEntry {
                player_id: p.id.clone(),
                name: p.name.clone(),
                points,
                total_score: p.total_score.saturating_add(u64::from(points)),
                breakdown: events
                    .iter()
                    .filter(|e| e.player_id == p.id)
                    .cloned()
                    .collect(),
            }
        })
        .collect();
    // Stable sort keeps join order among ties
    entries.sort_by(|a, b| b.points.cmp(&a.points));

    let deltas = input
        .players
        .iter()
        .map(|p| (p.id.clone(), deltas.get(p.id.as_str()).copied().unwrap_or(0)))
        .collect();

    RoundScore {
        events,
        deltas,
        results: RoundResults {
            room_id: input.room_id.to_string(),
            round_number: question.round_number,
            question_id: question.id.clone(),
            correct_answer: question.correct_answer.clone(),
            entries,
            most_fooled_answer,
        },
    }
}
