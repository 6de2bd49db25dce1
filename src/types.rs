use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque ID types for type safety
pub type RoomId = String;
pub type RoomCode = String;
pub type PlayerId = String;
pub type QuestionId = String;
pub type AnswerId = String;
pub type ScoreEventId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Lobby,
    Answering,
    Voting,
    Results,
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub code: RoomCode,
    pub status: RoomStatus,
    pub current_round: u32,
    pub categories: Vec<String>,
    pub host_id: PlayerId,
    /// Member ids in join order (leaderboard ties fall back to this order)
    pub players: Vec<PlayerId>,
    pub created_at: String,
}

impl Room {
    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p == player_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Cumulative across every room and round
    pub total_score: u64,
}

/// Normalize text for answer comparison (trim whitespace, lowercase)
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub room_id: RoomId,
    pub round_number: u32,
    pub text: String,
    pub correct_answer: String,
    /// Externally generated decoys, addressed by index from `VoteTarget::Decoy`
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub alternate_spellings: Vec<String>,
    pub created_at: String,
}

impl Question {
    /// Whether `text` is the correct answer or one of its accepted spellings
    pub fn is_correct(&self, text: &str) -> bool {
        let candidate = normalize(text);
        if candidate.is_empty() {
            return false;
        }
        candidate == normalize(&self.correct_answer)
            || self
                .alternate_spellings
                .iter()
                .any(|s| normalize(s) == candidate)
    }
}

/// Everything the store needs to create a question for a round
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub room_id: RoomId,
    pub round_number: u32,
    pub text: String,
    pub correct_answer: String,
    pub alternatives: Vec<String>,
    pub alternate_spellings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    /// None for system or AI answers
    pub author_id: Option<PlayerId>,
    pub text: String,
    /// Filled in from the vote ledger on read, never stored
    #[serde(default)]
    pub vote_count: u32,
}

/// What a vote points at
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VoteTarget {
    Answer(AnswerId),
    Correct,
    Decoy(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastVote {
    pub voter_id: PlayerId,
    pub target: VoteTarget,
}

/// One selectable option on the voting screen, as players see it.
/// `option_id` is opaque and only meaningful for this round's ballot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BallotEntry {
    pub option_id: String,
    pub text: String,
}

/// Server-side ballot option: the opaque id together with what it votes for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BallotOption {
    pub option_id: String,
    pub target: VoteTarget,
    pub text: String,
}

impl BallotOption {
    pub fn entry(&self) -> BallotEntry {
        BallotEntry {
            option_id: self.option_id.clone(),
            text: self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreKind {
    CorrectGuess,
    FooledPlayer,
    MostFooledBonus,
}

/// Immutable audit record of a single award
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreEvent {
    pub id: ScoreEventId,
    pub player_id: PlayerId,
    pub room_id: RoomId,
    pub round_number: u32,
    pub points: u32,
    pub kind: ScoreKind,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub name: String,
    /// Points earned this round
    pub points: u32,
    /// Cumulative score including this round
    pub total_score: u64,
    pub breakdown: Vec<ScoreEvent>,
}

/// Outcome of scoring one round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundResults {
    pub room_id: RoomId,
    pub round_number: u32,
    pub question_id: QuestionId,
    pub correct_answer: String,
    pub entries: Vec<LeaderboardEntry>,
    pub most_fooled_answer: Option<AnswerId>,
}

impl RoundResults {
    pub fn events(&self) -> impl Iterator<Item = &ScoreEvent> {
        self.entries.iter().flat_map(|e| e.breakdown.iter())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerTotal {
    pub player_id: PlayerId,
    pub name: String,
    pub total_score: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Leaderboard {
    pub round_number: u32,
    pub entries: Vec<LeaderboardEntry>,
    pub totals: Vec<PlayerTotal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BestRound {
    pub round: u32,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub name: String,
    pub total_score: u64,
    pub correct_guess_points: u32,
    pub fooled_points: u32,
    pub bonus_points: u32,
    pub rounds: BTreeMap<u32, u32>,
    pub best_round: Option<BestRound>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomStats {
    pub total_players: usize,
    pub total_rounds: u32,
    pub total_points: u64,
    pub avg_points_per_round: f64,
    pub players: Vec<PlayerStats>,
}

/// Host-facing view of a room at one instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: Room,
    pub players: Vec<Player>,
    pub question: Option<Question>,
    pub answers: Vec<Answer>,
    pub votes: Vec<CastVote>,
    pub ballot: Vec<BallotOption>,
}

/// What the host view adds once a round is revealed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReveal {
    pub question: Question,
    pub answers: Vec<Answer>,
    pub votes: Vec<CastVote>,
}

/// Player-facing view of a room. Until RESULTS it carries only the question
/// text, progress counts and the opaque ballot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub room: Room,
    pub players: Vec<Player>,
    pub question: Option<String>,
    pub answers_submitted: usize,
    pub votes_cast: usize,
    pub ballot: Vec<BallotEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reveal: Option<RoundReveal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Player,
}
