//! Game configuration loaded from environment variables.

use std::net::SocketAddr;

/// Point values for each kind of award
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub correct_guess_points: u32,
    pub fooling_points: u32,
    pub most_fooled_bonus: u32,
    /// Minimum fooled count before the most-fooled bonus is paid
    pub most_fooled_threshold: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            correct_guess_points: 1000,
            fooling_points: 500,
            most_fooled_bonus: 500,
            most_fooled_threshold: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Players required before the first round can start
    pub min_players: usize,
    pub max_answer_chars: usize,
    /// How many times one round's score batch is attempted before giving up
    pub score_commit_attempts: u32,
    pub scoring: ScoringConfig,
    pub bind_addr: SocketAddr,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_answer_chars: 120,
            score_commit_attempts: 3,
            scoring: ScoringConfig::default(),
            // 6573 is ascii for "AI"
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 6573)),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
}

impl GameConfig {
    /// Load config from environment variables, keeping defaults for anything unset or invalid
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let scoring = ScoringConfig {
            correct_guess_points: env_parse("SCORE_CORRECT_GUESS")
                .unwrap_or(defaults.scoring.correct_guess_points),
            fooling_points: env_parse("SCORE_FOOLED_PLAYER")
                .unwrap_or(defaults.scoring.fooling_points),
            most_fooled_bonus: env_parse("SCORE_MOST_FOOLED_BONUS")
                .unwrap_or(defaults.scoring.most_fooled_bonus),
            most_fooled_threshold: env_parse("SCORE_MOST_FOOLED_THRESHOLD")
                .unwrap_or(defaults.scoring.most_fooled_threshold),
        };

        let score_commit_attempts = env_parse::<u32>("SCORE_COMMIT_ATTEMPTS")
            .unwrap_or(defaults.score_commit_attempts)
            .max(1);

        Self {
            min_players: env_parse("MIN_PLAYERS").unwrap_or(defaults.min_players),
            max_answer_chars: env_parse("MAX_ANSWER_CHARS").unwrap_or(defaults.max_answer_chars),
            score_commit_attempts,
            scoring,
            bind_addr: env_parse("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }
}
