//! Aggregates rebuilt from the append-only score events.

use super::AppState;
use crate::error::GameResult;
use crate::types::*;
use std::collections::BTreeMap;

fn player_stats(player: &Player, events: &[ScoreEvent]) -> PlayerStats {
    let mut stats = PlayerStats {
        player_id: player.id.clone(),
        name: player.name.clone(),
        total_score: player.total_score,
        correct_guess_points: 0,
        fooled_points: 0,
        bonus_points: 0,
        rounds: BTreeMap::new(),
        best_round: None,
    };

    for event in events.iter().filter(|e| e.player_id == player.id) {
        let bucket = match event.kind {
            ScoreKind::CorrectGuess => &mut stats.correct_guess_points,
            ScoreKind::FooledPlayer => &mut stats.fooled_points,
            ScoreKind::MostFooledBonus => &mut stats.bonus_points,
        };
        *bucket = bucket.saturating_add(event.points);
        let round = stats.rounds.entry(event.round_number).or_insert(0);
        *round = round.saturating_add(event.points);
    }

    // Earliest round wins a tie
    for (&round, &points) in &stats.rounds {
        if stats.best_round.as_ref().map_or(true, |best| points > best.points) {
            stats.best_round = Some(BestRound { round, points });
        }
    }

    stats
}

impl AppState {
    /// Current round's awards plus cumulative totals for every member
    pub async fn get_leaderboard(&self, code: &str) -> GameResult<Leaderboard> {
        let room = self.require_room(code).await?;
        let players = self.store.get_players(&room.players).await?;
        let events = self.store.get_score_events(&room.id).await?;

        let mut entries: Vec<LeaderboardEntry> = players
            .iter()
            .map(|player| {
                let breakdown: Vec<ScoreEvent> = events
                    .iter()
                    .filter(|e| e.round_number == room.current_round && e.player_id == player.id)
                    .cloned()
                    .collect();
                LeaderboardEntry {
                    player_id: player.id.clone(),
                    name: player.name.clone(),
                    points: breakdown
                        .iter()
                        .fold(0u32, |sum, e| sum.saturating_add(e.points)),
                    total_score: player.total_score,
                    breakdown,
                }
            })
            .collect();
        // Stable: ties keep join order
        entries.sort_by(|a, b| b.points.cmp(&a.points));

        let mut totals: Vec<PlayerTotal> = players
            .into_iter()
            .map(|p| PlayerTotal {
                player_id: p.id,
                name: p.name,
                total_score: p.total_score,
            })
            .collect();
        totals.sort_by(|a, b| b.total_score.cmp(&a.total_score));

        Ok(Leaderboard {
            round_number: room.current_round,
            entries,
            totals,
        })
    }

    /// Per-player breakdown of everything scored in a room
    pub async fn room_stats(&self, code: &str) -> GameResult<RoomStats> {
        let room = self.require_room(code).await?;
        let players = self.store.get_players(&room.players).await?;
        let events = self.store.get_score_events(&room.id).await?;

        let total_points: u64 = events.iter().map(|e| u64::from(e.points)).sum();
        let avg_points_per_round = if room.current_round > 0 {
            total_points as f64 / f64::from(room.current_round)
        } else {
            0.0
        };

        let mut stats: Vec<PlayerStats> =
            players.iter().map(|p| player_stats(p, &events)).collect();
        stats.sort_by(|a, b| b.total_score.cmp(&a.total_score));

        tracing::debug!(
            "Stats for room {}: {} events over {} rounds",
            code,
            events.len(),
            room.current_round
        );

        Ok(RoomStats {
            total_players: room.players.len(),
            total_rounds: room.current_round,
            total_points,
            avg_points_per_round,
            players: stats,
        })
    }
}
