// src/models/leaderboard.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Row of the global average-score board.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardRow {
    /// 1-based position after sorting. Equal averages get consecutive
    /// ranks in their stored order, not a shared rank.
    pub rank: i64,
    pub user_id: i64,
    pub name: String,
    pub total_tests: i64,
    pub avg_score: f64,
}

/// Response of the global leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardRow>,
}

/// Rank of one user inside one series, with their own attempt fields for
/// display.
#[derive(Debug, Serialize, ToSchema)]
pub struct SeriesRankResponse {
    pub user_id: i64,
    pub test_series_id: i64,
    pub rank: i64,
    pub total_participants: i64,
    pub score: f64,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub skipped_questions: i32,
    pub time_taken_seconds: i64,
    pub completed_at: DateTime<Utc>,
}
