// src/ranking.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::leaderboard::LeaderboardRow;
use crate::models::progress::{ParticipantId, ProgressRecord};

/// A participant's latest attempt for one series, flattened for sorting.
#[derive(Debug, Clone)]
pub struct SeriesStanding {
    pub participant: ParticipantId,
    pub score: f64,
    pub time_taken_seconds: i64,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub skipped_questions: i32,
    pub completed_at: DateTime<Utc>,
}

/// Builds the global board: per participant, the average score across all
/// attempted series, sorted best average first.
///
/// Guests and users missing from the name directory carry no display name
/// and are left off the board. A record with zero attempts averages to 0
/// instead of dividing by zero. The sort is stable, so equal averages
/// keep their stored order and receive consecutive ranks.
pub fn build_leaderboard(
    records: &[ProgressRecord],
    names: &HashMap<i64, String>,
) -> Vec<LeaderboardRow> {
    let mut rows: Vec<LeaderboardRow> = Vec::new();

    for record in records {
        let Some(user_id) = record.participant.user_id() else {
            continue;
        };
        let Some(name) = names.get(&user_id) else {
            continue;
        };

        let total_tests = record.attempts.len() as i64;
        let avg_score = if total_tests > 0 {
            let total_score: f64 = record.attempts.iter().map(|a| a.score).sum();
            total_score / total_tests as f64
        } else {
            0.0
        };

        rows.push(LeaderboardRow {
            rank: 0,
            user_id,
            name: name.clone(),
            total_tests,
            avg_score,
        });
    }

    rows.sort_by(|a, b| b.avg_score.total_cmp(&a.avg_score));
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index as i64 + 1;
    }

    rows
}

/// Standings for one series: the stored (unique) attempt per participant,
/// ordered by score descending, then time taken ascending. On equal
/// scores the faster completion ranks higher.
pub fn series_standings(records: &[ProgressRecord], series_id: i64) -> Vec<SeriesStanding> {
    let mut standings: Vec<SeriesStanding> = records
        .iter()
        .filter_map(|record| {
            record.attempt_for(series_id).map(|attempt| SeriesStanding {
                participant: record.participant.clone(),
                score: attempt.score,
                time_taken_seconds: attempt.time_taken_seconds,
                correct_answers: attempt.correct_answers,
                incorrect_answers: attempt.incorrect_answers,
                skipped_questions: attempt.skipped_questions,
                completed_at: attempt.completed_at,
            })
        })
        .collect();

    standings.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.time_taken_seconds.cmp(&b.time_taken_seconds))
    });

    standings
}

/// 1-based position of a participant in the standings. `None` means they
/// have no attempt for the series, which is a normal outcome.
pub fn position_of(standings: &[SeriesStanding], participant: &ParticipantId) -> Option<usize> {
    standings
        .iter()
        .position(|s| &s.participant == participant)
        .map(|index| index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::progress::Attempt;

    fn attempt(series_id: i64, score: f64, time_taken_seconds: i64) -> Attempt {
        Attempt {
            test_series_id: series_id,
            answers: Vec::new(),
            score,
            time_taken_seconds,
            total_questions: 10,
            correct_answers: 0,
            incorrect_answers: 0,
            skipped_questions: 0,
            completed_at: Utc::now(),
        }
    }

    fn record(participant: ParticipantId, attempts: Vec<Attempt>) -> ProgressRecord {
        let mut record = ProgressRecord::new(participant, Utc::now());
        for a in attempts {
            record.apply_attempt(a);
        }
        record
    }

    fn names(entries: &[(i64, &str)]) -> HashMap<i64, String> {
        entries
            .iter()
            .map(|(id, name)| (*id, name.to_string()))
            .collect()
    }

    #[test]
    fn leaderboard_averages_scores_across_series() {
        let records = vec![
            record(ParticipantId::User(1), vec![attempt(1, 80.0, 60), attempt(2, 60.0, 60)]),
            record(ParticipantId::User(2), vec![attempt(1, 90.0, 60)]),
        ];
        let names = names(&[(1, "Asha"), (2, "Bo")]);

        let board = build_leaderboard(&records, &names);

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].name, "Bo");
        assert_eq!(board[0].avg_score, 90.0);
        assert_eq!(board[0].total_tests, 1);
        assert_eq!(board[1].name, "Asha");
        assert_eq!(board[1].avg_score, 70.0);
        assert_eq!(board[1].total_tests, 2);
    }

    #[test]
    fn leaderboard_ranks_are_one_based_and_consecutive() {
        let records = vec![
            record(ParticipantId::User(1), vec![attempt(1, 50.0, 60)]),
            record(ParticipantId::User(2), vec![attempt(1, 70.0, 60)]),
            record(ParticipantId::User(3), vec![attempt(1, 60.0, 60)]),
        ];
        let names = names(&[(1, "A"), (2, "B"), (3, "C")]);

        let board = build_leaderboard(&records, &names);

        let ranks: Vec<i64> = board.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(board[0].user_id, 2);
        assert_eq!(board[2].user_id, 1);
    }

    #[test]
    fn leaderboard_equal_averages_keep_stored_order() {
        let records = vec![
            record(ParticipantId::User(1), vec![attempt(1, 75.0, 60)]),
            record(ParticipantId::User(2), vec![attempt(1, 75.0, 30)]),
            record(ParticipantId::User(3), vec![attempt(1, 80.0, 90)]),
        ];
        let names = names(&[(1, "A"), (2, "B"), (3, "C")]);

        let board = build_leaderboard(&records, &names);

        // 3 leads; the tied pair stays in input order with distinct ranks.
        assert_eq!(board[0].user_id, 3);
        assert_eq!(board[1].user_id, 1);
        assert_eq!(board[2].user_id, 2);
        assert_eq!(board[1].rank, 2);
        assert_eq!(board[2].rank, 3);
    }

    #[test]
    fn leaderboard_zero_attempts_average_is_zero() {
        let empty = ProgressRecord::new(ParticipantId::User(1), Utc::now());
        let names = names(&[(1, "A")]);

        let board = build_leaderboard(&[empty], &names);

        assert_eq!(board.len(), 1);
        assert_eq!(board[0].avg_score, 0.0);
        assert!(!board[0].avg_score.is_nan());
        assert_eq!(board[0].total_tests, 0);
    }

    #[test]
    fn leaderboard_skips_guests_and_unnamed_users() {
        let records = vec![
            record(ParticipantId::Guest("tok".to_string()), vec![attempt(1, 99.0, 10)]),
            record(ParticipantId::User(8), vec![attempt(1, 40.0, 60)]),
            record(ParticipantId::User(1), vec![attempt(1, 60.0, 60)]),
        ];
        // User 8 has no directory entry.
        let names = names(&[(1, "A")]);

        let board = build_leaderboard(&records, &names);

        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, 1);
    }

    #[test]
    fn standings_sort_by_score_descending() {
        let records = vec![
            record(ParticipantId::User(1), vec![attempt(5, 40.0, 60)]),
            record(ParticipantId::User(2), vec![attempt(5, 90.0, 60)]),
            record(ParticipantId::User(3), vec![attempt(5, 65.0, 60)]),
        ];

        let standings = series_standings(&records, 5);

        let order: Vec<f64> = standings.iter().map(|s| s.score).collect();
        assert_eq!(order, vec![90.0, 65.0, 40.0]);
    }

    #[test]
    fn standings_tie_break_prefers_faster_time() {
        let records = vec![
            record(ParticipantId::User(1), vec![attempt(5, 80.0, 120)]),
            record(ParticipantId::User(2), vec![attempt(5, 80.0, 90)]),
        ];

        let standings = series_standings(&records, 5);

        assert_eq!(standings[0].participant, ParticipantId::User(2));
        assert_eq!(standings[1].participant, ParticipantId::User(1));
    }

    #[test]
    fn standings_ignore_other_series() {
        let records = vec![
            record(ParticipantId::User(1), vec![attempt(5, 80.0, 60), attempt(6, 10.0, 60)]),
            record(ParticipantId::User(2), vec![attempt(6, 95.0, 60)]),
        ];

        let standings = series_standings(&records, 5);

        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].participant, ParticipantId::User(1));
    }

    #[test]
    fn position_is_one_based() {
        let records = vec![
            record(ParticipantId::User(1), vec![attempt(5, 80.0, 120)]),
            record(ParticipantId::User(2), vec![attempt(5, 80.0, 90)]),
        ];

        let standings = series_standings(&records, 5);

        assert_eq!(position_of(&standings, &ParticipantId::User(2)), Some(1));
        assert_eq!(position_of(&standings, &ParticipantId::User(1)), Some(2));
    }

    #[test]
    fn position_of_absent_participant_is_none() {
        let records = vec![record(ParticipantId::User(1), vec![attempt(5, 80.0, 120)])];

        let standings = series_standings(&records, 5);

        assert_eq!(position_of(&standings, &ParticipantId::User(99)), None);
    }

    #[test]
    fn guests_occupy_positions_in_standings() {
        let records = vec![
            record(ParticipantId::Guest("g1".to_string()), vec![attempt(5, 90.0, 30)]),
            record(ParticipantId::User(1), vec![attempt(5, 70.0, 60)]),
        ];

        let standings = series_standings(&records, 5);

        assert_eq!(standings.len(), 2);
        assert_eq!(position_of(&standings, &ParticipantId::User(1)), Some(2));
    }
}
