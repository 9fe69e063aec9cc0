// src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Identity of the submitter of an attempt.
///
/// A progress record belongs to exactly one of these. Modeling the two
/// cases as an enum (instead of two nullable fields) makes "never both,
/// never neither" impossible to violate in memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParticipantId {
    /// Persistent account id from the user directory.
    User(i64),
    /// Transient token identifying an unauthenticated submitter.
    Guest(String),
}

impl ParticipantId {
    /// Key used for per-participant document lookup and upsert.
    pub fn storage_key(&self) -> String {
        match self {
            ParticipantId::User(id) => format!("u:{}", id),
            ParticipantId::Guest(token) => format!("g:{}", token),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            ParticipantId::User(id) => Some(*id),
            ParticipantId::Guest(_) => None,
        }
    }

    pub fn guest_id(&self) -> Option<&str> {
        match self {
            ParticipantId::User(_) => None,
            ParticipantId::Guest(token) => Some(token),
        }
    }
}

/// Per-question review entry inside an attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnswerReview {
    pub question_id: i64,
    pub selected_option: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
}

/// One scored submission of a test series.
///
/// Stored as an element of the record's attempts array; only the latest
/// submission per series survives a resubmission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Attempt {
    pub test_series_id: i64,
    #[serde(default)]
    pub answers: Vec<AnswerReview>,
    /// Signed. Negative marking can push it below zero.
    pub score: f64,
    pub time_taken_seconds: i64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub skipped_questions: i32,
    pub completed_at: DateTime<Utc>,
}

/// Per-participant container of attempts, unique by test series.
#[derive(Debug, Clone)]
pub struct ProgressRecord {
    pub participant: ParticipantId,
    pub attempts: Vec<Attempt>,
    pub total_completed: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Empty record bound to one identity, created lazily on first
    /// submission.
    pub fn new(participant: ParticipantId, now: DateTime<Utc>) -> Self {
        Self {
            participant,
            attempts: Vec::new(),
            total_completed: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Swaps in an attempt: any stored attempt for the same series is
    /// dropped before the new one is appended, then the completion count
    /// is recomputed. Submitting a series N times leaves exactly one
    /// attempt for it, carrying the last submission's values.
    pub fn apply_attempt(&mut self, attempt: Attempt) {
        self.attempts
            .retain(|a| a.test_series_id != attempt.test_series_id);
        self.updated_at = attempt.completed_at;
        self.attempts.push(attempt);
        self.total_completed = self.attempts.len() as i32;
    }

    /// The stored attempt for one series, if any. At most one exists.
    pub fn attempt_for(&self, series_id: i64) -> Option<&Attempt> {
        self.attempts.iter().find(|a| a.test_series_id == series_id)
    }
}

/// Body of `POST /api/series/complete-test`.
///
/// `test_series_id` and `total_questions` are required but modeled as
/// options so a missing field maps to a 400 with a readable message
/// instead of a deserializer rejection. Numeric ranges are covered by
/// `validate()`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitAttemptRequest {
    /// Identity fallback for requests without a bearer token.
    pub guest_id: Option<String>,
    pub test_series_id: Option<i64>,
    #[serde(default)]
    pub answers: Vec<AnswerReview>,
    #[serde(default)]
    pub score: f64,
    #[validate(range(min = 0, message = "time_taken_seconds cannot be negative"))]
    #[serde(default)]
    pub time_taken_seconds: i64,
    #[validate(range(min = 1, message = "total_questions must be positive"))]
    pub total_questions: Option<i32>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub correct_answers: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub incorrect_answers: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub skipped_questions: i32,
}

/// Wire shape of a saved progress record.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressRecordResponse {
    pub user_id: Option<i64>,
    pub guest_id: Option<String>,
    pub attempts: Vec<Attempt>,
    pub total_completed: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<ProgressRecord> for ProgressRecordResponse {
    fn from(record: ProgressRecord) -> Self {
        let user_id = record.participant.user_id();
        let guest_id = record.participant.guest_id().map(str::to_owned);
        Self {
            user_id,
            guest_id,
            attempts: record.attempts,
            total_completed: record.total_completed,
            updated_at: record.updated_at,
        }
    }
}

/// Response of the attempt recorder.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAttemptResponse {
    pub message: String,
    pub data: ProgressRecordResponse,
}

/// One history row: the attempt plus series display metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub attempt: Attempt,
    pub title: String,
    pub subject_name: String,
}

/// Response of the history view. An empty list is a normal outcome, not
/// an error.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub completed_test_series: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn apply_attempt_appends_first_attempt() {
        let mut record = ProgressRecord::new(ParticipantId::User(1), Utc::now());

        record.apply_attempt(attempt(7, 50.0, 100));

        assert_eq!(record.attempts.len(), 1);
        assert_eq!(record.total_completed, 1);
        assert_eq!(record.attempts[0].test_series_id, 7);
    }

    #[test]
    fn apply_attempt_replaces_same_series() {
        let mut record = ProgressRecord::new(ParticipantId::User(1), Utc::now());

        record.apply_attempt(attempt(7, 40.0, 120));
        record.apply_attempt(attempt(7, 70.0, 90));

        assert_eq!(record.attempts.len(), 1);
        assert_eq!(record.total_completed, 1);
        assert_eq!(record.attempts[0].score, 70.0);
        assert_eq!(record.attempts[0].time_taken_seconds, 90);
    }

    #[test]
    fn apply_attempt_keeps_other_series() {
        let mut record = ProgressRecord::new(ParticipantId::Guest("tok".to_string()), Utc::now());

        record.apply_attempt(attempt(1, 30.0, 60));
        record.apply_attempt(attempt(2, 80.0, 45));
        record.apply_attempt(attempt(1, 55.0, 50));

        assert_eq!(record.attempts.len(), 2);
        assert_eq!(record.total_completed, 2);
        assert_eq!(record.attempt_for(1).map(|a| a.score), Some(55.0));
        assert_eq!(record.attempt_for(2).map(|a| a.score), Some(80.0));
    }

    #[test]
    fn no_duplicate_series_after_any_sequence() {
        let mut record = ProgressRecord::new(ParticipantId::User(9), Utc::now());

        for (series, score) in [(1, 10.0), (2, 20.0), (1, 30.0), (3, 40.0), (2, 50.0), (1, 60.0)] {
            record.apply_attempt(attempt(series, score, 100));

            let mut seen: Vec<i64> = record.attempts.iter().map(|a| a.test_series_id).collect();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), record.attempts.len(), "duplicate series stored");
            assert_eq!(record.total_completed as usize, record.attempts.len());
        }

        assert_eq!(record.attempts.len(), 3);
        assert_eq!(record.attempt_for(1).map(|a| a.score), Some(60.0));
    }

    #[test]
    fn attempt_for_unknown_series_is_none() {
        let mut record = ProgressRecord::new(ParticipantId::User(1), Utc::now());
        record.apply_attempt(attempt(5, 10.0, 10));

        assert!(record.attempt_for(99).is_none());
    }

    #[test]
    fn storage_keys_do_not_collide_across_kinds() {
        let user = ParticipantId::User(42);
        let guest = ParticipantId::Guest("42".to_string());

        assert_ne!(user.storage_key(), guest.storage_key());
    }
}
