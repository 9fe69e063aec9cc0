// src/handlers/progress.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::progress::{
        Attempt, HistoryEntry, HistoryResponse, ParticipantId, ProgressRecordResponse,
        SubmitAttemptRequest, SubmitAttemptResponse,
    },
    state::AppState,
    utils::jwt::AuthContext,
};

/// Records a completed test series for the caller.
///
/// * Resolves identity: JWT subject when a valid token was sent, the
///   body's `guest_id` otherwise. Neither present is a 400.
/// * Replaces any stored attempt for the same series (a retake overwrites,
///   it never accumulates) and recounts `total_completed`.
/// * Persists the whole record as one atomic upsert.
pub async fn complete_test(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    payload.validate()?;

    let (test_series_id, total_questions) = match (payload.test_series_id, payload.total_questions)
    {
        (Some(series_id), Some(total)) => (series_id, total),
        _ => {
            return Err(AppError::Validation(
                "test_series_id and total_questions are required".to_string(),
            ));
        }
    };

    // 2. Resolve participant identity
    let participant = match auth.0 {
        Some(claims) => {
            let user_id = claims
                .sub
                .parse::<i64>()
                .map_err(|_| AppError::Auth("Invalid user id in token".to_string()))?;
            ParticipantId::User(user_id)
        }
        None => match payload.guest_id.as_deref() {
            Some(guest_id) if !guest_id.is_empty() => ParticipantId::Guest(guest_id.to_string()),
            _ => {
                return Err(AppError::Validation(
                    "user login or guest_id required".to_string(),
                ));
            }
        },
    };

    let attempt = Attempt {
        test_series_id,
        answers: payload.answers,
        score: payload.score,
        time_taken_seconds: payload.time_taken_seconds,
        total_questions,
        correct_answers: payload.correct_answers,
        incorrect_answers: payload.incorrect_answers,
        skipped_questions: payload.skipped_questions,
        completed_at: Utc::now(),
    };

    // 3. Atomic whole-record upsert
    let record = state.store.record_attempt(&participant, attempt).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitAttemptResponse {
            message: "Test series progress saved successfully".to_string(),
            data: ProgressRecordResponse::from(record),
        }),
    ))
}

/// Lists a user's completed test series, newest first, each enriched with
/// the series title and subject name.
///
/// A user with no record gets an empty list, not an error.
pub async fn get_user_tests(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .store
        .find_record(&ParticipantId::User(user_id))
        .await?;

    let Some(record) = record else {
        return Ok(Json(HistoryResponse {
            completed_test_series: Vec::new(),
        }));
    };

    let series_ids: Vec<i64> = record.attempts.iter().map(|a| a.test_series_id).collect();
    let meta = state.content.series_meta(&series_ids).await?;

    let mut entries: Vec<HistoryEntry> = record
        .attempts
        .into_iter()
        .map(|attempt| {
            // A dangling series reference degrades to sentinels instead of
            // failing the whole request.
            let (title, subject_name) = match meta.get(&attempt.test_series_id) {
                Some(m) => (m.title.clone(), m.subject_name.clone()),
                None => ("Unknown Title".to_string(), "Unknown Subject".to_string()),
            };
            HistoryEntry {
                attempt,
                title,
                subject_name,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.attempt.completed_at.cmp(&a.attempt.completed_at));

    Ok(Json(HistoryResponse {
        completed_test_series: entries,
    }))
}
