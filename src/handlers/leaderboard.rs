// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        leaderboard::{LeaderboardResponse, SeriesRankResponse},
        progress::ParticipantId,
    },
    ranking,
    state::AppState,
};

/// Global board: every named user's average score across their attempted
/// series, best average first. Guests have no directory entry and are not
/// listed.
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let records = state.store.all_records().await?;

    let user_ids: Vec<i64> = records
        .iter()
        .filter_map(|record| record.participant.user_id())
        .collect();
    let names = state.users.display_names(&user_ids).await?;

    let leaderboard = ranking::build_leaderboard(&records, &names);

    Ok(Json(LeaderboardResponse { leaderboard }))
}

/// A user's rank within one test series.
///
/// Standings include guests, so a guest ahead of the user pushes their
/// rank down. A user with no attempt for the series is a 404, not a
/// server error.
pub async fn get_user_rank(
    State(state): State<AppState>,
    Path((series_id, user_id)): Path<(i64, i64)>,
) -> Result<Response, AppError> {
    let records = state.store.records_for_series(series_id).await?;
    let standings = ranking::series_standings(&records, series_id);

    let participant = ParticipantId::User(user_id);
    let Some(rank) = ranking::position_of(&standings, &participant) else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "message": "User has not attempted this test series yet",
            })),
        )
            .into_response());
    };

    let own = &standings[rank - 1];

    Ok(Json(SeriesRankResponse {
        user_id,
        test_series_id: series_id,
        rank: rank as i64,
        total_participants: standings.len() as i64,
        score: own.score,
        correct_answers: own.correct_answers,
        incorrect_answers: own.incorrect_answers,
        skipped_questions: own.skipped_questions,
        time_taken_seconds: own.time_taken_seconds,
        completed_at: own.completed_at,
    })
    .into_response())
}
