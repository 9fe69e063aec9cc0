// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};

use crate::models::progress::{Attempt, ParticipantId, ProgressRecord};

use super::{ContentDirectory, ProgressStore, SeriesMeta, StoreError, UserDirectory};

/// Progress documents in Postgres: one row per participant, attempts held
/// in a JSONB array so the whole record writes in one statement.
#[derive(Clone)]
pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    user_id: Option<i64>,
    guest_id: Option<String>,
    attempts: Json<Vec<Attempt>>,
    total_completed: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProgressRow> for ProgressRecord {
    type Error = StoreError;

    fn try_from(row: ProgressRow) -> Result<Self, StoreError> {
        // The table CHECK makes this unreachable, but a migrated or
        // hand-edited row should fail loudly rather than misattribute.
        let participant = match (row.user_id, row.guest_id) {
            (Some(id), None) => ParticipantId::User(id),
            (None, Some(token)) => ParticipantId::Guest(token),
            _ => {
                return Err(StoreError::Corrupt(
                    "record carries neither or both identities".to_string(),
                ));
            }
        };

        Ok(ProgressRecord {
            participant,
            attempts: row.attempts.0,
            total_completed: row.total_completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn record_attempt(
        &self,
        participant: &ParticipantId,
        attempt: Attempt,
    ) -> Result<ProgressRecord, StoreError> {
        let key = participant.storage_key();
        let mut tx = self.pool.begin().await?;

        // Lock the participant's row so concurrent submissions serialize;
        // the upsert below still wins cleanly when two first submissions
        // race on a row that does not exist yet.
        let existing = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT user_id, guest_id, attempts, total_completed, created_at, updated_at
            FROM progress_records
            WHERE participant_key = $1
            FOR UPDATE
            "#,
        )
        .bind(&key)
        .fetch_optional(&mut *tx)
        .await?;

        let mut record = match existing {
            Some(row) => ProgressRecord::try_from(row)?,
            None => ProgressRecord::new(participant.clone(), attempt.completed_at),
        };
        record.apply_attempt(attempt);

        sqlx::query(
            r#"
            INSERT INTO progress_records
                (participant_key, user_id, guest_id, attempts, total_completed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (participant_key) DO UPDATE SET
                attempts = EXCLUDED.attempts,
                total_completed = EXCLUDED.total_completed,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&key)
        .bind(record.participant.user_id())
        .bind(record.participant.guest_id())
        .bind(Json(&record.attempts))
        .bind(record.total_completed)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn find_record(
        &self,
        participant: &ParticipantId,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        let row = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT user_id, guest_id, attempts, total_completed, created_at, updated_at
            FROM progress_records
            WHERE participant_key = $1
            "#,
        )
        .bind(participant.storage_key())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProgressRecord::try_from).transpose()
    }

    async fn all_records(&self) -> Result<Vec<ProgressRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT user_id, guest_id, attempts, total_completed, created_at, updated_at
            FROM progress_records
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProgressRecord::try_from).collect()
    }

    async fn records_for_series(&self, series_id: i64) -> Result<Vec<ProgressRecord>, StoreError> {
        // JSONB containment, served by the GIN index on attempts.
        let rows = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT user_id, guest_id, attempts, total_completed, created_at, updated_at
            FROM progress_records
            WHERE attempts @> jsonb_build_array(jsonb_build_object('test_series_id', $1::bigint))
            ORDER BY id
            "#,
        )
        .bind(series_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProgressRecord::try_from).collect()
    }
}

/// Series metadata lookups against the platform's `test_series` table.
#[derive(Clone)]
pub struct PgContentDirectory {
    pool: PgPool,
}

impl PgContentDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SeriesMetaRow {
    id: i64,
    title: String,
    subject_name: String,
}

#[async_trait]
impl ContentDirectory for PgContentDirectory {
    async fn series_meta(&self, ids: &[i64]) -> Result<HashMap<i64, SeriesMeta>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query_builder = sqlx::QueryBuilder::<Postgres>::new(
            "SELECT id, title, subject_name FROM test_series WHERE id IN (",
        );
        let mut separated = query_builder.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<SeriesMetaRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.id,
                    SeriesMeta {
                        title: row.title,
                        subject_name: row.subject_name,
                    },
                )
            })
            .collect())
    }
}

/// Display-name lookups against the platform's `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserNameRow {
    id: i64,
    name: String,
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn display_names(&self, ids: &[i64]) -> Result<HashMap<i64, String>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query_builder =
            sqlx::QueryBuilder::<Postgres>::new("SELECT id, name FROM users WHERE id IN (");
        let mut separated = query_builder.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<UserNameRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| (row.id, row.name)).collect())
    }
}
