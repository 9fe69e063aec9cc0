// src/store/mod.rs

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::progress::{Attempt, ParticipantId, ProgressRecord};

pub use memory::{MemoryContentDirectory, MemoryProgressStore, MemoryUserDirectory};
pub use postgres::{PgContentDirectory, PgProgressStore, PgUserDirectory};

/// Storage layer failures. Handlers surface these as a 500 with no
/// partial state change, since every write is a whole-record swap.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored record is inconsistent: {0}")]
    Corrupt(String),
}

/// Display metadata for a test series, owned by the content catalog.
#[derive(Debug, Clone)]
pub struct SeriesMeta {
    pub title: String,
    pub subject_name: String,
}

/// Per-participant progress documents.
///
/// One document per participant; `record_attempt` is the only writer and
/// must apply the whole read-modify-write as a single atomic unit, so
/// concurrent submissions for the same participant cannot lose updates.
/// The scan methods take no locks; a concurrent write may or may not be
/// visible in their snapshot.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Creates or loads the participant's record, swaps in the attempt
    /// (replacing any stored attempt for the same series), recounts and
    /// persists. Returns the saved record.
    async fn record_attempt(
        &self,
        participant: &ParticipantId,
        attempt: Attempt,
    ) -> Result<ProgressRecord, StoreError>;

    async fn find_record(
        &self,
        participant: &ParticipantId,
    ) -> Result<Option<ProgressRecord>, StoreError>;

    /// Full scan, in stable stored order.
    async fn all_records(&self) -> Result<Vec<ProgressRecord>, StoreError>;

    /// Records containing an attempt for the given series, in stable
    /// stored order.
    async fn records_for_series(&self, series_id: i64) -> Result<Vec<ProgressRecord>, StoreError>;
}

/// Read-side lookup into the externally owned series catalog.
#[async_trait]
pub trait ContentDirectory: Send + Sync {
    /// Batch-resolves ids to display metadata. Unknown ids are simply
    /// absent from the map; callers substitute their own fallback.
    async fn series_meta(&self, ids: &[i64]) -> Result<HashMap<i64, SeriesMeta>, StoreError>;
}

/// Read-side lookup into the externally owned user accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn display_names(&self, ids: &[i64]) -> Result<HashMap<i64, String>, StoreError>;
}
