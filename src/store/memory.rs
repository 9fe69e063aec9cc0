// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::progress::{Attempt, ParticipantId, ProgressRecord};

use super::{ContentDirectory, ProgressStore, SeriesMeta, StoreError, UserDirectory};

/// Progress documents held in process memory.
///
/// Backs the integration tests and local runs without a database nearby.
/// First-submission order is preserved so scans are deterministic, the
/// way rows come back from the table scan in Postgres.
#[derive(Default)]
pub struct MemoryProgressStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    order: Vec<String>,
    records: HashMap<String, ProgressRecord>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn record_attempt(
        &self,
        participant: &ParticipantId,
        attempt: Attempt,
    ) -> Result<ProgressRecord, StoreError> {
        // The write guard spans the whole read-modify-write, so a racing
        // submission for the same participant cannot interleave.
        let mut inner = self.inner.write().await;
        let key = participant.storage_key();

        if !inner.records.contains_key(&key) {
            inner.order.push(key.clone());
            inner.records.insert(
                key.clone(),
                ProgressRecord::new(participant.clone(), attempt.completed_at),
            );
        }

        let record = inner
            .records
            .get_mut(&key)
            .ok_or_else(|| StoreError::Corrupt("record vanished mid-write".to_string()))?;
        record.apply_attempt(attempt);

        Ok(record.clone())
    }

    async fn find_record(
        &self,
        participant: &ParticipantId,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.records.get(&participant.storage_key()).cloned())
    }

    async fn all_records(&self) -> Result<Vec<ProgressRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|key| inner.records.get(key).cloned())
            .collect())
    }

    async fn records_for_series(&self, series_id: i64) -> Result<Vec<ProgressRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|key| inner.records.get(key))
            .filter(|record| record.attempt_for(series_id).is_some())
            .cloned()
            .collect())
    }
}

/// In-memory series catalog, seeded by tests.
#[derive(Default)]
pub struct MemoryContentDirectory {
    series: RwLock<HashMap<i64, SeriesMeta>>,
}

impl MemoryContentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: i64, title: &str, subject_name: &str) {
        self.series.write().await.insert(
            id,
            SeriesMeta {
                title: title.to_string(),
                subject_name: subject_name.to_string(),
            },
        );
    }
}

#[async_trait]
impl ContentDirectory for MemoryContentDirectory {
    async fn series_meta(&self, ids: &[i64]) -> Result<HashMap<i64, SeriesMeta>, StoreError> {
        let series = self.series.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| series.get(id).map(|meta| (*id, meta.clone())))
            .collect())
    }
}

/// In-memory user directory, seeded by tests.
#[derive(Default)]
pub struct MemoryUserDirectory {
    names: RwLock<HashMap<i64, String>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: i64, name: &str) {
        self.names.write().await.insert(id, name.to_string());
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn display_names(&self, ids: &[i64]) -> Result<HashMap<i64, String>, StoreError> {
        let names = self.names.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| names.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}
