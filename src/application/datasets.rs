//! Dataset orchestration.
//!
//! Wraps the durable store and wires every mutation into cache
//! invalidation, so no wire format can serve a snapshot derived from a
//! prior dataset generation.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::cache::SnapshotCache;
use crate::domain::players::{Dataset, DatasetSummary};

use super::error::AppError;

/// Durable key→dataset persistence contract, implemented by
/// `infra::store::FsDatasetStore`.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Persist a dataset and return its content fingerprint.
    async fn store(&self, dataset: &Dataset) -> Result<String, StoreError>;
    async fn retrieve(&self, id: &str) -> Result<Option<StoredDataset>, StoreError>;
    /// Returns whether the dataset existed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
    async fn list(&self) -> Result<Vec<DatasetSummary>, StoreError>;
}

/// A dataset as read back from the store.
#[derive(Debug, Clone)]
pub struct StoredDataset {
    pub dataset: Dataset,
    /// Hex-encoded SHA-256 of the persisted bytes.
    pub fingerprint: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset id `{id}` contains unsupported characters")]
    InvalidId { id: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("dataset could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Cache resource prefix for one dataset; every base key derived from the
/// dataset starts with it.
pub fn dataset_resource(dataset_id: &str) -> String {
    format!("players:{dataset_id}")
}

/// Application service over the dataset store and the snapshot cache.
pub struct DatasetService {
    store: Arc<dyn DatasetStore>,
    cache: Arc<SnapshotCache>,
}

impl DatasetService {
    pub fn new(store: Arc<dyn DatasetStore>, cache: Arc<SnapshotCache>) -> Self {
        Self { store, cache }
    }

    /// Validate and persist a dataset, then invalidate every snapshot
    /// derived from its previous generation.
    pub async fn store_dataset(&self, dataset: &Dataset) -> Result<String, AppError> {
        dataset.validate()?;
        let fingerprint = self
            .store
            .store(dataset)
            .await
            .map_err(|err| AppError::unexpected(err.to_string()))?;
        let invalidated = self.cache.delete_resource(&dataset_resource(&dataset.id));
        info!(
            dataset = %dataset.id,
            players = dataset.players.len(),
            invalidated,
            "dataset stored"
        );
        Ok(fingerprint)
    }

    pub async fn retrieve(&self, id: &str) -> Result<Option<StoredDataset>, AppError> {
        self.store
            .retrieve(id)
            .await
            .map_err(|err| AppError::unexpected(err.to_string()))
    }

    /// Delete a dataset and all of its cached variants. Returns whether
    /// the dataset existed.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let existed = self
            .store
            .delete(id)
            .await
            .map_err(|err| AppError::unexpected(err.to_string()))?;
        let invalidated = self.cache.delete_resource(&dataset_resource(id));
        info!(dataset = %id, existed, invalidated, "dataset deleted");
        Ok(existed)
    }

    pub async fn list(&self) -> Result<Vec<DatasetSummary>, AppError> {
        self.store
            .list()
            .await
            .map_err(|err| AppError::unexpected(err.to_string()))
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }
}
