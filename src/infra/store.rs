//! Filesystem-backed dataset persistence.
//!
//! Each dataset lives in `<directory>/<id>.json`. Writes go through a
//! temporary file and an atomic rename so readers never observe a
//! partially written dataset.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use crate::application::datasets::{DatasetStore, StoreError, StoredDataset};
use crate::domain::players::{Dataset, DatasetSummary};

pub struct FsDatasetStore {
    directory: PathBuf,
}

impl FsDatasetStore {
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory).await?;
        Ok(Self { directory })
    }

    fn dataset_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_id(id)?;
        Ok(self.directory.join(format!("{id}.json")))
    }
}

/// Dataset ids become file names, so only a conservative character set
/// is accepted.
fn validate_id(id: &str) -> Result<(), StoreError> {
    let acceptable = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if acceptable {
        Ok(())
    } else {
        Err(StoreError::InvalidId { id: id.to_string() })
    }
}

fn fingerprint_of(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[async_trait]
impl DatasetStore for FsDatasetStore {
    async fn store(&self, dataset: &Dataset) -> Result<String, StoreError> {
        let path = self.dataset_path(&dataset.id)?;
        let bytes = serde_json::to_vec_pretty(dataset)?;
        let fingerprint = fingerprint_of(&bytes);

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;

        debug!(dataset = %dataset.id, bytes = bytes.len(), "dataset persisted");
        Ok(fingerprint)
    }

    async fn retrieve(&self, id: &str) -> Result<Option<StoredDataset>, StoreError> {
        let path = self.dataset_path(id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let dataset: Dataset = serde_json::from_slice(&bytes)?;
        Ok(Some(StoredDataset {
            dataset,
            fingerprint: fingerprint_of(&bytes),
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let path = self.dataset_path(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> Result<Vec<DatasetSummary>, StoreError> {
        let mut summaries = Vec::new();
        let mut entries = fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = dataset_id_of(&path) else {
                continue;
            };
            let bytes = fs::read(&path).await?;
            let dataset: Dataset = serde_json::from_slice(&bytes)?;
            summaries.push(DatasetSummary {
                id,
                player_count: dataset.players.len(),
                updated_at: dataset.updated_at,
            });
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }
}

fn dataset_id_of(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}
