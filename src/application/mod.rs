pub mod datasets;
pub mod error;
pub mod ratings;

pub use datasets::{DatasetService, DatasetStore, StoreError, StoredDataset, dataset_resource};
pub use error::{AppError, ErrorReport};
pub use ratings::{RatingFilter, compute_report};
