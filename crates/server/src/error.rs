//! Error types for query-time failures.

use data_loader::DataLoadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommendError {
    /// The query title is not in the catalog
    #[error("No movie titled '{title}' in the catalog")]
    QueryNotFound { title: String },

    /// The artifact pair could not be loaded or does not line up
    #[error(transparent)]
    Artifact(#[from] DataLoadError),
}
