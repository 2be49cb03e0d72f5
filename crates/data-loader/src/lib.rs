//! # Data Loader Crate
//!
//! This crate owns the data that flows in and out of the recommender.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (MovieRecord, Catalog, SimilarityMatrix)
//! - **parser**: Read the movies/credits CSV tables and join them on title
//! - **artifacts**: Save and load the catalog/similarity artifact pair
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{ArtifactStore, parser};
//! use std::path::Path;
//!
//! let joined = parser::load_from_files(
//!     Path::new("data/tmdb_5000_movies.csv"),
//!     Path::new("data/tmdb_5000_credits.csv"),
//! )?;
//! println!("{} usable rows", joined.movies.len());
//!
//! let (catalog, matrix) = ArtifactStore::new("artifacts").load()?;
//! ```

// Public modules
pub mod artifacts;
pub mod error;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use artifacts::ArtifactStore;
pub use error::{DataLoadError, Result};
pub use parser::JoinOutcome;
pub use types::{
    // Type aliases
    MovieId,
    // Core types
    Catalog,
    CatalogEntry,
    MovieRecord,
    RawMovie,
    SimilarityMatrix,
};
