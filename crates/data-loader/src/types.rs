//! Core domain types for the content-based recommender.
//!
//! The shapes here are shared by every stage of the system:
//! - `RawMovie`: one joined row from the movies and credits tables
//! - `MovieRecord`: the typed per-movie metadata the pipeline consumes
//! - `Catalog` and `SimilarityMatrix`: the persisted artifact pair
//!
//! The catalog and the matrix share one index space. Row `i` of the
//! matrix always describes `catalog.get(i)`.

use crate::error::{DataLoadError, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// Type Aliases
// =============================================================================

/// TMDB identifier for a movie (not guaranteed unique across a catalog)
pub type MovieId = u32;

// =============================================================================
// Movie Metadata
// =============================================================================

/// One row produced by joining the movies table with the credits table.
///
/// Structured columns (`genres`, `keywords`, `cast`, `crew`) are kept as the
/// raw JSON text found in the source files. Extracting names from them is the
/// normalizer's job, so a malformed cell only degrades that one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMovie {
    pub movie_id: MovieId,
    pub title: String,
    pub overview: String,
    pub genres: String,
    pub keywords: String,
    pub cast: String,
    pub crew: String,
}

/// Typed metadata for a single catalog entry.
///
/// `cast` holds the leading cast members and `director` holds at most one
/// name, but nothing here enforces that: the normalizer re-applies its own
/// limits when it builds tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: MovieId,
    pub title: String,
    pub overview: String,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub cast: Vec<String>,
    pub director: Vec<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A single `(id, title)` row of the catalog artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: MovieId,
    pub title: String,
}

/// Ordered list of catalog entries, index-aligned with the similarity matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Build the catalog from records, preserving their order
    pub fn from_records(records: &[MovieRecord]) -> Self {
        let entries = records
            .iter()
            .map(|record| CatalogEntry {
                id: record.id,
                title: record.title.clone(),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Row index of the first entry whose title matches exactly.
    ///
    /// Duplicate titles are not disambiguated: the earliest row wins.
    pub fn position_of(&self, title: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.title == title)
    }
}

// =============================================================================
// Similarity Matrix
// =============================================================================

/// Dense N×N matrix of cosine similarities, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    dim: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Wrap row-major values, checking they form a square matrix
    pub fn from_row_major(dim: usize, values: Vec<f32>) -> Result<Self> {
        let expected = dim.checked_mul(dim).ok_or_else(|| {
            DataLoadError::ValidationError(format!("matrix dimension {} overflows", dim))
        })?;
        if values.len() != expected {
            return Err(DataLoadError::ValidationError(format!(
                "expected {} values for a {}x{} matrix, got {}",
                expected,
                dim,
                dim,
                values.len()
            )));
        }
        Ok(Self { dim, values })
    }

    /// Number of rows (and columns)
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.dim || col >= self.dim {
            return None;
        }
        Some(self.values[row * self.dim + col])
    }

    /// Borrow one row; empty slice when out of range
    pub fn row(&self, row: usize) -> &[f32] {
        if row >= self.dim {
            return &[];
        }
        let start = row * self.dim;
        &self.values[start..start + self.dim]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Error unless every value is a finite cosine in [-1, 1]
    pub fn check_scores(&self) -> Result<()> {
        match self.values.iter().position(|v| !is_cosine(*v)) {
            None => Ok(()),
            Some(pos) => Err(DataLoadError::InvalidArtifact(format!(
                "similarity ({}, {}) is {}, not a cosine",
                pos / self.dim,
                pos % self.dim,
                self.values[pos]
            ))),
        }
    }
}

/// Slack for rounding at the ends of [-1, 1]
const COSINE_TOLERANCE: f32 = 1e-4;

fn is_cosine(value: f32) -> bool {
    value.is_finite() && value.abs() <= 1.0 + COSINE_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: MovieId, title: &str) -> CatalogEntry {
        CatalogEntry {
            id,
            title: title.to_string(),
        }
    }

    #[test]
    fn test_position_of_picks_first_duplicate() {
        let catalog = Catalog::new(vec![
            entry(1, "Batman"),
            entry(2, "Heat"),
            entry(3, "Batman"),
        ]);

        assert_eq!(catalog.position_of("Batman"), Some(0));
        assert_eq!(catalog.position_of("Heat"), Some(1));
        assert_eq!(catalog.position_of("batman"), None);
    }

    #[test]
    fn test_catalog_from_records_keeps_order() {
        let records = vec![
            MovieRecord {
                id: 10,
                title: "Alien".to_string(),
                ..Default::default()
            },
            MovieRecord {
                id: 5,
                title: "Aliens".to_string(),
                ..Default::default()
            },
        ];

        let catalog = Catalog::from_records(&records);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(0), Some(&entry(10, "Alien")));
        assert_eq!(catalog.get(1), Some(&entry(5, "Aliens")));
    }

    #[test]
    fn test_matrix_rejects_non_square_values() {
        let result = SimilarityMatrix::from_row_major(2, vec![1.0, 0.0, 0.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_matrix_row_access() {
        let matrix = SimilarityMatrix::from_row_major(2, vec![1.0, 0.25, 0.25, 1.0]).unwrap();

        assert_eq!(matrix.dim(), 2);
        assert_eq!(matrix.row(1), &[0.25, 1.0]);
        assert_eq!(matrix.get(0, 1), Some(0.25));
        assert_eq!(matrix.get(2, 0), None);
        assert!(matrix.row(5).is_empty());
    }

    #[test]
    fn test_check_scores_rejects_non_cosines() {
        let good = SimilarityMatrix::from_row_major(2, vec![1.0, -0.5, -0.5, 1.0]).unwrap();
        assert!(good.check_scores().is_ok());

        for bad in [f32::NAN, f32::INFINITY, 1.5, -2.0] {
            let matrix = SimilarityMatrix::from_row_major(2, vec![1.0, bad, 0.0, 1.0]).unwrap();
            assert!(matches!(
                matrix.check_scores(),
                Err(DataLoadError::InvalidArtifact(_))
            ));
        }
    }
}
