//! All-pairs cosine similarity.
//!
//! ## Performance Note
//! Only the upper triangle is computed; rows are spread across the rayon
//! pool and each cell is then written to both `(i, j)` and `(j, i)`, so the
//! result is exactly symmetric.

use crate::vectorizer::FeatureVector;
use data_loader::SimilarityMatrix;
use rayon::prelude::*;
use tracing::{info, instrument, warn};

/// Computes the N×N cosine similarity matrix of a vectorized catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityEngine;

impl SimilarityEngine {
    pub fn new() -> Self {
        Self
    }

    /// Cosine similarity of every pair of vectors.
    ///
    /// A zero vector has similarity 0 with everything, itself included.
    #[instrument(skip(self, vectors), fields(n = vectors.len()))]
    pub fn compute(&self, vectors: &[FeatureVector]) -> data_loader::Result<SimilarityMatrix> {
        let n = vectors.len();
        let norms: Vec<f64> = vectors.par_iter().map(FeatureVector::norm).collect();

        let degenerate = norms.iter().filter(|&&norm| norm == 0.0).count();
        if degenerate > 0 {
            warn!("{} of {} movies have an all-zero feature vector", degenerate, n);
        }

        let upper: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i..n)
                    .map(|j| cosine(&vectors[i], &vectors[j], norms[i], norms[j], i == j))
                    .collect()
            })
            .collect();

        let mut values = vec![0f32; n * n];
        for (i, row) in upper.into_iter().enumerate() {
            for (offset, value) in row.into_iter().enumerate() {
                let j = i + offset;
                values[i * n + j] = value;
                values[j * n + i] = value;
            }
        }

        info!("Computed {}x{} similarity matrix", n, n);
        SimilarityMatrix::from_row_major(n, values)
    }
}

fn cosine(a: &FeatureVector, b: &FeatureVector, norm_a: f64, norm_b: f64, same: bool) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    if same {
        return 1.0;
    }
    (a.dot(b) as f64 / (norm_a * norm_b)) as f32
}
