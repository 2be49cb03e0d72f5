//! The offline batch job: records in, catalog and similarity matrix out.
//!
//! ## Stages
//! 1. Extract typed records from joined rows (malformed fields degrade)
//! 2. Normalize each record into tokens
//! 3. Fit the vocabulary and vectorize
//! 4. Compute the similarity matrix
//!
//! Every stage rebuilds from scratch; there is no incremental path.

use crate::metadata::{
    DEFAULT_CAST_LIMIT, DEFAULT_DIRECTOR_JOB, ExtractionReport, MetadataNormalizer,
};
use crate::similarity::SimilarityEngine;
use crate::traits::Stemmer;
use crate::vectorizer::{DEFAULT_MAX_FEATURES, FeatureVector, Vectorizer, Vocabulary};
use anyhow::{Context, Result};
use data_loader::{Catalog, MovieRecord, RawMovie, SimilarityMatrix};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Tunables for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Vocabulary cap (V)
    pub max_features: usize,
    /// Leading cast members kept per movie
    pub cast_limit: usize,
    /// Crew job that identifies the director
    pub director_job: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            cast_limit: DEFAULT_CAST_LIMIT,
            director_job: DEFAULT_DIRECTOR_JOB.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_cast_limit(mut self, cast_limit: usize) -> Self {
        self.cast_limit = cast_limit;
        self
    }

    pub fn with_director_job(mut self, job: impl Into<String>) -> Self {
        self.director_job = job.into();
        self
    }
}

/// Everything a run produces. Only `catalog` and `similarity` are persisted.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub catalog: Catalog,
    pub vocabulary: Vocabulary,
    pub vectors: Vec<FeatureVector>,
    pub similarity: SimilarityMatrix,
    pub report: ExtractionReport,
}

#[derive(Debug, Clone)]
pub struct ContentPipeline {
    config: PipelineConfig,
    normalizer: MetadataNormalizer,
    engine: SimilarityEngine,
}

impl Default for ContentPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl ContentPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let normalizer = MetadataNormalizer::new()
            .with_cast_limit(config.cast_limit)
            .with_director_job(config.director_job.clone());
        Self {
            config,
            normalizer,
            engine: SimilarityEngine::new(),
        }
    }

    /// Swap the stemming rules used during normalization
    pub fn with_stemmer(mut self, stemmer: Arc<dyn Stemmer>) -> Self {
        self.normalizer = self.normalizer.with_stemmer(stemmer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole job over joined source rows
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn run(&self, rows: &[RawMovie]) -> Result<PipelineOutput> {
        let (records, report) = self.normalizer.extract_all(rows);
        let mut output = self.run_records(&records)?;
        output.report = report;
        Ok(output)
    }

    /// Run the job over records that are already typed
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn run_records(&self, records: &[MovieRecord]) -> Result<PipelineOutput> {
        let start = Instant::now();

        let tokens = self.normalizer.normalize_all(records);
        let vectorizer = Vectorizer::fit(&tokens, self.config.max_features);
        let vectors = vectorizer.transform_all(&tokens);
        let similarity = self
            .engine
            .compute(&vectors)
            .context("Failed to compute similarity matrix")?;
        let catalog = Catalog::from_records(records);

        info!(
            "Pipeline finished: {} movies, {} terms in {:.2?}",
            catalog.len(),
            vectorizer.vocabulary().len(),
            start.elapsed()
        );

        Ok(PipelineOutput {
            catalog,
            vocabulary: vectorizer.into_vocabulary(),
            vectors,
            similarity,
            report: ExtractionReport {
                records: records.len(),
                ..Default::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = PipelineConfig::new()
            .with_max_features(10)
            .with_cast_limit(5)
            .with_director_job("Producer");
        assert_eq!(config.max_features, 10);
        assert_eq!(config.cast_limit, 5);
        assert_eq!(config.director_job, "Producer");
        assert_eq!(PipelineConfig::default().max_features, 5000);
    }

    #[test]
    fn test_run_records_aligns_catalog_and_matrix() {
        let records: Vec<MovieRecord> = (0..4)
            .map(|i| MovieRecord {
                id: i,
                title: format!("Movie {}", i),
                overview: format!("shared word{}", i),
                ..Default::default()
            })
            .collect();
        let output = ContentPipeline::default().run_records(&records).unwrap();

        assert_eq!(output.catalog.len(), 4);
        assert_eq!(output.similarity.dim(), 4);
        assert_eq!(output.vectors.len(), 4);
        assert_eq!(output.vocabulary.term(0), Some("share"));
        assert_eq!(output.catalog.get(2).map(|e| e.id), Some(2));
    }
}
