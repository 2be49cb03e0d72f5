//! Content-based feature pipeline for the movie catalog.
//!
//! This crate provides:
//! - MetadataNormalizer for turning raw metadata into token sequences
//! - Vectorizer for the bounded bag-of-words vocabulary and count vectors
//! - SimilarityEngine for the all-pairs cosine similarity matrix
//! - ContentPipeline for running the whole batch job
//!
//! ## Architecture
//! The pipeline processes the catalog in stages:
//! 1. Structured fields are parsed into name lists and folded into tokens
//! 2. Tokens are stemmed, stop words dropped, and the vocabulary ranked
//! 3. Each movie becomes a count vector over the vocabulary
//! 4. Vectors are compared pairwise to fill the similarity matrix
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{ContentPipeline, PipelineConfig};
//!
//! let pipeline = ContentPipeline::new(PipelineConfig::new().with_max_features(5000));
//! let output = pipeline.run(&joined.movies)?;
//! store.save(&output.catalog, &output.similarity)?;
//! ```

pub mod content_pipeline;
pub mod metadata;
pub mod similarity;
pub mod stemmer;
pub mod stop_words;
pub mod traits;
pub mod vectorizer;

// Re-export main types
pub use content_pipeline::{ContentPipeline, PipelineConfig, PipelineOutput};
pub use metadata::{ExtractionReport, FieldError, MetadataNormalizer, NormalizedTokens};
pub use similarity::SimilarityEngine;
pub use stemmer::PorterStemmer;
pub use traits::Stemmer;
pub use vectorizer::{FeatureVector, Vectorizer, Vocabulary};
