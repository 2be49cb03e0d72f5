//! Metadata normalization.
//!
//! Turns joined source rows into typed `MovieRecord`s, then folds each record
//! into a single token sequence (the movie's "tags").
//!
//! ## Field handling
//! - genres, keywords, cast and crew arrive as JSON arrays of objects with a
//!   `name` key (crew entries also carry a `job`)
//! - a field that is blank or fails to parse becomes an empty list, and the
//!   reason is kept in an `ExtractionReport` instead of failing the record

use crate::stemmer::PorterStemmer;
use crate::traits::Stemmer;
use data_loader::{MovieRecord, RawMovie};
use rayon::prelude::*;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const DEFAULT_CAST_LIMIT: usize = 3;
pub const DEFAULT_DIRECTOR_JOB: &str = "Director";

/// Why a structured field resolved to an empty list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("field is absent")]
    Absent,

    #[error("field is malformed: {0}")]
    Malformed(String),
}

/// Counts of degraded fields seen during extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub records: usize,
    pub absent_fields: usize,
    pub malformed_fields: usize,
}

impl ExtractionReport {
    fn note(&mut self, error: &FieldError) {
        match error {
            FieldError::Absent => self.absent_fields += 1,
            FieldError::Malformed(_) => self.malformed_fields += 1,
        }
    }

    pub fn merge(mut self, other: ExtractionReport) -> Self {
        self.records += other.records;
        self.absent_fields += other.absent_fields;
        self.malformed_fields += other.malformed_fields;
        self
    }

    pub fn is_clean(&self) -> bool {
        self.absent_fields == 0 && self.malformed_fields == 0
    }
}

/// Ordered, lowercase, whitespace-free tokens describing one movie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTokens {
    tokens: Vec<String>,
}

impl NormalizedTokens {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct NamedEntry {
    name: String,
    #[serde(default)]
    job: Option<String>,
}

fn parse_entries(raw: &str) -> Result<Vec<NamedEntry>, FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FieldError::Absent);
    }
    serde_json::from_str(raw).map_err(|e| FieldError::Malformed(e.to_string()))
}

/// All `name` values of a JSON name list, in order
pub fn extract_names(raw: &str) -> Result<Vec<String>, FieldError> {
    Ok(parse_entries(raw)?.into_iter().map(|entry| entry.name).collect())
}

/// The first `limit` cast names
pub fn extract_cast(raw: &str, limit: usize) -> Result<Vec<String>, FieldError> {
    Ok(parse_entries(raw)?
        .into_iter()
        .take(limit)
        .map(|entry| entry.name)
        .collect())
}

/// Name of the first crew member whose job is `job`, if any
pub fn extract_director(raw: &str, job: &str) -> Result<Vec<String>, FieldError> {
    Ok(parse_entries(raw)?
        .into_iter()
        .find(|entry| entry.job.as_deref() == Some(job))
        .map(|entry| entry.name)
        .into_iter()
        .collect())
}

/// "Sam Worthington" -> "SamWorthington"
fn squash(name: &str) -> String {
    name.split_whitespace().collect()
}

/// Builds `MovieRecord`s and their normalized token sequences.
#[derive(Clone)]
pub struct MetadataNormalizer {
    stemmer: Arc<dyn Stemmer>,
    cast_limit: usize,
    director_job: String,
}

impl fmt::Debug for MetadataNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataNormalizer")
            .field("stemmer", &self.stemmer.name())
            .field("cast_limit", &self.cast_limit)
            .field("director_job", &self.director_job)
            .finish()
    }
}

impl Default for MetadataNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataNormalizer {
    pub fn new() -> Self {
        Self {
            stemmer: Arc::new(PorterStemmer::new()),
            cast_limit: DEFAULT_CAST_LIMIT,
            director_job: DEFAULT_DIRECTOR_JOB.to_string(),
        }
    }

    pub fn with_stemmer(mut self, stemmer: Arc<dyn Stemmer>) -> Self {
        self.stemmer = stemmer;
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

    /// Extract a typed record from one joined row.
    ///
    /// Never fails: a bad field becomes an empty list and is counted.
    pub fn extract_record(&self, raw: &RawMovie) -> (MovieRecord, ExtractionReport) {
        let mut report = ExtractionReport {
            records: 1,
            ..Default::default()
        };
        let mut field = |name: &str, parsed: Result<Vec<String>, FieldError>| {
            parsed.unwrap_or_else(|error| {
                debug!("Movie {} ({}): {} {}", raw.movie_id, raw.title, name, error);
                report.note(&error);
                Vec::new()
            })
        };

        let genres = field("genres", extract_names(&raw.genres));
        let keywords = field("keywords", extract_names(&raw.keywords));
        let cast = field("cast", extract_cast(&raw.cast, self.cast_limit));
        let director = field("crew", extract_director(&raw.crew, &self.director_job));

        let record = MovieRecord {
            id: raw.movie_id,
            title: raw.title.clone(),
            overview: raw.overview.clone(),
            genres,
            keywords,
            cast,
            director,
        };
        (record, report)
    }

    /// Extract every row in parallel, keeping input order
    #[instrument(skip(self, raws), fields(rows = raws.len()))]
    pub fn extract_all(&self, raws: &[RawMovie]) -> (Vec<MovieRecord>, ExtractionReport) {
        let (records, reports): (Vec<_>, Vec<_>) = raws
            .par_iter()
            .map(|raw| self.extract_record(raw))
            .unzip();
        let report = reports
            .into_iter()
            .fold(ExtractionReport::default(), ExtractionReport::merge);

        info!(
            "Extracted {} records ({} absent fields, {} malformed fields)",
            report.records, report.absent_fields, report.malformed_fields
        );
        (records, report)
    }

    /// Fold a record into its token sequence.
    ///
    /// Field order is overview, genres, keywords, cast, director. Names lose
    /// their internal whitespace, then every token is lowercased and stemmed.
    pub fn normalize(&self, record: &MovieRecord) -> NormalizedTokens {
        let overview = record.overview.split_whitespace().map(str::to_string);
        let names = record
            .genres
            .iter()
            .chain(&record.keywords)
            .chain(record.cast.iter().take(self.cast_limit))
            .chain(record.director.iter().take(1))
            .map(|name| squash(name));

        let tokens = overview
            .chain(names)
            .filter(|token| !token.is_empty())
            .map(|token| self.stemmer.stem(&token.to_lowercase()))
            .collect();
        NormalizedTokens::new(tokens)
    }

    /// Normalize every record in parallel, keeping catalog order
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn normalize_all(&self, records: &[MovieRecord]) -> Vec<NormalizedTokens> {
        let tokens: Vec<NormalizedTokens> = records
            .par_iter()
            .map(|record| self.normalize(record))
            .collect();
        debug!(
            "Normalized {} records into {} tokens",
            tokens.len(),
            tokens.iter().map(NormalizedTokens::len).sum::<usize>()
        );
        tokens
    }
}
