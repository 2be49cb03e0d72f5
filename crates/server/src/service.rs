//! # Recommendation Service
//!
//! Query side of the recommender. The service is built once from a matched
//! catalog/similarity pair and never mutates it afterwards, so a single
//! instance can answer queries from any number of tasks at once.
//!
//! ## Ranking
//! 1. Resolve the title to the first catalog row with that exact title
//! 2. Take that row of the similarity matrix, minus the query itself
//! 3. Stable-sort by similarity descending, so equal scores keep ascending
//!    index order
//! 4. Return the first k

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use data_loader::{ArtifactStore, Catalog, CatalogEntry, MovieId, SimilarityMatrix, artifacts};

use crate::error::RecommendError;
use crate::posters::PosterSource;

pub const DEFAULT_LIMIT: usize = 5;
const DEFAULT_POSTER_TIMEOUT: Duration = Duration::from_secs(3);

/// One ranked result
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub movie_id: MovieId,
    pub title: String,
    pub score: f32,
}

/// A ranked result together with its poster, when one was found
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationWithPoster {
    pub recommendation: Recommendation,
    pub poster_url: Option<String>,
}

/// Serves top-k queries over an immutable catalog/similarity pair
#[derive(Debug, Clone)]
pub struct RecommendationService {
    catalog: Arc<Catalog>,
    matrix: Arc<SimilarityMatrix>,
    poster_timeout: Duration,
}

impl RecommendationService {
    /// Wrap an in-memory pair, refusing one that is misaligned or holds
    /// anything other than finite cosines
    pub fn new(catalog: Catalog, matrix: SimilarityMatrix) -> Result<Self, RecommendError> {
        artifacts::check_aligned(&catalog, &matrix)?;
        matrix.check_scores()?;
        Ok(Self {
            catalog: Arc::new(catalog),
            matrix: Arc::new(matrix),
            poster_timeout: DEFAULT_POSTER_TIMEOUT,
        })
    }

    /// Load the artifact pair from `dir` or fail
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RecommendError> {
        let (catalog, matrix) = ArtifactStore::new(dir.as_ref()).load()?;
        info!("Recommendation service ready with {} movies", catalog.len());
        Self::new(catalog, matrix)
    }

    /// Upper bound on each poster lookup
    pub fn with_poster_timeout(mut self, timeout: Duration) -> Self {
        self.poster_timeout = timeout;
        self
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Every title in catalog order
    pub fn titles(&self) -> Vec<&str> {
        self.catalog.iter().map(|entry| entry.title.as_str()).collect()
    }

    /// Case-insensitive substring search, exact matches first
    pub fn search(&self, fragment: &str) -> Vec<&CatalogEntry> {
        let needle = fragment.to_lowercase();
        let mut matches: Vec<(bool, &CatalogEntry)> = self
            .catalog
            .iter()
            .filter_map(|entry| {
                let title = entry.title.to_lowercase();
                title
                    .contains(&needle)
                    .then_some((title != needle, entry))
            })
            .collect();
        // stable: catalog order within each group
        matches.sort_by_key(|(partial, _)| *partial);
        matches.into_iter().map(|(_, entry)| entry).collect()
    }

    /// Top `k` movies most similar to `title`.
    ///
    /// Returns `min(k, N - 1)` results and never the query itself. An unknown
    /// title is an error, not an empty list.
    #[instrument(skip(self))]
    pub fn recommend(&self, title: &str, k: usize) -> Result<Vec<Recommendation>, RecommendError> {
        let query = self
            .catalog
            .position_of(title)
            .ok_or_else(|| RecommendError::QueryNotFound {
                title: title.to_string(),
            })?;

        let mut scored: Vec<(usize, f32)> = self
            .matrix
            .row(query)
            .iter()
            .copied()
            .enumerate()
            .filter(|&(index, _)| index != query)
            .collect();

        // Stable, so equal scores keep ascending index order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let recommendations: Vec<Recommendation> = scored
            .into_iter()
            .filter_map(|(index, score)| {
                let entry = self.catalog.get(index)?;
                Some(Recommendation {
                    movie_id: entry.id,
                    title: entry.title.clone(),
                    score,
                })
            })
            .collect();

        debug!("Ranked {} recommendations for row {}", recommendations.len(), query);
        Ok(recommendations)
    }

    /// Like `recommend`, with posters looked up concurrently.
    ///
    /// Each lookup gets `poster_timeout`; a slow or failed lookup leaves
    /// that poster empty and never fails the call.
    pub async fn recommend_with_posters(
        &self,
        title: &str,
        k: usize,
        posters: Arc<dyn PosterSource>,
    ) -> Result<Vec<RecommendationWithPoster>, RecommendError> {
        let recommendations = self.recommend(title, k)?;

        let mut lookups = JoinSet::new();
        for (slot, rec) in recommendations.iter().enumerate() {
            let posters = posters.clone();
            let movie_id = rec.movie_id;
            let timeout = self.poster_timeout;
            lookups.spawn(async move {
                let url = tokio::time::timeout(timeout, posters.poster_url(movie_id))
                    .await
                    .ok()
                    .flatten();
                (slot, url)
            });
        }

        let mut urls: Vec<Option<String>> = vec![None; recommendations.len()];
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((slot, url)) => urls[slot] = url,
                Err(e) => debug!(error = %e, "Poster task failed"),
            }
        }

        Ok(recommendations
            .into_iter()
            .zip(urls)
            .map(|(recommendation, poster_url)| RecommendationWithPoster {
                recommendation,
                poster_url,
            })
            .collect())
    }
}
