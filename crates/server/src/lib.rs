//! Server crate for the content-based recommender.
//!
//! This crate contains the query side: a `RecommendationService` built once
//! from the persisted artifact pair, and the poster lookup boundary used
//! when displaying results.

pub mod error;
pub mod posters;
pub mod service;

pub use error::RecommendError;
pub use posters::{PosterSource, TmdbPosterClient};
pub use service::{DEFAULT_LIMIT, Recommendation, RecommendationService, RecommendationWithPoster};
