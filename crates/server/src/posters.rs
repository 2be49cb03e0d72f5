//! Poster lookup boundary.
//!
//! Posters are decoration: every lookup may fail or time out, and either
//! case only means "no image". Nothing here can fail a recommendation.

use async_trait::async_trait;
use data_loader::MovieId;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const API_KEY_ENV: &str = "TMDB_API_KEY";
const API_URL: &str = "https://api.themoviedb.org/3";
const IMAGE_URL: &str = "https://image.tmdb.org/t/p/w500";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves a movie id to a poster image URL
#[async_trait]
pub trait PosterSource: Send + Sync {
    /// `None` when there is no poster or the lookup failed
    async fn poster_url(&self, movie_id: MovieId) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct MovieDetails {
    poster_path: Option<String>,
}

/// Full image URL for a TMDB `poster_path`
pub fn image_url(poster_path: &str) -> String {
    format!("{}/{}", IMAGE_URL, poster_path.trim_start_matches('/'))
}

/// Looks posters up through the TMDB movie details endpoint
#[derive(Clone)]
pub struct TmdbPosterClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbPosterClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let http_client = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        Self {
            http_client,
            api_key: api_key.into(),
            api_url: API_URL.to_string(),
        }
    }

    /// Client keyed from `TMDB_API_KEY`, or `None` if it is unset
    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(Self::new)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    async fn fetch(&self, movie_id: MovieId) -> reqwest::Result<MovieDetails> {
        self.http_client
            .get(format!("{}/movie/{}", self.api_url, movie_id))
            .query(&[("api_key", self.api_key.as_str()), ("language", "en-US")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl PosterSource for TmdbPosterClient {
    async fn poster_url(&self, movie_id: MovieId) -> Option<String> {
        match self.fetch(movie_id).await {
            Ok(details) => details.poster_path.as_deref().map(image_url),
            Err(e) => {
                debug!(error = %e, movie_id, "Poster lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url("/kqjL17yufvn9OVLyXYpvtyrFfak.jpg"),
            "https://image.tmdb.org/t/p/w500/kqjL17yufvn9OVLyXYpvtyrFfak.jpg"
        );
        assert_eq!(image_url("x.jpg"), "https://image.tmdb.org/t/p/w500/x.jpg");
    }

    #[tokio::test]
    async fn test_unreachable_api_yields_no_poster() {
        // Port 9 on localhost is not listening
        let client = TmdbPosterClient::new("key").with_api_url("http://127.0.0.1:9");
        assert_eq!(client.poster_url(19995).await, None);
    }
}
