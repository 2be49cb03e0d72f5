//! Core traits for the normalization stage.
//!
//! The normalizer reduces every token through a `Stemmer`, so the
//! stemming rules can be swapped without touching field extraction.

/// Maps a lowercase token to its root form.
///
/// ## Design Note
/// - `Send + Sync` lets one stemmer serve every rayon worker
/// - Implementations must be deterministic, and `stem` applied to its own
///   output must return that output unchanged
pub trait Stemmer: Send + Sync {
    /// Returns the name of this stemmer (for logging/debugging)
    fn name(&self) -> &str;

    /// Reduce `token` to its root.
    fn stem(&self, token: &str) -> String;
}
