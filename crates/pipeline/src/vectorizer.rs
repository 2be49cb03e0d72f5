//! Bag-of-words vectorization.
//!
//! `Vectorizer::fit` ranks every non-stop-word token by corpus frequency and
//! keeps the top `max_features` as the vocabulary. Equal counts keep the
//! order in which the tokens were first seen, so the vocabulary is a pure
//! function of the corpus.

use crate::metadata::NormalizedTokens;
use crate::stop_words::is_stop_word;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

pub const DEFAULT_MAX_FEATURES: usize = 5000;

/// Ranked terms used as feature dimensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn from_terms(terms: Vec<String>) -> Self {
        let index = terms
            .iter()
            .enumerate()
            .map(|(j, term)| (term.clone(), j))
            .collect();
        Self { terms, index }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn term(&self, j: usize) -> Option<&str> {
        self.terms.get(j).map(String::as_str)
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

/// Count vector over a vocabulary.
///
/// Stored as `(term index, count)` pairs sorted by index with zero counts
/// omitted; reads behave like a dense vector of length `dims()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureVector {
    dims: usize,
    entries: Vec<(usize, u32)>,
}

impl FeatureVector {
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Count for term `j` (0 outside the vocabulary)
    pub fn get(&self, j: usize) -> u32 {
        self.entries
            .binary_search_by_key(&j, |&(index, _)| index)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0)
    }

    pub fn entries(&self) -> &[(usize, u32)] {
        &self.entries
    }

    pub fn to_dense(&self) -> Vec<u32> {
        let mut dense = vec![0; self.dims];
        for &(j, count) in &self.entries {
            dense[j] = count;
        }
        dense
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        self.entries
            .iter()
            .map(|&(_, count)| (count as f64) * (count as f64))
            .sum::<f64>()
            .sqrt()
    }

    pub fn dot(&self, other: &FeatureVector) -> u64 {
        let (a, b) = (&self.entries, &other.entries);
        let (mut p, mut q) = (0, 0);
        let mut sum = 0u64;
        while p < a.len() && q < b.len() {
            let ((i, x), (j, y)) = (a[p], b[q]);
            match i.cmp(&j) {
                std::cmp::Ordering::Less => p += 1,
                std::cmp::Ordering::Greater => q += 1,
                std::cmp::Ordering::Equal => {
                    sum += x as u64 * y as u64;
                    p += 1;
                    q += 1;
                }
            }
        }
        sum
    }
}

/// Maps token sequences to count vectors over a fitted vocabulary
#[derive(Debug, Clone, Default)]
pub struct Vectorizer {
    vocabulary: Vocabulary,
}

impl Vectorizer {
    /// Reuse an existing vocabulary verbatim
    pub fn from_vocabulary(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Build the vocabulary from a corpus.
    ///
    /// ## Algorithm
    /// 1. Scan the corpus in order, skipping stop words, counting each token
    ///    and remembering where it was first seen
    /// 2. Stable-sort by count descending
    /// 3. Keep the first `max_features` terms
    #[instrument(skip(corpus), fields(documents = corpus.len()))]
    pub fn fit(corpus: &[NormalizedTokens], max_features: usize) -> Self {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for token in corpus.iter().flat_map(NormalizedTokens::iter) {
            if is_stop_word(token) {
                continue;
            }
            let slot = *slots.entry(token).or_insert_with(|| {
                counts.push((token, 0));
                counts.len() - 1
            });
            counts[slot].1 += 1;
        }

        let distinct = counts.len();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(max_features);

        let terms = counts.into_iter().map(|(term, _)| term.to_string()).collect();
        let vocabulary = Vocabulary::from_terms(terms);
        info!(
            "Built vocabulary of {} terms from {} distinct tokens (cap {})",
            vocabulary.len(),
            distinct,
            max_features
        );
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn into_vocabulary(self) -> Vocabulary {
        self.vocabulary
    }

    /// Count vocabulary terms in `tokens`; unknown tokens are ignored
    pub fn transform(&self, tokens: &NormalizedTokens) -> FeatureVector {
        let mut counts: HashMap<usize, u32> = HashMap::new();
        for token in tokens.iter() {
            if let Some(j) = self.vocabulary.index_of(token) {
                *counts.entry(j).or_insert(0) += 1;
            }
        }
        let mut entries: Vec<(usize, u32)> = counts.into_iter().collect();
        entries.sort_unstable_by_key(|&(j, _)| j);
        FeatureVector {
            dims: self.vocabulary.len(),
            entries,
        }
    }

    /// Vectorize every document in parallel, keeping order
    pub fn transform_all(&self, corpus: &[NormalizedTokens]) -> Vec<FeatureVector> {
        let vectors: Vec<FeatureVector> = corpus.par_iter().map(|t| self.transform(t)).collect();
        debug!(
            "Vectorized {} documents, {} with no vocabulary terms",
            vectors.len(),
            vectors.iter().filter(|v| v.is_zero()).count()
        );
        vectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(tokens: &[&str]) -> NormalizedTokens {
        NormalizedTokens::new(tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_vocabulary_ranked_by_frequency_then_first_seen() {
        let corpus = vec![
            doc(&["war", "space", "the", "hero"]),
            doc(&["space", "war", "villain"]),
            doc(&["space", "romance"]),
        ];
        let vectorizer = Vectorizer::fit(&corpus, 10);
        assert_eq!(
            vectorizer.vocabulary().terms(),
            &["space", "war", "hero", "villain", "romance"]
        );
        assert_eq!(vectorizer.vocabulary().index_of("the"), None);
    }

    #[test]
    fn test_vocabulary_respects_cap() {
        let corpus = vec![doc(&["b", "c", "c", "d", "e", "e", "e"])];
        let vectorizer = Vectorizer::fit(&corpus, 2);
        assert_eq!(vectorizer.vocabulary().terms(), &["e", "c"]);
        assert!(Vectorizer::fit(&corpus, 0).vocabulary().is_empty());
    }

    #[test]
    fn test_transform_counts_and_ignores_unknown() {
        let corpus = vec![doc(&["space", "war"]), doc(&["space"])];
        let vectorizer = Vectorizer::fit(&corpus, 10);

        let vector = vectorizer.transform(&doc(&["war", "space", "war", "dragon"]));
        assert_eq!(vector.dims(), 2);
        assert_eq!(vector.to_dense(), vec![1, 2]);
        assert_eq!(vector.get(1), 2);
        assert_eq!(vector.get(7), 0);
    }

    #[test]
    fn test_norm_and_dot() {
        let vectorizer = Vectorizer::from_vocabulary(Vocabulary::from_terms(vec![
            "x".to_string(),
            "y".to_string(),
            "z".to_string(),
        ]));
        let a = vectorizer.transform(&doc(&["x", "x", "y"]));
        let b = vectorizer.transform(&doc(&["x", "z", "z"]));
        assert_eq!(a.dot(&b), 2);
        assert!((a.norm() - 5f64.sqrt()).abs() < 1e-12);
        assert_eq!(vectorizer.transform(&doc(&[])).norm(), 0.0);
    }
}
