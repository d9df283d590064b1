//! Similar-entry retrieval over a TF-IDF vector space.
//!
//! The space is rebuilt from scratch for every query over
//! `[query] + history`, so there is no index to keep in sync. Cost is
//! O(history × vocabulary) per call, fine for one person's journal.

use crate::tokenize::tokens;
use lumen_core::embedding::cosine_similarity;
use lumen_core::{JournalEntry, SimilarityMatch};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Below this many past entries the vector space is too thin to rank.
pub const MIN_HISTORY: usize = 3;

/// Fitted vocabulary and smoothed inverse document frequencies.
pub struct TfIdfSpace {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f32>,
}

impl TfIdfSpace {
    /// Fit on `docs` and return the space plus one L2-normalised vector per doc.
    pub fn fit(docs: &[&str]) -> (Self, Vec<Vec<f32>>) {
        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| tokens(d)).collect();

        let mut vocabulary = BTreeMap::new();
        for doc in &tokenized {
            for t in doc {
                let next = vocabulary.len();
                vocabulary.entry(t.clone()).or_insert(next);
            }
        }

        let mut df = vec![0usize; vocabulary.len()];
        for doc in &tokenized {
            let mut seen = vec![false; vocabulary.len()];
            for t in doc {
                let i = vocabulary[t];
                if !seen[i] {
                    seen[i] = true;
                    df[i] += 1;
                }
            }
        }

        // Smooth idf: ln((1 + n) / (1 + df)) + 1
        let n = docs.len() as f32;
        let idf: Vec<f32> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f32)).ln() + 1.0)
            .collect();

        let space = Self { vocabulary, idf };
        let vectors = tokenized.iter().map(|doc| space.vectorize(doc)).collect();
        (space, vectors)
    }

    fn vectorize(&self, doc: &[String]) -> Vec<f32> {
        let mut v = vec![0.0f32; self.vocabulary.len()];
        for t in doc {
            if let Some(&i) = self.vocabulary.get(t) {
                v[i] += 1.0;
            }
        }
        for (x, idf) in v.iter_mut().zip(&self.idf) {
            *x *= idf;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Rank `history` by similarity to `new_text`, most similar first.
///
/// Returns nothing when `history` has fewer than [`MIN_HISTORY`] entries.
/// Otherwise returns `min(top_k, history.len())` matches; equal scores are
/// ordered most recent first.
pub fn find_similar(new_text: &str, history: &[JournalEntry], top_k: usize) -> Vec<SimilarityMatch> {
    if history.len() < MIN_HISTORY {
        tracing::debug!(
            "Similarity skipped: {} past entries (< {})",
            history.len(),
            MIN_HISTORY
        );
        return Vec::new();
    }

    let mut corpus: Vec<&str> = Vec::with_capacity(history.len() + 1);
    corpus.push(new_text);
    corpus.extend(history.iter().map(|e| e.text.as_str()));
    let (_, vectors) = TfIdfSpace::fit(&corpus);

    let query = &vectors[0];
    let mut scored: Vec<(&JournalEntry, f32)> = history
        .iter()
        .zip(&vectors[1..])
        .map(|(entry, v)| (entry, cosine_similarity(query, v).clamp(0.0, 1.0)))
        .collect();

    scored.sort_by(|(ea, sa), (eb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| eb.timestamp.cmp(&ea.timestamp))
            .then_with(|| eb.id.cmp(&ea.id))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(entry, score)| SimilarityMatch {
            entry_id: entry.id,
            score,
        })
        .collect()
}

/// Look matched ids back up in the history they were ranked against.
pub fn resolve<'a>(
    matches: &[SimilarityMatch],
    history: &'a [JournalEntry],
) -> Vec<(&'a JournalEntry, f32)> {
    matches
        .iter()
        .filter_map(|m| {
            history
                .iter()
                .find(|e| e.id == m.entry_id)
                .map(|e| (e, m.score))
        })
        .collect()
}
