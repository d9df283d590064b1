//! Pattern analytics over the entry history.
//!
//! Everything here is a pure function of the history slice. Empty and
//! single-entry histories give empty tables or `None`, never errors.

use crate::tokenize::{is_stopword, tokens};
use chrono::{DateTime, Utc};
use lumen_core::config::AnalyticsConfig;
use lumen_core::{EmotionLabel, JournalEntry, Safety};
use serde::Serialize;
use std::collections::HashMap;

/// Entries in time order (timestamp, then id).
fn chronological(history: &[JournalEntry]) -> Vec<&JournalEntry> {
    let mut sorted: Vec<&JournalEntry> = history.iter().collect();
    sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    sorted
}

/// Label counts, most frequent first; ties in vocabulary order.
pub fn emotion_frequencies(history: &[JournalEntry]) -> Vec<(EmotionLabel, usize)> {
    let mut counts: HashMap<EmotionLabel, usize> = HashMap::new();
    for e in history {
        *counts.entry(e.emotion).or_default() += 1;
    }
    let mut table: Vec<(EmotionLabel, usize)> = counts.into_iter().collect();
    table.sort_by(|(la, ca), (lb, cb)| cb.cmp(ca).then(la.cmp(lb)));
    table
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub count: usize,
    pub mean: f32,
    pub max: f32,
    pub min: f32,
    /// Population standard deviation; 0 for a single entry.
    pub std_dev: f32,
}

pub fn sentiment_summary(history: &[JournalEntry]) -> Option<SentimentSummary> {
    if history.is_empty() {
        return None;
    }
    let n = history.len() as f64;
    let values: Vec<f64> = history.iter().map(|e| e.sentiment as f64).collect();
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);

    Some(SentimentSummary {
        count: history.len(),
        mean: mean as f32,
        max: max as f32,
        min: min as f32,
        std_dev: variance.sqrt() as f32,
    })
}

/// Counts of `(previous, next)` label pairs over consecutive entries in time
/// order. Most frequent first; ties by label order.
pub fn emotion_transitions(history: &[JournalEntry]) -> Vec<((EmotionLabel, EmotionLabel), usize)> {
    let ordered = chronological(history);
    let mut counts: HashMap<(EmotionLabel, EmotionLabel), usize> = HashMap::new();
    for pair in ordered.windows(2) {
        *counts.entry((pair[0].emotion, pair[1].emotion)).or_default() += 1;
    }
    let mut table: Vec<_> = counts.into_iter().collect();
    table.sort_by(|(pa, ca), (pb, cb)| cb.cmp(ca).then(pa.cmp(pb)));
    table
}

/// Most frequent non-stopword terms in entries with sentiment strictly below
/// `threshold`. Ties are alphabetical.
pub fn low_sentiment_terms(history: &[JournalEntry], threshold: f32, top_n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for e in history.iter().filter(|e| e.sentiment < threshold) {
        for t in tokens(&e.text) {
            if !is_stopword(&t) {
                *counts.entry(t).or_default() += 1;
            }
        }
    }
    let mut table: Vec<(String, usize)> = counts.into_iter().collect();
    table.sort_by(|(ta, ca), (tb, cb)| cb.cmp(ca).then_with(|| ta.cmp(tb)));
    table.truncate(top_n);
    table
}

pub fn sentiment_timeline(history: &[JournalEntry]) -> Vec<(DateTime<Utc>, f32)> {
    chronological(history)
        .into_iter()
        .map(|e| (e.timestamp, e.sentiment))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SafetyBreakdown {
    pub none: usize,
    pub flagged: usize,
    pub crisis: usize,
}

pub fn safety_breakdown(history: &[JournalEntry]) -> SafetyBreakdown {
    let mut b = SafetyBreakdown::default();
    for e in history {
        match e.safety {
            Safety::None => b.none += 1,
            Safety::Flagged => b.flagged += 1,
            Safety::Crisis(_) => b.crisis += 1,
        }
    }
    b
}

/// The newest `n` entries, oldest of them first.
pub fn recent_entries(history: &[JournalEntry], n: usize) -> Vec<&JournalEntry> {
    let ordered = chronological(history);
    let skip = ordered.len().saturating_sub(n);
    ordered.into_iter().skip(skip).collect()
}

/// Everything the analytics view shows, computed in one pass over config.
#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub total_entries: usize,
    pub emotion_frequencies: Vec<(EmotionLabel, usize)>,
    pub sentiment: Option<SentimentSummary>,
    pub transitions: Vec<((EmotionLabel, EmotionLabel), usize)>,
    pub low_sentiment_terms: Vec<(String, usize)>,
    pub timeline: Vec<(DateTime<Utc>, f32)>,
    pub safety: SafetyBreakdown,
    pub recent: Vec<JournalEntry>,
}

impl PatternReport {
    pub fn build(history: &[JournalEntry], config: &AnalyticsConfig) -> Self {
        Self {
            total_entries: history.len(),
            emotion_frequencies: emotion_frequencies(history),
            sentiment: sentiment_summary(history),
            transitions: emotion_transitions(history),
            low_sentiment_terms: low_sentiment_terms(
                history,
                config.low_sentiment_threshold,
                config.top_terms,
            ),
            timeline: sentiment_timeline(history),
            safety: safety_breakdown(history),
            recent: recent_entries(history, config.recent_entries)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}
