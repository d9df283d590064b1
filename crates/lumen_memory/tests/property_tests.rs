//! Property-based tests for retrieval and analytics.

use chrono::{Duration, TimeZone, Utc};
use lumen_core::config::AnalyticsConfig;
use lumen_core::{EmotionLabel, EntryId, GenerationStatus, JournalEntry, Safety};
use lumen_memory::analytics::{emotion_transitions, sentiment_summary};
use lumen_memory::{find_similar, PatternReport, MIN_HISTORY};
use proptest::prelude::*;

fn arb_text() -> impl Strategy<Value = String> {
    let vocab = prop::sample::select(vec![
        "work", "job", "sleep", "tired", "happy", "family", "run", "rain", "coffee", "deadline",
        "friend", "walk", "quiet", "loud", "music",
    ]);
    prop::collection::vec(vocab, 1..8).prop_map(|w| w.join(" "))
}

fn arb_label() -> impl Strategy<Value = EmotionLabel> {
    prop::sample::select(EmotionLabel::ZERO_SHOT.to_vec())
}

fn arb_history() -> impl Strategy<Value = Vec<JournalEntry>> {
    prop::collection::vec((arb_text(), -1.0f32..=1.0f32, arb_label()), 0..12).prop_map(|rows| {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        rows.into_iter()
            .enumerate()
            .map(|(i, (text, sentiment, emotion))| JournalEntry {
                id: EntryId(i as i64 + 1),
                timestamp: base + Duration::hours(i as i64),
                text,
                sentiment,
                emotion,
                safety: Safety::None,
                reflection: String::new(),
                summary: String::new(),
                followups: vec![],
                tone: String::new(),
                generation: GenerationStatus::Skipped,
                raw_response: None,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn similarity_length_and_order(query in arb_text(), history in arb_history(), k in 0usize..6) {
        let matches = find_similar(&query, &history, k);
        if history.len() < MIN_HISTORY {
            prop_assert!(matches.is_empty());
        } else {
            prop_assert_eq!(matches.len(), k.min(history.len()));
        }
        for w in matches.windows(2) {
            prop_assert!(w[0].score >= w[1].score);
        }
        for m in &matches {
            prop_assert!((0.0..=1.0).contains(&m.score));
            prop_assert!(history.iter().any(|e| e.id == m.entry_id));
        }
    }

    #[test]
    fn summary_bounds_hold(history in arb_history()) {
        match sentiment_summary(&history) {
            None => prop_assert!(history.is_empty()),
            Some(s) => {
                prop_assert_eq!(s.count, history.len());
                prop_assert!(s.min <= s.mean + 1e-5 && s.mean <= s.max + 1e-5);
                prop_assert!(s.std_dev >= 0.0);
            }
        }
    }

    #[test]
    fn transitions_count_consecutive_pairs(history in arb_history()) {
        let total: usize = emotion_transitions(&history).iter().map(|(_, c)| c).sum();
        prop_assert_eq!(total, history.len().saturating_sub(1));
    }

    #[test]
    fn report_frequencies_cover_history(history in arb_history()) {
        let report = PatternReport::build(&history, &AnalyticsConfig::default());
        let total: usize = report.emotion_frequencies.iter().map(|(_, c)| c).sum();
        prop_assert_eq!(total, history.len());
        prop_assert!(report.recent.len() <= AnalyticsConfig::default().recent_entries);
    }
}
