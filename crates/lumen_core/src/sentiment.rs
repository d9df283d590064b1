//! Lexical polarity scoring for English journal text.
//!
//! Each known word carries a weight in `[-1.0, 1.0]`. An intensifier directly
//! before a polar word scales it; a negator within the two preceding words
//! flips and damps it. The score is the mean of the adjusted weights.
//!
//! Deterministic and allocation-light; runs on every submission.

const LEXICON: &[(&str, f32)] = &[
    // positive
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("calm", 0.3),
    ("cheerful", 0.6),
    ("confident", 0.5),
    ("content", 0.3),
    ("delighted", 0.8),
    ("enjoy", 0.4),
    ("enjoyed", 0.4),
    ("excellent", 1.0),
    ("excited", 0.4),
    ("fantastic", 0.4),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("grateful", 0.6),
    ("great", 0.8),
    ("happy", 0.8),
    ("hopeful", 0.5),
    ("inspired", 0.5),
    ("joy", 0.8),
    ("love", 0.5),
    ("loved", 0.7),
    ("lovely", 0.5),
    ("nice", 0.6),
    ("peaceful", 0.5),
    ("proud", 0.8),
    ("relaxed", 0.4),
    ("relieved", 0.4),
    ("thankful", 0.5),
    ("wonderful", 1.0),
    // negative
    ("afraid", -0.6),
    ("alone", -0.3),
    ("angry", -0.5),
    ("annoyed", -0.4),
    ("anxious", -0.4),
    ("ashamed", -0.6),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -0.5),
    ("broken", -0.5),
    ("cry", -0.4),
    ("crying", -0.4),
    ("depressed", -0.7),
    ("disappointed", -0.6),
    ("empty", -0.4),
    ("exhausted", -0.6),
    ("frustrated", -0.6),
    ("guilty", -0.5),
    ("hate", -0.8),
    ("hopeless", -0.8),
    ("horrible", -1.0),
    ("hurt", -0.5),
    ("lonely", -0.5),
    ("miserable", -0.8),
    ("nervous", -0.3),
    ("overwhelmed", -0.5),
    ("pain", -0.5),
    ("painful", -0.6),
    ("sad", -0.5),
    ("scared", -0.6),
    ("sick", -0.6),
    ("stressed", -0.5),
    ("terrible", -1.0),
    ("tired", -0.4),
    ("upset", -0.5),
    ("worried", -0.4),
    ("worse", -0.6),
    ("worst", -1.0),
    ("worthless", -0.9),
];

const INTENSIFIERS: &[(&str, f32)] = &[
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("really", 1.3),
    ("so", 1.3),
    ("super", 1.4),
    ("too", 1.2),
    ("very", 1.3),
    ("slightly", 0.6),
    ("somewhat", 0.7),
    ("kinda", 0.7),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "nothing", "hardly", "cannot", "cant", "dont", "didnt", "isnt",
    "wasnt", "wont", "aint",
];

fn weight(word: &str) -> Option<f32> {
    LEXICON.iter().find(|(w, _)| *w == word).map(|(_, s)| *s)
}

fn intensifier(word: &str) -> Option<f32> {
    INTENSIFIERS.iter().find(|(w, _)| *w == word).map(|(_, m)| *m)
}

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't")
}

/// Lowercase words; apostrophes are kept so contractions like "don't" survive.
pub(crate) fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Polarity of `text` in `[-1.0, 1.0]`. Text with no polar words scores `0.0`.
pub fn polarity(text: &str) -> f32 {
    let words = words(text);
    let mut total = 0.0f32;
    let mut hits = 0usize;

    for (i, word) in words.iter().enumerate() {
        let Some(mut score) = weight(word) else {
            continue;
        };
        if i > 0 {
            if let Some(m) = intensifier(&words[i - 1]) {
                score *= m;
            }
        }
        if words[i.saturating_sub(2)..i].iter().any(|w| is_negator(w)) {
            score *= -0.5;
        }
        total += score.clamp(-1.0, 1.0);
        hits += 1;
    }

    if hits == 0 {
        return 0.0;
    }
    (total / hits as f32).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_text() {
        assert_eq!(polarity("I walked to the station this morning"), 0.0);
    }

    #[test]
    fn test_positive_text() {
        assert!(polarity("I love my job") > 0.0);
    }

    #[test]
    fn test_negative_text() {
        assert!(polarity("I hate mornings") < 0.0);
    }

    #[test]
    fn test_intensifier_strengthens() {
        assert!(polarity("very happy") > polarity("happy"));
        assert!(polarity("really sad") < polarity("sad"));
    }

    #[test]
    fn test_negation_flips() {
        assert!(polarity("I am not happy") < 0.0);
        assert!(polarity("I don't feel sad") > 0.0);
        assert!(polarity("I don\u{2019}t feel sad") > 0.0);
    }

    #[test]
    fn test_mean_of_mixed_words() {
        let mixed = polarity("good day but a bad night");
        assert!(mixed.abs() < 0.01);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(polarity(""), 0.0);
    }

    #[test]
    fn test_superlative_clamped() {
        let p = polarity("extremely awesome");
        assert!((p - 1.0).abs() < f32::EPSILON);
    }
}
