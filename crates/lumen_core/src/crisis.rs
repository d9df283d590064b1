//! Keyword-based crisis detection.
//!
//! A heuristic safety net, not a diagnosis: matching is a case-insensitive
//! substring scan over configured phrases. The reported severity is the
//! highest among every matched phrase.

use crate::config::CrisisConfig;
use crate::journal::Severity;
use serde::Serialize;
use std::fmt;

// ============================================================================
// Error type
// ============================================================================

/// The detector refuses to start rather than run with checks disabled.
#[derive(Debug, Clone, PartialEq)]
pub enum CrisisConfigError {
    NoTerms,
    BlankTerm { severity: Severity },
}

impl fmt::Display for CrisisConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrisisConfigError::NoTerms => {
                write!(f, "Crisis detector has no terms configured")
            }
            CrisisConfigError::BlankTerm { severity } => {
                write!(f, "Blank crisis term in the {} list", severity.as_str())
            }
        }
    }
}

impl std::error::Error for CrisisConfigError {}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrisisAssessment {
    pub severity: Severity,
    /// Every configured term found in the text, with its own severity.
    pub matched: Vec<(String, Severity)>,
}

impl CrisisAssessment {
    pub fn is_crisis(&self) -> bool {
        self.severity.is_crisis()
    }
}

/// A support reference surfaced verbatim when a crisis is detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrisisResource {
    pub region: String,
    pub contact: String,
}

// ============================================================================
// CrisisDetector
// ============================================================================

pub struct CrisisDetector {
    /// Lowercased terms paired with their severity.
    terms: Vec<(String, Severity)>,
    resources: Vec<CrisisResource>,
}

impl CrisisDetector {
    pub fn new(config: &CrisisConfig) -> Result<Self, CrisisConfigError> {
        let mut terms = Vec::with_capacity(config.severe.len() + config.moderate.len());
        for (list, severity) in [
            (&config.severe, Severity::Severe),
            (&config.moderate, Severity::Moderate),
        ] {
            for term in list {
                let term = term.trim();
                if term.is_empty() {
                    return Err(CrisisConfigError::BlankTerm { severity });
                }
                terms.push((term.to_lowercase(), severity));
            }
        }
        if terms.is_empty() {
            return Err(CrisisConfigError::NoTerms);
        }

        let resources = config
            .resources
            .iter()
            .map(|(region, contact)| CrisisResource {
                region: region.clone(),
                contact: contact.clone(),
            })
            .collect();

        Ok(Self { terms, resources })
    }

    /// Scan `text` against every configured term.
    pub fn detect(&self, text: &str) -> CrisisAssessment {
        let lower = text.to_lowercase();
        let matched: Vec<(String, Severity)> = self
            .terms
            .iter()
            .filter(|(term, _)| lower.contains(term.as_str()))
            .cloned()
            .collect();
        let severity = matched
            .iter()
            .map(|(_, s)| *s)
            .max()
            .unwrap_or(Severity::None);

        if severity.is_crisis() {
            tracing::warn!(
                "Crisis language detected (severity={}, {} term(s))",
                severity.as_str(),
                matched.len()
            );
        }

        CrisisAssessment { severity, matched }
    }

    pub fn resources(&self) -> &[CrisisResource] {
        &self.resources
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
