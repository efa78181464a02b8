//! Relevance blending of semantic similarity and lexical matches.

use super::lexical::{LexicalMatch, QueryMatcher, DEFAULT_FUZZY_THRESHOLD, DEFAULT_FUZZY_WEIGHT};
use crate::vector_store::IndexedDocument;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boost and penalty constants applied when blending scores.
///
/// The defaults are empirical and kept as-is; the `[scoring]` config section
/// overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Match ratio above which lexical hits are added to the semantic score.
    pub lexical_boost_threshold: f32,
    /// Weight of the match ratio when added.
    pub lexical_weight: f32,
    /// Semantic similarity at or above which the score is multiplied up.
    pub high_similarity_threshold: f32,
    pub high_similarity_boost: f32,
    /// Semantic similarity below which a result without exact hits is penalised.
    pub low_similarity_threshold: f32,
    pub low_similarity_penalty: f32,
    /// Word similarity needed for a fuzzy hit.
    pub fuzzy_threshold: f32,
    /// Weight of a fuzzy hit relative to an exact hit.
    pub fuzzy_weight: f32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            lexical_boost_threshold: 0.5,
            lexical_weight: 0.4,
            high_similarity_threshold: 0.4,
            high_similarity_boost: 1.3,
            low_similarity_threshold: 0.25,
            low_similarity_penalty: 0.7,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            fuzzy_weight: DEFAULT_FUZZY_WEIGHT,
        }
    }
}

impl ScoringPolicy {
    /// Compile a query for lexical matching under this policy's fuzzy settings.
    pub fn matcher(&self, query: &str) -> QueryMatcher {
        QueryMatcher::new(query, self.fuzzy_threshold, self.fuzzy_weight)
    }

    /// Blend a semantic similarity (0 when the document has no embedding) with
    /// a lexical match into a relevance score rounded to two decimals.
    pub fn blend(&self, semantic: f32, lexical: &LexicalMatch) -> f32 {
        self.blend_parts(semantic, lexical.match_ratio, lexical.exact_matches > 0)
    }

    fn blend_parts(&self, semantic: f32, match_ratio: f32, has_exact: bool) -> f32 {
        let mut boosted = semantic;

        if match_ratio > self.lexical_boost_threshold {
            boosted = (semantic + match_ratio * self.lexical_weight).min(1.0);
        }

        if semantic >= self.high_similarity_threshold {
            boosted = (boosted * self.high_similarity_boost).min(1.0);
        }

        if semantic < self.low_similarity_threshold && !has_exact {
            boosted *= self.low_similarity_penalty;
        }

        round2(boosted)
    }
}

/// Round to two decimal places.
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Confidence label derived from the raw (pre-boost) similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_similarity(similarity: f32) -> Self {
        if similarity > 0.8 {
            Confidence::High
        } else if similarity > 0.5 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "High"),
            Confidence::Medium => write!(f, "Medium"),
            Confidence::Low => write!(f, "Low"),
        }
    }
}

/// A candidate document with its scores for one query.
#[derive(Debug, Clone)]
pub struct ScoredResult {
    pub document: IndexedDocument,
    /// Raw similarity; keyword overlap in lexical mode.
    pub similarity: f32,
    /// Final ranking score.
    pub relevance: f32,
    pub confidence: Confidence,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lexical(ratio: f32, exact: usize) -> LexicalMatch {
        LexicalMatch {
            exact_matches: exact,
            fuzzy_matches: 0,
            total_tokens: 1,
            match_ratio: ratio,
        }
    }

    #[test]
    fn test_blend_steps() {
        let policy = ScoringPolicy::default();

        // Lexical boost then similarity boost, capped.
        assert_eq!(policy.blend(0.5, &lexical(1.0, 1)), 1.0);
        // Lexical boost only: 0.3 + 0.6 * 0.4.
        assert_eq!(policy.blend(0.3, &lexical(0.6, 1)), 0.54);
        // Similarity boost only.
        assert_eq!(policy.blend(0.5, &lexical(0.0, 0)), 0.65);
        // Low similarity penalty without exact hits.
        assert_eq!(policy.blend(0.2, &lexical(0.0, 0)), 0.14);
        // Exact hit suppresses the penalty.
        assert_eq!(policy.blend(0.2, &lexical(0.4, 1)), 0.2);
        // No embedding: lexical alone drives the score.
        assert_eq!(policy.blend(0.0, &lexical(0.8, 0)), 0.22);
        assert_eq!(policy.blend(0.0, &lexical(1.0, 1)), 0.4);
    }

    #[test]
    fn test_confidence_from_raw_similarity() {
        assert_eq!(Confidence::from_similarity(0.81), Confidence::High);
        assert_eq!(Confidence::from_similarity(0.8), Confidence::Medium);
        assert_eq!(Confidence::from_similarity(0.51), Confidence::Medium);
        assert_eq!(Confidence::from_similarity(0.5), Confidence::Low);
        assert_eq!(Confidence::High.to_string(), "High");
    }

    #[test]
    fn test_policy_overrides() {
        let policy: ScoringPolicy = toml::from_str("high_similarity_boost = 1.0").unwrap();
        assert_eq!(policy.high_similarity_boost, 1.0);
        assert_eq!(policy.blend(0.5, &lexical(0.0, 0)), 0.5);
    }

    proptest! {
        #[test]
        fn blend_is_monotonic_in_match_ratio(
            semantic in 0.0f32..=1.0,
            r1 in 0.0f32..=1.0,
            r2 in 0.0f32..=1.0,
            has_exact in any::<bool>(),
        ) {
            let policy = ScoringPolicy::default();
            let (lo, hi) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
            prop_assert!(
                policy.blend_parts(semantic, lo, has_exact) <= policy.blend_parts(semantic, hi, has_exact)
            );
        }

        #[test]
        fn blend_stays_in_unit_range(semantic in 0.0f32..=1.0, ratio in 0.0f32..=1.0) {
            let score = ScoringPolicy::default().blend_parts(semantic, ratio, false);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
