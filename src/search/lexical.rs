//! Lexical matching: exact whole-word hits and positional fuzzy hits.

use regex::RegexSet;
use serde::Serialize;
use tracing::warn;

/// Similarity a text word needs to count as a fuzzy hit.
pub const DEFAULT_FUZZY_THRESHOLD: f32 = 0.8;

/// Weight of a fuzzy hit relative to an exact one.
pub const DEFAULT_FUZZY_WEIGHT: f32 = 0.8;

/// Query tokens shorter than this carry no signal.
const MIN_TOKEN_CHARS: usize = 3;

/// How well a query's tokens are covered by a text.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LexicalMatch {
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    pub total_tokens: usize,
    /// `(exact + fuzzy_weight * fuzzy) / total_tokens`, 0 when there are no tokens.
    pub match_ratio: f32,
}

impl LexicalMatch {
    pub fn has_any(&self) -> bool {
        self.match_ratio > 0.0
    }
}

/// Lowercased whitespace tokens, ignoring very short ones.
pub fn query_tokens(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Match a query against one text with the default fuzzy threshold and weight.
///
/// Prefer [`QueryMatcher`] when matching one query against many texts.
pub fn lexical_match(query: &str, text: &str) -> LexicalMatch {
    QueryMatcher::new(query, DEFAULT_FUZZY_THRESHOLD, DEFAULT_FUZZY_WEIGHT).match_text(text)
}

/// A query tokenized and compiled once, then matched against many texts.
///
/// A token is an exact hit when it appears in the text as a whole word
/// (case-insensitive). Otherwise it is a fuzzy hit when some text word of
/// similar length reaches `fuzzy_threshold` under [`word_similarity`].
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    tokens: Vec<String>,
    /// One whole-word pattern per token, in token order.
    whole_words: Option<RegexSet>,
    fuzzy_threshold: f32,
    fuzzy_weight: f32,
}

impl QueryMatcher {
    pub fn new(query: &str, fuzzy_threshold: f32, fuzzy_weight: f32) -> Self {
        let tokens = query_tokens(query);
        let patterns = tokens
            .iter()
            .map(|t| format!(r"\b{}\b", regex::escape(t)));

        let whole_words = match RegexSet::new(patterns) {
            Ok(set) => Some(set),
            Err(e) => {
                warn!("Whole-word matching disabled for this query: {}", e);
                None
            }
        };

        Self {
            tokens,
            whole_words,
            fuzzy_threshold,
            fuzzy_weight,
        }
    }

    pub fn match_text(&self, text: &str) -> LexicalMatch {
        if self.tokens.is_empty() {
            return LexicalMatch::default();
        }

        let lowered = text.to_lowercase();
        let exact_hits = self
            .whole_words
            .as_ref()
            .map(|set| set.matches(&lowered))
            .filter(|hits| hits.matched_any());

        let words: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .collect();

        let mut exact = 0;
        let mut fuzzy = 0;

        for (i, token) in self.tokens.iter().enumerate() {
            if exact_hits.as_ref().is_some_and(|hits| hits.matched(i)) {
                exact += 1;
            } else if has_fuzzy_match(token, &words, self.fuzzy_threshold) {
                fuzzy += 1;
            }
        }

        let match_ratio =
            (exact as f32 + self.fuzzy_weight * fuzzy as f32) / self.tokens.len() as f32;

        LexicalMatch {
            exact_matches: exact,
            fuzzy_matches: fuzzy,
            total_tokens: self.tokens.len(),
            match_ratio,
        }
    }
}

fn has_fuzzy_match(token: &str, words: &[&str], threshold: f32) -> bool {
    let token_len = token.chars().count();
    words.iter().any(|word| {
        let word_len = word.chars().count();
        token_len.abs_diff(word_len) <= 2 && word_similarity(token, word) >= threshold
    })
}

/// Positional character overlap: characters equal at the same index divided by
/// the longer length. Two empty words are identical.
pub fn word_similarity(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let matches = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    matches as f32 / max_len as f32
}

/// Share of lowercased query tokens literally contained in the lowercased text.
///
/// Used when no query embedding is available.
pub fn keyword_overlap(query: &str, text: &str) -> f32 {
    let query = query.to_lowercase();
    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let text = text.to_lowercase();
    let found = tokens.iter().filter(|t| text.contains(*t)).count();
    found as f32 / tokens.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_whole_word() {
        let m = lexical_match("Gradient descent", "Today: gradient descent, explained.");
        assert_eq!(m.exact_matches, 2);
        assert_eq!(m.fuzzy_matches, 0);
        assert_eq!(m.match_ratio, 1.0);
    }

    #[test]
    fn test_fuzzy_plural() {
        let m = lexical_match("polynomial", "We discuss polynomials today");
        assert_eq!(m.exact_matches, 0);
        assert_eq!(m.fuzzy_matches, 1);
        assert!((m.match_ratio - 0.8).abs() < 1e-6);

        assert!(!lexical_match("polynomial", "Cooking recipes").has_any());
    }

    #[test]
    fn test_fuzzy_threshold_is_inclusive() {
        assert_eq!(word_similarity("abcde", "abcdx"), DEFAULT_FUZZY_THRESHOLD);
        let m = lexical_match("abcde", "token abcdx here");
        assert_eq!(m.exact_matches, 0);
        assert_eq!(m.fuzzy_matches, 1);

        // 3 of 5 positions agree: below the threshold.
        assert!(!lexical_match("abcde", "abxye").has_any());
    }

    #[test]
    fn test_matcher_reused_across_texts() {
        let matcher = QueryMatcher::new("eigen values matrix", 0.8, 0.8);

        let texts = [
            "The matrix has two eigen values.",
            "Matrices and their values",
            "nothing relevant",
        ];
        for text in texts {
            assert_eq!(matcher.match_text(text), lexical_match("eigen values matrix", text));
        }

        let m = matcher.match_text("Matrix values only");
        assert_eq!(m.exact_matches, 2);
        assert_eq!(m.total_tokens, 3);
    }

    #[test]
    fn test_substring_is_not_whole_word() {
        let m = lexical_match("cat", "concatenate strings");
        assert_eq!(m.exact_matches, 0);
    }

    #[test]
    fn test_short_tokens_ignored() {
        let m = lexical_match("is a of", "this is a test of things");
        assert_eq!(m.total_tokens, 0);
        assert_eq!(m.match_ratio, 0.0);

        let m = lexical_match("to matrix", "the matrix");
        assert_eq!(m.total_tokens, 1);
        assert_eq!(m.match_ratio, 1.0);
    }

    #[test]
    fn test_special_characters_escaped() {
        let m = lexical_match("c++ (rust)", "comparing c++ and (rust) today");
        assert_eq!(m.total_tokens, 2);
    }

    #[test]
    fn test_word_similarity() {
        assert_eq!(word_similarity("", ""), 1.0);
        assert_eq!(word_similarity("abc", "abc"), 1.0);
        assert_eq!(word_similarity("abcd", "abxd"), 0.75);
        assert_eq!(word_similarity("abc", "xabc"), 0.0);
        assert!((word_similarity("polynomial", "polynomials") - 10.0 / 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_keyword_overlap() {
        assert_eq!(keyword_overlap("hello world", "Hello there"), 0.5);
        assert_eq!(keyword_overlap("polynomial", "We discuss polynomials"), 1.0);
        assert_eq!(keyword_overlap("   ", "anything"), 0.0);
        assert_eq!(keyword_overlap("pasta", "linear algebra"), 0.0);
    }
}
