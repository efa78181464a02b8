//! Retrieval: similarity, lexical matching, score blending and query execution.

mod engine;
mod lexical;
mod scoring;
mod similarity;

pub use engine::{
    deep_link, score_lexical, score_semantic, SearchEngine, SearchHit, SearchRequest,
    SearchResponse, SearchStats, SearchType,
};
pub use lexical::{
    keyword_overlap, lexical_match, query_tokens, word_similarity, LexicalMatch, QueryMatcher,
};
pub use scoring::{round2, Confidence, ScoredResult, ScoringPolicy};
pub use similarity::cosine_similarity;
