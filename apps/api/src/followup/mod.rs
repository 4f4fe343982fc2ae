//! Follow-up question decision and generation.

pub mod decision;
pub mod handlers;
pub mod keywords;

pub use keywords::{KeywordExtractor, LlmKeywordExtractor, TermFrequencyExtractor};
