//! Interview feedback: the LLM-written report, its PDF archive and history.

pub mod archive;
pub mod cache;
pub mod handlers;
pub mod history;
pub mod prompts;
pub mod report;

pub use cache::ScoreCache;
pub use history::FeedbackHistory;
