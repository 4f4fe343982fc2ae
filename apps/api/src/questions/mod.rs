pub mod generator;
pub mod handlers;
pub mod numbering;
pub mod prompts;
