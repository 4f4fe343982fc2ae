//! Resume upload, lookup and text extraction.

pub mod handlers;
pub mod pdf;
pub mod repository;
