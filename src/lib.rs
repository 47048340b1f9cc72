//! Semantic product search over scraped catalog data: build a flat L2
//! index from JSONL product records, query it, and ask a chat model for a
//! recommendation.

pub mod catalog;
pub mod core;
pub mod embedding;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod query;
pub mod recommend;
pub mod server;
pub mod state;
