//! CLI command handlers

pub mod ask;
pub mod cache;
pub mod search;
