//! Command implementations for the cachenode CLI.

pub mod config;
pub mod describe;
pub mod replay;
