//! CLI command implementations.

pub mod board;
pub mod demo;
