//! Error types for the wire layer.

use thiserror::Error;

/// Errors that can occur while parsing or encoding protocol data.
#[derive(Debug, Error)]
pub enum TypesError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Move token does not match `^[XO]:[ABC][1-3]$`
    #[error("invalid move: {0:?}")]
    InvalidMove(String),

    /// Mark is neither `X` nor `O`
    #[error("invalid mark: {0:?}")]
    InvalidMark(String),

    /// Identifier could not be parsed
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}
