//! Error types for configuration, the comment store and the thread controller.

use thiserror::Error;

use crate::comments::{CommentId, SeriesId};

/// A required configuration option was left empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required option `{0}`")]
    MissingField(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure reported by one of the five store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store answered with a non-success status.
    #[error("store returned status {status}: {detail}")]
    Status { status: u16, detail: String },
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The response body could not be decoded.
    #[error("undecodable store response: {0}")]
    Decode(String),
    /// The request payload could not be encoded.
    #[error("unencodable request: {0}")]
    Encode(String),
}

/// A payload that breaks the thread snapshot invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("series group {index} is empty")]
    EmptyGroup { index: usize },
    #[error("series group {index} mixes series {expected} and {found}")]
    MixedSeries { index: usize, expected: SeriesId, found: SeriesId },
    #[error("comment {id} appears more than once")]
    DuplicateComment { id: CommentId },
    #[error("comments payload is not an array of series groups: {0}")]
    NotAnArray(String),
}

/// Controller-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    /// The render surface could not attach to the host document.
    #[error("cannot mount thread container: {0}")]
    Mount(String),
    /// An interaction referenced a comment that is not in the current thread.
    #[error("comment {0} is not part of the rendered thread")]
    UnknownComment(CommentId),
    #[error("thread widget is not initialized")]
    NotReady,
}
