//! In-memory holder for the current thread snapshot.

use tracing::error;

use crate::comments::Snapshot;
use crate::error::SnapshotError;

/// Authoritative copy of the last fetched thread. Only whole-snapshot
/// replacement is supported, so readers never see a half-applied update.
#[derive(Debug, Default, Clone)]
pub struct ThreadModel {
    comments: Option<Snapshot>,
}

impl ThreadModel {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self) -> Option<&Snapshot> { self.comments.as_ref() }

    /// Replaces the snapshot. A snapshot that breaks the grouping invariants
    /// is logged and leaves the current state untouched.
    pub fn set(&mut self, snapshot: Snapshot) -> Result<(), SnapshotError> {
        if let Err(e) = snapshot.validate() {
            error!(error = %e, "could not set comments");
            return Err(e);
        }
        self.comments = Some(snapshot);
        Ok(())
    }

    /// Same as [`ThreadModel::set`] for raw JSON handed over by a host page.
    pub fn set_json(&mut self, json: &str) -> Result<(), SnapshotError> {
        match serde_json::from_str::<Snapshot>(json) {
            Ok(snapshot) => self.set(snapshot),
            Err(e) => {
                error!(error = %e, "could not set comments: argument is not an array of series groups");
                Err(SnapshotError::NotAnArray(e.to_string()))
            }
        }
    }

    pub fn clear(&mut self) { self.comments = None; }
}
