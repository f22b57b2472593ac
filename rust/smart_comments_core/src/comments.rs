//! Comment series model as delivered by the comment store.
//!
//! A [`Snapshot`] is an ordered list of [`SeriesGroup`]s; each group holds a
//! root comment followed by its replies, in the order the store assigned.
//! Nothing here reorders comments.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SnapshotError;

/// Store-assigned comment identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(#[serde(deserialize_with = "opaque_id")] pub String);

/// Identity shared by a root comment and all of its replies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(#[serde(deserialize_with = "opaque_id")] pub String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl SeriesId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Stores frequently emit integer keys; identities are opaque so both forms
/// are kept as strings.
fn opaque_id<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// One comment, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    /// `None` for series roots.
    #[serde(rename = "parentId", default, deserialize_with = "optional_parent")]
    pub parent_id: Option<CommentId>,
    #[serde(rename = "commentBlockId")]
    pub series_id: SeriesId,
    #[serde(rename = "commenterName")]
    pub author: String,
    /// Display string; never parsed.
    #[serde(rename = "timeStamp")]
    pub timestamp: String,
    /// Rich text, escaped by the store.
    #[serde(rename = "commentBody")]
    pub body: String,
}

fn optional_parent<'de, D: Deserializer<'de>>(de: D) -> Result<Option<CommentId>, D::Error> {
    let parent: Option<CommentId> = Option::deserialize(de)?;
    Ok(parent.filter(|p| !p.0.is_empty()))
}

impl Comment {
    pub fn is_root(&self) -> bool { self.parent_id.is_none() }
}

/// Comments of one series, root first, replies in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SeriesGroup {
    pub comments: Vec<Comment>,
}

impl SeriesGroup {
    pub fn new(comments: Vec<Comment>) -> Self { Self { comments } }

    /// Series identity of the group, taken from its first comment.
    pub fn series_id(&self) -> Option<&SeriesId> {
        self.comments.first().map(|c| &c.series_id)
    }

    /// The most recent comment; the only one that can be replied to or deleted.
    pub fn last(&self) -> Option<&Comment> { self.comments.last() }

    pub fn len(&self) -> usize { self.comments.len() }
    pub fn is_empty(&self) -> bool { self.comments.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, Comment> { self.comments.iter() }
}

/// The full thread as last returned by fetch-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Snapshot {
    pub groups: Vec<SeriesGroup>,
}

impl Snapshot {
    pub fn new(groups: Vec<SeriesGroup>) -> Self { Self { groups } }

    pub fn from_json(json: &str) -> serde_json::Result<Self> { serde_json::from_str(json) }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn len(&self) -> usize { self.groups.len() }
    pub fn is_empty(&self) -> bool { self.groups.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, SeriesGroup> { self.groups.iter() }

    pub fn comment_count(&self) -> usize { self.groups.iter().map(SeriesGroup::len).sum() }

    pub fn find(&self, id: &CommentId) -> Option<&Comment> {
        self.groups.iter().flat_map(SeriesGroup::iter).find(|c| &c.id == id)
    }

    /// True when `id` is the most recent comment of its series.
    pub fn is_last(&self, id: &CommentId) -> bool {
        self.groups.iter().any(|g| g.last().is_some_and(|c| &c.id == id))
    }

    /// Checks the grouping invariants: groups are non-empty, every comment
    /// carries its group's series identity and comment identities are unique.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen: HashSet<&CommentId> = HashSet::new();
        for (index, group) in self.groups.iter().enumerate() {
            let Some(series) = group.series_id() else {
                return Err(SnapshotError::EmptyGroup { index });
            };
            for comment in group.iter() {
                if &comment.series_id != series {
                    return Err(SnapshotError::MixedSeries {
                        index,
                        expected: series.clone(),
                        found: comment.series_id.clone(),
                    });
                }
                if !seen.insert(&comment.id) {
                    return Err(SnapshotError::DuplicateComment { id: comment.id.clone() });
                }
            }
        }
        Ok(())
    }
}
