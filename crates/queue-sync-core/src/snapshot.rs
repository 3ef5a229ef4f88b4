//! # Queue Snapshot Model
//!
//! The ordered queue view delivered by the remote service. Ordering is owned
//! entirely by the remote side; nothing in this crate reorders entries.
//!
//! [`SnapshotPayload`] is the transport-level shape carried by both delivery
//! paths (one pull response, one push message). [`QueueSnapshot`] is the
//! caller-facing composition of a payload with the identifier pair it was
//! requested for.

use crate::{QueueIdentity, Timestamp};
use serde::{Deserialize, Serialize};

/// One entry in the remotely-managed queue.
///
/// Everything except `entry_id` is optional: the remote service omits fields
/// it has not resolved yet, and the label fields are opaque display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// Unique identifier of this entry
    pub entry_id: String,

    /// 1-based position in the queue, when the remote side has assigned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,

    /// Remote-defined processing status (opaque to the client)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Display label for the queued item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Display label for the entry's owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl QueueEntry {
    /// Create an entry carrying only its identifier
    pub fn new(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            position: None,
            status: None,
            title: None,
            owner: None,
        }
    }

    /// Set the queue position
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the processing status
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the item label
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the owner label
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// The queue payload as delivered by the transport.
///
/// Both delivery paths carry exactly this shape, keyed by `parent_id` at the
/// call site. `last_updated` is optional on the wire; composition fills in
/// the receive time when the remote service omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    /// Entries in remote-defined order
    pub ordered_entries: Vec<QueueEntry>,

    /// When the remote service last changed the queue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

impl SnapshotPayload {
    /// Create a payload with the given entries and no update time
    pub fn new(ordered_entries: Vec<QueueEntry>) -> Self {
        Self {
            ordered_entries,
            last_updated: None,
        }
    }

    /// Set the update time
    pub fn with_last_updated(mut self, last_updated: Timestamp) -> Self {
        self.last_updated = Some(last_updated);
        self
    }

    /// Number of entries in the payload
    pub fn len(&self) -> usize {
        self.ordered_entries.len()
    }

    /// Whether the payload carries no entries
    pub fn is_empty(&self) -> bool {
        self.ordered_entries.is_empty()
    }
}

/// The caller-facing queue view: a payload bound to the identifier pair it
/// was synchronized for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    /// Identifier of the observing participant
    pub subject_id: String,

    /// Identifier of the queue-owning aggregate
    pub parent_id: String,

    /// Entries in remote-defined order, never reordered locally
    pub ordered_entries: Vec<QueueEntry>,

    /// When this view was last updated
    pub last_updated: Timestamp,
}

impl QueueSnapshot {
    /// Compose a snapshot from a transport payload and the identity it was
    /// fetched for.
    ///
    /// When the payload carries no update time, the receive time is used.
    pub fn from_payload(identity: &QueueIdentity, payload: SnapshotPayload) -> Self {
        Self {
            subject_id: identity.subject_id.clone(),
            parent_id: identity.parent_id.clone(),
            ordered_entries: payload.ordered_entries,
            last_updated: payload.last_updated.unwrap_or_else(Timestamp::now),
        }
    }

    /// Look up an entry by its identifier
    pub fn entry(&self, entry_id: &str) -> Option<&QueueEntry> {
        self.ordered_entries.iter().find(|e| e.entry_id == entry_id)
    }

    /// Number of entries in the snapshot
    pub fn len(&self) -> usize {
        self.ordered_entries.len()
    }

    /// Whether the snapshot carries no entries
    pub fn is_empty(&self) -> bool {
        self.ordered_entries.is_empty()
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
