//! Core data types that flow through the sync pipeline.
//!
//! A [`Document`] is the unit of sync: built locally from a source item,
//! serialized as the upsert payload, and identified remotely by its `id`.
//! A [`RemoteDocument`] is the minimal shadow the remote index reports back
//! (identity only, never compared by content). A [`SyncPlan`] is computed
//! fresh on every run and discarded afterwards — the remote index is the
//! only durable state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A normalized, index-ready document.
///
/// `id` is stable and unique within an index (see [`crate::docid`]);
/// `content` is whitespace-trimmed body text and may be empty; `url` is an
/// opaque canonical locator. All other indexed fields live in `fields` and
/// serialize inline next to the fixed three, which is the flat shape the
/// remote documents API expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub url: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// A document as reported by the remote index.
///
/// Only the `id` matters: reconciliation compares identity, never content.
/// Any other attributes the remote returns are ignored on deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
}

/// The outcome of reconciling the local document set against the remote one.
///
/// `to_delete` holds ids present remotely but absent locally; `to_upsert`
/// is the full local set in build order (every document is resent each run,
/// trading write amplification for correctness under external edits).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub to_delete: BTreeSet<String>,
    pub to_upsert: Vec<Document>,
}

impl SyncPlan {
    /// True when the plan would issue no remote writes at all.
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_upsert.is_empty()
    }
}
