//! Local-vs-remote reconciliation.
//!
//! Pure set algebra: ids present remotely but absent locally are deleted;
//! the full local set is upserted in build order every run. Content is
//! never diffed — resending identical documents is cheaper to reason about
//! than detecting drift caused by concurrent external edits.

use std::collections::BTreeSet;

use crate::models::{Document, RemoteDocument, SyncPlan};

/// Compute the sync plan for one run.
pub fn reconcile(local: Vec<Document>, remote: &[RemoteDocument]) -> SyncPlan {
    let local_ids: BTreeSet<&str> = local.iter().map(|d| d.id.as_str()).collect();

    let to_delete: BTreeSet<String> = remote
        .iter()
        .filter(|r| !local_ids.contains(r.id.as_str()))
        .map(|r| r.id.clone())
        .collect();

    SyncPlan {
        to_delete,
        to_upsert: local,
    }
}
