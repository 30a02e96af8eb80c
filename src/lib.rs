//! # meili-sync
//!
//! Incremental synchronization of locally generated content collections
//! into a Meilisearch-compatible search index.
//!
//! The engine builds a normalized document set from a [`source::DocumentSource`],
//! fetches the ids currently stored remotely, and reconciles the two: ids
//! present remotely but absent locally are deleted, and the full local set
//! is upserted in order. When the remote state cannot be determined, the
//! run falls back to a wipe-and-reindex. Every remote call goes through one
//! bounded retry/backoff helper, and no failure propagates above the
//! orchestrator — a host build must never fail because indexing failed.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────┐   ┌────────────┐
//! │ DocumentSource│──▶│ Builder  │──▶│ local set  │──┐
//! └───────────────┘   └──────────┘   └────────────┘  │   ┌───────────┐
//!                                                    ├──▶│ Reconcile │
//! ┌───────────────┐   ┌──────────┐   ┌────────────┐  │   └─────┬─────┘
//! │ Remote index  │◀─▶│  Client  │──▶│ remote set │──┘         ▼
//! └───────────────┘   └──────────┘   └────────────┘   delete + upsert
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`source`] | `DocumentSource` seam and JSON corpus loader |
//! | [`docid`] | Stable document id generation |
//! | [`models`] | `Document`, `RemoteDocument`, `SyncPlan` |
//! | [`builder`] | Collection items → normalized documents |
//! | [`client`] | Blocking HTTP client with retry/backoff and pagination |
//! | [`reconcile`] | Local/remote set difference |
//! | [`sync`] | End-to-end run orchestration and fallback |

pub mod builder;
pub mod client;
pub mod config;
pub mod docid;
pub mod models;
pub mod reconcile;
pub mod source;
pub mod sync;
