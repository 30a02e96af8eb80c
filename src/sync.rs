//! End-to-end sync orchestration.
//!
//! One invocation is a single linear run: disabled check → change gate →
//! config validation → build → ensure index → fetch remote → reconcile and
//! apply, with a full wipe-and-reindex fallback when the remote document
//! set cannot be determined. Nothing here propagates an error outward —
//! every failure is absorbed into the returned [`SyncOutcome`] so the host
//! build never fails because indexing failed.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info, warn};

use crate::builder::build_documents;
use crate::client::IndexClient;
use crate::config::Config;
use crate::models::SyncPlan;
use crate::reconcile::reconcile;
use crate::source::DocumentSource;

/// The host environment a run executes in. Syncing can be disabled for
/// development builds via `disable_in_development`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse an environment label; anything that is not a development
    /// label counts as production.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        }
    }

    /// Read the environment from `MSYNC_ENV`, defaulting to development —
    /// the conservative choice when the flag that disables dev syncs is on.
    pub fn from_env() -> Self {
        match std::env::var("MSYNC_ENV") {
            Ok(value) => Environment::parse(&value),
            Err(_) => Environment::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub environment: Environment,
    /// Build, fetch, and reconcile, but write nothing.
    pub dry_run: bool,
    /// Skip the remote fetch and reindex from scratch.
    pub force_full: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            dry_run: false,
            force_full: false,
        }
    }
}

/// What a run did. The orchestrator never returns `Err`.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Disabled for this environment, or the change gate saw nothing
    /// relevant to sync.
    Skipped { reason: String },
    /// Configuration invalid; no network call was made.
    ConfigInvalid { reason: String },
    /// Dry run: the plan that would have been applied.
    Planned { plan: SyncPlan, full_reindex: bool },
    /// Documents were pushed to the remote index.
    Synced {
        deleted: usize,
        upserted: usize,
        failed_chunks: usize,
        full_reindex: bool,
    },
    /// An internal failure was caught at the orchestrator boundary.
    Failed { reason: String },
}

/// Run one sync against the configured remote index.
pub fn run_sync(config: &Config, source: &dyn DocumentSource, options: &SyncOptions) -> SyncOutcome {
    if let Some(outcome) = preflight(config, source, options) {
        return outcome;
    }

    let client = match IndexClient::new(config) {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "could not construct index client");
            return SyncOutcome::Failed {
                reason: err.to_string(),
            };
        }
    };

    execute(config, source, options, &client)
}

/// Like [`run_sync`], but with a caller-supplied client. Used by tests and
/// by callers that tune the client (for example its backoff unit).
pub fn run_sync_with_client(
    config: &Config,
    source: &dyn DocumentSource,
    options: &SyncOptions,
    client: &IndexClient,
) -> SyncOutcome {
    if let Some(outcome) = preflight(config, source, options) {
        return outcome;
    }
    execute(config, source, options, client)
}

/// The steps that need no network: disabled check, change gate, config
/// validation. `Some` short-circuits the run.
fn preflight(
    config: &Config,
    source: &dyn DocumentSource,
    options: &SyncOptions,
) -> Option<SyncOutcome> {
    if config.disable_in_development && options.environment == Environment::Development {
        info!("sync disabled in development, skipping");
        return Some(SyncOutcome::Skipped {
            reason: "disabled in development".to_string(),
        });
    }

    if let Some(changed) = source.changed_files() {
        let collections: BTreeSet<String> =
            config.effective_collections().into_keys().collect();
        if changed.is_empty() {
            info!("no changed files, skipping");
            return Some(SyncOutcome::Skipped {
                reason: "no changed files".to_string(),
            });
        }
        if !changed
            .iter()
            .any(|path| touches_collection(path, &collections))
        {
            info!("no changed files under synced collections, skipping");
            return Some(SyncOutcome::Skipped {
                reason: "no relevant changes".to_string(),
            });
        }
    }

    if let Err(err) = config.validate() {
        error!(error = %err, "invalid configuration, aborting sync");
        return Some(SyncOutcome::ConfigInvalid {
            reason: err.to_string(),
        });
    }

    None
}

fn execute(
    config: &Config,
    source: &dyn DocumentSource,
    options: &SyncOptions,
    client: &IndexClient,
) -> SyncOutcome {
    // A foreign DocumentSource may panic; that must not take the host
    // build down with it.
    let documents =
        match catch_unwind(AssertUnwindSafe(|| build_documents(config, source))) {
            Ok(documents) => documents,
            Err(_) => {
                error!("document build panicked, ending run");
                return SyncOutcome::Failed {
                    reason: "document build panicked".to_string(),
                };
            }
        };
    info!(documents = documents.len(), "built local document set");

    client.ensure_index();

    let remote = if options.force_full {
        None
    } else {
        match client.fetch_all() {
            Ok(remote) => Some(remote),
            Err(_) => {
                warn!("remote document set unknown, falling back to full reindex");
                None
            }
        }
    };

    match remote {
        Some(remote) => {
            let plan = reconcile(documents, &remote);
            if options.dry_run {
                return SyncOutcome::Planned {
                    plan,
                    full_reindex: false,
                };
            }
            apply(client, plan, false)
        }
        None => {
            let plan = SyncPlan {
                to_delete: BTreeSet::new(),
                to_upsert: documents,
            };
            if options.dry_run {
                return SyncOutcome::Planned {
                    plan,
                    full_reindex: true,
                };
            }
            if !client.wipe_all() {
                warn!("wipe did not take effect, reindexing anyway");
            }
            apply(client, plan, true)
        }
    }
}

fn apply(client: &IndexClient, plan: SyncPlan, full_reindex: bool) -> SyncOutcome {
    let deleted = if client.delete_batch(&plan.to_delete) {
        plan.to_delete.len()
    } else {
        0
    };

    let failed_chunks = if plan.to_upsert.is_empty() {
        0
    } else {
        client.upsert_batch(&plan.to_upsert)
    };
    if failed_chunks > 0 {
        warn!(failed_chunks, "some upsert chunks were not applied");
    }

    SyncOutcome::Synced {
        deleted,
        upserted: plan.to_upsert.len(),
        failed_chunks,
        full_reindex,
    }
}

/// True when the changed path's leading component names one of the synced
/// collections, with or without the underscore prefix content directories
/// conventionally carry.
fn touches_collection(path: &str, collections: &BTreeSet<String>) -> bool {
    let Some(first) = path.split(['/', '\\']).find(|part| !part.is_empty()) else {
        return false;
    };
    collections
        .iter()
        .any(|name| first == name || first.strip_prefix('_') == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{JsonCorpus, SourceItem};
    use std::collections::BTreeMap;

    fn base_config(extra: &str) -> Config {
        toml::from_str(&format!(
            "url = \"https://s.example\"\napi_key = \"k\"\n{extra}"
        ))
        .unwrap()
    }

    fn empty_source() -> JsonCorpus {
        JsonCorpus::from_collections(BTreeMap::new())
    }

    struct GatedSource {
        changed: Option<Vec<String>>,
    }

    impl DocumentSource for GatedSource {
        fn collection(&self, _name: &str) -> Option<&[SourceItem]> {
            None
        }
        fn changed_files(&self) -> Option<Vec<String>> {
            self.changed.clone()
        }
    }

    #[test]
    fn development_runs_are_skipped_when_disabled() {
        let config = base_config("disable_in_development = true\n");
        let options = SyncOptions {
            environment: Environment::Development,
            ..SyncOptions::default()
        };
        let outcome = run_sync(&config, &empty_source(), &options);
        assert!(matches!(outcome, SyncOutcome::Skipped { .. }));
    }

    #[test]
    fn empty_change_set_skips_the_run() {
        let config = base_config("");
        let source = GatedSource {
            changed: Some(Vec::new()),
        };
        let outcome = run_sync(&config, &source, &SyncOptions::default());
        assert!(matches!(outcome, SyncOutcome::Skipped { .. }));
    }

    #[test]
    fn irrelevant_changes_skip_the_run() {
        let config = base_config("[collections.posts]\n");
        let source = GatedSource {
            changed: Some(vec!["assets/logo.png".to_string(), "about.md".to_string()]),
        };
        let outcome = run_sync(&config, &source, &SyncOptions::default());
        assert!(matches!(outcome, SyncOutcome::Skipped { .. }));
    }

    #[test]
    fn invalid_config_aborts_before_any_network_call() {
        let config: Config =
            toml::from_str("url = \"https://s.example\"\napi_key = \"\"\n").unwrap();
        let outcome = run_sync(&config, &empty_source(), &SyncOptions::default());
        assert!(matches!(outcome, SyncOutcome::ConfigInvalid { .. }));
    }

    #[test]
    fn environment_labels_parse_conservatively() {
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse("DEV"), Environment::Development);
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Production);
    }

    #[test]
    fn change_gate_matches_collection_directories() {
        let collections: BTreeSet<String> = ["posts".to_string()].into_iter().collect();
        assert!(touches_collection("_posts/2024-01-05-hello.md", &collections));
        assert!(touches_collection("posts/hello.md", &collections));
        assert!(touches_collection("/posts/hello.md", &collections));
        assert!(!touches_collection("assets/posts.css", &collections));
        assert!(!touches_collection("", &collections));
    }
}
