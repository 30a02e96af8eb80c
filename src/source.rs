//! The document-source seam and the built-in JSON corpus loader.
//!
//! A [`DocumentSource`] is whatever produces the content being indexed —
//! typically the host site-generation pipeline. The sync engine only reads
//! from it: named collections of [`SourceItem`]s, plus optional
//! changed-file information for the incremental-change gate.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// A single content record belonging to a named collection.
///
/// Read-only to the sync engine; never mutated. `data` carries the item's
/// front-matter-style attributes, from which configured fields are selected.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    /// Remaining attributes of the item. An item with no data at all is
    /// treated as having no front matter and is skipped by the builder.
    #[serde(flatten)]
    pub data: BTreeMap<String, Value>,
}

/// A provider of content collections.
///
/// Implement this to feed the sync engine from a custom pipeline. The
/// built-in [`JsonCorpus`] implements it for a corpus file on disk.
pub trait DocumentSource {
    /// Look up a collection by name. `None` means the collection does not
    /// exist in this source (the builder warns and skips it).
    fn collection(&self, name: &str) -> Option<&[SourceItem]>;

    /// Changed-file paths for the incremental-change gate, relative to the
    /// content root.
    ///
    /// `None` means the source cannot tell what changed — the orchestrator
    /// then proceeds unconditionally. `Some` with an empty list means
    /// "nothing changed" and the run is skipped.
    fn changed_files(&self) -> Option<Vec<String>> {
        None
    }
}

/// A corpus loaded from a single JSON file.
///
/// The expected shape is a map of collection name to item array, with an
/// optional `changed_files` list:
///
/// ```json
/// {
///   "collections": {
///     "posts": [
///       {"id": "hello", "url": "/hello/", "content": "...", "title": "Hi"}
///     ]
///   },
///   "changed_files": ["_posts/2024-01-05-hello.md"]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct JsonCorpus {
    #[serde(default)]
    collections: BTreeMap<String, Vec<SourceItem>>,
    #[serde(default)]
    changed_files: Option<Vec<String>>,
}

impl JsonCorpus {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
        let corpus: JsonCorpus =
            serde_json::from_str(&content).with_context(|| "Failed to parse corpus file")?;
        Ok(corpus)
    }

    pub fn from_collections(collections: BTreeMap<String, Vec<SourceItem>>) -> Self {
        Self {
            collections,
            changed_files: None,
        }
    }
}

impl DocumentSource for JsonCorpus {
    fn collection(&self, name: &str) -> Option<&[SourceItem]> {
        self.collections.get(name).map(|items| items.as_slice())
    }

    fn changed_files(&self) -> Option<Vec<String>> {
        self.changed_files.clone()
    }
}
