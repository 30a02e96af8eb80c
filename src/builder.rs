//! Builds index-ready documents from source collections.
//!
//! Walks the configured collections, normalizes each item into a
//! [`Document`] using the collection's field selection and id strategy, and
//! never fails: collections missing from the source are logged and skipped
//! so the remaining ones still sync.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

use crate::config::Config;
use crate::docid::generate_id;
use crate::models::Document;
use crate::source::DocumentSource;

/// Field names handled structurally on [`Document`] rather than copied
/// into its open field map.
const RESERVED_FIELDS: [&str; 3] = ["id", "content", "url"];

/// Build the local document set for one sync run.
///
/// Items with no data at all (no front matter) are skipped. Two items
/// normalizing to the same id are both kept — the later one wins at upsert
/// time — but the collision is logged since it usually means lost content.
pub fn build_documents(config: &Config, source: &dyn DocumentSource) -> Vec<Document> {
    let mut documents = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (name, collection) in config.effective_collections() {
        let Some(items) = source.collection(&name) else {
            warn!(collection = %name, "collection not found in source, skipping");
            continue;
        };

        let fields = collection.effective_fields();
        let before = documents.len();

        for item in items {
            if item.data.is_empty() {
                continue;
            }

            let id = generate_id(item, &name, collection.id_format);
            if !seen_ids.insert(id.clone()) {
                warn!(
                    collection = %name,
                    id = %id,
                    "duplicate document id within this run, later item wins"
                );
            }

            let mut doc_fields = BTreeMap::new();
            for field in &fields {
                if RESERVED_FIELDS.contains(&field.as_str()) {
                    continue;
                }
                let value = item
                    .data
                    .get(field)
                    .map(normalize_field_value)
                    .unwrap_or(Value::Null);
                doc_fields.insert(field.clone(), value);
            }

            documents.push(Document {
                id,
                content: item.content.trim().to_string(),
                url: item.url.clone(),
                fields: doc_fields,
            });
        }

        info!(
            collection = %name,
            documents = documents.len() - before,
            "built collection"
        );
    }

    documents
}

/// Reformat datetime-valued fields as `YYYY-MM-DD`; pass everything else
/// through unchanged.
fn normalize_field_value(value: &Value) -> Value {
    if let Value::String(s) = value {
        if let Some(date) = parse_date(s) {
            return Value::String(date);
        }
    }
    value.clone()
}

fn parse_date(s: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.format("%Y-%m-%d").to_string());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.format("%Y-%m-%d").to_string());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.format("%Y-%m-%d").to_string());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{JsonCorpus, SourceItem};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn config(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    fn corpus(collections: &[(&str, Vec<SourceItem>)]) -> JsonCorpus {
        JsonCorpus::from_collections(
            collections
                .iter()
                .map(|(name, items)| (name.to_string(), items.clone()))
                .collect(),
        )
    }

    fn item(id: &str, url: &str, content: &str, data: &[(&str, Value)]) -> SourceItem {
        SourceItem {
            id: id.to_string(),
            url: url.to_string(),
            content: content.to_string(),
            data: data
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn builds_hello_world_scenario() {
        let cfg = config(
            r#"
url = "https://s.example"
api_key = "k"

[collections.posts]
id_format = "id"
"#,
        );
        let src = corpus(&[(
            "posts",
            vec![item(
                "Hello World!",
                "/hello-world/",
                "  hi  ",
                &[("title", json!("Hi")), ("date", json!("2024-01-05"))],
            )],
        )]);

        let docs = build_documents(&cfg, &src);
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.id, "hello-world-");
        assert_eq!(doc.content, "hi");
        assert_eq!(doc.url, "/hello-world/");
        assert_eq!(doc.fields["title"], json!("Hi"));
        assert_eq!(doc.fields["date"], json!("2024-01-05"));
    }

    #[test]
    fn missing_collection_is_skipped_not_fatal() {
        let cfg = config(
            r#"
url = "https://s.example"
api_key = "k"

[collections.pages]
[collections.posts]
"#,
        );
        let src = corpus(&[(
            "posts",
            vec![item("a", "/a/", "x", &[("title", json!("A"))])],
        )]);

        let docs = build_documents(&cfg, &src);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a");
    }

    #[test]
    fn items_without_data_are_skipped() {
        let cfg = config("url = \"https://s.example\"\napi_key = \"k\"\n");
        let src = corpus(&[(
            "posts",
            vec![
                item("bare", "/bare/", "body", &[]),
                item("kept", "/kept/", "body", &[("title", json!("K"))]),
            ],
        )]);

        let docs = build_documents(&cfg, &src);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "kept");
    }

    #[test]
    fn missing_fields_become_null() {
        let cfg = config("url = \"https://s.example\"\napi_key = \"k\"\n");
        let src = corpus(&[(
            "posts",
            vec![item("a", "/a/", "x", &[("title", json!("A"))])],
        )]);

        let docs = build_documents(&cfg, &src);
        // Default field set is {title, content, url, date}; content/url are
        // structural, so only title and date land in the open map.
        assert_eq!(docs[0].fields["title"], json!("A"));
        assert_eq!(docs[0].fields["date"], Value::Null);
        assert!(!docs[0].fields.contains_key("content"));
        assert!(!docs[0].fields.contains_key("url"));
    }

    #[test]
    fn datetime_values_are_reduced_to_dates() {
        assert_eq!(
            normalize_field_value(&json!("2024-01-05T08:30:00+02:00")),
            json!("2024-01-05")
        );
        assert_eq!(
            normalize_field_value(&json!("2024-01-05 08:30:00")),
            json!("2024-01-05")
        );
        assert_eq!(normalize_field_value(&json!("2024-01-05")), json!("2024-01-05"));
        assert_eq!(normalize_field_value(&json!("not a date")), json!("not a date"));
        assert_eq!(normalize_field_value(&json!(17)), json!(17));
    }

    #[test]
    fn duplicate_ids_keep_both_for_last_write_wins() {
        let cfg = config(
            r#"
url = "https://s.example"
api_key = "k"

[collections.posts]
id_format = "id"
"#,
        );
        let src = corpus(&[(
            "posts",
            vec![
                item("Same Id", "/first/", "first", &[("title", json!("1"))]),
                item("same-id", "/second/", "second", &[("title", json!("2"))]),
            ],
        )]);

        let docs = build_documents(&cfg, &src);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, docs[1].id);
        assert_eq!(docs[1].url, "/second/");
    }
}
