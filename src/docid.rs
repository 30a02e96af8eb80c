//! Stable document id generation.
//!
//! The remote index requires ids matching `^[a-zA-Z0-9_-]{1,100}$`. Every
//! strategy funnels through the same normalization pipeline, so generated
//! ids are always URL/path-safe and idempotent under re-normalization.

use crate::config::IdFormat;
use crate::source::SourceItem;

/// Maximum id length accepted by the remote index.
const MAX_ID_LEN: usize = 100;

/// Normalize an arbitrary string into an index-safe id.
///
/// Pipeline: path separators become `-`, every character outside
/// `[a-zA-Z0-9_-]` becomes `-`, runs of `-` collapse to one, the result is
/// lowercased and truncated to 100 characters. Never fails; an empty input
/// normalizes to an empty string.
pub fn normalize_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_ID_LEN));
    let mut prev_dash = false;
    for ch in raw.chars() {
        let mapped = match ch {
            '/' | '\\' => '-',
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => {
                c.to_ascii_lowercase()
            }
            _ => '-',
        };
        if mapped == '-' {
            if prev_dash {
                continue;
            }
            prev_dash = true;
        } else {
            prev_dash = false;
        }
        if out.len() >= MAX_ID_LEN {
            break;
        }
        out.push(mapped);
    }
    out.truncate(MAX_ID_LEN);
    out
}

/// Derive the id for one source item under the given strategy.
///
/// `ByNumber` uses the item's numeric `number` field as
/// `"{collection}-{number}"` and falls back to `ById` when the field is
/// absent or non-numeric. `ById` normalizes the intrinsic id, `ByUrl` the
/// canonical URL.
pub fn generate_id(item: &SourceItem, collection: &str, format: IdFormat) -> String {
    match format {
        IdFormat::ByNumber => match item.data.get("number").and_then(|v| v.as_i64()) {
            Some(n) => normalize_id(&format!("{collection}-{n}")),
            None => normalize_id(&item.id),
        },
        IdFormat::ById => normalize_id(&item.id),
        IdFormat::ByUrl => normalize_id(&item.url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn item(id: &str, url: &str) -> SourceItem {
        SourceItem {
            id: id.to_string(),
            url: url.to_string(),
            content: String::new(),
            data: BTreeMap::new(),
        }
    }

    #[test]
    fn punctuation_collapses_to_single_dash() {
        assert_eq!(normalize_id("Hello World!"), "hello-world-");
        assert_eq!(normalize_id("a//b\\c"), "a-b-c");
        assert_eq!(normalize_id("a - _ b"), "a-_-b");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "Hello World!",
            "/posts/2024/01/05/hello/",
            "ALL_CAPS__AND--DASHES",
            "",
            "日本語タイトル",
        ] {
            let once = normalize_id(raw);
            assert_eq!(normalize_id(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn output_alphabet_and_length_are_bounded() {
        let long = "x!".repeat(400);
        for raw in ["Hello World!", &long, "ümläut spaces"] {
            let id = normalize_id(raw);
            assert!(id.len() <= 100);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'));
        }
    }

    #[test]
    fn empty_input_normalizes_to_empty() {
        assert_eq!(normalize_id(""), "");
        assert_eq!(normalize_id("!!!"), "-");
    }

    #[test]
    fn by_id_uses_intrinsic_identifier() {
        let it = item("Hello World!", "/hello-world/");
        assert_eq!(generate_id(&it, "posts", IdFormat::ById), "hello-world-");
    }

    #[test]
    fn by_url_uses_canonical_url() {
        let it = item("whatever", "/2024/01/05/hello/");
        assert_eq!(
            generate_id(&it, "posts", IdFormat::ByUrl),
            "-2024-01-05-hello-"
        );
    }

    #[test]
    fn by_number_prefixes_collection() {
        let mut it = item("fallback-id", "/x/");
        it.data.insert("number".into(), json!(42));
        assert_eq!(generate_id(&it, "issues", IdFormat::ByNumber), "issues-42");
    }

    #[test]
    fn by_number_falls_back_to_id_when_field_missing() {
        let it = item("Fallback Id", "/x/");
        assert_eq!(generate_id(&it, "issues", IdFormat::ByNumber), "fallback-id");

        let mut non_numeric = item("Fallback Id", "/x/");
        non_numeric.data.insert("number".into(), json!("ten"));
        assert_eq!(
            generate_id(&non_numeric, "issues", IdFormat::ByNumber),
            "fallback-id"
        );
    }
}
