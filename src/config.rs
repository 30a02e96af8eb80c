use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Default index name used when the config does not set one.
pub const DEFAULT_INDEX_NAME: &str = "jekyll_documents";

/// Fields copied into a document when a collection does not list its own.
pub const DEFAULT_FIELDS: [&str; 4] = ["title", "content", "url", "date"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the remote index service. Trailing slash is stripped
    /// at load time; [`Config::validate`] rejects an empty value.
    pub url: String,
    /// Bearer token sent on every request.
    pub api_key: String,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default)]
    pub disable_in_development: bool,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CollectionConfig {
    /// Field names to copy from each item's data; empty means the
    /// [`DEFAULT_FIELDS`] set.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub id_format: IdFormat,
}

/// Id-derivation strategy, resolved once at config parse time.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdFormat {
    /// Prefer the numeric `number` field, fall back to the intrinsic id.
    #[default]
    #[serde(rename = "default")]
    ByNumber,
    #[serde(rename = "id")]
    ById,
    #[serde(rename = "url")]
    ByUrl,
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

impl Config {
    /// Check the invariants a sync run depends on.
    ///
    /// A run aborts before any network call when this fails.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            anyhow::bail!("url is required");
        }
        if self.api_key.trim().is_empty() {
            anyhow::bail!("api_key is required");
        }
        Ok(())
    }

    /// The effective collection set: the configured one, or the `posts`
    /// default when the config names none.
    pub fn effective_collections(&self) -> BTreeMap<String, CollectionConfig> {
        if self.collections.is_empty() {
            let mut defaults = BTreeMap::new();
            defaults.insert(
                "posts".to_string(),
                CollectionConfig {
                    fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
                    id_format: IdFormat::default(),
                },
            );
            defaults
        } else {
            self.collections.clone()
        }
    }
}

impl CollectionConfig {
    /// The effective field list for this collection.
    pub fn effective_fields(&self) -> Vec<String> {
        if self.fields.is_empty() {
            DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
        } else {
            self.fields.clone()
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    while config.url.ends_with('/') {
        config.url.pop();
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let file = write_config(
            r#"
url = "https://search.example.com/"
api_key = "k"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.url, "https://search.example.com");
        assert_eq!(config.index_name, DEFAULT_INDEX_NAME);
        assert!(!config.disable_in_development);
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let file = write_config("url = \"https://search.example.com\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn empty_url_is_rejected() {
        let file = write_config("url = \"\"\napi_key = \"k\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn id_format_parses_into_enum() {
        let file = write_config(
            r#"
url = "https://search.example.com"
api_key = "k"

[collections.posts]
fields = ["title", "date"]
id_format = "url"

[collections.issues]
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.collections["posts"].id_format, IdFormat::ByUrl);
        assert_eq!(config.collections["issues"].id_format, IdFormat::ByNumber);
        assert_eq!(
            config.collections["issues"].effective_fields(),
            vec!["title", "content", "url", "date"]
        );
    }

    #[test]
    fn unknown_id_format_is_rejected() {
        let file = write_config(
            r#"
url = "https://search.example.com"
api_key = "k"

[collections.posts]
id_format = "sha"
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn default_collection_set_is_posts() {
        let file = write_config("url = \"https://s.example\"\napi_key = \"k\"\n");
        let config = load_config(file.path()).unwrap();
        let collections = config.effective_collections();
        assert_eq!(collections.len(), 1);
        assert!(collections.contains_key("posts"));
        assert_eq!(
            collections["posts"].fields,
            vec!["title", "content", "url", "date"]
        );
    }
}
