//! Category configuration loading and resolution.
//!
//! A configuration document maps category names to lists of file extensions
//! and carries a small set of traversal options. It is stored as JSON (or
//! TOML when the file name ends in `.toml`):
//!
//! ```json
//! {
//!   "categories": {
//!     "Images": [".jpg", ".png"],
//!     "Docs": [".pdf"]
//!   },
//!   "options": {
//!     "ignore_hidden_files": true,
//!     "ignore_hidden_folders": true
//!   }
//! }
//! ```
//!
//! Both sections are optional. The document is resolved once into an
//! [`OrganizerConfig`], which is then shared read-only by every run.

use crate::file_category::{ExtensionIndex, starter_categories};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The document could not be parsed into the expected shape.
    #[error("Invalid configuration in {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
    /// IO error while reading or writing the document.
    #[error("IO error on configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The document could not be rendered for writing.
    #[error("Failed to render configuration for {}: {reason}", .path.display())]
    Render { path: PathBuf, reason: String },
    /// Refused to overwrite an existing configuration file.
    #[error("Configuration file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

/// Serialization format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from the file extension: `.toml` is TOML, anything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Raw configuration document as read from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Category name to extension list, in document order.
    #[serde(
        default,
        deserialize_with = "ordered_categories",
        serialize_with = "serialize_categories"
    )]
    pub categories: Vec<(String, Vec<String>)>,

    #[serde(default)]
    pub options: ConfigOptions,
}

/// Traversal options from the `options` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOptions {
    /// Skip files whose name starts with ".". Defaults to true.
    #[serde(default = "default_true")]
    pub ignore_hidden_files: bool,

    /// Do not descend into directories whose name starts with ".". Defaults to true.
    #[serde(default = "default_true")]
    pub ignore_hidden_folders: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            ignore_hidden_files: true,
            ignore_hidden_folders: true,
        }
    }
}

/// Deserializes a map into an ordered list of entries.
///
/// A key that appears twice keeps its first position and takes the later value.
fn ordered_categories<'de, D>(deserializer: D) -> Result<Vec<(String, Vec<String>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CategoriesVisitor;

    impl<'de> Visitor<'de> for CategoriesVisitor {
        type Value = Vec<(String, Vec<String>)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of category names to lists of extensions")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries: Vec<(String, Vec<String>)> =
                Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, exts)) = map.next_entry::<String, Vec<String>>()? {
                if let Some(slot) = entries.iter_mut().find(|(existing, _)| *existing == name) {
                    slot.1 = exts;
                } else {
                    entries.push((name, exts));
                }
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(CategoriesVisitor)
}

fn serialize_categories<S>(
    categories: &[(String, Vec<String>)],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(categories.len()))?;
    for (name, exts) in categories {
        map.serialize_entry(name, exts)?;
    }
    map.end()
}

impl ConfigDocument {
    /// Reads and parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist.
    /// Returns `ConfigError::Io` if the file cannot be read.
    /// Returns `ConfigError::Parse` if the content does not match the expected shape.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content, ConfigFormat::from_path(path)).map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parses document text in the given format.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }

    /// Document containing the built-in starter categories and default options.
    pub fn starter() -> Self {
        Self {
            categories: starter_categories(),
            options: ConfigOptions::default(),
        }
    }

    /// Renders the document in the given format.
    pub fn render(&self, format: ConfigFormat) -> Result<String, String> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
        }
    }

    /// Writes the document to a new file, never overwriting an existing one.
    pub fn write_new(&self, path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        let content =
            self.render(ConfigFormat::from_path(path))
                .map_err(|reason| ConfigError::Render {
                    path: path.to_path_buf(),
                    reason,
                })?;

        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves the document into a lookup configuration.
    pub fn resolve(self) -> OrganizerConfig {
        OrganizerConfig::resolve(self.categories, self.options)
    }
}

/// Resolved, immutable configuration used by the organizing engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizerConfig {
    pub extension_index: ExtensionIndex,
    pub ignore_hidden_files: bool,
    pub ignore_hidden_folders: bool,
}

impl OrganizerConfig {
    /// Flattens a category mapping into an extension lookup table.
    ///
    /// Entries are processed in iteration order; when an extension appears
    /// under several categories the last one wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use foldersort::config::{ConfigOptions, OrganizerConfig};
    ///
    /// let config = OrganizerConfig::resolve(
    ///     vec![("Images", vec![".jpg", ".PNG"]), ("Docs", vec![".pdf"])],
    ///     ConfigOptions::default(),
    /// );
    /// assert_eq!(config.extension_index.get(".png"), Some("Images"));
    /// assert!(config.ignore_hidden_files);
    /// ```
    pub fn resolve<I, C, E, S>(categories: I, options: ConfigOptions) -> Self
    where
        I: IntoIterator<Item = (C, E)>,
        C: AsRef<str>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extension_index = ExtensionIndex::new();
        for (category, exts) in categories {
            for ext in exts {
                extension_index.insert(ext.as_ref(), category.as_ref());
            }
        }

        debug!(
            extensions = extension_index.len(),
            "resolved category configuration"
        );

        Self {
            extension_index,
            ignore_hidden_files: options.ignore_hidden_files,
            ignore_hidden_folders: options.ignore_hidden_folders,
        }
    }

    /// Loads and resolves a configuration document from disk.
    ///
    /// # Errors
    ///
    /// See [`ConfigDocument::load`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        ConfigDocument::load(path).map(ConfigDocument::resolve)
    }

    /// Configuration built from the starter categories.
    pub fn starter() -> Self {
        ConfigDocument::starter().resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_options_ignore_hidden() {
        let options = ConfigOptions::default();
        assert!(options.ignore_hidden_files);
        assert!(options.ignore_hidden_folders);
    }

    #[test]
    fn test_parse_full_json_document() {
        let doc = ConfigDocument::parse(
            r#"{
                "categories": {"Images": [".jpg", ".png"], "Docs": [".pdf"]},
                "options": {"ignore_hidden_files": false}
            }"#,
            ConfigFormat::Json,
        )
        .unwrap();

        assert_eq!(doc.categories.len(), 2);
        assert!(!doc.options.ignore_hidden_files);
        assert!(doc.options.ignore_hidden_folders);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = ConfigDocument::parse("{}", ConfigFormat::Json)
            .unwrap()
            .resolve();

        assert!(config.extension_index.is_empty());
        assert!(config.ignore_hidden_files);
        assert!(config.ignore_hidden_folders);
    }

    #[test]
    fn test_json_category_order_is_preserved() {
        let doc = ConfigDocument::parse(
            r#"{"categories": {"Zeta": [".a"], "Alpha": [".b"], "Mid": [".c"]}}"#,
            ConfigFormat::Json,
        )
        .unwrap();

        let names: Vec<&str> = doc.categories.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_duplicate_extension_last_category_wins() {
        let config = ConfigDocument::parse(
            r#"{"categories": {"Text": [".txt"], "Notes": [".TXT"]}}"#,
            ConfigFormat::Json,
        )
        .unwrap()
        .resolve();

        assert_eq!(config.extension_index.get(".txt"), Some("Notes"));
    }

    #[test]
    fn test_repeated_category_key_replaces_earlier_list() {
        let doc = ConfigDocument::parse(
            r#"{"categories": {"A": [".x"], "B": [".y"], "A": [".y"]}}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        assert_eq!(
            doc.categories,
            vec![
                ("A".to_string(), vec![".y".to_string()]),
                ("B".to_string(), vec![".y".to_string()]),
            ]
        );

        let config = doc.resolve();
        assert_eq!(config.extension_index.get(".x"), None);
        assert_eq!(config.extension_index.get(".y"), Some("B"));
    }

    #[test]
    fn test_wrong_shape_is_parse_error() {
        let result = ConfigDocument::parse(r#"{"categories": {"Images": ".jpg"}}"#, ConfigFormat::Json);
        assert!(result.is_err());

        let result = ConfigDocument::parse("not json", ConfigFormat::Json);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_toml_document() {
        let doc = ConfigDocument::parse(
            r#"
[categories]
Images = [".jpg"]

[options]
ignore_hidden_folders = false
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let config = doc.resolve();
        assert_eq!(config.extension_index.get(".jpg"), Some("Images"));
        assert!(config.ignore_hidden_files);
        assert!(!config.ignore_hidden_folders);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("config.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("rules.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Json);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("missing.json");

        match OrganizerConfig::load(&path) {
            Err(ConfigError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ broken").unwrap();

        assert!(matches!(
            OrganizerConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_write_new_then_load_starter() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.json");

        ConfigDocument::starter().write_new(&path).unwrap();
        let config = OrganizerConfig::load(&path).unwrap();
        assert_eq!(config, OrganizerConfig::starter());
        assert_eq!(config.extension_index.get(".pdf"), Some("Documents"));
    }

    #[test]
    fn test_write_new_refuses_to_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        assert!(matches!(
            ConfigDocument::starter().write_new(&path),
            Err(ConfigError::AlreadyExists(_))
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_write_new_errors_are_write_errors() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("missing/config.json");

        let err = ConfigDocument::starter().write_new(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let render = ConfigError::Render {
            path: PathBuf::from("config.toml"),
            reason: "unsupported value".to_string(),
        };
        assert!(render.to_string().starts_with("Failed to render configuration"));
    }
}
