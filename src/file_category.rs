/// Extension-based file categorization.
///
/// This module holds the flat lookup table that maps a lower-cased file
/// extension (including the leading dot, e.g. `.pdf`) to the name of the
/// category directory a file belongs in.
///
/// # Examples
///
/// ```
/// use foldersort::file_category::ExtensionIndex;
/// use std::path::Path;
///
/// let mut index = ExtensionIndex::new();
/// index.insert(".PDF", "Docs");
/// assert_eq!(index.category_for(Path::new("report.pdf")), Some("Docs"));
/// assert_eq!(index.category_for(Path::new("notes.txt")), None);
/// ```
use std::collections::HashMap;
use std::path::Path;

/// Lookup table from extension key to category name.
///
/// Keys are stored lower-cased. Inserting an extension that is already
/// present replaces its category, so the last mapping processed wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionIndex {
    extension_map: HashMap<String, String>,
}

impl ExtensionIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an extension to category mapping.
    ///
    /// The extension is lower-cased but otherwise kept as given; a value
    /// without a leading dot is accepted and simply never matches a real
    /// file extension key.
    pub fn insert(&mut self, ext: &str, category: &str) {
        self.extension_map
            .insert(ext.to_lowercase(), category.to_string());
    }

    /// Looks up the category for an already normalized extension key.
    pub fn get(&self, ext_key: &str) -> Option<&str> {
        self.extension_map.get(ext_key).map(String::as_str)
    }

    /// Determines the category for a file path from its extension.
    ///
    /// Unknown extensions yield `None` rather than an error.
    pub fn category_for(&self, path: &Path) -> Option<&str> {
        self.get(&extension_key(path))
    }

    pub fn len(&self) -> usize {
        self.extension_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extension_map.is_empty()
    }

    /// Returns the distinct category names referenced by the index, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.extension_map.values().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Returns the lower-cased extension of `path` including the leading dot.
///
/// Names without an extension, names ending in a dot and dot-files such as
/// `.bashrc` all produce an empty string.
///
/// ```
/// use foldersort::file_category::extension_key;
/// use std::path::Path;
///
/// assert_eq!(extension_key(Path::new("photo.JPG")), ".jpg");
/// assert_eq!(extension_key(Path::new("archive.tar.gz")), ".gz");
/// assert_eq!(extension_key(Path::new(".bashrc")), "");
/// assert_eq!(extension_key(Path::new("README")), "");
/// ```
pub fn extension_key(path: &Path) -> String {
    match path.extension() {
        Some(ext) if !ext.is_empty() => format!(".{}", ext.to_string_lossy().to_lowercase()),
        _ => String::new(),
    }
}

/// Built-in category table used to bootstrap a new configuration file.
pub fn starter_categories() -> Vec<(String, Vec<String>)> {
    const TABLE: &[(&str, &[&str])] = &[
        (
            "Images",
            &[
                ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".tiff", ".ico", ".heic",
            ],
        ),
        (
            "Audio",
            &[".mp3", ".wav", ".ogg", ".flac", ".aac", ".m4a", ".wma"],
        ),
        (
            "Videos",
            &[".mp4", ".mkv", ".avi", ".mov", ".flv", ".wmv", ".webm", ".3gp"],
        ),
        (
            "Documents",
            &[".pdf", ".txt", ".doc", ".docx", ".md", ".rtf", ".odt"],
        ),
        (
            "Archives",
            &[".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz"],
        ),
        (
            "Code",
            &[
                ".py", ".java", ".c", ".cpp", ".h", ".hpp", ".js", ".ts", ".rs", ".go", ".sh",
                ".json", ".xml", ".yaml", ".yml", ".toml", ".html", ".htm",
            ],
        ),
        ("Spreadsheets", &[".csv", ".xls", ".xlsx", ".ods"]),
        ("Presentations", &[".ppt", ".pptx", ".odp"]),
        ("Fonts", &[".ttf", ".otf", ".woff", ".woff2"]),
    ];

    TABLE
        .iter()
        .map(|(category, exts)| {
            (
                (*category).to_string(),
                exts.iter().map(|ext| (*ext).to_string()).collect(),
            )
        })
        .collect()
}
