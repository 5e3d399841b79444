//! Extension-based file categorization.
//!
//! A [`CategoryTable`] is an ordered list of named categories, each owning a
//! set of lowercase extensions (with their leading dot). The order is
//! significant: when two categories would claim the same extension the first
//! one declared wins, although [`CategoryTable::validate`] rejects such tables
//! outright. Anything that matches no category lands in [`OTHERS`].
//!
//! # Examples
//!
//! ```
//! use tidydesk::file_category::Classifier;
//!
//! let classifier = Classifier::default();
//! assert_eq!(classifier.classify("Photo.JPG"), "Images");
//! assert_eq!(classifier.classify("archive.tar.gz"), "Archives");
//! assert_eq!(classifier.classify("README"), "Others");
//! assert_eq!(classifier.classify(".gitignore"), "Others");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Name of the implicit fallback category.
pub const OTHERS: &str = "Others";

/// Built-in table, in lookup order.
const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Images",
        &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp", ".ico"],
    ),
    (
        "Documents",
        &[
            ".pdf", ".docx", ".doc", ".txt", ".pptx", ".ppt", ".xlsx", ".xls", ".csv", ".md",
        ],
    ),
    ("Videos", &[".mp4", ".mkv", ".flv", ".avi", ".mov", ".wmv"]),
    ("Music", &[".mp3", ".wav", ".aac", ".flac"]),
    ("Archives", &[".zip", ".rar", ".7z", ".tar", ".gz"]),
    ("Programs", &[".exe", ".msi", ".dmg", ".pkg", ".deb"]),
    (
        "Code",
        &[".py", ".js", ".html", ".css", ".java", ".cpp", ".json"],
    ),
];

/// Problems that make a category table unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryTableError {
    /// The same extension is listed under two categories.
    #[error("extension '{extension}' is claimed by both '{first}' and '{second}'")]
    DuplicateExtension {
        /// The offending extension, normalized.
        extension: String,
        /// Category that declared it first.
        first: String,
        /// Category that declared it again.
        second: String,
    },
    /// The category name cannot be used as a single directory name.
    #[error("invalid category name '{0}': must be a single, non-empty path component")]
    InvalidCategoryName(String),
    /// The category name is reserved for the fallback category.
    #[error("category name '{0}' is reserved for unmatched files")]
    ReservedCategory(String),
    /// A category lists an empty extension.
    #[error("category '{0}' lists an empty extension")]
    EmptyExtension(String),
}

/// One named category and the extensions that belong to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Directory name the files are moved into.
    pub name: String,
    /// Extensions, lowercase, with their leading dot.
    pub extensions: Vec<String>,
}

/// Ordered mapping from category name to extension set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryTable {
    categories: Vec<CategoryDef>,
}

impl CategoryTable {
    /// Creates an empty table. Every file will classify as [`OTHERS`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the built-in table.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (name, extensions) in DEFAULT_CATEGORIES {
            table.push(*name, extensions.iter().copied());
        }
        table
    }

    /// Appends a category after the existing ones.
    ///
    /// Extensions are normalized with [`normalize_extension`], so `"JPG"`
    /// and `".jpg"` are equivalent.
    pub fn push<I, S>(&mut self, name: impl Into<String>, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.categories.push(CategoryDef {
            name: name.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        });
    }

    /// Builder form of [`CategoryTable::push`].
    pub fn with_category<I, S>(mut self, name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push(name, extensions);
        self
    }

    /// Categories in declaration order.
    pub fn categories(&self) -> &[CategoryDef] {
        &self.categories
    }

    /// Checks the table invariants.
    ///
    /// Category names must be usable as directory names and must not shadow
    /// [`OTHERS`]; extensions must be non-empty and unique across the whole
    /// table.
    pub fn validate(&self) -> Result<(), CategoryTableError> {
        let mut owners: HashMap<&str, &str> = HashMap::new();

        for category in &self.categories {
            let name = category.name.as_str();
            if name.eq_ignore_ascii_case(OTHERS) {
                return Err(CategoryTableError::ReservedCategory(name.to_string()));
            }
            if !is_single_component(name) {
                return Err(CategoryTableError::InvalidCategoryName(name.to_string()));
            }

            for extension in &category.extensions {
                if extension.len() < 2 {
                    return Err(CategoryTableError::EmptyExtension(name.to_string()));
                }
                if let Some(first) = owners.insert(extension.as_str(), name) {
                    return Err(CategoryTableError::DuplicateExtension {
                        extension: extension.clone(),
                        first: first.to_string(),
                        second: name.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn is_single_component(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}

/// Lowercases an extension and makes sure it starts with a dot.
///
/// ```
/// use tidydesk::file_category::normalize_extension;
///
/// assert_eq!(normalize_extension("JPG"), ".jpg");
/// assert_eq!(normalize_extension(" .Tar "), ".tar");
/// ```
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Splits a file name into `(stem, extension)` at its last dot.
///
/// The extension keeps its dot. Dots at the very start of the name never
/// begin an extension, so dotfiles have none.
///
/// ```
/// use tidydesk::file_category::split_extension;
///
/// assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
/// assert_eq!(split_extension(".gitignore"), (".gitignore", ""));
/// assert_eq!(split_extension("README"), ("README", ""));
/// ```
pub fn split_extension(file_name: &str) -> (&str, &str) {
    let leading = file_name.len() - file_name.trim_start_matches('.').len();
    match file_name[leading..].rfind('.') {
        Some(idx) => file_name.split_at(leading + idx),
        None => (file_name, ""),
    }
}

/// Maps file names to category names.
///
/// Lookups go through an extension map precomputed from the table, so each
/// call is a single hash lookup.
#[derive(Debug, Clone)]
pub struct Classifier {
    table: CategoryTable,
    extension_map: HashMap<String, usize>,
}

impl Classifier {
    /// Builds a classifier, rejecting tables that fail
    /// [`CategoryTable::validate`].
    pub fn new(table: CategoryTable) -> Result<Self, CategoryTableError> {
        table.validate()?;
        Ok(Self::from_valid_table(table))
    }

    fn from_valid_table(table: CategoryTable) -> Self {
        let mut extension_map = HashMap::new();
        for (index, category) in table.categories.iter().enumerate() {
            for extension in &category.extensions {
                extension_map.entry(extension.clone()).or_insert(index);
            }
        }
        Self {
            table,
            extension_map,
        }
    }

    /// Returns the category a file belongs to, falling back to [`OTHERS`].
    pub fn classify(&self, file_name: &str) -> &str {
        let (_, extension) = split_extension(file_name);
        if extension.is_empty() {
            return OTHERS;
        }

        self.extension_map
            .get(&extension.to_lowercase())
            .map(|&index| self.table.categories[index].name.as_str())
            .unwrap_or(OTHERS)
    }

    /// Every category a file can land in: the table's, then [`OTHERS`].
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.table
            .categories
            .iter()
            .map(|category| category.name.as_str())
            .chain(std::iter::once(OTHERS))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_valid_table(CategoryTable::builtin())
    }
}
