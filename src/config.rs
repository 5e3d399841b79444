//! TOML configuration for the command-line front end.
//!
//! Everything is optional; an empty file behaves exactly like the built-in
//! defaults.
//!
//! ```toml
//! # Replaces the built-in table. Order matters: first match wins.
//! [[categories]]
//! name = "Images"
//! extensions = ["jpg", ".png"]
//!
//! [[categories]]
//! name = "Ebooks"
//! extensions = [".epub", ".mobi"]
//!
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.part", "~$*"]
//! extensions = ["tmp", "crdownload"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [organizer]
//! max_collision_attempts = 10000
//! ```
//!
//! Files matching no category still go to `Others`, which must not be
//! declared here.

use crate::file_category::{CategoryDef, CategoryTable, CategoryTableError, Classifier};
use crate::file_organizer::Organizer;
use crate::naming::DEFAULT_MAX_ATTEMPTS;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".tidydeskrc.toml";

/// Errors that can occur while loading or compiling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// Why it failed.
        reason: String,
    },
    /// The `[[categories]]` table breaks a table invariant.
    #[error("Invalid categories: {0}")]
    InvalidCategories(#[from] CategoryTableError),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Replacement category table; `None` keeps the built-in one.
    #[serde(default)]
    pub categories: Option<Vec<CategoryDef>>,

    /// Which files are eligible for moving.
    #[serde(default)]
    pub filters: FilterRules,

    /// Tuning for the move engine.
    #[serde(default)]
    pub organizer: OrganizerSettings,
}

/// File filter rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether hidden files (starting with ".") are organized. Defaults to
    /// true: they are classified by extension like everything else.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    /// Rules for leaving files in place.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Whitelist that overrides exclude rules.
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_enable_hidden_files() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for leaving files where they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames (e.g. ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the file name (e.g. "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Extensions, with or without the leading dot (e.g. "tmp").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regular expressions matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Whitelist rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// `[organizer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerSettings {
    /// Upper bound on `_N` suffixes tried when a name is taken.
    #[serde(default = "default_max_collision_attempts")]
    pub max_collision_attempts: usize,
}

fn default_max_collision_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for OrganizerSettings {
    fn default() -> Self {
        Self {
            max_collision_attempts: default_max_collision_attempts(),
        }
    }
}

impl Config {
    /// Loads configuration, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if provided
    /// 2. `.tidydeskrc.toml` in the current directory
    /// 3. `~/.config/tidydesk/config.toml`
    /// 4. built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed. An
    /// explicitly given path that does not exist is an error too.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("tidydesk")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Loads configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// The category table this configuration selects, extensions normalized.
    pub fn category_table(&self) -> CategoryTable {
        match &self.categories {
            Some(categories) => {
                let mut table = CategoryTable::empty();
                for category in categories {
                    table.push(category.name.clone(), &category.extensions);
                }
                table
            }
            None => CategoryTable::builtin(),
        }
    }

    /// Builds a ready-to-run organizer: validates the category table and
    /// compiles the filters.
    ///
    /// # Errors
    ///
    /// Fails on an invalid category table or an invalid glob/regex pattern.
    pub fn into_organizer(self) -> Result<Organizer, ConfigError> {
        let classifier = Classifier::new(self.category_table())?;
        let filters = CompiledFilters::new(self.filters)?;
        Ok(Organizer::new(classifier)
            .with_filters(filters)
            .with_max_collision_attempts(self.organizer.max_collision_attempts))
    }
}

/// Filter rules with every pattern compiled up front.
#[derive(Debug)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Compiles filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex pattern is invalid.
    pub fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Whether a file should be organized.
    ///
    /// `file_path` is matched as given; the organizer passes bare file
    /// names. Checks run in this order:
    /// 1. include patterns: a match always includes
    /// 2. hidden files, when disabled
    /// 3. exact filename
    /// 4. extension (case-insensitive)
    /// 5. glob patterns
    /// 6. regex patterns
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if matches_any(&self.include_patterns, file_path) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if matches_any(&self.exclude_patterns, file_path) {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

fn matches_any(patterns: &[Pattern], file_path: &Path) -> bool {
    patterns.iter().any(|pattern| pattern.matches_path(file_path))
}
