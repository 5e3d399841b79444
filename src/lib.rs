//! tidydesk - sort a messy folder into category subfolders
//!
//! Files are classified by extension against an ordered category table,
//! moved into a subfolder named after their category, and renamed with a
//! `_N` suffix instead of ever overwriting an existing file.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod naming;
pub mod output;

pub use config::{CompiledFilters, Config, ConfigError};
pub use file_category::{CategoryTable, Classifier, OTHERS};
pub use file_organizer::{OrganizeError, OrganizeReport, Organizer, PerFileError, Tally};
pub use naming::resolve_unique_name;

pub use cli::{Cli, run_cli};
