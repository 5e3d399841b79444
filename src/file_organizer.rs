/// Folder organization: list, classify, and move files into category folders.
///
/// An [`Organizer`] owns everything a run needs (classifier, optional filters,
/// the self-exclusion name) and hands the outcome back as an
/// [`OrganizeReport`]. It never prints; rendering is up to the caller.
use crate::config::CompiledFilters;
use crate::file_category::Classifier;
use crate::naming::{DEFAULT_MAX_ATTEMPTS, resolve_unique_name_reserving};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a whole run before any file is touched.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The folder to organize does not exist.
    #[error("Path '{}' does not exist", path.display())]
    PathNotFound {
        /// The path that was given.
        path: PathBuf,
    },
    /// The path exists but is not a directory.
    #[error("Path '{}' is not a directory", path.display())]
    NotADirectory {
        /// The path that was given.
        path: PathBuf,
    },
    /// The folder could not be inspected or its entries enumerated.
    #[error("Failed to list {}: {source}", path.display())]
    DirectoryListingFailed {
        /// The folder being listed.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

/// Result type for organizer operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Which step failed for a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileErrorKind {
    /// The category folder could not be created.
    DestinationCreateFailed,
    /// No free destination name could be determined.
    NameResolutionFailed,
    /// The rename itself failed.
    MoveFailed,
}

impl fmt::Display for FileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DestinationCreateFailed => "could not create destination folder",
            Self::NameResolutionFailed => "could not resolve a free destination name",
            Self::MoveFailed => "could not move file",
        };
        f.write_str(text)
    }
}

/// A file that could not be organized. The run carries on regardless.
#[derive(Debug, Error)]
#[error("Failed to move {file_name}: {kind}: {source}")]
pub struct PerFileError {
    /// Name of the file inside the organized folder.
    pub file_name: String,
    /// Full source path.
    pub path: PathBuf,
    /// The step that failed.
    pub kind: FileErrorKind,
    /// Underlying IO error.
    pub source: io::Error,
}

impl Serialize for PerFileError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PerFileError", 4)?;
        state.serialize_field("file_name", &self.file_name)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("cause", &self.source.to_string())?;
        state.end()
    }
}

/// Kind of a directory entry, as reported by the listing (links are not
/// followed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl From<fs::FileType> for EntryKind {
    fn from(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

/// One entry of the organized folder.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: OsString,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Why a non-directory entry was left where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Symbolic links are never followed or moved.
    Symlink,
    /// Sockets, FIFOs, devices and the like.
    SpecialFile,
    /// The name matches the caller's self-exclusion name.
    SelfExcluded,
    /// Rejected by the configured filters.
    Filtered,
    /// The name is not valid UTF-8 and cannot be renamed safely.
    NonUtf8Name,
}

/// An entry that was deliberately not moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub file_name: String,
    pub reason: SkipReason,
}

/// A single resolved move: where a file comes from and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovePlan {
    /// Current location of the file.
    pub source: PathBuf,
    /// Category the file was classified into.
    pub category: String,
    /// Final file name inside the category folder, after collision handling.
    pub file_name: String,
    /// Full destination path.
    pub destination: PathBuf,
}

/// Files moved per category.
///
/// Every category of the classifier starts at zero, in table order, with
/// `Others` last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    counts: Vec<(String, usize)>,
}

impl Tally {
    /// Creates an all-zero tally over the given categories.
    pub fn new<'a>(categories: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for category in categories {
            if !counts.iter().any(|(name, _)| name == category) {
                counts.push((category.to_string(), 0));
            }
        }
        Self { counts }
    }

    fn increment(&mut self, category: &str) {
        match self.counts.iter_mut().find(|(name, _)| name == category) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((category.to_string(), 1)),
        }
    }

    /// Count for one category; unknown categories count zero.
    pub fn get(&self, category: &str) -> usize {
        self.counts
            .iter()
            .find(|(name, _)| name == category)
            .map_or(0, |(_, count)| *count)
    }

    /// Total number of files moved.
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    /// All categories with their counts, zeros included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
    }

    /// Only the categories that received at least one file.
    pub fn non_zero(&self) -> impl Iterator<Item = (&str, usize)> {
        self.iter().filter(|(_, count)| *count > 0)
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (name, count) in &self.counts {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

/// Outcome of [`Organizer::run`].
#[derive(Debug, Serialize)]
pub struct OrganizeReport {
    /// Files moved per category.
    pub tally: Tally,
    /// Moves that were carried out, in processing order.
    pub moved: Vec<MovePlan>,
    /// Files that could not be moved.
    pub errors: Vec<PerFileError>,
    /// Non-directory entries that were left alone on purpose.
    pub skipped: Vec<SkippedEntry>,
    /// True if the observer stopped the run before every file was handled.
    pub cancelled: bool,
}

impl OrganizeReport {
    /// True when every eligible file was moved.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }
}

/// Outcome of [`Organizer::plan`]: what a run would do right now.
#[derive(Debug, Serialize)]
pub struct DryRunReport {
    /// Moves that would be performed.
    pub planned: Vec<MovePlan>,
    /// Files whose destination name could not be resolved.
    pub errors: Vec<PerFileError>,
    /// Non-directory entries that would be left alone.
    pub skipped: Vec<SkippedEntry>,
}

/// Per-file notification passed to the observer of [`Organizer::run_with`].
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    Moved(&'a MovePlan),
    Failed(&'a PerFileError),
}

/// A regular file selected for moving.
struct Candidate<'c> {
    name: String,
    path: PathBuf,
    category: &'c str,
}

impl Candidate<'_> {
    fn error(&self, kind: FileErrorKind, source: io::Error) -> PerFileError {
        PerFileError {
            file_name: self.name.clone(),
            path: self.path.clone(),
            kind,
            source,
        }
    }
}

/// Sorts the files of one folder into per-category subfolders.
///
/// Runs are sequential and leave no state behind, so one organizer can be
/// reused for any number of folders.
///
/// # Examples
///
/// ```no_run
/// use tidydesk::file_organizer::Organizer;
/// use std::path::Path;
///
/// let organizer = Organizer::default();
/// match organizer.run(Path::new("/home/me/Downloads")) {
///     Ok(report) => println!("Moved {} files", report.tally.total()),
///     Err(e) => eprintln!("Organization failed: {}", e),
/// }
/// ```
#[derive(Debug)]
pub struct Organizer {
    classifier: Classifier,
    filters: Option<CompiledFilters>,
    exclude_name: Option<OsString>,
    max_collision_attempts: usize,
}

impl Organizer {
    /// Creates an organizer with no filters and no self-exclusion.
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            filters: None,
            exclude_name: None,
            max_collision_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Only files accepted by `filters` are moved.
    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Never moves an entry with exactly this name, typically the running
    /// program's own file when it sits in the organized folder.
    pub fn with_self_exclusion(mut self, name: impl Into<OsString>) -> Self {
        self.exclude_name = Some(name.into());
        self
    }

    /// Caps the `_N` suffix probing done on name collisions.
    pub fn with_max_collision_attempts(mut self, attempts: usize) -> Self {
        self.max_collision_attempts = attempts;
        self
    }

    /// Organizes `folder` and returns the tally and per-file errors.
    ///
    /// # Errors
    ///
    /// Fails without touching anything if `folder` is missing, is not a
    /// directory, or cannot be listed. Problems with individual files are
    /// reported in [`OrganizeReport::errors`] instead.
    pub fn run(&self, folder: &Path) -> OrganizeResult<OrganizeReport> {
        self.run_with(folder, |_| ControlFlow::Continue(()))
    }

    /// Like [`Organizer::run`], calling `observer` after every processed
    /// file.
    ///
    /// Returning [`ControlFlow::Break`] stops the run before the next file.
    /// Files already moved stay moved.
    pub fn run_with<F>(&self, folder: &Path, mut observer: F) -> OrganizeResult<OrganizeReport>
    where
        F: FnMut(Progress<'_>) -> ControlFlow<()>,
    {
        let folder = resolve_folder(folder)?;
        let (candidates, skipped) = self.select(&folder)?;
        info!(
            folder = %folder.display(),
            files = candidates.len(),
            skipped = skipped.len(),
            "organizing folder"
        );

        let mut report = OrganizeReport {
            tally: Tally::new(self.classifier.category_names()),
            moved: Vec::new(),
            errors: Vec::new(),
            skipped,
            cancelled: false,
        };

        let total = candidates.len();
        for (index, candidate) in candidates.into_iter().enumerate() {
            let flow = match self.execute(&folder, &candidate) {
                Ok(plan) => {
                    debug!(
                        file = %candidate.name,
                        category = %plan.category,
                        destination = %plan.destination.display(),
                        "moved file"
                    );
                    report.tally.increment(&plan.category);
                    let flow = observer(Progress::Moved(&plan));
                    report.moved.push(plan);
                    flow
                }
                Err(error) => {
                    warn!(file = %error.file_name, kind = ?error.kind, error = %error.source, "file not moved");
                    let flow = observer(Progress::Failed(&error));
                    report.errors.push(error);
                    flow
                }
            };

            if flow.is_break() {
                report.cancelled = index + 1 < total;
                if report.cancelled {
                    info!(remaining = total - index - 1, "run stopped by caller");
                }
                break;
            }
        }

        info!(
            moved = report.tally.total(),
            failed = report.errors.len(),
            "organization finished"
        );
        Ok(report)
    }

    /// Works out what [`Organizer::run`] would do, without touching the
    /// filesystem.
    ///
    /// Names are resolved against the current contents of the category
    /// folders plus the destinations already planned in this call.
    pub fn plan(&self, folder: &Path) -> OrganizeResult<DryRunReport> {
        let folder = resolve_folder(folder)?;
        let (candidates, skipped) = self.select(&folder)?;

        let mut report = DryRunReport {
            planned: Vec::new(),
            errors: Vec::new(),
            skipped,
        };
        let mut claimed = HashSet::new();
        for candidate in &candidates {
            match self.resolve(&folder.join(candidate.category), candidate, &claimed) {
                Ok(plan) => {
                    claimed.insert(plan.destination.clone());
                    report.planned.push(plan);
                }
                Err(error) => report.errors.push(error),
            }
        }
        Ok(report)
    }

    /// Picks the regular files to move and classifies them.
    fn select(&self, folder: &Path) -> OrganizeResult<(Vec<Candidate<'_>>, Vec<SkippedEntry>)> {
        let entries =
            list_entries(folder).map_err(|source| OrganizeError::DirectoryListingFailed {
                path: folder.to_path_buf(),
                source,
            })?;

        let mut candidates = Vec::new();
        let mut skipped = Vec::new();
        let mut skip = |entry: &DirectoryEntry, reason: SkipReason| {
            debug!(entry = %entry.name.to_string_lossy(), ?reason, "skipping entry");
            skipped.push(SkippedEntry {
                file_name: entry.name.to_string_lossy().into_owned(),
                reason,
            });
        };

        for entry in entries {
            match entry.kind {
                EntryKind::Directory => continue,
                EntryKind::Symlink => {
                    skip(&entry, SkipReason::Symlink);
                    continue;
                }
                EntryKind::Other => {
                    skip(&entry, SkipReason::SpecialFile);
                    continue;
                }
                EntryKind::File => {}
            }

            if self.exclude_name.as_deref() == Some(entry.name.as_os_str()) {
                skip(&entry, SkipReason::SelfExcluded);
                continue;
            }

            let Some(name) = entry.name.to_str() else {
                skip(&entry, SkipReason::NonUtf8Name);
                continue;
            };

            if let Some(filters) = &self.filters
                && !filters.should_include(Path::new(name))
            {
                skip(&entry, SkipReason::Filtered);
                continue;
            }

            candidates.push(Candidate {
                name: name.to_string(),
                category: self.classifier.classify(name),
                path: entry.path,
            });
        }

        Ok((candidates, skipped))
    }

    /// Creates the category folder, picks a free name, and moves the file.
    fn execute(&self, folder: &Path, candidate: &Candidate<'_>) -> Result<MovePlan, PerFileError> {
        let category_dir = folder.join(candidate.category);
        fs::create_dir_all(&category_dir)
            .map_err(|e| candidate.error(FileErrorKind::DestinationCreateFailed, e))?;

        let plan = self.resolve(&category_dir, candidate, &HashSet::new())?;
        fs::rename(&plan.source, &plan.destination)
            .map_err(|e| candidate.error(FileErrorKind::MoveFailed, e))?;

        Ok(plan)
    }

    fn resolve(
        &self,
        category_dir: &Path,
        candidate: &Candidate<'_>,
        reserved: &HashSet<PathBuf>,
    ) -> Result<MovePlan, PerFileError> {
        let file_name = resolve_unique_name_reserving(
            category_dir,
            &candidate.name,
            self.max_collision_attempts,
            reserved,
        )
        .map_err(|e| candidate.error(FileErrorKind::NameResolutionFailed, e))?;

        Ok(MovePlan {
            source: candidate.path.clone(),
            category: candidate.category.to_string(),
            destination: category_dir.join(&file_name),
            file_name,
        })
    }
}

impl Default for Organizer {
    fn default() -> Self {
        Self::new(Classifier::default())
    }
}

/// Lists the immediate entries of `folder` without following links.
pub fn list_entries(folder: &Path) -> io::Result<Vec<DirectoryEntry>> {
    fs::read_dir(folder)?
        .map(|entry| {
            let entry = entry?;
            Ok(DirectoryEntry {
                kind: EntryKind::from(entry.file_type()?),
                name: entry.file_name(),
                path: entry.path(),
            })
        })
        .collect()
}

/// Checks that `folder` is an existing directory and returns its absolute
/// form.
fn resolve_folder(folder: &Path) -> OrganizeResult<PathBuf> {
    let listing_failed = |source| OrganizeError::DirectoryListingFailed {
        path: folder.to_path_buf(),
        source,
    };

    let metadata = match fs::metadata(folder) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(OrganizeError::PathNotFound {
                path: folder.to_path_buf(),
            });
        }
        Err(e) => return Err(listing_failed(e)),
    };

    if !metadata.is_dir() {
        return Err(OrganizeError::NotADirectory {
            path: folder.to_path_buf(),
        });
    }

    fs::canonicalize(folder).map_err(listing_failed)
}
