//! Collision-free destination names.
//!
//! Files are never overwritten: when `photo.jpg` already exists in the
//! destination, the next free name among `photo_1.jpg`, `photo_2.jpg`, ... is
//! used instead.

use crate::file_category::split_extension;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default cap on suffix probes before giving up on a file.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

/// Returns a name that does not exist yet inside `destination_dir`.
///
/// Equivalent to [`resolve_unique_name_bounded`] with
/// [`DEFAULT_MAX_ATTEMPTS`].
pub fn resolve_unique_name(destination_dir: &Path, desired_name: &str) -> io::Result<String> {
    resolve_unique_name_bounded(destination_dir, desired_name, DEFAULT_MAX_ATTEMPTS)
}

/// Returns `desired_name` if it is free in `destination_dir`, otherwise the
/// first free `stem_N.ext` for `N` in `1..=max_attempts`.
///
/// # Errors
///
/// Fails if an existence probe fails (for example the directory cannot be
/// read) or if every suffix up to `max_attempts` is taken.
pub fn resolve_unique_name_bounded(
    destination_dir: &Path,
    desired_name: &str,
    max_attempts: usize,
) -> io::Result<String> {
    resolve_unique_name_reserving(destination_dir, desired_name, max_attempts, &HashSet::new())
}

/// Like [`resolve_unique_name_bounded`], also treating every path in
/// `reserved` as taken.
///
/// A dry run uses this to keep the names it has already handed out, since
/// nothing is written to disk between two planned moves.
pub fn resolve_unique_name_reserving(
    destination_dir: &Path,
    desired_name: &str,
    max_attempts: usize,
    reserved: &HashSet<PathBuf>,
) -> io::Result<String> {
    let taken = |name: &str| -> io::Result<bool> {
        let path = destination_dir.join(name);
        Ok(reserved.contains(&path) || is_taken(&path)?)
    };

    if !taken(desired_name)? {
        return Ok(desired_name.to_string());
    }

    let (stem, extension) = split_extension(desired_name);
    for counter in 1..=max_attempts {
        let candidate = format!("{}_{}{}", stem, counter, extension);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
    }

    Err(io::Error::other(format!(
        "no free name for '{}' after {} attempts",
        desired_name, max_attempts
    )))
}

/// Links count as taken even when dangling, since renaming onto one would
/// replace it.
fn is_taken(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
