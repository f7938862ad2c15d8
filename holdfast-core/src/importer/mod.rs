//! The Library Importer: places a completed artifact at its
//! canonical path and returns a descriptor the caller records against the
//! owning entity.

use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::error::{CoreError, CoreResult};

/// `{absolute path, relative path, size}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFile {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
    pub size_bytes: u64,
}

/// Whether the importer performed the placement or found it already done.
/// A second import of the same (source, destination) pair reports
/// `AlreadyExists`, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Placed,
    AlreadyExists,
}

#[derive(Debug, Clone)]
pub struct ImportResult {
    pub file: ImportedFile,
    pub outcome: ImportOutcome,
}

/// Replace characters illegal or awkward in filenames, collapse repeated
/// dashes, and trim. `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(name: &str) -> String {
    let mut replaced = String::with_capacity(name.len());
    for c in name.chars() {
        if "/\\:*?\"<>|".contains(c) {
            replaced.push('-');
        } else {
            replaced.push(c);
        }
    }
    let mut collapsed = String::with_capacity(replaced.len());
    let mut last_was_dash = false;
    for c in replaced.chars() {
        if c == '-' {
            if !last_was_dash {
                collapsed.push('-');
            }
            last_was_dash = true;
        } else {
            collapsed.push(c);
            last_was_dash = false;
        }
    }
    collapsed.trim().to_string()
}

/// Destination path for a movie file:
/// `<movies-root>/<Sanitized Title>/<original-basename>`.
pub fn movie_destination(movies_root: &Path, title: &str, source: &Path) -> CoreResult<PathBuf> {
    let basename = source
        .file_name()
        .ok_or_else(|| CoreError::invalid("source path has no filename"))?;
    Ok(movies_root.join(sanitize(title)).join(basename))
}

/// Destination path for an episode file:
/// `<tv-root>/<Sanitized Series Title>/Season <NN>/<filename>`.
pub fn episode_destination(tv_root: &Path, series_title: &str, season_number: u16, source: &Path) -> CoreResult<PathBuf> {
    let basename = source
        .file_name()
        .ok_or_else(|| CoreError::invalid("source path has no filename"))?;
    Ok(tv_root
        .join(sanitize(series_title))
        .join(format!("Season {season_number:02}"))
        .join(basename))
}

/// Places `source` at `destination`.
#[instrument(skip(library_root), fields(destination = %destination.display()))]
pub fn import_file(source: &Path, destination: &Path, library_root: &Path) -> CoreResult<ImportResult> {
    if destination.exists() {
        let size_bytes = std::fs::metadata(destination)
            .map_err(|e| CoreError::fatal(format!("stat existing destination: {e}")))?
            .len();
        let relative_path = destination
            .strip_prefix(library_root)
            .unwrap_or(destination)
            .to_path_buf();
        return Ok(ImportResult {
            file: ImportedFile { absolute_path: destination.to_path_buf(), relative_path, size_bytes },
            outcome: ImportOutcome::AlreadyExists,
        });
    }

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CoreError::fatal(format!("create destination directory: {e}")))?;
    }

    same_device_rename_or_copy(source, destination)?;

    let size_bytes = std::fs::metadata(destination)
        .map_err(|e| CoreError::fatal(format!("stat placed file: {e}")))?
        .len();
    let relative_path = destination
        .strip_prefix(library_root)
        .unwrap_or(destination)
        .to_path_buf();

    Ok(ImportResult {
        file: ImportedFile { absolute_path: destination.to_path_buf(), relative_path, size_bytes },
        outcome: ImportOutcome::Placed,
    })
}

#[cfg(unix)]
fn same_device_rename_or_copy(source: &Path, destination: &Path) -> CoreResult<()> {
    use std::os::unix::fs::MetadataExt;

    let source_meta = std::fs::metadata(source).map_err(|e| CoreError::fatal(format!("stat source: {e}")))?;
    let parent_meta = destination
        .parent()
        .map(std::fs::metadata)
        .transpose()
        .map_err(|e| CoreError::fatal(format!("stat destination directory: {e}")))?;

    let same_device = parent_meta.map(|m| m.dev() == source_meta.dev()).unwrap_or(false);

    if same_device {
        std::fs::rename(source, destination).map_err(|e| CoreError::fatal(format!("rename: {e}")))
    } else {
        std::fs::copy(source, destination)
            .map(|_| ())
            .map_err(|e| CoreError::fatal(format!("copy: {e}")))
    }
}

#[cfg(not(unix))]
fn same_device_rename_or_copy(source: &Path, destination: &Path) -> CoreResult<()> {
    std::fs::rename(source, destination)
        .or_else(|_| std::fs::copy(source, destination).map(|_| ()))
        .map_err(|e| CoreError::fatal(format!("place file: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_illegal_characters_and_collapses_dashes() {
        assert_eq!(sanitize("Movie: Part/2?"), "Movie- Part-2-");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize("Bad***Name///Title");
        let twice = sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn movie_destination_joins_sanitized_title_and_basename() {
        let dest = movie_destination(Path::new("/movies"), "Alien: Covenant", Path::new("/tmp/source/alien.mkv")).unwrap();
        assert_eq!(dest, PathBuf::from("/movies/Alien- Covenant/alien.mkv"));
    }

    #[test]
    fn episode_destination_zero_pads_season_number() {
        let dest = episode_destination(Path::new("/tv"), "Example Show", 3, Path::new("/tmp/source/e01.mkv")).unwrap();
        assert_eq!(dest, PathBuf::from("/tv/Example Show/Season 03/e01.mkv"));
    }

    #[test]
    fn import_file_reports_already_exists_on_second_call() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.mkv");
        std::fs::write(&source, b"data").unwrap();
        let destination = dir.path().join("dest").join("source.mkv");

        let first = import_file(&source, &destination, dir.path()).unwrap();
        assert_eq!(first.outcome, ImportOutcome::Placed);

        std::fs::write(&source, b"data").unwrap();
        let second = import_file(&source, &destination, dir.path()).unwrap();
        assert_eq!(second.outcome, ImportOutcome::AlreadyExists);
        assert_eq!(first.file, second.file);
    }
}
