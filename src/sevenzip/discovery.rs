//! Finding archives inside a folder.
//!
//! 7-Zip's folder listing reports one `Path = ` line per archive it recognizes.
//! The listing may be stale (a file deleted since) or name files we cannot
//! read, so every reported path is checked against the real filesystem before
//! it is handed out. Paths that fail the check are skipped silently.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use tracing::{debug, info};

use super::{Completion, LineSource};
use crate::error::{CatalogError, Result};

const PATH_PREFIX: &str = "Path = ";

/// Lazily yields the archives reported by a folder listing that exist as regular files.
pub struct ArchiveFinder<S> {
    lines: S,
    origin: PathBuf,
    verbose: bool,
    done: bool,
}

impl<S> ArchiveFinder<S>
where
    S: Iterator<Item = std::io::Result<String>>,
{
    pub fn new(lines: S) -> Self {
        Self {
            lines,
            origin: PathBuf::from("-"),
            verbose: false,
            done: false,
        }
    }

    /// Names the listed folder in stream errors. Defaults to `-`.
    pub fn origin(mut self, folder: impl AsRef<Path>) -> Self {
        self.origin = folder.as_ref().to_path_buf();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn into_inner(self) -> S {
        self.lines
    }
}

impl<S: LineSource> ArchiveFinder<S> {
    /// Ends the underlying stream; see [`LineSource::finish`].
    pub fn finish(&mut self, completion: Completion) -> Result<Option<ExitStatus>> {
        self.done = true;
        self.lines.finish(completion)
    }
}

impl<S> Iterator for ArchiveFinder<S>
where
    S: Iterator<Item = std::io::Result<String>>,
{
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while let Some(line) = self.lines.next() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    self.done = true;
                    return Some(Err(CatalogError::stream(e, &self.origin)));
                }
            };

            let Some(reported) = line.strip_prefix(PATH_PREFIX) else {
                continue;
            };

            let path = PathBuf::from(reported);
            if !is_existing_file(&path) {
                debug!(path = %path.display(), "skipping reported archive that is not a readable file");
                continue;
            }

            if self.verbose {
                info!("Found archive: {}", path.display());
            } else {
                debug!("Found archive: {}", path.display());
            }
            return Some(Ok(path));
        }

        self.done = true;
        None
    }
}

/// True when `path` is a regular file right now. Any metadata error counts as missing.
fn is_existing_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
