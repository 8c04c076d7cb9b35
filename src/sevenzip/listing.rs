//! # Technical listing parser
//!
//! Turns the output of `7z l -slt <archive>` into [`ArchiveEntry`] values.
//!
//! The listing is a sequence of records separated by blank lines:
//!
//! ```text
//! Path = docs/readme.txt
//! Folder = -
//! Size = 1024
//! Modified = 2024-01-01 00:00:00
//!
//! Path = docs
//! Folder = +
//! ```
//!
//! A record starts at a `Path = ` line and is emitted when the next blank line
//! arrives. Parsing is a single pass without lookahead, so entries come out as
//! soon as 7-Zip has printed them. Unknown labels are ignored.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use chrono::{DateTime, NaiveDateTime};

use super::{Completion, LineSource};
use crate::common::ArchiveEntry;
use crate::error::{CatalogError, Result};

const PATH_PREFIX: &str = "Path = ";
const FOLDER_LINE: &str = "Folder = +";
const SIZE_PREFIX: &str = "Size = ";
const MODIFIED_PREFIX: &str = "Modified = ";
const CREATED_PREFIX: &str = "Created = ";
const ACCESSED_PREFIX: &str = "Accessed = ";

/// Timestamp layouts 7-Zip prints, independent of the current locale.
/// `%.f` accepts the optional fractional part (up to 9 digits).
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Lazily parses archive entries from a line stream.
///
/// Yields `Err` at most once: a malformed field value or an I/O error from the
/// underlying stream ends the sequence.
pub struct EntryReader<S> {
    lines: S,
    origin: PathBuf,
    current: Option<ArchiveEntry>,
    done: bool,
}

impl<S> EntryReader<S>
where
    S: Iterator<Item = std::io::Result<String>>,
{
    pub fn new(lines: S) -> Self {
        Self {
            lines,
            origin: PathBuf::from("-"),
            current: None,
            done: false,
        }
    }

    /// Names the archive being listed in stream errors. Defaults to `-`.
    pub fn origin(mut self, origin: impl AsRef<Path>) -> Self {
        self.origin = origin.as_ref().to_path_buf();
        self
    }

    /// Gives back the underlying line stream, dropping any unterminated record.
    pub fn into_inner(self) -> S {
        self.lines
    }

    /// Feeds one line into the working record, returning a finished entry if
    /// the line terminated one.
    fn accept(&mut self, line: &str) -> Result<Option<ArchiveEntry>> {
        if let Some(name) = line.strip_prefix(PATH_PREFIX) {
            self.current = Some(ArchiveEntry::new(name));
            return Ok(None);
        }

        if line.is_empty() {
            return Ok(self.current.take());
        }

        let Some(entry) = self.current.as_mut() else {
            return Ok(None);
        };

        if line == FOLDER_LINE {
            entry.is_folder = true;
        } else if let Some(value) = line.strip_prefix(SIZE_PREFIX) {
            // Evaluated in arrival order: a size printed before the folder flag stays set.
            if !entry.is_folder {
                entry.size = parse_size(value)?;
            }
        } else if let Some(value) = line.strip_prefix(MODIFIED_PREFIX) {
            entry.modified = parse_timestamp("Modified", value)?;
        } else if let Some(value) = line.strip_prefix(CREATED_PREFIX) {
            entry.created = parse_timestamp("Created", value)?;
        } else if let Some(value) = line.strip_prefix(ACCESSED_PREFIX) {
            entry.accessed = parse_timestamp("Accessed", value)?;
        }

        Ok(None)
    }
}

impl<S: LineSource> EntryReader<S> {
    /// Ends the underlying stream; see [`LineSource::finish`].
    pub fn finish(&mut self, completion: Completion) -> Result<Option<ExitStatus>> {
        self.done = true;
        self.current = None;
        self.lines.finish(completion)
    }
}

impl<S> Iterator for EntryReader<S>
where
    S: Iterator<Item = std::io::Result<String>>,
{
    type Item = Result<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while let Some(line) = self.lines.next() {
            let outcome = line
                .map_err(|e| CatalogError::stream(e, &self.origin))
                .and_then(|line| self.accept(&line));
            match outcome {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    self.current = None;
                    return Some(Err(e));
                }
            }
        }

        // End of input: an unterminated record is never emitted.
        self.done = true;
        self.current = None;
        None
    }
}

/// Parses a byte count. Like timestamps, an empty value means "not reported".
fn parse_size(value: &str) -> Result<Option<u64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<u64>().map(Some).map_err(|e| CatalogError::MalformedField {
        field: "Size",
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Parses a 7-Zip timestamp. An empty value means the archive has no such time.
fn parse_timestamp(field: &'static str, value: &str) -> Result<Option<NaiveDateTime>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Some(ts));
        }
    }

    // Keep the wall-clock time as printed, like the offset-less layouts above.
    DateTime::parse_from_rfc3339(value)
        .map(|ts| Some(ts.naive_local()))
        .map_err(|e| CatalogError::MalformedField {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Parses a complete listing held in memory.
pub fn parse_listing(text: &str) -> Result<Vec<ArchiveEntry>> {
    EntryReader::new(text.lines().map(|line| Ok(line.to_string()))).collect()
}
