//! # 7-Zip integration
//!
//! Everything that talks to the external 7-Zip executable goes through the
//! [`Archiver`] trait. An archiver turns an [`ArchiverCommand`] into a lazily
//! produced stream of output lines (a [`LineSource`]). The listing parser and
//! the archive discovery walk those streams one line at a time.
//!
//! A line stream backed by a running process must be ended explicitly with
//! [`LineSource::finish`]: the caller decides whether the remaining output is
//! drained ([`Completion::Drain`]) or the process is killed
//! ([`Completion::Terminate`]).

pub mod discovery;
pub mod listing;
pub mod process;
mod text;

use std::ffi::OsString;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::process::ExitStatus;

use tracing::debug;

use crate::error::{CatalogError, Result};

pub use discovery::ArchiveFinder;
pub use listing::EntryReader;
pub use process::{default_executable, ProcessArchiver, ProcessLines};
pub use text::TextLines;

/// Password handed to 7-Zip on extraction so that encrypted archives fail
/// instead of blocking on an interactive prompt.
const DUMMY_PASSWORD: &str = "blah";

/// How a caller ends a line stream it no longer wants to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Read and discard the remaining output, then wait for the producer to exit.
    Drain,
    /// Stop the producer immediately, then reap it.
    Terminate,
}

/// A lazily produced sequence of output lines.
///
/// Iteration blocks until the producer has written the next line.
pub trait LineSource: Iterator<Item = std::io::Result<String>> + Send {
    /// Ends the stream. Returns the producer's exit status when there is one.
    ///
    /// Calling `finish` more than once is allowed; later calls are no-ops.
    fn finish(&mut self, completion: Completion) -> Result<Option<ExitStatus>>;
}

impl LineSource for Box<dyn LineSource> {
    fn finish(&mut self, completion: Completion) -> Result<Option<ExitStatus>> {
        (**self).finish(completion)
    }
}

/// The operations 7-Zip is asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiverCommand {
    /// Extract everything (recursively, overwriting) into `output_folder`.
    Extract { archive: PathBuf, output_folder: PathBuf },
    /// Plain listing of a folder, used to find archives it contains.
    ListFolder { folder: PathBuf },
    /// Verbose technical listing (`-slt`) of one archive.
    ListTechnical { archive: PathBuf },
}

impl ArchiverCommand {
    /// The argument vector handed to the executable.
    pub fn args(&self) -> Vec<OsString> {
        match self {
            ArchiverCommand::Extract { archive, output_folder } => {
                let mut out = OsString::from("-o");
                out.push(output_folder);
                vec![
                    "x".into(),
                    archive.into(),
                    format!("-p{DUMMY_PASSWORD}").into(),
                    "-r".into(),
                    "-y".into(),
                    out,
                ]
            }
            ArchiverCommand::ListFolder { folder } => {
                vec!["l".into(), ensure_trailing_separator(folder)]
            }
            ArchiverCommand::ListTechnical { archive } => {
                vec!["l".into(), "-slt".into(), archive.into()]
            }
        }
    }

    /// The archive or folder the command operates on.
    pub fn target(&self) -> &Path {
        match self {
            ArchiverCommand::Extract { archive, .. } => archive.as_path(),
            ArchiverCommand::ListFolder { folder } => folder.as_path(),
            ArchiverCommand::ListTechnical { archive } => archive.as_path(),
        }
    }
}

/// Appends the platform separator unless the path already ends in one.
fn ensure_trailing_separator(path: &Path) -> OsString {
    let text = path.as_os_str().to_string_lossy();
    let mut s = path.as_os_str().to_os_string();
    if !(text.ends_with('/') || text.ends_with(MAIN_SEPARATOR)) {
        s.push(MAIN_SEPARATOR.to_string());
    }
    s
}

/// Something able to run 7-Zip commands and stream their standard output.
pub trait Archiver: Send + Sync {
    fn invoke(&self, command: &ArchiverCommand) -> Result<Box<dyn LineSource>>;
}

impl<A: Archiver + ?Sized> Archiver for &A {
    fn invoke(&self, command: &ArchiverCommand) -> Result<Box<dyn LineSource>> {
        (**self).invoke(command)
    }
}

/// High-level entry points over an injected [`Archiver`].
pub struct SevenZip<A> {
    archiver: A,
    verbose: bool,
}

impl<A: Archiver> SevenZip<A> {
    pub fn new(archiver: A) -> Self {
        Self { archiver, verbose: false }
    }

    /// Report found archives at `info` level instead of `debug`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Lists the entries of `archive`.
    ///
    /// The returned reader must be finished by the caller if it is not read to the end.
    pub fn archive_entries(&self, archive: &Path) -> Result<EntryReader<Box<dyn LineSource>>> {
        let lines = self.archiver.invoke(&ArchiverCommand::ListTechnical {
            archive: archive.to_path_buf(),
        })?;
        Ok(EntryReader::new(lines).origin(archive))
    }

    /// Finds the archives 7-Zip reports under `folder` that exist on disk right now.
    pub fn archives_in_folder(&self, folder: &Path) -> Result<ArchiveFinder<Box<dyn LineSource>>> {
        let lines = self.archiver.invoke(&ArchiverCommand::ListFolder {
            folder: folder.to_path_buf(),
        })?;
        Ok(ArchiveFinder::new(lines).origin(folder).verbose(self.verbose))
    }

    /// Extracts `archive` into `output_folder`, returning once 7-Zip has exited.
    pub fn extract(&self, archive: &Path, output_folder: &Path) -> Result<()> {
        let mut lines = self.archiver.invoke(&ArchiverCommand::Extract {
            archive: archive.to_path_buf(),
            output_folder: output_folder.to_path_buf(),
        })?;
        let status = lines.finish(Completion::Drain)?;
        debug!(archive = %archive.display(), ?status, "extraction finished");
        match status {
            Some(status) if !status.success() => Err(CatalogError::ToolFailed { status }),
            _ => Ok(()),
        }
    }
}
