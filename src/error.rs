use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// The primary error type for all operations in the `diskcat` crate.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The 7-Zip executable location is unknown for the running operating system.
    #[error("7-Zip is not supported on this operating system yet: {os}")]
    UnsupportedPlatform { os: String },

    /// A path matched none of the container variants.
    /// Includes the offending path so batch callers can report it.
    #[error("Could not determine if this is a Clonezilla folder, a partclone file or an image file: {}", .path.display())]
    Unclassified { path: PathBuf },

    /// A recognized listing field carried a value that does not parse as its expected type.
    #[error("Malformed '{field}' value in archive listing: '{value}' ({reason})")]
    MalformedField {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// An I/O error occurred, typically while probing or reading a file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", .path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Reading a listing stream failed partway through.
    /// `origin` is the archive or folder being listed, or `-` for stdin.
    #[error("Failed to read 7-Zip output for '{}': {source}", .origin.display())]
    Stream {
        origin: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external archiver could not be started.
    #[error("Failed to start '{}': {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external archiver ran to completion but reported failure.
    #[error("7-Zip exited with {status}")]
    ToolFailed { status: ExitStatus },
}

impl CatalogError {
    /// Wraps an I/O error together with the path that produced it.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CatalogError::Io { source, path: path.into() }
    }

    /// Wraps an error from reading the output produced for `origin`.
    pub fn stream(source: std::io::Error, origin: impl Into<PathBuf>) -> Self {
        CatalogError::Stream { source, origin: origin.into() }
    }
}

// Generic IO error conversion that doesn't require a path
impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io { source: err, path: PathBuf::new() }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
