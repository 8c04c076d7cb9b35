//! Deciding which kind of container a path holds.
//!
//! The decision is made once per path, in a fixed order:
//!
//! 1. a directory holding a `clonezilla-img` file is a Clonezilla image;
//! 2. a regular file starting with the partclone magic is a partclone file;
//! 3. any other regular file is a plain image file;
//! 4. anything else cannot be classified.

use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{CatalogError, Result};

/// File whose presence marks a directory as a Clonezilla image.
pub const CLONEZILLA_MAGIC_FILE: &str = "clonezilla-img";

/// Magic string at offset 0 of a partclone image, NUL-padded to [`MAGIC_LEN`] bytes.
pub const PARTCLONE_MAGIC: &[u8] = b"partclone-image";

/// Number of bytes read from the start of a file to look for the partclone magic.
pub const MAGIC_LEN: u64 = 16;

/// The closed set of container kinds.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// A Clonezilla backup folder (one folder, many partition image files).
    ClonezillaImage,
    /// A single partclone block-level clone of one partition.
    PartcloneFile,
    /// Any other single file, treated as a raw disk or partition image.
    ImageFile,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerKind::ClonezillaImage => "Clonezilla image",
            ContainerKind::PartcloneFile => "partclone file",
            ContainerKind::ImageFile => "image file",
        };
        f.write_str(name)
    }
}

/// What the first filesystem probe found at the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Folder,
    File,
    Nothing,
}

fn probe(path: &Path) -> Candidate {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Candidate::Folder,
        Ok(meta) if meta.is_file() => Candidate::File,
        _ => Candidate::Nothing,
    }
}

/// Classifies `path`. Holds no state, so repeated calls on an unchanged path agree.
pub fn classify(path: &Path) -> Result<ContainerKind> {
    let kind = match probe(path) {
        Candidate::Folder => has_clonezilla_marker(path).then_some(ContainerKind::ClonezillaImage),
        Candidate::File if has_partclone_magic(path)? => Some(ContainerKind::PartcloneFile),
        Candidate::File => Some(ContainerKind::ImageFile),
        Candidate::Nothing => None,
    };

    match kind {
        Some(kind) => {
            debug!(path = %path.display(), %kind, "classified container");
            Ok(kind)
        }
        None => Err(CatalogError::Unclassified { path: path.to_path_buf() }),
    }
}

fn has_clonezilla_marker(dir: &Path) -> bool {
    fs::metadata(dir.join(CLONEZILLA_MAGIC_FILE))
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Reads the first [`MAGIC_LEN`] bytes of `path` (fewer if the file is shorter).
/// The handle is closed before returning.
pub fn read_magic(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| CatalogError::io(e, path))?;
    let mut magic = Vec::with_capacity(MAGIC_LEN as usize);
    file.take(MAGIC_LEN)
        .read_to_end(&mut magic)
        .map_err(|e| CatalogError::io(e, path))?;
    Ok(magic)
}

fn has_partclone_magic(path: &Path) -> Result<bool> {
    Ok(is_partclone_magic(&read_magic(path)?))
}

/// True when `magic`, with trailing NUL bytes removed, is exactly the partclone magic.
pub fn is_partclone_magic(magic: &[u8]) -> bool {
    let end = magic.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &magic[..end] == PARTCLONE_MAGIC
}
