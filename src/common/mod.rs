//! Common types module.
// Shared structs used by the listing parser, the CLI and downstream mount layers.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One catalogued member (file or folder) of an archive, as reported by 7-Zip.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry path exactly as the tool printed it.
    pub name: String,
    /// True when the tool reported `Folder = +`.
    #[serde(default)]
    pub is_folder: bool,
    /// Uncompressed size. Never set for entries already known to be folders.
    pub size: Option<u64>,
    pub modified: Option<NaiveDateTime>,
    pub created: Option<NaiveDateTime>,
    pub accessed: Option<NaiveDateTime>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
