//! # Partition containers
//!
//! A container is a disk-image source that yields zero or more partitions.
//! Three kinds exist (see [`ContainerKind`]) and each one has its own payload
//! type inside [`PartitionContainer`]. The kind is decided once, by
//! [`classify`], when the container is opened.

pub mod cache;
pub mod classify;
pub mod vfs;

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CatalogError, Result};

pub use cache::CacheManager;
pub use classify::{classify, ContainerKind};
pub use vfs::{NullVfs, VirtualFs};

/// Clonezilla writes the names of the saved partitions to this file, space separated.
pub const CLONEZILLA_PARTS_FILE: &str = "parts";

/// How partition data is expected to be read, which decides the buffering used.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    /// Front-to-back reads (copying, hashing).
    Sequential,
    /// Arbitrary seeks (browsing a mounted filesystem).
    RandomAccess,
}

impl ReadStrategy {
    pub fn from_hint(random_seek: bool) -> Self {
        if random_seek {
            ReadStrategy::RandomAccess
        } else {
            ReadStrategy::Sequential
        }
    }
}

/// One partition stored in a container.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Partition name, e.g. `sda1`.
    pub name: String,
    /// Files holding the partition data, in read order (split images have several).
    pub sources: Vec<PathBuf>,
    pub read_strategy: ReadStrategy,
    /// Cache file assigned by the cache manager, for containers that use one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<PathBuf>,
}

/// Parameters shared by every container opened in one session.
#[derive(Debug, Clone, Default)]
pub struct ContainerOptions {
    /// Root folder under which per-container cache directories are created.
    pub cache_folder: PathBuf,
    /// Names of the partitions to load. Empty means all of them.
    pub partitions_to_load: Vec<String>,
    /// Whether reads will seek randomly rather than stream.
    pub random_seek: bool,
}

impl ContainerOptions {
    pub fn new(cache_folder: impl Into<PathBuf>) -> Self {
        Self {
            cache_folder: cache_folder.into(),
            ..Default::default()
        }
    }

    pub fn wants_partition(&self, name: &str) -> bool {
        self.partitions_to_load.is_empty() || self.partitions_to_load.iter().any(|p| p == name)
    }

    fn read_strategy(&self) -> ReadStrategy {
        ReadStrategy::from_hint(self.random_seek)
    }
}

/// A Clonezilla backup folder.
#[derive(Debug, Clone)]
pub struct ClonezillaImage {
    pub path: PathBuf,
    pub name: String,
    pub cache: CacheManager,
    pub partitions: Vec<Partition>,
}

/// A single partclone image file.
#[derive(Debug, Clone)]
pub struct PartcloneFile {
    pub path: PathBuf,
    pub name: String,
    pub partitions: Vec<Partition>,
}

/// A raw image file of a disk or a partition.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub path: PathBuf,
    pub name: String,
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Clone)]
pub enum PartitionContainer {
    Clonezilla(ClonezillaImage),
    Partclone(PartcloneFile),
    Image(ImageFile),
}

impl PartitionContainer {
    pub fn kind(&self) -> ContainerKind {
        match self {
            PartitionContainer::Clonezilla(_) => ContainerKind::ClonezillaImage,
            PartitionContainer::Partclone(_) => ContainerKind::PartcloneFile,
            PartitionContainer::Image(_) => ContainerKind::ImageFile,
        }
    }

    /// Human-readable container name.
    pub fn name(&self) -> &str {
        match self {
            PartitionContainer::Clonezilla(c) => &c.name,
            PartitionContainer::Partclone(c) => &c.name,
            PartitionContainer::Image(c) => &c.name,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            PartitionContainer::Clonezilla(c) => &c.path,
            PartitionContainer::Partclone(c) => &c.path,
            PartitionContainer::Image(c) => &c.path,
        }
    }

    pub fn partitions(&self) -> &[Partition] {
        match self {
            PartitionContainer::Clonezilla(c) => &c.partitions,
            PartitionContainer::Partclone(c) => &c.partitions,
            PartitionContainer::Image(c) => &c.partitions,
        }
    }

    pub fn summary(&self) -> ContainerSummary {
        ContainerSummary {
            name: self.name().to_string(),
            kind: self.kind(),
            path: self.path().to_path_buf(),
            partitions: self.partitions().to_vec(),
        }
    }
}

/// Serializable description of an opened container, used for reporting.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub name: String,
    pub kind: ContainerKind,
    pub path: PathBuf,
    pub partitions: Vec<Partition>,
}

/// Builds the container for an already classified path.
pub fn construct(
    path: &Path,
    kind: ContainerKind,
    options: &ContainerOptions,
    vfs: &dyn VirtualFs,
) -> Result<PartitionContainer> {
    let container = match kind {
        ContainerKind::ClonezillaImage => {
            let cache = CacheManager::new(path, &options.cache_folder);
            PartitionContainer::Clonezilla(ClonezillaImage::open(path, cache, options)?)
        }
        ContainerKind::PartcloneFile => PartitionContainer::Partclone(PartcloneFile {
            path: path.to_path_buf(),
            name: display_name(path),
            partitions: single_partition(path, options),
        }),
        ContainerKind::ImageFile => {
            let name = display_name(path);
            vfs.attach(&name, path)?;
            PartitionContainer::Image(ImageFile {
                path: path.to_path_buf(),
                name,
                partitions: single_partition(path, options),
            })
        }
    };

    info!(
        container = container.name(),
        kind = %container.kind(),
        partitions = container.partitions().len(),
        "opened container"
    );
    Ok(container)
}

/// Classifies `path` and builds its container.
pub fn open(path: &Path, options: &ContainerOptions, vfs: &dyn VirtualFs) -> Result<PartitionContainer> {
    let kind = classify(path)?;
    construct(path, kind, options, vfs)
}

/// Opens every path in order. The first failure aborts the whole batch.
pub fn open_all<P: AsRef<Path>>(
    paths: &[P],
    options: &ContainerOptions,
    vfs: &dyn VirtualFs,
) -> Result<Vec<PartitionContainer>> {
    paths
        .iter()
        .map(|path| open(path.as_ref(), options, vfs))
        .collect()
}

/// Same contract as [`open_all`], with the paths opened on the rayon pool.
/// Results keep the input order.
pub fn open_all_parallel<P: AsRef<Path> + Sync>(
    paths: &[P],
    options: &ContainerOptions,
    vfs: &dyn VirtualFs,
) -> Result<Vec<PartitionContainer>> {
    paths
        .par_iter()
        .map(|path| open(path.as_ref(), options, vfs))
        .collect()
}

impl ClonezillaImage {
    fn open(path: &Path, cache: CacheManager, options: &ContainerOptions) -> Result<Self> {
        cache.ensure_cache_dir()?;

        let names = read_parts_file(path)?;
        let files = list_files(path)?;

        let partitions = names
            .into_iter()
            .filter(|name| options.wants_partition(name))
            .map(|name| {
                let sources = partition_image_files(&files, &name);
                debug!(partition = %name, chunks = sources.len(), "found Clonezilla partition");
                Partition {
                    cache_file: Some(cache.partition_cache_file(&name)),
                    sources,
                    read_strategy: options.read_strategy(),
                    name,
                }
            })
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            name: display_name(path),
            cache,
            partitions,
        })
    }
}

/// Partition names listed in the image's `parts` file; none when the file is absent.
fn read_parts_file(dir: &Path) -> Result<Vec<String>> {
    let parts = dir.join(CLONEZILLA_PARTS_FILE);
    match fs::read_to_string(&parts) {
        Ok(text) => Ok(text.split_whitespace().map(str::to_string).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(CatalogError::io(e, parts)),
    }
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CatalogError::io(e, dir))? {
        let entry = entry.map_err(|e| CatalogError::io(e, dir))?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Image chunks of one partition, e.g. `sda1.ext4-ptcl-img.gz.aa`, `sda1.ext4-ptcl-img.gz.ab`.
fn partition_image_files(files: &[PathBuf], partition: &str) -> Vec<PathBuf> {
    let prefix = format!("{partition}.");
    files
        .iter()
        .filter(|f| {
            f.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.contains("-img"))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Single-file containers hold one partition named after the file.
fn single_partition(path: &Path, options: &ContainerOptions) -> Vec<Partition> {
    let name = partition_name_from_file(path);
    if !options.wants_partition(&name) {
        return Vec::new();
    }
    vec![Partition {
        name,
        sources: vec![path.to_path_buf()],
        read_strategy: options.read_strategy(),
        cache_file: None,
    }]
}

/// `sda1.ext4-ptcl-img` -> `sda1`.
fn partition_name_from_file(path: &Path) -> String {
    let file_name = display_name(path);
    match file_name.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name,
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
