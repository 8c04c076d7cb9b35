//! The virtual filesystem seam.
//!
//! Mounting and serving file contents happens elsewhere. Plain image files are
//! handed to the virtual filesystem at construction so it can expose them (for
//! example as a loop-mountable file) before their partitions are resolved.

use std::path::Path;

use crate::error::Result;

pub trait VirtualFs: Send + Sync {
    /// Registers the container `container_name`, backed by `source`.
    fn attach(&self, container_name: &str, source: &Path) -> Result<()>;
}

/// A virtual filesystem that accepts everything and exposes nothing.
/// Used when containers are only being catalogued.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVfs;

impl VirtualFs for NullVfs {
    fn attach(&self, _container_name: &str, _source: &Path) -> Result<()> {
        Ok(())
    }
}
