//! # diskcat Core Library
//!
//! This crate locates, identifies and catalogs disk-image containers so that a
//! mount layer can expose their partitions as a virtual filesystem.
//!
//! It is designed to be used by the `diskcat` command-line application, but its
//! public API can also be used directly.
//!
//! ## Key Modules
//!
//! - [`container`]: Classifies a path as a Clonezilla image folder, a partclone
//!   file or a plain image file, and builds the matching container.
//! - [`sevenzip`]: Runs 7-Zip and parses its technical listings and folder
//!   listings into entries and archive paths.
//! - [`common`]: Shared data types such as [`ArchiveEntry`].
//! - [`cli`]: Command-line definitions used by the binary.
//!
//! ## Examples
//!
//! ```
//! use diskcat::sevenzip::listing::parse_listing;
//!
//! let entries = parse_listing("Path = a.txt\nSize = 10\n\nPath = dir\nFolder = +\n\n").unwrap();
//! assert_eq!(entries.len(), 2);
//! assert_eq!(entries[0].size, Some(10));
//! assert!(entries[1].is_folder);
//! ```

pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod container;
pub mod error;
pub mod sevenzip;

pub use common::ArchiveEntry;
pub use container::{ContainerKind, PartitionContainer};
pub use error::{CatalogError, Result};
