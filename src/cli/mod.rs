use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::Result;
use crate::sevenzip::default_executable;

/// Environment variable naming the 7-Zip executable to use.
pub const SEVENZIP_ENV: &str = "DISKCAT_SEVENZIP";
/// Environment variable naming the cache folder.
pub const CACHE_ENV: &str = "DISKCAT_CACHE";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the 7-Zip executable. Defaults to DISKCAT_SEVENZIP, then the bundled copy.
    #[arg(long, global = true)]
    pub sevenzip: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Report which kind of container each path is.
    #[command(alias = "c")]
    Classify {
        /// Clonezilla image folders, partclone files or image files.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Open containers and list their partitions.
    #[command(alias = "o")]
    Open {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Folder for per-container caches. Defaults to DISKCAT_CACHE, then a folder in the temp dir.
        #[arg(long)]
        cache_folder: Option<PathBuf>,

        /// Only load the named partition. Repeat to load several. [default: all]
        #[arg(long = "partition", value_name = "NAME")]
        partitions: Vec<String>,

        /// Hint that reads will seek randomly instead of streaming.
        #[arg(long)]
        random_seek: bool,

        /// Open the paths in parallel.
        #[arg(long)]
        parallel: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// List the contents of an archive using 7-Zip's technical listing.
    #[command(alias = "l")]
    List {
        /// The archive to list.
        #[arg(required = true)]
        archive: PathBuf,

        /// Treat ARCHIVE as a saved `7z l -slt` listing ('-' reads stdin) instead of running 7-Zip.
        #[arg(long)]
        saved: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Find the archives inside a folder.
    #[command(alias = "d")]
    Discover {
        #[arg(required = true)]
        folder: PathBuf,
    },

    /// Extract an archive with 7-Zip.
    #[command(alias = "x")]
    Extract {
        #[arg(required = true)]
        archive: PathBuf,

        /// The directory where files will be extracted. Defaults to the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Gets the 7-Zip executable from the command-line option, the `DISKCAT_SEVENZIP`
/// environment variable, or the bundled location for this platform, in that order.
pub fn sevenzip_from_opt_or_env(sevenzip_opt: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = sevenzip_opt {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(SEVENZIP_ENV) {
        return Ok(PathBuf::from(path));
    }
    default_executable()
}

/// Gets the cache folder from the command-line option, the `DISKCAT_CACHE`
/// environment variable, or `<temp dir>/diskcat-cache`, in that order.
pub fn cache_folder_from_opt_or_env(cache_opt: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cache_opt {
        return path;
    }
    if let Some(path) = std::env::var_os(CACHE_ENV) {
        return PathBuf::from(path);
    }
    std::env::temp_dir().join("diskcat-cache")
}

/// Parses command-line arguments using `clap`.
///
/// Exits the process with clap's usage message when parsing fails.
pub fn run() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn explicit_options_win() {
        assert_eq!(
            sevenzip_from_opt_or_env(Some(PathBuf::from("/opt/7zz"))).unwrap(),
            PathBuf::from("/opt/7zz")
        );
        assert_eq!(
            cache_folder_from_opt_or_env(Some(PathBuf::from("/var/cache/x"))),
            PathBuf::from("/var/cache/x")
        );
    }

    #[test]
    fn open_collects_repeated_partitions() {
        let args = Args::parse_from([
            "diskcat", "open", "img", "--partition", "sda1", "--partition", "sda2", "--random-seek",
        ]);
        match args.command {
            Commands::Open { paths, partitions, random_seek, parallel, .. } => {
                assert_eq!(paths, vec![PathBuf::from("img")]);
                assert_eq!(partitions, vec!["sda1".to_string(), "sda2".to_string()]);
                assert!(random_seek);
                assert!(!parallel);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
