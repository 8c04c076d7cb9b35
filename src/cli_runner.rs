//! CLI runner shared by the `diskcat` binary and the integration tests.
//!
//! Every subcommand maps onto one library entry point; this module only wires
//! options together and formats the results.

use std::error::Error;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::cli::{self, Args, Commands};
use crate::common::ArchiveEntry;
use crate::container::{self, ContainerOptions, NullVfs, PartitionContainer};
use crate::sevenzip::{Completion, EntryReader, LineSource, ProcessArchiver, SevenZip, TextLines};

/// Public entry for running the CLI.
pub fn run_cli_app() -> Result<(), Box<dyn Error>> {
    let args = cli::run();
    init_logging(args.verbose);
    execute(args)
}

/// Installs the `tracing` subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "diskcat=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded; that one is kept.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn execute(args: Args) -> Result<(), Box<dyn Error>> {
    let Args { verbose, sevenzip, command } = args;

    match command {
        Commands::Classify { paths, json } => {
            let mut report = Vec::with_capacity(paths.len());
            for path in &paths {
                report.push((path.display().to_string(), container::classify(path)?));
            }
            if json {
                let map: serde_json::Map<String, serde_json::Value> = report
                    .into_iter()
                    .map(|(path, kind)| serde_json::to_value(kind).map(|v| (path, v)))
                    .collect::<Result<_, serde_json::Error>>()?;
                print_json(&map)?;
            } else {
                for (path, kind) in report {
                    println!("{path}: {kind}");
                }
            }
        }
        Commands::Open { paths, cache_folder, partitions, random_seek, parallel, json } => {
            let options = ContainerOptions {
                cache_folder: cli::cache_folder_from_opt_or_env(cache_folder),
                partitions_to_load: partitions,
                random_seek,
            };
            let containers = if parallel {
                container::open_all_parallel(&paths, &options, &NullVfs)?
            } else {
                container::open_all(&paths, &options, &NullVfs)?
            };
            if json {
                let summaries: Vec<_> = containers.iter().map(PartitionContainer::summary).collect();
                print_json(&summaries)?;
            } else {
                for c in &containers {
                    print_container(c);
                }
            }
        }
        Commands::List { archive, saved, json } => {
            let reader = if saved {
                EntryReader::new(saved_listing(&archive)?).origin(&archive)
            } else {
                sevenzip_tool(sevenzip, verbose)?.archive_entries(&archive)?
            };
            list_entries(reader, json)?;
        }
        Commands::Discover { folder } => {
            let tool = sevenzip_tool(sevenzip, verbose)?;
            let mut finder = tool.archives_in_folder(&folder)?;
            let mut outcome = Ok(());
            for found in finder.by_ref() {
                match found {
                    Ok(path) => println!("{}", path.display()),
                    Err(e) => {
                        outcome = Err(e);
                        break;
                    }
                }
            }
            let completion = if outcome.is_ok() { Completion::Drain } else { Completion::Terminate };
            finder.finish(completion)?;
            outcome?;
        }
        Commands::Extract { archive, output } => {
            let output = match output {
                Some(p) => p,
                None => std::env::current_dir()?,
            };
            sevenzip_tool(sevenzip, verbose)?.extract(&archive, &output)?;
        }
    }

    Ok(())
}

fn sevenzip_tool(
    sevenzip: Option<std::path::PathBuf>,
    verbose: bool,
) -> Result<SevenZip<ProcessArchiver>, Box<dyn Error>> {
    let program = cli::sevenzip_from_opt_or_env(sevenzip)?;
    Ok(SevenZip::new(ProcessArchiver::with_program(program).verbose(verbose)).verbose(verbose))
}

fn saved_listing(path: &Path) -> Result<Box<dyn LineSource>, Box<dyn Error>> {
    if path == Path::new("-") {
        return Ok(Box::new(TextLines::from_reader(io::stdin())));
    }
    let file = File::open(path).map_err(|e| crate::CatalogError::io(e, path))?;
    Ok(Box::new(TextLines::from_reader(file)))
}

/// Prints entries as they arrive (text) or once complete (JSON). On a parse
/// error the producer is terminated rather than drained.
fn list_entries(mut reader: EntryReader<Box<dyn LineSource>>, json: bool) -> Result<(), Box<dyn Error>> {
    let mut entries = Vec::new();
    let mut outcome = Ok(());
    for entry in reader.by_ref() {
        match entry {
            Ok(entry) if json => entries.push(entry),
            Ok(entry) => println!("{}", format_entry(&entry)),
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }

    let completion = if outcome.is_ok() { Completion::Drain } else { Completion::Terminate };
    reader.finish(completion)?;
    outcome?;

    if json {
        print_json(&entries)?;
    }
    Ok(())
}

fn format_entry(entry: &ArchiveEntry) -> String {
    let modified = entry
        .modified
        .map(|m| format!("  {}", m.format("%Y-%m-%d %H:%M:%S")))
        .unwrap_or_default();
    if entry.is_folder {
        format!("- {}/ (folder){modified}", entry.name)
    } else {
        match entry.size {
            Some(size) => format!("- {} ({size} bytes){modified}", entry.name),
            None => format!("- {}{modified}", entry.name),
        }
    }
}

fn print_container(container: &PartitionContainer) {
    println!(
        "{} [{}] ({} partitions)",
        container.name(),
        container.kind(),
        container.partitions().len()
    );
    for partition in container.partitions() {
        println!("  - {} ({} source files)", partition.name, partition.sources.len());
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn entry_lines() {
        let mut file = ArchiveEntry::new("a.txt");
        file.size = Some(10);
        file.modified = NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0));
        assert_eq!(format_entry(&file), "- a.txt (10 bytes)  2024-01-01 00:00:00");

        let mut dir = ArchiveEntry::new("dir");
        dir.is_folder = true;
        assert_eq!(format_entry(&dir), "- dir/ (folder)");

        assert_eq!(format_entry(&ArchiveEntry::new("stream")), "- stream");
    }
}
