//! Running the real 7-Zip executable as a child process.

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use super::text::RawLines;
use super::{Archiver, ArchiverCommand, Completion, LineSource};
use crate::error::{CatalogError, Result};

/// Location of the bundled 7-Zip executable for the running operating system.
pub fn default_executable() -> Result<PathBuf> {
    if cfg!(target_os = "windows") {
        return Ok(PathBuf::from(r"ext\7-Zip\win-x64\7z.exe"));
    }
    if cfg!(target_os = "linux") {
        return Ok(PathBuf::from("ext/7-Zip/linux-x64/7zz"));
    }
    Err(CatalogError::UnsupportedPlatform {
        os: std::env::consts::OS.to_string(),
    })
}

/// [`Archiver`] that spawns 7-Zip for every command.
#[derive(Debug, Clone)]
pub struct ProcessArchiver {
    program: PathBuf,
    verbose: bool,
}

impl ProcessArchiver {
    /// Uses the bundled executable for this platform.
    pub fn bundled() -> Result<Self> {
        Ok(Self::with_program(default_executable()?))
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            verbose: false,
        }
    }

    /// When verbose, 7-Zip's stderr is passed through instead of discarded.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn spawn(&self, command: &ArchiverCommand) -> Result<ProcessLines> {
        let args = command.args();
        debug!(program = %self.program.display(), ?args, "spawning 7-Zip");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.verbose { Stdio::inherit() } else { Stdio::null() })
            .spawn()
            .map_err(|source| CatalogError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Always present: stdout was configured as piped above.
        let lines = child.stdout.take().map(|stdout| RawLines::new(BufReader::new(stdout)));
        Ok(ProcessLines {
            child,
            lines,
            target: command.target().to_path_buf(),
            status: None,
        })
    }
}

impl Archiver for ProcessArchiver {
    fn invoke(&self, command: &ArchiverCommand) -> Result<Box<dyn LineSource>> {
        Ok(Box::new(self.spawn(command)?))
    }
}

/// Standard output of a running 7-Zip process, one line at a time.
///
/// Lines are decoded lossily: bytes that are not UTF-8 never end the stream.
///
/// Dropping it without calling [`LineSource::finish`] is a caller bug: it is
/// reported with a warning and the process is killed.
#[must_use = "finish() must be called to drain or terminate the 7-Zip process"]
pub struct ProcessLines {
    child: Child,
    lines: Option<RawLines<BufReader<ChildStdout>>>,
    target: PathBuf,
    status: Option<ExitStatus>,
}

impl ProcessLines {
    fn is_finished(&self) -> bool {
        self.status.is_some()
    }
}

impl Iterator for ProcessLines {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.as_mut()?.next()
    }
}

impl LineSource for ProcessLines {
    fn finish(&mut self, completion: Completion) -> Result<Option<ExitStatus>> {
        if let Some(status) = self.status {
            return Ok(Some(status));
        }

        let drained = match completion {
            Completion::Drain => self.lines.as_mut().map_or(Ok(0), RawLines::skip_rest),
            Completion::Terminate => {
                // The process may already have exited on its own.
                if let Err(e) = self.child.kill() {
                    debug!(pid = self.child.id(), error = %e, "kill failed");
                }
                Ok(0)
            }
        };

        // Close our end first so a writer cannot block on a full pipe.
        // The child is reaped even when draining failed.
        self.lines = None;
        let status = self
            .child
            .wait()
            .map_err(|e| CatalogError::stream(e, &self.target))?;
        debug!(pid = self.child.id(), ?completion, %status, "7-Zip finished");
        self.status = Some(status);

        match drained {
            Ok(skipped) => {
                debug!(bytes = skipped, "discarded remaining 7-Zip output");
                Ok(Some(status))
            }
            Err(e) => Err(CatalogError::stream(e, &self.target)),
        }
    }
}

impl Drop for ProcessLines {
    fn drop(&mut self) {
        if self.is_finished() {
            return;
        }
        warn!(
            pid = self.child.id(),
            "7-Zip output dropped without finish(); terminating the process"
        );
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
