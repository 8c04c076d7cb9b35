//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use diskcat::sevenzip::{Archiver, ArchiverCommand, LineSource, TextLines};
use diskcat::Result;

/// An archiver that answers every command with the same canned output and
/// remembers what it was asked to run.
pub struct CannedArchiver {
    output: String,
    pub invoked: Mutex<Vec<ArchiverCommand>>,
}

impl CannedArchiver {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            invoked: Mutex::new(Vec::new()),
        }
    }

    pub fn commands(&self) -> Vec<ArchiverCommand> {
        self.invoked.lock().unwrap().clone()
    }
}

impl Archiver for CannedArchiver {
    fn invoke(&self, command: &ArchiverCommand) -> Result<Box<dyn LineSource>> {
        self.invoked.lock().unwrap().push(command.clone());
        Ok(Box::new(TextLines::from_text(self.output.clone())))
    }
}
