use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::Path;
use std::process::ExitStatus;

use super::{Completion, LineSource};
use crate::error::{CatalogError, Result};

/// Splits a byte stream into lines without requiring UTF-8.
///
/// 7-Zip prints member names as raw bytes on Unix. Invalid sequences are
/// replaced with U+FFFD instead of failing the whole line.
pub(crate) struct RawLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> RawLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self { reader, buf: Vec::new() }
    }

    /// Reads and discards the rest of the stream without decoding it.
    pub(crate) fn skip_rest(&mut self) -> io::Result<u64> {
        io::copy(&mut self.reader, &mut io::sink())
    }
}

impl<R: BufRead> Iterator for RawLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                }
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// A [`LineSource`] over already available text: a saved listing file,
/// stdin, or canned output standing in for a real 7-Zip run.
pub struct TextLines<R> {
    lines: RawLines<R>,
}

impl<R: BufRead> TextLines<R> {
    pub fn new(reader: R) -> Self {
        Self { lines: RawLines::new(reader) }
    }
}

impl<R: Read> TextLines<BufReader<R>> {
    pub fn from_reader(reader: R) -> Self {
        Self::new(BufReader::new(reader))
    }
}

impl TextLines<Cursor<Vec<u8>>> {
    /// Accepts `&str`, `String` or raw bytes.
    pub fn from_text(text: impl Into<Vec<u8>>) -> Self {
        Self::new(Cursor::new(text.into()))
    }
}

impl<R: BufRead> Iterator for TextLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next()
    }
}

impl<R: BufRead + Send> LineSource for TextLines<R> {
    fn finish(&mut self, completion: Completion) -> Result<Option<ExitStatus>> {
        if completion == Completion::Drain {
            self.lines
                .skip_rest()
                .map_err(|e| CatalogError::stream(e, Path::new("-")))?;
        }
        Ok(None)
    }
}
