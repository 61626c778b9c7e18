//! Line Source
//!
//! Turns a (possibly compressed) input file into a sequence of text lines.
//!
//! Two pieces live here:
//!
//! - [`InputSpec`]: a path plus its [`Compression`] framing. Opening it again
//!   restarts the stream from the first byte, which is how formats that need a
//!   pre-pass (type guessing) re-read their input.
//! - [`LineCursor`]: an explicit cursor over the lines of an open stream with
//!   one line of lookahead. Every read step of the block reader goes through
//!   it, so nested parsing never depends on ambient file-handle position.

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

/// Byte framing of an input file. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Bz2,
}

impl Compression {
    /// Pick a framing from the mutually exclusive CLI flags.
    pub fn from_flags(gzip: bool, bz2: bool) -> Self {
        match (gzip, bz2) {
            (true, _) => Compression::Gzip,
            (_, true) => Compression::Bz2,
            _ => Compression::None,
        }
    }

    /// Wrap a raw byte reader in the matching decoder.
    pub fn decode<'a, R: io::Read + 'a>(self, raw: R) -> Box<dyn BufRead + 'a> {
        match self {
            Compression::None => Box::new(BufReader::new(raw)),
            Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(raw))),
            Compression::Bz2 => Box::new(BufReader::new(MultiBzDecoder::new(raw))),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bz2 => write!(f, "bz2"),
        }
    }
}

/// A named input and its framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub path: PathBuf,
    pub compression: Compression,
}

impl InputSpec {
    pub fn new(path: impl AsRef<Path>, compression: Compression) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            compression,
        }
    }

    /// Open the input at its first byte.
    ///
    /// Each call yields an independent stream, so a second call re-reads the
    /// file from the start.
    pub fn open(&self) -> io::Result<Box<dyn BufRead>> {
        let file = File::open(&self.path)?;
        Ok(self.compression.decode(file))
    }

    /// Open the input behind a fresh [`LineCursor`].
    pub fn cursor(&self) -> io::Result<LineCursor<Box<dyn BufRead>>> {
        Ok(LineCursor::new(self.open()?))
    }
}

/// Explicit position over the lines of a stream.
///
/// Lines are returned without their terminator (`\n` or `\r\n`). Bytes that
/// are not valid UTF-8 are replaced rather than rejected; the corpora are
/// old crawls with mixed encodings.
pub struct LineCursor<R> {
    reader: R,
    /// `Some(None)` caches a peeked end of stream.
    peeked: Option<Option<String>>,
    consumed: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> LineCursor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            peeked: None,
            consumed: 0,
            buf: Vec::new(),
        }
    }

    /// Look at the next line without consuming it. `None` means end of stream.
    pub fn peek_line(&mut self) -> io::Result<Option<&str>> {
        if self.peeked.is_none() {
            let line = self.read_raw()?;
            self.peeked = Some(line);
        }
        Ok(self.peeked.as_ref().and_then(|line| line.as_deref()))
    }

    /// Consume and return the next line. `None` means end of stream.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let line = match self.peeked.take() {
            Some(line) => line,
            None => self.read_raw()?,
        };
        if line.is_some() {
            self.consumed += 1;
        }
        Ok(line)
    }

    /// True once every line has been consumed.
    pub fn at_end(&mut self) -> io::Result<bool> {
        Ok(self.peek_line()?.is_none())
    }

    /// Number of lines consumed so far; the 1-based number of the last line read.
    pub fn line_number(&self) -> usize {
        self.consumed
    }

    /// Consume up to `count` lines, stopping early at end of stream.
    pub fn skip_lines(&mut self, count: usize) -> io::Result<usize> {
        let mut skipped = 0;
        while skipped < count && self.next_line()?.is_some() {
            skipped += 1;
        }
        Ok(skipped)
    }

    fn read_raw(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

impl<'a> LineCursor<Cursor<&'a [u8]>> {
    /// Cursor over an in-memory string.
    pub fn from_text(text: &'a str) -> Self {
        Self::new(Cursor::new(text.as_bytes()))
    }
}

/// A line made only of whitespace counts as a blank separator.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}
