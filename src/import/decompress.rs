//! Bounded-memory decompression of dump files
//!
//! [`DecompressionStream`] reads the file in fixed-size chunks and yields UTF-8
//! text chunks. Bzip2 input goes through [`Bz2Decoder`], an incremental decoder
//! that keeps its state between `feed` calls and restarts itself at every
//! stream boundary so multistream dumps decode back to back.

use super::source::{ByteRange, DumpError, DumpFormat};
use bzip2::{Decompress, Status};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default read size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Size of the decoder's output scratch buffer
const SCRATCH_SIZE: usize = 64 * 1024;

/// Incremental bzip2 decoder
pub struct Bz2Decoder {
    /// Active stream state; `None` between streams
    stream: Option<Decompress>,
    scratch: Vec<u8>,
    streams_completed: usize,
}

impl Default for Bz2Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Bz2Decoder {
    pub fn new() -> Self {
        Self {
            stream: None,
            scratch: vec![0; SCRATCH_SIZE],
            streams_completed: 0,
        }
    }

    /// Number of bzip2 streams fully decoded so far
    pub fn streams_completed(&self) -> usize {
        self.streams_completed
    }

    /// Feed compressed bytes, appending whatever can be decoded to `out`.
    pub fn feed(&mut self, mut input: &[u8], out: &mut Vec<u8>) -> Result<(), bzip2::Error> {
        loop {
            let stream = match self.stream {
                Some(ref mut stream) => stream,
                None if input.is_empty() => return Ok(()),
                None => self.stream.insert(Decompress::new(false)),
            };

            let before_in = stream.total_in();
            let before_out = stream.total_out();
            let status = stream.decompress(input, &mut self.scratch)?;
            let consumed = (stream.total_in() - before_in) as usize;
            let produced = (stream.total_out() - before_out) as usize;

            out.extend_from_slice(&self.scratch[..produced]);
            input = &input[consumed..];

            if status == Status::StreamEnd {
                self.stream = None;
                self.streams_completed += 1;
                continue;
            }

            if consumed == 0 && produced == 0 {
                return Ok(());
            }
        }
    }

    /// Drain buffered output at end of input.
    ///
    /// Returns `false` when the input ended inside a compressed stream.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> Result<bool, bzip2::Error> {
        self.feed(&[], out)?;
        Ok(self.stream.is_none())
    }
}

enum Codec {
    Plain,
    Bz2(Bz2Decoder),
}

/// Incremental UTF-8 decoding across chunk boundaries
#[derive(Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    /// Decode as much of `pending + bytes` as possible, keeping an incomplete
    /// trailing code point for the next call.
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix is UTF-8
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            warn!("Replacing invalid UTF-8 sequence in dump text");
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        text
    }

    /// Flush at end of input; a dangling partial code point becomes U+FFFD
    fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        warn!("Dump text ends with an incomplete UTF-8 sequence");
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

/// Lazy sequence of decoded text chunks from a dump file.
///
/// The file handle is dropped as soon as the stream is exhausted or fails.
pub struct DecompressionStream {
    path: PathBuf,
    format: DumpFormat,
    reader: Option<Box<dyn Read + Send>>,
    codec: Codec,
    utf8: Utf8Carry,
    read_buf: Vec<u8>,
    decoded: Vec<u8>,
    bytes_read: u64,
    done: bool,
}

impl DecompressionStream {
    /// Open a dump file, detecting its format from the path
    pub fn open(
        path: impl AsRef<Path>,
        range: Option<ByteRange>,
        chunk_size: usize,
    ) -> Result<Self, DumpError> {
        let path = path.as_ref();
        let format = DumpFormat::detect(path)?;
        Self::open_with_format(path, format, range, chunk_size)
    }

    /// Open a dump file with an already known format
    pub fn open_with_format(
        path: impl AsRef<Path>,
        format: DumpFormat,
        range: Option<ByteRange>,
        chunk_size: usize,
    ) -> Result<Self, DumpError> {
        let path = path.as_ref().to_path_buf();

        let mut file = File::open(&path).map_err(|e| open_error(&path, e))?;

        let reader: Box<dyn Read + Send> = match range {
            Some(range) => {
                file.seek(SeekFrom::Start(range.start))
                    .map_err(|e| DumpError::ReadFailure {
                        path: path.clone(),
                        source: e,
                    })?;
                Box::new(file.take(range.len()))
            }
            None => Box::new(file),
        };

        let codec = match format {
            DumpFormat::Xml => Codec::Plain,
            DumpFormat::Bz2 => Codec::Bz2(Bz2Decoder::new()),
        };

        debug!(
            "Opened {} ({}, range: {})",
            path.display(),
            format,
            range.map(|r| r.to_string()).unwrap_or_else(|| "whole file".to_string())
        );

        Ok(Self {
            path,
            format,
            reader: Some(reader),
            codec,
            utf8: Utf8Carry::default(),
            read_buf: vec![0; chunk_size.max(1)],
            decoded: Vec::new(),
            bytes_read: 0,
            done: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DumpFormat {
        self.format
    }

    /// Raw (compressed) bytes read from the file so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn read_chunk(&mut self) -> Result<usize, DumpError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(0);
        };
        loop {
            match reader.read(&mut self.read_buf) {
                Ok(n) => {
                    self.bytes_read += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(DumpError::ReadFailure {
                        path: self.path.clone(),
                        source: e,
                    })
                }
            }
        }
    }

    /// Produce the next non-empty text chunk, `None` at a clean end
    fn next_text(&mut self) -> Result<Option<String>, DumpError> {
        loop {
            let n = self.read_chunk()?;
            self.decoded.clear();

            if n == 0 {
                self.reader = None;
                self.done = true;
                if let Codec::Bz2(ref mut decoder) = self.codec {
                    let complete = decoder
                        .finish(&mut self.decoded)
                        .map_err(|e| bz2_error(&self.path, e))?;
                    if !complete {
                        return Err(DumpError::DecompressionFailure {
                            path: self.path.clone(),
                            message: "input ended inside a compressed stream (truncated)".into(),
                            source: None,
                        });
                    }
                    debug!(
                        "Decoded {} bzip2 stream(s) from {}",
                        decoder.streams_completed(),
                        self.path.display()
                    );
                }
                let mut text = self.utf8.decode(&self.decoded);
                text.push_str(&self.utf8.finish());
                return Ok((!text.is_empty()).then_some(text));
            }

            let chunk = &self.read_buf[..n];
            let text = match self.codec {
                Codec::Plain => self.utf8.decode(chunk),
                Codec::Bz2(ref mut decoder) => {
                    decoder
                        .feed(chunk, &mut self.decoded)
                        .map_err(|e| bz2_error(&self.path, e))?;
                    self.utf8.decode(&self.decoded)
                }
            };

            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }
}

impl Iterator for DecompressionStream {
    type Item = Result<String, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_text() {
            Ok(Some(text)) => Some(Ok(text)),
            Ok(None) => None,
            Err(e) => {
                self.reader = None;
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn open_error(path: &Path, e: io::Error) -> DumpError {
    if e.kind() == io::ErrorKind::NotFound {
        DumpError::SourceNotFound {
            path: path.to_path_buf(),
        }
    } else {
        DumpError::ReadFailure {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

fn bz2_error(path: &Path, e: bzip2::Error) -> DumpError {
    DumpError::DecompressionFailure {
        path: path.to_path_buf(),
        message: e.to_string(),
        source: Some(e),
    }
}
