//! Core types for dump ingestion: formats, byte ranges, records and errors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Dump format, selected from the file suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    /// Uncompressed XML export (`.xml`)
    Xml,
    /// Bzip2 compressed XML export, optionally multistream (`.bz2`, `.xml.bz2`)
    Bz2,
}

impl DumpFormat {
    /// Detect the format from the path suffix.
    ///
    /// Matching is case-sensitive and never touches the filesystem.
    pub fn detect(path: &Path) -> Result<Self, DumpError> {
        let name = path.to_string_lossy();

        if name.ends_with(".bz2") {
            Ok(DumpFormat::Bz2)
        } else if name.ends_with(".xml") {
            Ok(DumpFormat::Xml)
        } else {
            Err(DumpError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    }
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpFormat::Xml => f.write_str("xml"),
            DumpFormat::Bz2 => f.write_str("bz2"),
        }
    }
}

/// Byte range `[start, end)` of the underlying file
///
/// Used to decode a single block run of a multistream bzip2 dump. The range
/// must start and end on stream boundaries; nothing here discovers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: u64, end: u64) -> Result<Self, DumpError> {
        if start > end {
            return Err(DumpError::InvalidByteRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of bytes covered by the range
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for ByteRange {
    type Err = String;

    /// Parse `START:END`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| format!("expected START:END, got '{}'", s))?;
        let start: u64 = start
            .trim()
            .parse()
            .map_err(|e| format!("invalid range start '{}': {}", start, e))?;
        let end: u64 = end
            .trim()
            .parse()
            .map_err(|e| format!("invalid range end '{}': {}", end, e))?;
        ByteRange::new(start, end).map_err(|e| e.to_string())
    }
}

/// A page record assembled by the tokenizer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WikipediaPage {
    pub title: String,
    /// Page id (the first `<id>` inside the page, not the revision id)
    pub id: String,
    /// Namespace from `<ns>`, if the export carries it
    pub namespace: Option<i32>,
    pub is_redirect: bool,
    /// Raw wikitext of the page's revision
    pub text: String,
}

/// A section of a page's wikitext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading text, empty for the lead section
    pub name: String,
    /// 0 for the lead section, 2..=6 for headings
    pub level: u8,
    pub content: String,
}

impl Section {
    /// The text before the first heading
    pub fn lead(content: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            level: 0,
            content: content.into(),
        }
    }

    pub fn is_lead(&self) -> bool {
        self.level == 0
    }
}

/// A cleaned paragraph with its article and section context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikipediaParagraph {
    pub article_title: String,
    pub article_id: String,
    pub section_name: String,
    /// 0-based position among the emitted paragraphs of the section
    pub paragraph_position: usize,
    pub content: String,
}

/// Category of a [`DumpError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    SourceNotFound,
    ReadFailure,
    DecompressionFailure,
    MalformedDump,
    InvalidByteRange,
}

/// Errors that can occur while ingesting a dump.
///
/// Every error is terminal for the stream that produced it.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("unsupported dump format: {} (expected .xml, .bz2 or .xml.bz2)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("dump source not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bzip2 decompression failed for {}: {message}", .path.display())]
    DecompressionFailure {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<bzip2::Error>,
    },

    #[error("malformed dump {}: {message}{}", .path.display(), page_context(.title, .id))]
    MalformedDump {
        path: PathBuf,
        message: String,
        title: Option<String>,
        id: Option<String>,
    },

    #[error("invalid byte range {start}:{end} (start is past end)")]
    InvalidByteRange { start: u64, end: u64 },
}

fn page_context(title: &Option<String>, id: &Option<String>) -> String {
    match (title, id) {
        (Some(t), Some(i)) => format!(" (in page '{}', id {})", t, i),
        (Some(t), None) => format!(" (in page '{}')", t),
        (None, Some(i)) => format!(" (in page id {})", i),
        (None, None) => String::new(),
    }
}

impl DumpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DumpError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            DumpError::SourceNotFound { .. } => ErrorKind::SourceNotFound,
            DumpError::ReadFailure { .. } => ErrorKind::ReadFailure,
            DumpError::DecompressionFailure { .. } => ErrorKind::DecompressionFailure,
            DumpError::MalformedDump { .. } => ErrorKind::MalformedDump,
            DumpError::InvalidByteRange { .. } => ErrorKind::InvalidByteRange,
        }
    }

    /// Attach the dump path to an error raised without one (the tokenizer
    /// works on text and does not know where it came from).
    pub(crate) fn with_path(self, source_path: &Path) -> Self {
        match self {
            DumpError::MalformedDump {
                path,
                message,
                title,
                id,
            } if path.as_os_str().is_empty() => DumpError::MalformedDump {
                path: source_path.to_path_buf(),
                message,
                title,
                id,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DumpFormat::detect(Path::new("enwiki-latest-pages-articles.xml")).unwrap(),
            DumpFormat::Xml
        );
        assert_eq!(
            DumpFormat::detect(Path::new("enwiki-latest-pages-articles.xml.bz2")).unwrap(),
            DumpFormat::Bz2
        );
        assert_eq!(
            DumpFormat::detect(Path::new("/data/dumps/chunk-0001.bz2")).unwrap(),
            DumpFormat::Bz2
        );
    }

    #[test]
    fn test_format_detection_rejects_unknown() {
        for name in ["dump.json", "dump.XML", "dump.xml.gz", "dump.BZ2", "dump", "xml"] {
            let err = DumpFormat::detect(Path::new(name)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedFormat, "{}", name);
        }
    }

    #[test]
    fn test_byte_range_parsing() {
        let range: ByteRange = "100:2500".parse().unwrap();
        assert_eq!(range, ByteRange { start: 100, end: 2500 });
        assert_eq!(range.len(), 2400);

        assert!("2500:100".parse::<ByteRange>().is_err());
        assert!("100".parse::<ByteRange>().is_err());
        assert!("a:b".parse::<ByteRange>().is_err());
    }

    #[test]
    fn test_malformed_error_context() {
        let err = DumpError::MalformedDump {
            path: PathBuf::new(),
            message: "unexpected end of stream".into(),
            title: Some("Anarchism".into()),
            id: Some("12".into()),
        }
        .with_path(Path::new("dump.xml"));

        let msg = err.to_string();
        assert!(msg.contains("dump.xml"));
        assert!(msg.contains("Anarchism"));
        assert!(msg.contains("id 12"));
    }

    #[test]
    fn test_read_failure_keeps_cause() {
        let err = DumpError::ReadFailure {
            path: PathBuf::from("dump.xml"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
        };
        assert_eq!(err.kind(), ErrorKind::ReadFailure);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_paragraph_serializes_camel_case() {
        let para = WikipediaParagraph {
            article_title: "Rust".into(),
            article_id: "42".into(),
            section_name: "History".into(),
            paragraph_position: 1,
            content: "Some text.".into(),
        };
        let json = serde_json::to_string(&para).unwrap();
        assert!(json.contains("\"articleTitle\":\"Rust\""));
        assert!(json.contains("\"paragraphPosition\":1"));
    }
}
