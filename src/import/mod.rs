//! Streaming ingestion of Wikipedia XML dumps
//!
//! Turns a dump file (plain `.xml` or bzip2 `.bz2` / `.xml.bz2`, optionally
//! multistream) into a lazy sequence of cleaned paragraphs tagged with their
//! article and section.
//!
//! # Example Usage
//!
//! ```no_run
//! use wikidump::config::ParserOptions;
//! use wikidump::import::ParagraphStream;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = ParagraphStream::open(
//!     "enwiki-latest-pages-articles.xml.bz2",
//!     ParserOptions::default(),
//!     None,
//! )?;
//!
//! for paragraph in stream {
//!     let paragraph = paragraph?;
//!     println!("{} / {}: {}", paragraph.article_title, paragraph.section_name, paragraph.content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   bytes    ┌──────────────────────┐   text chunks
//! │  dump file       │──────────▶│ DecompressionStream  │──────────────┐
//! │  (+ ByteRange)   │            │  plain / Bz2Decoder  │              │
//! └──────────────────┘            └──────────────────────┘              ▼
//!                                                          ┌──────────────────────┐
//!                                                          │ PageTokenizer        │
//!                                                          │ Seeking/InPage/Field │
//!                                                          └──────────┬───────────┘
//!                                                                     │ WikipediaPage
//!                                                                     ▼
//! ┌──────────────────────┐  paragraphs  ┌────────────────────┐  ┌─────────────────┐
//! │ ParagraphStream      │◀────────────│ ParagraphExtractor │◀─│ split_sections  │
//! │ (redirect/ns filter) │              │ + WikiTextCleaner  │  │                 │
//! └──────────────────────┘              └────────────────────┘  └─────────────────┘
//! ```
//!
//! Every stage is pulled by the next one. Independent byte ranges of a
//! multistream file can be processed concurrently with [`ingest_ranges`].

pub mod decompress;
pub mod paragraphs;
pub mod parallel;
pub mod pipeline;
pub mod progress;
pub mod sections;
pub mod source;
pub mod tokenizer;
pub mod wikitext;

// Re-export main types
pub use decompress::{Bz2Decoder, DecompressionStream};
pub use paragraphs::ParagraphExtractor;
pub use parallel::{ingest_ranges, validate_ranges, RangeIngest};
pub use pipeline::{ParagraphStream, PipelineStats};
pub use progress::{IngestProgress, IngestStats};
pub use sections::split_sections;
pub use source::{
    ByteRange, DumpError, DumpFormat, ErrorKind, Section, WikipediaPage, WikipediaParagraph,
};
pub use tokenizer::{PageStream, PageTokenizer};
pub use wikitext::WikiTextCleaner;
