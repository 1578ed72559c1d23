//! wikidump: streaming Wikipedia dump ingestion
//!
//! Reads Wikipedia XML exports (plain or bzip2, including multistream dumps
//! split into byte ranges) with bounded memory and produces paragraph records
//! tagged with article and section context, ready for embedding and indexing.

pub mod config;
pub mod import;
pub mod util;

pub use config::{Config, ParserOptions};
pub use import::{
    ByteRange, DumpError, DumpFormat, ParagraphStream, WikipediaPage, WikipediaParagraph,
};
