//! CLI subcommand implementations

mod init;
mod pages;
mod paragraphs;
mod stats;

pub use init::init_config;
pub use pages::list_pages;
pub use paragraphs::export_paragraphs;
pub use stats::show_stats;

use anyhow::Result;
use std::path::Path;
use wikidump::import::DumpFormat;

/// Fail early with a readable message for paths we cannot ingest
fn check_source(path: &Path) -> Result<DumpFormat> {
    let format = DumpFormat::detect(path)?;
    if !path.exists() {
        anyhow::bail!("Dump file not found: {}", path.display());
    }
    Ok(format)
}
