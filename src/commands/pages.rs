use anyhow::{Context, Result};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use wikidump::{
    config::ParserOptions,
    import::{ByteRange, PageStream},
};

/// List `id<TAB>title` for every page of a dump
pub async fn list_pages(
    options: ParserOptions,
    path: PathBuf,
    range: Option<ByteRange>,
) -> Result<()> {
    let format = super::check_source(&path)?;
    info!("Listing pages of: {} (format: {})", path.display(), format);

    let count = tokio::task::spawn_blocking(move || -> Result<usize> {
        let pages = PageStream::open(&path, range, options.chunk_size)?;
        let mut out = BufWriter::new(io::stdout().lock());
        let mut count = 0;

        for page in pages {
            let page = page?;
            if page.is_redirect {
                writeln!(out, "{}\t{}\t(redirect)", page.id, page.title)?;
            } else {
                writeln!(out, "{}\t{}", page.id, page.title)?;
            }
            count += 1;
        }

        out.flush()?;
        Ok(count)
    })
    .await
    .context("Page listing task failed")??;

    info!("Listed {} pages", count);
    Ok(())
}
