use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use wikidump::{
    config::ParserOptions,
    import::{ByteRange, IngestProgress, ParagraphStream, PipelineStats},
};

/// Refresh page and byte counters every this many paragraphs
const REFRESH_INTERVAL: usize = 256;

fn sync_progress(progress: &IngestProgress, stats: &PipelineStats, bytes: u64) {
    let skipped = stats.redirects_skipped + stats.namespace_skipped;
    progress.set_pages(stats.pages_seen - skipped, skipped);
    progress.set_bytes(bytes);
}

/// Run the pipeline over a dump and print what it produced
pub async fn show_stats(
    options: ParserOptions,
    path: PathBuf,
    range: Option<ByteRange>,
    quiet: bool,
    json: bool,
) -> Result<()> {
    let format = super::check_source(&path)?;
    info!("Collecting statistics for: {} (format: {})", path.display(), format);

    let progress = Arc::new(IngestProgress::new(quiet || json));

    let ctrl_c = {
        let progress = progress.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current paragraph");
                progress.cancel();
            }
        })
    };

    let worker = {
        let progress = progress.clone();
        tokio::task::spawn_blocking(move || -> Result<PipelineStats> {
            let mut stream = ParagraphStream::open(&path, options, range)?;

            while let Some(item) = stream.next() {
                let paragraph = item?;
                progress.paragraph_emitted(&paragraph.article_title);

                if stream.stats().paragraphs % REFRESH_INTERVAL == 0 {
                    sync_progress(&progress, stream.stats(), stream.bytes_read());
                }
                if progress.is_cancelled() {
                    break;
                }
            }

            sync_progress(&progress, stream.stats(), stream.bytes_read());
            Ok(stream.stats().clone())
        })
    };

    let result = worker.await.context("Statistics task failed")?;
    ctrl_c.abort();
    let pipeline = result?;

    if !progress.is_cancelled() {
        progress.finish();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&progress.get_stats())?);
    } else {
        progress.print_summary();
        println!("Sections:            {}", pipeline.sections);
        println!("Redirects skipped:   {}", pipeline.redirects_skipped);
        println!("Namespace skipped:   {}", pipeline.namespace_skipped);
    }

    Ok(())
}
