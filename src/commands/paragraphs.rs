use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use wikidump::{
    config::ParserOptions,
    import::{ingest_ranges, validate_ranges, ByteRange, ParagraphStream, WikipediaParagraph},
};

/// Channel capacity per range for parallel ingestion
const RECORDS_PER_RANGE: usize = 256;

fn open_output(output: Option<&PathBuf>) -> Result<Box<dyn Write + Send>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn write_record(out: &mut dyn Write, paragraph: &WikipediaParagraph) -> Result<()> {
    serde_json::to_writer(&mut *out, paragraph)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Write paragraphs of a dump as JSON lines
pub async fn export_paragraphs(
    options: ParserOptions,
    path: PathBuf,
    ranges: Vec<ByteRange>,
    output: Option<PathBuf>,
    limit: Option<usize>,
) -> Result<()> {
    let format = super::check_source(&path)?;
    info!("Exporting paragraphs from: {} (format: {})", path.display(), format);

    let mut out = open_output(output.as_ref())?;
    let limit = limit.unwrap_or(usize::MAX);

    let written = if ranges.len() > 1 {
        validate_ranges(&ranges).map_err(anyhow::Error::msg)?;
        info!("Processing {} byte ranges in parallel", ranges.len());

        let capacity = RECORDS_PER_RANGE * ranges.len();
        let mut ingest = ingest_ranges(&path, ranges, options, capacity);
        let mut written = 0;
        while written < limit {
            let Some(item) = ingest.receiver.recv().await else {
                break;
            };
            write_record(&mut *out, &item?)?;
            written += 1;
        }
        ingest.join().await;
        out.flush()?;
        written
    } else {
        let range = ranges.first().copied();
        tokio::task::spawn_blocking(move || -> Result<usize> {
            let stream = ParagraphStream::open(&path, options, range)?;
            let mut written = 0;
            for item in stream.take(limit) {
                write_record(&mut *out, &item?)?;
                written += 1;
            }
            out.flush()?;
            Ok(written)
        })
        .await
        .context("Paragraph export task failed")??
    };

    info!("Wrote {} paragraphs", written);
    Ok(())
}
