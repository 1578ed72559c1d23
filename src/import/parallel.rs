//! Parallel ingestion of disjoint byte ranges of a multistream dump
//!
//! Each range gets its own [`ParagraphStream`] (own file handle, own decoder)
//! on a blocking task. Records are forwarded into one bounded channel, so a
//! slow consumer holds every worker back.

use super::pipeline::ParagraphStream;
use super::source::{ByteRange, DumpError, WikipediaParagraph};
use crate::config::ParserOptions;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Check that no two ranges overlap
pub fn validate_ranges(ranges: &[ByteRange]) -> Result<(), String> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| r.start);
    for pair in sorted.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(format!("byte ranges {} and {} overlap", pair[0], pair[1]));
        }
    }
    Ok(())
}

/// Handle to a running parallel ingestion
pub struct RangeIngest {
    /// Paragraphs from all ranges; records of one range keep their order
    pub receiver: mpsc::Receiver<Result<WikipediaParagraph, DumpError>>,
    workers: Vec<JoinHandle<()>>,
}

impl RangeIngest {
    /// Wait for every worker to stop
    pub async fn join(self) {
        drop(self.receiver);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!("Range worker panicked: {}", e);
            }
        }
    }
}

/// Start one pipeline per byte range.
///
/// Must be called from within a tokio runtime. An error in one range is
/// forwarded on the channel and ends that range only. Dropping the receiver
/// stops every worker at its next send.
pub fn ingest_ranges(
    path: impl AsRef<Path>,
    ranges: Vec<ByteRange>,
    options: ParserOptions,
    capacity: usize,
) -> RangeIngest {
    let path: PathBuf = path.as_ref().to_path_buf();
    let (tx, receiver) = mpsc::channel(capacity.max(1));

    let workers = ranges
        .into_iter()
        .map(|range| {
            let tx = tx.clone();
            let path = path.clone();
            let options = options.clone();
            tokio::task::spawn_blocking(move || run_range(&path, range, options, tx))
        })
        .collect();

    RangeIngest { receiver, workers }
}

fn run_range(
    path: &Path,
    range: ByteRange,
    options: ParserOptions,
    tx: mpsc::Sender<Result<WikipediaParagraph, DumpError>>,
) {
    let stream = match ParagraphStream::open(path, options, Some(range)) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = tx.blocking_send(Err(e));
            return;
        }
    };

    for item in stream {
        if tx.blocking_send(item).is_err() {
            debug!("Receiver dropped, stopping range {}", range);
            return;
        }
    }
    debug!("Range {} finished", range);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::Write;

    fn compress(data: &str) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn page(id: usize) -> String {
        format!(
            "<page><title>Page {id}</title><id>{id}</id><text>Paragraph one of page {id}.\n\nParagraph two of page {id}.</text></page>\n"
        )
    }

    #[test]
    fn test_validate_ranges() {
        let a = ByteRange::new(0, 10).unwrap();
        let b = ByteRange::new(10, 20).unwrap();
        let c = ByteRange::new(15, 30).unwrap();
        assert!(validate_ranges(&[b, a]).is_ok());
        assert!(validate_ranges(&[a, b, c]).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_ranges_cover_all_pages() {
        let mut bytes = Vec::new();
        let mut ranges = Vec::new();
        for block in 0..4 {
            let text: String = (block * 3..block * 3 + 3).map(page).collect();
            let start = bytes.len() as u64;
            bytes.extend(compress(&text));
            ranges.push(ByteRange::new(start, bytes.len() as u64).unwrap());
        }

        let mut file = tempfile::Builder::new().suffix(".xml.bz2").tempfile().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let mut ingest = ingest_ranges(file.path(), ranges, ParserOptions::default(), 2);
        let mut paragraphs = Vec::new();
        while let Some(item) = ingest.receiver.recv().await {
            paragraphs.push(item.unwrap());
        }
        ingest.join().await;

        assert_eq!(paragraphs.len(), 24);
        let mut ids: Vec<usize> = paragraphs
            .iter()
            .map(|p| p.article_id.parse().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids, (0..12).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bad_range_reports_error() {
        let mut file = tempfile::Builder::new().suffix(".bz2").tempfile().unwrap();
        file.write_all(&compress(&page(1))).unwrap();
        file.flush().unwrap();

        // Starts in the middle of the stream
        let range = ByteRange::new(3, 20).unwrap();
        let mut ingest = ingest_ranges(file.path(), vec![range], ParserOptions::default(), 4);
        let first = ingest.receiver.recv().await.unwrap();
        assert!(first.is_err());
        ingest.join().await;
    }
}
