//! Progress tracking for dump ingestion

use crate::util::truncate_str;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of ingestion counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub pages_processed: usize,
    pub pages_skipped: usize,
    pub paragraphs_emitted: usize,
    pub bytes_processed: u64,
    pub elapsed_seconds: f64,
    pub paragraphs_per_second: f64,
}

impl IngestStats {
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.paragraphs_per_second = self.paragraphs_emitted as f64 / self.elapsed_seconds;
        }
    }
}

/// Progress tracker for ingestion runs
pub struct IngestProgress {
    /// Spinner (None in quiet mode)
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
    pages_processed: AtomicUsize,
    pages_skipped: AtomicUsize,
    paragraphs_emitted: AtomicUsize,
    bytes_processed: AtomicU64,
    cancelled: AtomicBool,
}

impl IngestProgress {
    pub fn new(quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} paragraphs {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
            pages_processed: AtomicUsize::new(0),
            pages_skipped: AtomicUsize::new(0),
            paragraphs_emitted: AtomicUsize::new(0),
            bytes_processed: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Record an emitted paragraph of the given article
    pub fn paragraph_emitted(&self, title: &str) {
        let total = self.paragraphs_emitted.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(ref pb) = self.progress_bar {
            pb.set_position(total as u64);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                total as f64 / elapsed
            } else {
                0.0
            };

            pb.set_message(format!("| {:.1} para/s | {}", rate, truncate_str(title, 30)));
        }
    }

    /// Update page counters from the pipeline
    pub fn set_pages(&self, processed: usize, skipped: usize) {
        self.pages_processed.store(processed, Ordering::Relaxed);
        self.pages_skipped.store(skipped, Ordering::Relaxed);
    }

    /// Set the raw byte count read from the source
    pub fn set_bytes(&self, bytes: u64) {
        self.bytes_processed.store(bytes, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> IngestStats {
        let mut stats = IngestStats {
            pages_processed: self.pages_processed.load(Ordering::Relaxed),
            pages_skipped: self.pages_skipped.load(Ordering::Relaxed),
            paragraphs_emitted: self.paragraphs_emitted.load(Ordering::Relaxed),
            bytes_processed: self.bytes_processed.load(Ordering::Relaxed),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
            paragraphs_per_second: 0.0,
        };
        stats.update_rate();
        stats
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if let Some(ref pb) = self.progress_bar {
            pb.abandon_with_message("Cancelled");
        }
    }

    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            let stats = self.get_stats();
            pb.finish_with_message(format!(
                "| done, {} pages, {:.1} para/s",
                stats.pages_processed, stats.paragraphs_per_second
            ));
        }
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        let stats = self.get_stats();

        println!("\nIngest Summary");
        println!("==============");
        println!("Pages processed:     {}", stats.pages_processed);
        println!("Pages skipped:       {}", stats.pages_skipped);
        println!("Paragraphs emitted:  {}", stats.paragraphs_emitted);
        println!("Bytes read:          {} MB", stats.bytes_processed / 1_000_000);
        println!("Elapsed time:        {:.1}s", stats.elapsed_seconds);
        println!("Processing rate:     {:.1} para/s", stats.paragraphs_per_second);
    }
}
