//! Pipeline driver: dump file to a lazy sequence of paragraphs

use super::paragraphs::ParagraphExtractor;
use super::sections::split_sections;
use super::source::{ByteRange, DumpError, Section, WikipediaPage, WikipediaParagraph};
use super::tokenizer::PageStream;
use crate::config::ParserOptions;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use tracing::{debug, info};

/// Counters kept while a stream runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub pages_seen: usize,
    pub redirects_skipped: usize,
    pub namespace_skipped: usize,
    pub sections: usize,
    pub paragraphs: usize,
}

/// Page whose sections are being expanded
struct CurrentPage {
    title: String,
    id: String,
    sections: VecDeque<Section>,
    /// Next position per section name; repeated headings share one numbering
    next_position: HashMap<String, usize>,
}

/// Lazy sequence of paragraphs from one dump file (or one byte range of it).
///
/// Not restartable: once exhausted or failed, open a new stream.
pub struct ParagraphStream {
    pages: PageStream,
    options: ParserOptions,
    extractor: ParagraphExtractor,
    current: Option<CurrentPage>,
    ready: VecDeque<WikipediaParagraph>,
    stats: PipelineStats,
    done: bool,
}

impl ParagraphStream {
    /// Open a dump file. Fails before any I/O if the suffix is unsupported.
    pub fn open(
        path: impl AsRef<Path>,
        options: ParserOptions,
        range: Option<ByteRange>,
    ) -> Result<Self, DumpError> {
        let path = path.as_ref();
        let pages = PageStream::open(path, range, options.chunk_size)?;

        info!(
            "Parsing paragraphs from {}{}",
            path.display(),
            range.map(|r| format!(" (bytes {})", r)).unwrap_or_default()
        );

        Ok(Self::from_pages(pages, options))
    }

    /// Build the paragraph stream over an existing page stream
    pub fn from_pages(pages: PageStream, options: ParserOptions) -> Self {
        let extractor = ParagraphExtractor::new(options.min_paragraph_length);
        Self {
            pages,
            options,
            extractor,
            current: None,
            ready: VecDeque::new(),
            stats: PipelineStats::default(),
            done: false,
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Raw bytes read from the underlying file so far
    pub fn bytes_read(&self) -> u64 {
        self.pages.bytes_read()
    }

    /// Whether a page contributes paragraphs under the current options
    fn accept(&mut self, page: &WikipediaPage) -> bool {
        if page.is_redirect && self.options.skip_redirects {
            self.stats.redirects_skipped += 1;
            if self.options.debug {
                debug!("Skipping redirect page '{}' ({})", page.title, page.id);
            }
            return false;
        }
        if !self.options.allows_namespace(page.namespace) {
            self.stats.namespace_skipped += 1;
            if self.options.debug {
                debug!(
                    "Skipping page '{}' in namespace {:?}",
                    page.title, page.namespace
                );
            }
            return false;
        }
        true
    }

    fn start_page(&mut self, page: WikipediaPage) {
        let sections: VecDeque<Section> = split_sections(&page.text).into();

        if self.options.debug {
            debug!(
                "Page '{}' ({}): {} bytes of wikitext, {} sections",
                page.title,
                page.id,
                page.text.len(),
                sections.len()
            );
        }

        self.current = Some(CurrentPage {
            title: page.title,
            id: page.id,
            sections,
            next_position: HashMap::new(),
        });
    }

    /// Expand the next section of the current page into `ready`.
    ///
    /// Returns `false` once the page has no sections left.
    fn expand_next_section(&mut self) -> bool {
        let Some(page) = self.current.as_mut() else {
            return false;
        };
        let Some(section) = page.sections.pop_front() else {
            self.current = None;
            return false;
        };

        let first = page.next_position.get(&section.name).copied().unwrap_or(0);
        let paragraphs = self
            .extractor
            .extract(&page.title, &page.id, &section, first);
        page.next_position
            .insert(section.name.clone(), first + paragraphs.len());
        if self.options.debug {
            debug!(
                "Section '{}' (level {}) of '{}': {} paragraphs",
                section.name,
                section.level,
                page.title,
                paragraphs.len()
            );
        }

        self.stats.sections += 1;
        self.ready.extend(paragraphs);
        true
    }
}

impl Iterator for ParagraphStream {
    type Item = Result<WikipediaParagraph, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(paragraph) = self.ready.pop_front() {
                self.stats.paragraphs += 1;
                return Some(Ok(paragraph));
            }
            if self.expand_next_section() {
                continue;
            }
            if self.done {
                return None;
            }

            match self.pages.next() {
                Some(Ok(page)) => {
                    self.stats.pages_seen += 1;
                    if self.accept(&page) {
                        self.start_page(page);
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    info!(
                        "Finished {}: {} pages, {} paragraphs",
                        self.pages.path().display(),
                        self.stats.pages_seen,
                        self.stats.paragraphs
                    );
                    return None;
                }
            }
        }
    }
}
