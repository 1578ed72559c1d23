//! Streaming page tokenizer for MediaWiki XML exports
//!
//! [`PageTokenizer`] is a push-driven state machine: text chunks of any size
//! are fed in and complete pages come out. Only the in-progress page and an
//! unfinished markup construct at the end of the last chunk are retained, so
//! memory does not grow with the size of the dump.

use super::decompress::DecompressionStream;
use super::source::{ByteRange, DumpError, WikipediaPage};
use quick_xml::escape::unescape;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Page fields captured by the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Id,
    Namespace,
    Text,
}

impl Field {
    fn from_tag(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Field::Title),
            "id" => Some(Field::Id),
            "ns" => Some(Field::Namespace),
            "text" => Some(Field::Text),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Id => "id",
            Field::Namespace => "ns",
            Field::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Seeking,
    InPage,
    InField(Field),
}

/// Page under construction
#[derive(Debug, Default)]
struct PartialPage {
    title: Option<String>,
    id: Option<String>,
    namespace: Option<String>,
    text: Option<String>,
    redirect: bool,
}

impl PartialPage {
    fn finish(self) -> WikipediaPage {
        WikipediaPage {
            title: self.title.unwrap_or_default(),
            id: self.id.unwrap_or_default(),
            namespace: self.namespace.and_then(|ns| ns.trim().parse().ok()),
            is_redirect: self.redirect,
            text: self.text.unwrap_or_default(),
        }
    }
}

/// Classification of a markup construct at the head of the buffer
enum Markup<'a> {
    /// `<name ...>` (`self_closing` for `<name .../>`)
    Start { name: &'a str, self_closing: bool },
    End { name: &'a str },
    /// Character data from a CDATA section
    CData(&'a str),
    /// Comment, processing instruction or doctype
    Ignored,
}

/// Incremental XML page tokenizer
#[derive(Debug)]
pub struct PageTokenizer {
    state: State,
    /// Unconsumed input (at most one incomplete construct between feeds)
    buffer: String,
    page: Option<PartialPage>,
    /// Raw escaped text of the open field
    field_text: String,
}

impl Default for PageTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageTokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Seeking,
            buffer: String::new(),
            page: None,
            field_text: String::new(),
        }
    }

    /// Feed a text chunk, appending the pages it completes to `pages`.
    ///
    /// On a structural error, pages closed earlier in the same chunk are
    /// still appended before the error is returned.
    pub fn feed(&mut self, chunk: &str, pages: &mut Vec<WikipediaPage>) -> Result<(), DumpError> {
        self.buffer.push_str(chunk);
        let consumed = self.scan(pages)?;
        self.buffer.drain(..consumed);
        Ok(())
    }

    /// Signal end of input.
    ///
    /// Fails if a page was left open or the input stopped inside a tag.
    pub fn finish(&mut self) -> Result<(), DumpError> {
        if self.state != State::Seeking {
            let message = match self.state {
                State::InField(field) => {
                    format!("end of stream inside <{}> of an unfinished page", field.tag())
                }
                _ => "end of stream before closing </page>".to_string(),
            };
            return Err(self.malformed(message));
        }
        if self.buffer.contains('<') {
            return Err(self.malformed("end of stream inside an unterminated tag"));
        }
        self.buffer.clear();
        Ok(())
    }

    /// Process the buffer, returning how many bytes were consumed
    fn scan(&mut self, pages: &mut Vec<WikipediaPage>) -> Result<usize, DumpError> {
        let mut pos = 0;

        loop {
            let rest = &self.buffer[pos..];
            let Some(lt) = rest.find('<') else {
                if let State::InField(_) = self.state {
                    self.field_text.push_str(rest);
                }
                return Ok(self.buffer.len());
            };

            if let State::InField(_) = self.state {
                self.field_text.push_str(&rest[..lt]);
            }
            pos += lt;

            let Some((len, markup)) = parse_markup(&self.buffer[pos..]) else {
                // Incomplete construct, wait for more input
                return Ok(pos);
            };

            let event = match markup {
                Markup::Start { name, self_closing } => Event::Start {
                    name: name.to_string(),
                    self_closing,
                },
                Markup::End { name } => Event::End {
                    name: name.to_string(),
                },
                Markup::CData(data) => Event::CData(data.to_string()),
                Markup::Ignored => Event::Ignored,
            };
            pos += len;

            if let Some(page) = self.handle(event)? {
                pages.push(page);
            }
        }
    }

    fn handle(&mut self, event: Event) -> Result<Option<WikipediaPage>, DumpError> {
        match (self.state, event) {
            (_, Event::Ignored) => Ok(None),

            (State::InField(_), Event::CData(data)) => {
                // CDATA is literal text; escape it so the field decodes uniformly
                self.field_text.push_str(&quick_xml::escape::escape(data.as_str()));
                Ok(None)
            }
            (_, Event::CData(_)) => Ok(None),

            (State::Seeking, Event::Start { name, self_closing }) => {
                if name == "page" && !self_closing {
                    self.page = Some(PartialPage::default());
                    self.state = State::InPage;
                }
                Ok(None)
            }
            (State::Seeking, Event::End { name }) => {
                if name == "page" {
                    return Err(self.malformed("</page> without matching <page>"));
                }
                Ok(None)
            }

            (State::InPage, Event::Start { name, self_closing }) => {
                if name == "page" {
                    return Err(self.malformed("<page> opened inside another page"));
                }
                if name == "redirect" {
                    if let Some(page) = self.page.as_mut() {
                        page.redirect = true;
                    }
                    return Ok(None);
                }
                if let Some(field) = Field::from_tag(&name) {
                    if self_closing {
                        // e.g. <text deleted="deleted" />
                        self.store_field(field, String::new());
                    } else {
                        self.field_text.clear();
                        self.state = State::InField(field);
                    }
                }
                Ok(None)
            }
            (State::InPage, Event::End { name }) => {
                if name == "page" {
                    let page = self.page.take().unwrap_or_default().finish();
                    self.state = State::Seeking;
                    return Ok(Some(page));
                }
                if let Some(field) = Field::from_tag(&name) {
                    return Err(self.malformed(format!(
                        "</{}> without matching <{}>",
                        field.tag(),
                        field.tag()
                    )));
                }
                Ok(None)
            }

            (State::InField(field), Event::End { name }) if name == field.tag() => {
                let raw = std::mem::take(&mut self.field_text);
                let value = match unescape(&raw) {
                    Ok(value) => value.into_owned(),
                    Err(e) => {
                        return Err(self.malformed(format!(
                            "invalid character reference in <{}>: {}",
                            field.tag(),
                            e
                        )))
                    }
                };
                self.store_field(field, value);
                self.state = State::InPage;
                Ok(None)
            }
            (State::InField(field), Event::End { name }) => Err(self.malformed(format!(
                "</{}> while <{}> is still open",
                name,
                field.tag()
            ))),
            (State::InField(field), Event::Start { name, .. }) => Err(self.malformed(format!(
                "<{}> inside <{}>",
                name,
                field.tag()
            ))),
        }
    }

    fn store_field(&mut self, field: Field, value: String) {
        let Some(page) = self.page.as_mut() else {
            return;
        };
        match field {
            Field::Title => page.title = Some(value),
            // Revision and contributor ids follow the page id
            Field::Id => {
                if page.id.is_none() {
                    page.id = Some(value.trim().to_string());
                }
            }
            Field::Namespace => page.namespace = Some(value),
            Field::Text => {
                if page.text.is_none() {
                    page.text = Some(value);
                }
            }
        }
    }

    fn malformed(&self, message: impl Into<String>) -> DumpError {
        let (title, id) = match self.page {
            Some(ref page) => (page.title.clone(), page.id.clone()),
            None => (None, None),
        };
        DumpError::MalformedDump {
            path: PathBuf::new(),
            message: message.into(),
            title,
            id,
        }
    }
}

/// Owned form of [`Markup`] so the buffer borrow ends before state changes
enum Event {
    Start { name: String, self_closing: bool },
    End { name: String },
    CData(String),
    Ignored,
}

/// Parse the construct starting at `input[0] == '<'`.
///
/// Returns `None` if `input` does not yet hold the whole construct.
fn parse_markup(input: &str) -> Option<(usize, Markup<'_>)> {
    if input.starts_with("<!--") {
        let end = input[4..].find("-->")?;
        return Some((4 + end + 3, Markup::Ignored));
    }
    if input.starts_with("<![CDATA[") {
        let end = input[9..].find("]]>")?;
        return Some((9 + end + 3, Markup::CData(&input[9..9 + end])));
    }
    if "<![CDATA[".starts_with(input) || "<!--".starts_with(input) {
        // Too short to tell which construct this is
        return None;
    }
    if input.starts_with("<?") {
        let end = input[2..].find("?>")?;
        return Some((2 + end + 2, Markup::Ignored));
    }

    let close = find_tag_end(input)?;
    let inner = &input[1..close];
    let len = close + 1;

    if inner.starts_with('!') {
        return Some((len, Markup::Ignored));
    }
    if let Some(name) = inner.strip_prefix('/') {
        return Some((len, Markup::End { name: name.trim() }));
    }

    let self_closing = inner.ends_with('/');
    let inner = inner.trim_end_matches('/');
    let name = inner
        .split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or_default();
    Some((len, Markup::Start { name, self_closing }))
}

/// Find the `>` closing the tag at the head of `input`, skipping quoted
/// attribute values.
fn find_tag_end(input: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(i),
            None => {}
        }
    }
    None
}

/// Pull adapter: pages from a [`DecompressionStream`]
pub struct PageStream {
    path: PathBuf,
    chunks: DecompressionStream,
    tokenizer: PageTokenizer,
    ready: VecDeque<WikipediaPage>,
    /// Terminal error, yielded once the pages completed before it are drained
    failed: Option<DumpError>,
    done: bool,
}

impl PageStream {
    /// Open a dump and iterate over its pages
    pub fn open(
        path: impl AsRef<Path>,
        range: Option<ByteRange>,
        chunk_size: usize,
    ) -> Result<Self, DumpError> {
        let chunks = DecompressionStream::open(path, range, chunk_size)?;
        Ok(Self::new(chunks))
    }

    pub fn new(chunks: DecompressionStream) -> Self {
        Self {
            path: chunks.path().to_path_buf(),
            chunks,
            tokenizer: PageTokenizer::new(),
            ready: VecDeque::new(),
            failed: None,
            done: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw bytes read from the underlying file so far
    pub fn bytes_read(&self) -> u64 {
        self.chunks.bytes_read()
    }

    fn fail(&mut self, e: DumpError) {
        self.done = true;
        self.failed = Some(e.with_path(&self.path));
    }
}

impl Iterator for PageStream {
    type Item = Result<WikipediaPage, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(page) = self.ready.pop_front() {
                return Some(Ok(page));
            }
            if let Some(e) = self.failed.take() {
                return Some(Err(e));
            }
            if self.done {
                return None;
            }
            match self.chunks.next() {
                Some(Ok(chunk)) => {
                    let mut pages = Vec::new();
                    let fed = self.tokenizer.feed(&chunk, &mut pages);
                    self.ready.extend(pages);
                    if let Err(e) = fed {
                        self.fail(e);
                    }
                }
                Some(Err(e)) => self.fail(e),
                None => {
                    self.done = true;
                    if let Err(e) = self.tokenizer.finish() {
                        self.fail(e);
                    }
                }
            }
        }
    }
}
