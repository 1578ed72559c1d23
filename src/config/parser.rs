//! Parser configuration

use crate::import::decompress::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};

/// Options controlling how a dump is turned into paragraphs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Redirect pages produce no paragraphs
    pub skip_redirects: bool,
    /// Cleaned paragraphs shorter than this many characters are dropped
    pub min_paragraph_length: usize,
    /// Emit per-page and per-section diagnostics at debug level
    pub debug: bool,
    /// Namespace allowlist (None = all namespaces)
    pub namespaces: Option<Vec<i32>>,
    /// Bytes read from the file per chunk
    pub chunk_size: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            skip_redirects: true,
            min_paragraph_length: 10,
            debug: false,
            namespaces: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ParserOptions {
    pub fn with_skip_redirects(mut self, skip: bool) -> Self {
        self.skip_redirects = skip;
        self
    }

    pub fn with_min_paragraph_length(mut self, min: usize) -> Self {
        self.min_paragraph_length = min;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set allowed namespaces (None = all namespaces)
    pub fn with_namespaces(mut self, namespaces: Option<Vec<i32>>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Whether pages of namespace `ns` are kept; pages without `<ns>` count as 0
    pub fn allows_namespace(&self, ns: Option<i32>) -> bool {
        match self.namespaces {
            Some(ref allowed) => allowed.contains(&ns.unwrap_or(0)),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParserOptions::default();
        assert!(options.skip_redirects);
        assert_eq!(options.min_paragraph_length, 10);
        assert!(!options.debug);
        assert!(options.allows_namespace(Some(4)));
    }

    #[test]
    fn test_namespace_filter() {
        let options = ParserOptions::default().with_namespaces(Some(vec![0]));
        assert!(options.allows_namespace(Some(0)));
        assert!(options.allows_namespace(None));
        assert!(!options.allows_namespace(Some(1)));
    }

    #[test]
    fn test_partial_toml() {
        let options: ParserOptions = toml::from_str("skip_redirects = false").unwrap();
        assert!(!options.skip_redirects);
        assert_eq!(options.min_paragraph_length, 10);
    }
}
