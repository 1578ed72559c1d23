//! WikiText to plaintext converter
//!
//! Reduces MediaWiki markup to readable prose. This is a best-effort
//! normalizer, not a renderer: markup it does not recognize, and openers that
//! are never closed, are left in the text as written.

use regex_lite::Regex;
use std::sync::OnceLock;

// Lazy-compiled regex patterns
static RE_EXTERNAL_LINK: OnceLock<Regex> = OnceLock::new();
static RE_EXTERNAL_BARE: OnceLock<Regex> = OnceLock::new();
static RE_INTERWIKI_PREFIX: OnceLock<Regex> = OnceLock::new();
static RE_INLINE_TAGS: OnceLock<Regex> = OnceLock::new();
static RE_HORIZONTAL_RULE: OnceLock<Regex> = OnceLock::new();
static RE_LIST: OnceLock<Regex> = OnceLock::new();
static RE_MAGIC_WORDS: OnceLock<Regex> = OnceLock::new();

/// Link namespaces whose links are dropped instead of reduced to text
const DROPPED_LINK_PREFIXES: &[&str] = &[
    "file:",
    "image:",
    "media:",
    "category:",
    "kategorie:",
    "catégorie:",
    "categoría:",
    "datei:",
    "fichier:",
    "archivo:",
];

/// Tags removed together with their content
const BLOCK_TAGS: &[&str] = &["ref", "references", "gallery"];

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static wikitext pattern is valid"))
}

/// WikiText cleaner that converts MediaWiki markup to plain text.
///
/// Tables, category links and file links are always removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WikiTextCleaner;

impl WikiTextCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Clean a whole fragment of wikitext
    pub fn clean(&self, wikitext: &str) -> String {
        let stripped = self.clean_blocks(wikitext);
        self.clean_inline(&stripped)
    }

    /// Remove constructs that may span several lines and blank lines:
    /// comments, references, templates and tables.
    pub fn clean_blocks(&self, text: &str) -> String {
        let mut text = remove_comments(text);

        for tag in BLOCK_TAGS {
            text = remove_tag_blocks(&text, tag);
        }

        text = strip_balanced(&text, "{{", "}}");
        strip_balanced(&text, "{|", "|}")
    }

    /// Reduce line-level markup of a single paragraph to prose
    pub fn clean_inline(&self, text: &str) -> String {
        let mut text = self.process_internal_links(text);
        text = process_external_links(&text);
        text = process_formatting(&text);
        text = regex(&RE_MAGIC_WORDS, r"__[A-Z]+__")
            .replace_all(&text, "")
            .into_owned();
        clean_whitespace(&text)
    }

    /// Process internal links `[[target]]` and `[[target|label]]`
    fn process_internal_links(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '[' || chars.peek() != Some(&'[') {
                result.push(c);
                continue;
            }
            chars.next(); // consume second '['

            // Read until the matching ]]
            let mut link_content = String::new();
            let mut depth = 1;

            while let Some(ch) = chars.next() {
                if ch == '[' && chars.peek() == Some(&'[') {
                    depth += 1;
                    chars.next();
                    link_content.push_str("[[");
                } else if ch == ']' && chars.peek() == Some(&']') {
                    depth -= 1;
                    chars.next();
                    if depth == 0 {
                        break;
                    }
                    link_content.push_str("]]");
                } else {
                    link_content.push(ch);
                }
            }

            if depth > 0 {
                // Never closed
                result.push_str("[[");
                result.push_str(&link_content);
                continue;
            }

            if let Some(display) = self.link_display(&link_content) {
                if display.contains("[[") {
                    result.push_str(&self.process_internal_links(display));
                } else {
                    result.push_str(display);
                }
            }
        }

        result
    }

    /// Visible text of a link, or `None` for links that render nothing inline
    fn link_display<'a>(&self, link: &'a str) -> Option<&'a str> {
        // A leading colon makes category/file links ordinary visible links
        let (link, escaped) = match link.strip_prefix(':') {
            Some(rest) => (rest, true),
            None => (link, false),
        };

        let (target, label) = match link.split_once('|') {
            Some((target, label)) => (target, Some(label)),
            None => (link, None),
        };

        if !escaped {
            let lower = target.trim_start().to_lowercase();
            if DROPPED_LINK_PREFIXES.iter().any(|p| lower.starts_with(p)) {
                return None;
            }

            // Interlanguage links like [[de:Albert Einstein]]
            if let Some((prefix, _)) = target.split_once(':') {
                if regex(&RE_INTERWIKI_PREFIX, r"^[a-z]{2,3}(-[a-z]+)*$").is_match(prefix) {
                    return None;
                }
            }
        }

        match label {
            Some(label) if !label.trim().is_empty() => Some(label),
            _ => Some(target),
        }
    }
}

/// Remove HTML comments; an unterminated comment runs to the end of the text
fn remove_comments(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<!--") {
        result.push_str(&rest[..start]);
        match rest[start + 4..].find("-->") {
            Some(end) => rest = &rest[start + 4 + end + 3..],
            None => return result,
        }
    }
    result.push_str(rest);
    result
}

/// Remove `<tag ...>...</tag>` blocks (tracking nesting) and `<tag .../>`.
///
/// An opening tag that is never closed is kept, along with everything after it.
fn remove_tag_blocks(text: &str, tag: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let open = format!("<{}", tag);
    let close = format!("</{}", tag);

    let mut result = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut outer_start = 0;
    let mut i = 0;

    while i < text.len() {
        let rest = &lower[i..];

        if rest.starts_with(&open) && is_name_end(&rest[open.len()..]) {
            let Some(gt) = rest.find('>') else {
                break;
            };
            if depth == 0 {
                outer_start = i;
            }
            if !rest[..gt].ends_with('/') {
                depth += 1;
            }
            i += gt + 1;
        } else if depth > 0 && rest.starts_with(&close) && is_name_end(&rest[close.len()..]) {
            let Some(gt) = rest.find('>') else {
                break;
            };
            depth -= 1;
            i += gt + 1;
        } else {
            let Some(c) = text[i..].chars().next() else {
                break;
            };
            if depth == 0 {
                result.push(c);
            }
            i += c.len_utf8();
        }
    }

    if depth > 0 {
        result.push_str(&text[outer_start..]);
    } else if i < text.len() {
        result.push_str(&text[i..]);
    }
    result
}

fn is_name_end(rest: &str) -> bool {
    matches!(rest.chars().next(), Some(c) if c == '>' || c == '/' || c.is_whitespace())
}

/// Remove balanced `open ... close` regions, tracking nesting depth.
///
/// A stray `close` at depth 0 is kept; an `open` that is never closed is kept
/// along with everything after it.
fn strip_balanced(text: &str, open: &str, close: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut outer_start = 0;
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with(open) {
            if depth == 0 {
                outer_start = i;
            }
            depth += 1;
            i += open.len();
        } else if depth > 0 && rest.starts_with(close) {
            depth -= 1;
            i += close.len();
        } else {
            let Some(c) = rest.chars().next() else {
                break;
            };
            if depth == 0 {
                result.push(c);
            }
            i += c.len_utf8();
        }
    }

    if depth > 0 {
        result.push_str(&text[outer_start..]);
    }
    result
}

/// Process external links `[url label]` -> label, `[url]` -> url
fn process_external_links(text: &str) -> String {
    let re = regex(
        &RE_EXTERNAL_LINK,
        r"\[(?:https?:)?//[^\s\]]+\s+([^\]]+)\]",
    );
    let result = re.replace_all(text, "$1");

    let re_bare = regex(&RE_EXTERNAL_BARE, r"\[((?:https?:)?//[^\s\]]+)\]");
    re_bare.replace_all(&result, "$1").into_owned()
}

/// Strip quote-run emphasis, inline formatting tags, rules and list markers
fn process_formatting(text: &str) -> String {
    // Longest run first: bold italic, bold, italic
    let mut result = text.replace("'''''", "");
    result = result.replace("'''", "");
    result = result.replace("''", "");

    result = regex(
        &RE_INLINE_TAGS,
        r"(?i)</?(?:small|big|sup|sub|span|div|center|u|s|b|i|em|strong|code|abbr|blockquote|nowiki|poem|br)\b[^>]*>",
    )
    .replace_all(&result, "")
    .into_owned();

    result = result
        .replace("&nbsp;", " ")
        .replace("&ndash;", "\u{2013}")
        .replace("&mdash;", "\u{2014}");

    result = regex(&RE_HORIZONTAL_RULE, r"(?m)^-{4,}\s*$")
        .replace_all(&result, "")
        .into_owned();

    regex(&RE_LIST, r"(?m)^[*#:;]+[ \t]*")
        .replace_all(&result, "")
        .into_owned()
}

/// Collapse whitespace runs, drop empty lines and trim
fn clean_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let mut words = line.split_whitespace().peekable();
        if words.peek().is_none() {
            continue;
        }
        if !result.is_empty() {
            result.push('\n');
        }
        for (i, word) in words.enumerate() {
            if i > 0 {
                result.push(' ');
            }
            result.push_str(word);
        }
    }

    result
}

/// Split text into paragraphs on blank lines (empty or whitespace-only)
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_bold_italic() {
        let cleaner = WikiTextCleaner::new();
        let result = cleaner.clean("This is '''bold''' and ''italic'' and '''''both'''''.");
        assert_eq!(result, "This is bold and italic and both.");
    }

    #[test]
    fn test_internal_links() {
        let cleaner = WikiTextCleaner::new();
        assert_eq!(
            cleaner.clean("The [[United States]] is a country."),
            "The United States is a country."
        );
        assert_eq!(
            cleaner.clean("The [[United States|US]] is a country."),
            "The US is a country."
        );
        assert_eq!(cleaner.clean("Many [[bus]]es."), "Many buses.");
        assert_eq!(cleaner.clean("[[Paris (France)|]] is big"), "Paris (France) is big");
    }

    #[test]
    fn test_unclosed_link_is_literal() {
        let cleaner = WikiTextCleaner::new();
        assert_eq!(cleaner.clean("Broken [[link here"), "Broken [[link here");
    }

    #[test]
    fn test_nested_templates() {
        let cleaner = WikiTextCleaner::new();
        assert_eq!(cleaner.clean("{{cite|{{nested}}}}Hello world"), "Hello world");
        assert_eq!(
            cleaner.clean("A {{a|{{b|{{c}}}}|d}} B"),
            "A B"
        );
    }

    #[test]
    fn test_unclosed_template_is_literal() {
        let cleaner = WikiTextCleaner::new();
        assert_eq!(cleaner.clean("Before {{open|x"), "Before {{open|x");
        assert_eq!(cleaner.clean("Stray }} close"), "Stray }} close");
    }

    #[test]
    fn test_references() {
        let cleaner = WikiTextCleaner::new();
        assert_eq!(
            cleaner.clean("Claim<ref name=\"a\">{{cite web|url=x}}</ref> here.<ref name=\"a\" /> Done."),
            "Claim here. Done."
        );
        assert_eq!(cleaner.clean("Keep <reflist> tag"), "Keep <reflist> tag");
        assert_eq!(cleaner.clean("Open <ref>never closed"), "Open <ref>never closed");
    }

    #[test]
    fn test_comments() {
        let cleaner = WikiTextCleaner::new();
        assert_eq!(cleaner.clean("Visible<!-- hidden -->text"), "Visibletext");
        assert_eq!(cleaner.clean("Visible <!-- runs to the end"), "Visible");
    }

    #[test]
    fn test_remove_categories_files_interwiki() {
        let cleaner = WikiTextCleaner::new();
        let result = cleaner.clean(
            "Content [[Category:Test]] more [[File:X.jpg|thumb|A [[caption]] here]] end [[de:Test]] [[:Category:Shown]]",
        );
        assert_eq!(result, "Content more end Category:Shown");
    }

    #[test]
    fn test_external_links() {
        let cleaner = WikiTextCleaner::new();
        assert_eq!(
            cleaner.clean("See [https://example.org the site] or [http://example.com]."),
            "See the site or http://example.com."
        );
    }

    #[test]
    fn test_remove_tables() {
        let cleaner = WikiTextCleaner::new();
        let result = cleaner.clean("Before {| class=\"wikitable\"\n|-\n| {{flag|X}} cell\n|} After");
        assert!(result.contains("Before"));
        assert!(result.contains("After"));
        assert!(!result.contains("wikitable"));
        assert!(!result.contains("cell"));
    }

    #[test]
    fn test_lists_and_tags() {
        let cleaner = WikiTextCleaner::new();
        let result = cleaner.clean("* First <small>item</small>\n** Second&nbsp;item<br />\n__NOTOC__");
        assert_eq!(result, "First item\nSecond item");
    }

    #[test]
    fn test_unknown_markup_is_kept() {
        let cleaner = WikiTextCleaner::new();
        assert_eq!(
            cleaner.clean("Formula <math>x^2</math> stays"),
            "Formula <math>x^2</math> stays"
        );
    }

    #[test]
    fn test_split_paragraphs() {
        let paragraphs = split_paragraphs("One\nstill one\n\n\n  \nTwo\n\nThree\n");
        assert_eq!(paragraphs, vec!["One\nstill one", "Two", "Three"]);
        assert!(split_paragraphs("\n \n").is_empty());
    }

    #[test]
    fn test_complex_wikitext() {
        let cleaner = WikiTextCleaner::new();
        let wikitext = r#"
'''Albert Einstein''' (14 March 1879 – 18 April 1955) was a German-born [[theoretical physicist]].

He developed the [[theory of relativity]]<ref>{{cite book|title=Einstein}}</ref>, one of the two pillars of [[modern physics]].

{{Infobox scientist
| name = Albert Einstein

| birth_date = 14 March 1879
}}

[[Category:Physicists]]
[[de:Albert Einstein]]
"#;

        let result = cleaner.clean(wikitext);

        assert!(result.contains("Albert Einstein"));
        assert!(result.contains("theoretical physicist"));
        assert!(result.contains("theory of relativity, one of"));

        assert!(!result.contains("'''"));
        assert!(!result.contains("[["));
        assert!(!result.contains("{{"));
        assert!(!result.contains("<ref>"));
        assert!(!result.contains("Category:"));
        assert!(!result.contains("de:"));
        assert!(!result.contains("birth_date"));
    }
}
