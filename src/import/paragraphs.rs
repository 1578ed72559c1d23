//! Paragraph extraction from page sections

use super::source::{Section, WikipediaParagraph};
use super::wikitext::{split_paragraphs, WikiTextCleaner};

/// Turns sections into cleaned, length-filtered, numbered paragraphs
#[derive(Debug, Clone)]
pub struct ParagraphExtractor {
    cleaner: WikiTextCleaner,
    min_length: usize,
}

impl ParagraphExtractor {
    pub fn new(min_length: usize) -> Self {
        Self {
            cleaner: WikiTextCleaner::new(),
            min_length,
        }
    }

    /// Cleaned paragraph texts of a section, in order.
    ///
    /// Paragraphs that clean to nothing or are shorter than the minimum length
    /// (in characters) are dropped.
    pub fn paragraphs(&self, content: &str) -> Vec<String> {
        let stripped = self.cleaner.clean_blocks(content);

        split_paragraphs(&stripped)
            .iter()
            .map(|candidate| self.cleaner.clean_inline(candidate))
            .filter(|cleaned| !cleaned.is_empty() && cleaned.chars().count() >= self.min_length)
            .collect()
    }

    /// Build the paragraph records of one section, numbered from `first_position`.
    ///
    /// Positions count emitted paragraphs only, so they stay gapless. A page
    /// repeating a heading continues the numbering of the earlier section.
    pub fn extract(
        &self,
        article_title: &str,
        article_id: &str,
        section: &Section,
        first_position: usize,
    ) -> Vec<WikipediaParagraph> {
        self.paragraphs(&section.content)
            .into_iter()
            .enumerate()
            .map(|(offset, content)| WikipediaParagraph {
                article_title: article_title.to_string(),
                article_id: article_id.to_string(),
                section_name: section.name.clone(),
                paragraph_position: first_position + offset,
                content,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, content: &str) -> Section {
        Section {
            name: name.to_string(),
            level: 2,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_min_length_boundary() {
        let extractor = ParagraphExtractor::new(10);
        let paragraphs = extractor.paragraphs("Abcdefghi\n\nAbcdefghij\n\n  '''Abcdefghi'''  ");
        assert_eq!(paragraphs, vec!["Abcdefghij"]);
    }

    #[test]
    fn test_min_length_counts_characters() {
        // 10 characters, 20 bytes
        let extractor = ParagraphExtractor::new(10);
        assert_eq!(extractor.paragraphs("ééééééééé"), Vec::<String>::new());
        assert_eq!(extractor.paragraphs("éééééééééé").len(), 1);
    }

    #[test]
    fn test_nested_template_paragraph() {
        let extractor = ParagraphExtractor::new(5);
        assert_eq!(
            extractor.paragraphs("{{cite|{{nested}}}}Hello world"),
            vec!["Hello world"]
        );
    }

    #[test]
    fn test_positions_skip_dropped_paragraphs() {
        let extractor = ParagraphExtractor::new(10);
        let content = "First paragraph text.\n\nshort\n\n{{only a template}}\n\nSecond paragraph text.";
        let records = extractor.extract("Title", "1", &section("History", content), 0);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].paragraph_position, 0);
        assert_eq!(records[0].content, "First paragraph text.");
        assert_eq!(records[1].paragraph_position, 1);
        assert_eq!(records[1].content, "Second paragraph text.");
        assert!(records.iter().all(|r| r.section_name == "History" && r.article_id == "1"));
    }

    #[test]
    fn test_multiline_template_does_not_leak() {
        let extractor = ParagraphExtractor::new(5);
        let content = "{{Infobox\n| a = 1\n\n| b = 2\n}}\nThe actual prose.";
        assert_eq!(extractor.paragraphs(content), vec!["The actual prose."]);
    }

    #[test]
    fn test_numbering_continues_from_offset() {
        let extractor = ParagraphExtractor::new(10);
        let records = extractor.extract(
            "Title",
            "1",
            &section("Reception", "Later reviews were mixed.\n\nSales kept growing."),
            2,
        );
        let positions: Vec<_> = records.iter().map(|r| r.paragraph_position).collect();
        assert_eq!(positions, vec![2, 3]);
    }

    #[test]
    fn test_empty_after_cleaning_is_dropped_at_zero_minimum() {
        let extractor = ParagraphExtractor::new(0);
        let content = "Real prose.\n\n[[Category:Things]]\n\n{{stub}}";
        assert_eq!(extractor.paragraphs(content), vec!["Real prose."]);
    }
}
