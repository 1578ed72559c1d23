//! Section segmentation of page wikitext by heading lines

use super::source::Section;

/// Deepest heading level MediaWiki renders
const MAX_HEADING_LEVEL: usize = 6;

/// Split wikitext into sections in document order.
///
/// Text before the first heading becomes the lead section (level 0) if it has
/// any non-whitespace content.
pub fn split_sections(wikitext: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<(String, u8)> = None;
    let mut content = String::new();

    for line in wikitext.lines() {
        if let Some((name, level)) = parse_heading(line) {
            push_section(&mut sections, current.take(), &mut content);
            current = Some((name.to_string(), level));
        } else {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(line);
        }
    }
    push_section(&mut sections, current, &mut content);

    sections
}

fn push_section(sections: &mut Vec<Section>, heading: Option<(String, u8)>, content: &mut String) {
    let content = std::mem::take(content);
    match heading {
        Some((name, level)) => sections.push(Section {
            name,
            level,
            content,
        }),
        None if !content.trim().is_empty() => sections.push(Section::lead(content)),
        None => {}
    }
}

/// Recognize `== Name ==` style headings.
///
/// Marker counts must match on both sides and lie in 2..=6; anything else is
/// plain text. Comments after the closing markers are ignored.
pub fn parse_heading(line: &str) -> Option<(&str, u8)> {
    let line = strip_trailing_comments(line);
    let leading = line.len() - line.trim_start_matches('=').len();
    if !(2..=MAX_HEADING_LEVEL).contains(&leading) {
        return None;
    }

    let trailing = line.len() - line.trim_end_matches('=').len();
    // A line made only of '=' has no name
    if trailing != leading || leading + trailing >= line.len() {
        return None;
    }

    let name = line[leading..line.len() - trailing].trim();
    if name.is_empty() {
        return None;
    }
    Some((name, leading as u8))
}

/// `== Name == <!-- note -->` -> `== Name ==`
fn strip_trailing_comments(line: &str) -> &str {
    let mut line = line.trim_end();
    while line.ends_with("-->") {
        match line.rfind("<!--") {
            Some(start) => line = line[..start].trim_end(),
            None => break,
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_and_sections() {
        let text = "Lead paragraph.\n\n== History ==\nEarly days.\n\n=== Origins ===\nBefore that.\n== See also ==\n";
        let sections = split_sections(text);

        assert_eq!(sections.len(), 4);
        assert!(sections[0].is_lead());
        assert_eq!(sections[0].content, "Lead paragraph.\n");
        assert_eq!(sections[1].name, "History");
        assert_eq!(sections[1].level, 2);
        assert_eq!(sections[1].content, "Early days.\n");
        assert_eq!(sections[2].name, "Origins");
        assert_eq!(sections[2].level, 3);
        assert_eq!(sections[3].name, "See also");
        assert_eq!(sections[3].content, "");
    }

    #[test]
    fn test_no_lead_when_text_starts_with_heading() {
        let sections = split_sections("\n\n==Only==\nBody");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Only");
        assert_eq!(sections[0].content, "Body");
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(parse_heading("== A =="), Some(("A", 2)));
        assert_eq!(parse_heading("====== Deep ======"), Some(("Deep", 6)));
        assert_eq!(parse_heading("===Tight===  "), Some(("Tight", 3)));
    }

    #[test]
    fn test_mismatched_markers_are_text() {
        assert_eq!(parse_heading("== Broken ==="), None);
        assert_eq!(parse_heading("=== Broken =="), None);
        assert_eq!(parse_heading("= Level one ="), None);
        assert_eq!(parse_heading("======= Seven ======="), None);
        assert_eq!(parse_heading("===="), None);
        assert_eq!(parse_heading("==  =="), None);
        assert_eq!(parse_heading("a == b =="), None);

        let sections = split_sections("Intro\n== Broken ===\nmore");
        assert_eq!(sections.len(), 1);
        assert!(sections[0].content.contains("== Broken ==="));
    }

    #[test]
    fn test_redirect_page_is_single_lead() {
        let sections = split_sections("#REDIRECT [[Computer accessibility]]");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].level, 0);
    }

    #[test]
    fn test_heading_with_trailing_comment() {
        assert_eq!(
            parse_heading("== History == <!-- see talk -->"),
            Some(("History", 2))
        );
        assert_eq!(parse_heading("=== Later ===<!-- a --><!-- b -->  "), Some(("Later", 3)));
        assert_eq!(parse_heading("<!-- only a comment -->"), None);

        let sections =
            split_sections("Lead paragraph text.\n== History == <!-- see talk -->\nHistory paragraph text.");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].content, "Lead paragraph text.");
        assert_eq!(sections[1].name, "History");
        assert_eq!(sections[1].content, "History paragraph text.");
    }
}
