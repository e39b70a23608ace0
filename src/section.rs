//! Delimiter Sectioner
//!
//! Splits raw text into named blocks for one open/close marker pair:
//!
//! ```text
//! <!-- + define "Card" --> ...body... <!-- + end -->
//! ```
//!
//! The same scanner runs at three levels with three vocabularies (file-level
//! `imports`, component-level `define`s, and the `props`/`html` sub-blocks of
//! a component), so the outer structure never needs a bespoke parser. Markers
//! of other vocabularies are plain text to a given scanner.

use crate::config::Delimiters;
use crate::error::line_at_offset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    /// Raw text between the `define` marker and its `end` marker.
    pub body: String,
    /// 1-based line of the `define` marker.
    pub line: u32,
}

/// Blocks of one level, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    blocks: Vec<Section>,
}

impl Sections {
    pub fn get(&self, name: &str) -> Option<&Section> {
        self.blocks.iter().find(|s| s.name == name)
    }

    pub fn body(&self, name: &str) -> Option<&str> {
        self.get(name).map(|s| s.body.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.blocks.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.blocks.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionError {
    pub message: String,
    /// 1-based line the error is reported at.
    pub line: u32,
}

impl SectionError {
    fn new(message: impl Into<String>, line: u32) -> Self {
        SectionError {
            message: message.into(),
            line,
        }
    }
}

enum Action {
    Define(String),
    End,
}

fn parse_action(action: &str) -> Option<Action> {
    let action = action.trim();
    if action == "end" {
        return Some(Action::End);
    }
    let rest = action.strip_prefix("define")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let quoted = rest.trim();
    let name = quoted.strip_prefix('"')?.strip_suffix('"')?;
    if name.is_empty() || name.contains('"') {
        return None;
    }
    Some(Action::Define(name.to_string()))
}

/// Extract every `define "name" … end` block delimited by `delims` from `text`.
pub fn sectionize(delims: &Delimiters, text: &str) -> Result<Sections, SectionError> {
    let mut sections = Sections::default();
    // (name, line, body start offset)
    let mut open: Option<(String, u32, usize)> = None;
    let mut pos = 0;

    while let Some(rel) = text[pos..].find(&delims.open) {
        let marker_start = pos + rel;
        let action_start = marker_start + delims.open.len();
        let line = line_at_offset(text, marker_start);

        let Some(close_rel) = text[action_start..].find(&delims.close) else {
            return Err(SectionError::new(
                format!("unterminated marker {:?}: missing {:?}", delims.open, delims.close),
                line,
            ));
        };
        let action_end = action_start + close_rel;
        let marker_end = action_end + delims.close.len();

        match parse_action(&text[action_start..action_end]) {
            Some(Action::Define(name)) => {
                if let Some((outer, outer_line, _)) = &open {
                    return Err(SectionError::new(
                        format!(
                            "define {:?} is not closed before define {:?} on line {}",
                            outer, name, line
                        ),
                        *outer_line,
                    ));
                }
                open = Some((name, line, marker_end));
            }
            Some(Action::End) => {
                let Some((name, define_line, body_start)) = open.take() else {
                    return Err(SectionError::new(
                        format!("unexpected {} end{} with no open block", delims.open, delims.close),
                        line,
                    ));
                };
                if sections.get(&name).is_some() {
                    return Err(SectionError::new(
                        format!("block {:?} is defined more than once", name),
                        define_line,
                    ));
                }
                sections.blocks.push(Section {
                    name,
                    body: text[body_start..marker_start].to_string(),
                    line: define_line,
                });
            }
            None => {
                return Err(SectionError::new(
                    format!(
                        "unknown action {:?} (expected `define \"name\"` or `end`)",
                        text[action_start..action_end].trim()
                    ),
                    line,
                ));
            }
        }

        pos = marker_end;
    }

    if let Some((name, line, _)) = open {
        return Err(SectionError::new(
            format!(
                "define {:?} has no matching {} end{}",
                name, delims.open, delims.close
            ),
            line,
        ));
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelimiterSet;

    fn component() -> Delimiters {
        DelimiterSet::default().component
    }

    #[test]
    fn test_extracts_blocks_in_order() {
        let text = "intro\n<!-- + define \"B\" -->content B<!-- + end -->\n<!-- + define \"A\" -->\ncontent A\n<!-- + end -->";
        let sections = sectionize(&component(), text).unwrap();
        assert_eq!(sections.names(), vec!["B", "A"]);
        assert_eq!(sections.body("B"), Some("content B"));
        assert_eq!(sections.body("A"), Some("\ncontent A\n"));
        assert_eq!(sections.get("A").unwrap().line, 3);
    }

    #[test]
    fn test_other_vocabularies_are_plain_text() {
        let text = "<!-- + define \"Card\" --><!-- | define \"html\" --><p>x</p><!-- | end --><!-- + end -->";
        let outer = sectionize(&component(), text).unwrap();
        let body = outer.body("Card").unwrap();
        assert_eq!(body, "<!-- | define \"html\" --><p>x</p><!-- | end -->");

        let inner = sectionize(&DelimiterSet::default().block, body).unwrap();
        assert_eq!(inner.body("html"), Some("<p>x</p>"));
    }

    #[test]
    fn test_plain_html_comments_are_ignored() {
        let text = "<!-- just a comment -->\n<!-- + define \"A\" --><!-- inner --><!-- + end -->";
        let sections = sectionize(&component(), text).unwrap();
        assert_eq!(sections.body("A"), Some("<!-- inner -->"));
    }

    #[test]
    fn test_unmatched_define_reports_its_line() {
        let text = "<!-- + define \"A\" -->a<!-- + end -->\n\n<!-- + define \"B\" -->\nno end here";
        let err = sectionize(&component(), text).unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("\"B\""));
    }

    #[test]
    fn test_nested_define_reports_the_unclosed_one() {
        let text = "<!-- + define \"A\" -->\n<!-- + define \"B\" -->b<!-- + end -->";
        let err = sectionize(&component(), text).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("\"A\""));
    }

    #[test]
    fn test_stray_end() {
        let err = sectionize(&component(), "x\n<!-- + end -->").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("no open block"));
    }

    #[test]
    fn test_duplicate_name_at_same_level() {
        let text = "<!-- + define \"A\" -->1<!-- + end -->\n<!-- + define \"A\" -->2<!-- + end -->";
        let err = sectionize(&component(), text).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("more than once"));
    }

    #[test]
    fn test_unknown_action_and_unterminated_marker() {
        let err = sectionize(&component(), "<!-- + if .X -->").unwrap_err();
        assert!(err.message.contains("unknown action"));

        let err = sectionize(&component(), "<!-- + define \"A\"").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_custom_delimiters() {
        let delims = Delimiters::new("{{%", "%}}");
        let sections = sectionize(&delims, "{{% define \"x\" %}}body{{% end %}}").unwrap();
        assert_eq!(sections.body("x"), Some("body"));
    }
}
