/// Extracts `[label]: destination "title"` definitions from the start of a paragraph
use crate::definitions::LinkReferenceDefinition;
use crate::escaping::{normalize_label, unescape_string};
use crate::inline::link_scanner::{scan_link_destination, scan_link_label_content, scan_link_title_content};
use crate::scanner::{END, Scanner};
use crate::source::{SourceLine, SourceLines, SourceSpan};

const MAX_LABEL_LENGTH: usize = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StartDefinition,
    Label,
    Destination,
    StartTitle,
    Title,
    /// Ordinary paragraph text; nothing more is parsed.
    Paragraph,
}

#[derive(Debug)]
pub(crate) struct LinkReferenceDefinitionParser {
    state: State,
    paragraph_lines: SourceLines,
    definitions: Vec<LinkReferenceDefinition>,
    source_spans: Vec<SourceSpan>,
    label: String,
    normalized_label: String,
    destination: String,
    title_delimiter: char,
    /// Title text while its closing delimiter has not been seen.
    title_buffer: String,
    title: Option<String>,
    reference_valid: bool,
}

impl LinkReferenceDefinitionParser {
    pub(crate) fn new() -> Self {
        LinkReferenceDefinitionParser {
            state: State::StartDefinition,
            paragraph_lines: SourceLines::empty(),
            definitions: Vec::new(),
            source_spans: Vec::new(),
            label: String::new(),
            normalized_label: String::new(),
            destination: String::new(),
            title_delimiter: END,
            title_buffer: String::new(),
            title: None,
            reference_valid: false,
        }
    }

    pub(crate) fn parse(&mut self, line: SourceLine) {
        self.paragraph_lines.add_line(line.clone());
        if self.state == State::Paragraph {
            return;
        }

        let lines = [line];
        let mut scanner = Scanner::new(&lines);
        while scanner.has_next() {
            let success = match self.state {
                State::StartDefinition => self.start_definition(&mut scanner),
                State::Label => self.label(&mut scanner),
                State::Destination => self.destination(&mut scanner),
                State::StartTitle => self.start_title(&mut scanner),
                State::Title => self.title(&mut scanner),
                State::Paragraph => true,
            };
            if !success {
                self.state = State::Paragraph;
                // A reference confirmed before the failing title is still valid.
                // It has to be finished before this line's span is added.
                self.finish_reference();
                return;
            }
        }
    }

    pub(crate) fn add_source_span(&mut self, span: SourceSpan) {
        self.source_spans.push(span);
    }

    /// Lines not consumed by definitions.
    pub(crate) fn paragraph_lines(&self) -> &SourceLines {
        &self.paragraph_lines
    }

    pub(crate) fn paragraph_source_spans(&self) -> &[SourceSpan] {
        &self.source_spans
    }

    pub(crate) fn take_definitions(&mut self) -> Vec<LinkReferenceDefinition> {
        self.finish_reference();
        std::mem::take(&mut self.definitions)
    }

    fn start_definition(&mut self, scanner: &mut Scanner<'_>) -> bool {
        // Finishing here rather than earlier lets the previous line's span land on the definition.
        self.finish_reference();

        scanner.whitespace();
        if !scanner.advance_if('[') {
            return false;
        }
        self.state = State::Label;
        self.label.clear();
        if !scanner.has_next() {
            self.label.push('\n');
        }
        true
    }

    fn label(&mut self, scanner: &mut Scanner<'_>) -> bool {
        let start = scanner.position();
        if !scan_link_label_content(scanner) {
            return false;
        }
        self.label
            .push_str(&scanner.source(start, scanner.position()).content());

        if !scanner.has_next() {
            // The label may continue on the next line.
            self.label.push('\n');
            true
        } else if scanner.advance_if(']') {
            if !scanner.advance_if(':') {
                return false;
            }
            if self.label.chars().count() > MAX_LABEL_LENGTH {
                return false;
            }
            let normalized = normalize_label(&self.label);
            if normalized.is_empty() {
                return false;
            }
            self.normalized_label = normalized;
            self.state = State::Destination;
            scanner.whitespace();
            true
        } else {
            false
        }
    }

    fn destination(&mut self, scanner: &mut Scanner<'_>) -> bool {
        scanner.whitespace();
        let start = scanner.position();
        if !scan_link_destination(scanner) {
            return false;
        }

        let raw = scanner.source(start, scanner.position()).content();
        self.destination = if raw.len() >= 2 && raw.starts_with('<') && raw.ends_with('>') {
            raw[1..raw.len() - 1].to_string()
        } else {
            raw
        };

        let whitespace = scanner.whitespace();
        if !scanner.has_next() {
            // Destination ends the line, so the definition is valid with or without a title.
            self.reference_valid = true;
            self.paragraph_lines.clear();
        } else if whitespace == 0 {
            // A title must be separated from the destination by whitespace.
            return false;
        }

        self.state = State::StartTitle;
        true
    }

    fn start_title(&mut self, scanner: &mut Scanner<'_>) -> bool {
        scanner.whitespace();
        if !scanner.has_next() {
            self.state = State::StartDefinition;
            return true;
        }

        self.title_delimiter = match scanner.peek() {
            '"' => '"',
            '\'' => '\'',
            '(' => ')',
            _ => END,
        };
        if self.title_delimiter != END {
            self.state = State::Title;
            self.title_buffer.clear();
            scanner.advance();
            if !scanner.has_next() {
                self.title_buffer.push('\n');
            }
        } else {
            // Not a title; the same character may start another definition.
            self.state = State::StartDefinition;
        }
        true
    }

    fn title(&mut self, scanner: &mut Scanner<'_>) -> bool {
        let start = scanner.position();
        if !scan_link_title_content(scanner, self.title_delimiter) {
            return false;
        }
        self.title_buffer
            .push_str(&scanner.source(start, scanner.position()).content());

        if !scanner.has_next() {
            // The title continues on the next line.
            self.title_buffer.push('\n');
            return true;
        }

        // Closing delimiter; only whitespace may follow it.
        scanner.advance();
        scanner.whitespace();
        if scanner.has_next() {
            return false;
        }
        self.title = Some(std::mem::take(&mut self.title_buffer));
        self.reference_valid = true;
        self.paragraph_lines.clear();
        self.state = State::StartDefinition;
        true
    }

    fn finish_reference(&mut self) {
        if !self.reference_valid {
            return;
        }
        self.reference_valid = false;

        let definition = LinkReferenceDefinition {
            label: std::mem::take(&mut self.normalized_label),
            destination: unescape_string(&self.destination).into_owned(),
            title: self.title.take().map(|t| unescape_string(&t).into_owned()),
            source_spans: std::mem::take(&mut self.source_spans),
        };
        self.definitions.push(definition);
        self.label.clear();
        self.destination.clear();
        self.title_buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(lines: &[&str]) -> LinkReferenceDefinitionParser {
        let mut parser = LinkReferenceDefinitionParser::new();
        for line in lines {
            parser.parse(SourceLine::new(*line, None));
        }
        parser
    }

    fn summary(parser: &mut LinkReferenceDefinitionParser) -> Vec<(String, String, Option<String>)> {
        parser
            .take_definitions()
            .into_iter()
            .map(|d| (d.label, d.destination, d.title))
            .collect()
    }

    #[test]
    fn stacked_definitions_leave_no_paragraph() {
        let mut parser = parse(&["[a]: /a", "[b]: /b 'B'"]);
        assert_eq!(
            summary(&mut parser),
            vec![
                ("a".to_string(), "/a".to_string(), None),
                ("b".to_string(), "/b".to_string(), Some("B".to_string())),
            ]
        );
        assert!(parser.paragraph_lines().is_empty());
    }

    #[test]
    fn title_on_next_line() {
        let mut parser = parse(&["[foo]: <bar baz>", "  \"the\\\" title\""]);
        assert_eq!(
            summary(&mut parser),
            vec![(
                "foo".to_string(),
                "bar baz".to_string(),
                Some("the\" title".to_string())
            )]
        );
    }

    #[test]
    fn trailing_text_after_title_keeps_definition_without_title() {
        let mut parser = parse(&["[foo]: /url", "\"title\" ok"]);
        assert_eq!(
            summary(&mut parser),
            vec![("foo".to_string(), "/url".to_string(), None)]
        );
        assert_eq!(parser.paragraph_lines().content(), "\"title\" ok");
    }

    #[test]
    fn unclosed_title_is_not_used() {
        let mut parser = parse(&["[foo]: /url", "'title"]);
        assert_eq!(
            summary(&mut parser),
            vec![("foo".to_string(), "/url".to_string(), None)]
        );
        assert_eq!(parser.paragraph_lines().content(), "'title");
    }

    #[test]
    fn missing_colon_is_paragraph() {
        let mut parser = parse(&["[foo] /url"]);
        assert!(summary(&mut parser).is_empty());
        assert_eq!(parser.paragraph_lines().content(), "[foo] /url");
    }

    #[test]
    fn label_over_limit_is_rejected() {
        let line = format!("[{}]: /url", "a".repeat(1000));
        let mut parser = parse(&[&line]);
        assert!(summary(&mut parser).is_empty());
    }

    #[test]
    fn blank_label_is_rejected() {
        let mut parser = parse(&["[  ]: /url"]);
        assert!(summary(&mut parser).is_empty());
    }
}
