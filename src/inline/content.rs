/// Built-in inline content parsers: escapes, code spans, entities, autolinks and raw HTML
use super::{ExhaustedScans, InlineContentParser, InlineParserState, ParsedInline};
use crate::chars::is_escapable;
use crate::escaping::entity_to_string;
use crate::node::NodeValue;
use crate::scanner::{Position, Scanner};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// In the order they are tried for a shared trigger character.
pub(crate) fn built_in() -> Vec<Arc<dyn InlineContentParser>> {
    vec![
        Arc::new(BackslashParser),
        Arc::new(BackticksParser),
        Arc::new(EntityParser),
        Arc::new(AutolinkParser),
        Arc::new(HtmlInlineParser),
    ]
}

/// `\` before punctuation escapes it; before a line end it is a hard break.
struct BackslashParser;

impl InlineContentParser for BackslashParser {
    fn trigger_characters(&self) -> &[char] {
        &['\\']
    }

    fn try_parse(&self, state: &mut InlineParserState<'_, '_>) -> Option<ParsedInline> {
        let scanner = state.scanner();
        scanner.advance();
        let next = scanner.peek();
        let value = if next == '\n' {
            scanner.advance();
            NodeValue::HardLineBreak
        } else if is_escapable(next) {
            scanner.advance();
            NodeValue::text(next.to_string())
        } else {
            NodeValue::text("\\")
        };
        let position = scanner.position();
        let node = state.tree().create(value);
        Some(ParsedInline::of(node, position))
    }
}

/// A code span closes with a backtick run of exactly the opening length.
struct BackticksParser;

impl InlineContentParser for BackticksParser {
    fn trigger_characters(&self) -> &[char] {
        &['`']
    }

    fn try_parse(&self, state: &mut InlineParserState<'_, '_>) -> Option<ParsedInline> {
        let scanner = state.scanner();
        let start = scanner.position();
        let opening_ticks = scanner.match_multiple('`');
        let after_opening = scanner.position();

        while scanner.find('`').is_some() {
            let before_closing = scanner.position();
            if scanner.match_multiple('`') != opening_ticks {
                continue;
            }
            let position = scanner.position();
            let mut content = scanner.source(after_opening, before_closing).content().replace('\n', " ");
            if content.len() >= 3
                && content.starts_with(' ')
                && content.ends_with(' ')
                && content.contains(|c| c != ' ')
            {
                content = content[1..content.len() - 1].to_string();
            }
            let node = state.tree().create(NodeValue::Code { literal: content });
            return Some(ParsedInline::of(node, position));
        }

        // No matching closer: the opening run is literal text.
        let source = scanner.source(start, after_opening);
        let node = state.text(source.content(), &source);
        Some(ParsedInline::of(node, after_opening))
    }
}

/// `&name;`, `&#123;` and `&#x1F;` character references.
struct EntityParser;

impl InlineContentParser for EntityParser {
    fn trigger_characters(&self) -> &[char] {
        &['&']
    }

    fn try_parse(&self, state: &mut InlineParserState<'_, '_>) -> Option<ParsedInline> {
        let scanner = state.scanner();
        let start = scanner.position();
        scanner.advance();

        let terminated = if scanner.advance_if('#') {
            let digits = if scanner.advance_if('x') || scanner.advance_if('X') {
                (scanner.match_while(|c| c.is_ascii_hexdigit()), 6)
            } else {
                (scanner.match_while(|c| c.is_ascii_digit()), 7)
            };
            let (count, max) = digits;
            (1..=max).contains(&count) && scanner.advance_if(';')
        } else if scanner.peek().is_ascii_alphanumeric() {
            scanner.match_while(|c| c.is_ascii_alphanumeric());
            scanner.advance_if(';')
        } else {
            false
        };
        if !terminated {
            return None;
        }

        let position = scanner.position();
        let text = scanner.source(start, position).content();
        let node = state.tree().create(NodeValue::text(entity_to_string(&text)));
        Some(ParsedInline::of(node, position))
    }
}

static URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9.+-]{1,31}:[^<>\x00-\x20]*$").expect("URI pattern should compile")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern should compile")
});

/// `<scheme:...>` and `<user@host>`.
struct AutolinkParser;

impl InlineContentParser for AutolinkParser {
    fn trigger_characters(&self) -> &[char] {
        &['<']
    }

    fn try_parse(&self, state: &mut InlineParserState<'_, '_>) -> Option<ParsedInline> {
        let scanner = state.scanner();
        scanner.advance();
        let text_start = scanner.position();
        // Neither kind of autolink contains `<`, whitespace or control characters.
        let content_end = scanner
            .find_matching(|c| c == '>' || c == '<' || c.is_ascii_whitespace() || c.is_ascii_control());
        if content_end.is_none_or(|skipped| skipped == 0) || scanner.peek() != '>' {
            return None;
        }
        let source = scanner.source(text_start, scanner.position());
        let content = source.content();
        scanner.advance();
        let position = scanner.position();

        let destination = if URI.is_match(&content) {
            content.clone()
        } else if EMAIL.is_match(&content) {
            format!("mailto:{content}")
        } else {
            return None;
        };

        let text = state.text(content, &source);
        let tree = state.tree();
        let link = tree.create(NodeValue::Link {
            destination,
            title: None,
        });
        tree.append_child(link, text);
        Some(ParsedInline::of(link, position))
    }
}

fn is_tag_name_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_tag_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

fn is_attribute_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

fn is_attribute_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')
}

fn is_attribute_value_end(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\n' | '\u{b}' | '\u{c}' | '\r' | '"' | '\'' | '=' | '<' | '>' | '`'
    )
}

/// Open and closing tags, comments, processing instructions, declarations and CDATA.
struct HtmlInlineParser;

impl InlineContentParser for HtmlInlineParser {
    fn trigger_characters(&self) -> &[char] {
        &['<']
    }

    fn try_parse(&self, state: &mut InlineParserState<'_, '_>) -> Option<ParsedInline> {
        let scanner = &mut *state.scanner;
        let exhausted = &mut *state.exhausted;
        let start = scanner.position();
        scanner.advance();

        let matched = match scanner.peek() {
            c if is_tag_name_start(c) => try_open_tag(scanner, exhausted),
            '/' => try_closing_tag(scanner),
            '?' => try_processing_instruction(scanner, exhausted),
            '!' => {
                scanner.advance();
                match scanner.peek() {
                    '-' => try_comment(scanner, exhausted),
                    '[' => try_cdata(scanner, exhausted),
                    c if c.is_ascii_alphabetic() => try_declaration(scanner, exhausted),
                    _ => false,
                }
            }
            _ => false,
        };
        if !matched {
            return None;
        }
        Some(html_inline(state, start))
    }
}

fn html_inline(state: &mut InlineParserState<'_, '_>, start: Position) -> ParsedInline {
    let scanner = state.scanner();
    let position = scanner.position();
    let literal = scanner.source(start, position).content();
    let node = state.tree().create(NodeValue::HtmlInline { literal });
    ParsedInline::of(node, position)
}

/// Move past the next `terminator`. Fails at once when an earlier search
/// from this position or before already reached the end of the block.
fn scan_past(scanner: &mut Scanner<'_>, exhausted: &mut ExhaustedScans, terminator: &'static str) -> bool {
    let from = scanner.position();
    if exhausted.contains(terminator, from) {
        return false;
    }
    let Some(first) = terminator.chars().next() else {
        return true;
    };
    while scanner.find(first).is_some() {
        if scanner.advance_if_str(terminator) {
            return true;
        }
        scanner.advance();
    }
    exhausted.insert(terminator, from);
    false
}

fn try_open_tag(scanner: &mut Scanner<'_>, exhausted: &mut ExhaustedScans) -> bool {
    scanner.advance();
    scanner.match_while(is_tag_name_continue);
    let mut whitespace = scanner.whitespace() >= 1;
    while whitespace && scanner.match_while(is_attribute_start) >= 1 {
        scanner.match_while(is_attribute_continue);
        whitespace = scanner.whitespace() >= 1;
        if scanner.advance_if('=') {
            scanner.whitespace();
            match scanner.peek() {
                quote @ ('\'' | '"') => {
                    scanner.advance();
                    let terminator = if quote == '"' { "\"" } else { "'" };
                    if !scan_past(scanner, exhausted, terminator) {
                        return false;
                    }
                }
                _ => {
                    if scanner.find_matching(is_attribute_value_end).is_none_or(|skipped| skipped == 0) {
                        return false;
                    }
                }
            }
            // Attributes must be separated by whitespace.
            whitespace = scanner.whitespace() >= 1;
        }
    }
    scanner.advance_if('/');
    scanner.advance_if('>')
}

fn try_closing_tag(scanner: &mut Scanner<'_>) -> bool {
    scanner.advance();
    if scanner.match_while(is_tag_name_start) == 0 {
        return false;
    }
    scanner.match_while(is_tag_name_continue);
    scanner.whitespace();
    scanner.advance_if('>')
}

fn try_processing_instruction(scanner: &mut Scanner<'_>, exhausted: &mut ExhaustedScans) -> bool {
    scanner.advance();
    scan_past(scanner, exhausted, "?>")
}

/// `<!-->`, `<!--->` or `<!--` up to the first `-->`.
fn try_comment(scanner: &mut Scanner<'_>, exhausted: &mut ExhaustedScans) -> bool {
    scanner.advance();
    if !scanner.advance_if('-') {
        return false;
    }
    if scanner.advance_if('>') || scanner.advance_if_str("->") {
        return true;
    }
    scan_past(scanner, exhausted, "-->")
}

fn try_cdata(scanner: &mut Scanner<'_>, exhausted: &mut ExhaustedScans) -> bool {
    scanner.advance();
    scanner.advance_if_str("CDATA[") && scan_past(scanner, exhausted, "]]>")
}

/// `<!` and a letter, then anything up to `>`.
fn try_declaration(scanner: &mut Scanner<'_>, exhausted: &mut ExhaustedScans) -> bool {
    scan_past(scanner, exhausted, ">")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLine;
    use rstest::rstest;

    fn html(input: &str) -> Option<String> {
        let lines: Vec<SourceLine> = input.split('\n').map(|l| SourceLine::new(l, None)).collect();
        let mut scanner = Scanner::new(&lines);
        let mut exhausted = ExhaustedScans::default();
        let start = scanner.position();
        scanner.advance();
        let matched = match scanner.peek() {
            c if is_tag_name_start(c) => try_open_tag(&mut scanner, &mut exhausted),
            '/' => try_closing_tag(&mut scanner),
            '?' => try_processing_instruction(&mut scanner, &mut exhausted),
            '!' => {
                scanner.advance();
                match scanner.peek() {
                    '-' => try_comment(&mut scanner, &mut exhausted),
                    '[' => try_cdata(&mut scanner, &mut exhausted),
                    _ => try_declaration(&mut scanner, &mut exhausted),
                }
            }
            _ => false,
        };
        matched.then(|| scanner.source(start, scanner.position()).content())
    }

    #[rstest]
    #[case("<a>", Some("<a>"))]
    #[case("<a href=\"x\" data-y='1' z=w />rest", Some("<a href=\"x\" data-y='1' z=w />"))]
    #[case("<a  \n b>", Some("<a  \n b>"))]
    #[case("<a href=\"x\"title=y>", None)]
    #[case("<33>", None)]
    #[case("</em >", Some("</em >"))]
    #[case("<?php echo ?> x", Some("<?php echo ?>"))]
    #[case("<??>", Some("<??>"))]
    #[case("<!-->", Some("<!-->"))]
    #[case("<!--->", Some("<!--->"))]
    #[case("<!-- a -- b -->", Some("<!-- a -- b -->"))]
    #[case("<![CDATA[x]]y]]>", Some("<![CDATA[x]]y]]>"))]
    #[case("<!DOCTYPE html>", Some("<!DOCTYPE html>"))]
    fn raw_html(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(html(input).as_deref(), expected);
    }

    #[rstest]
    #[case("http://example.com/a?b", true)]
    #[case("a+b.c:x", true)]
    #[case("m:x", false)]
    #[case("http://a b", false)]
    fn uri_autolinks(#[case] content: &str, #[case] expected: bool) {
        assert_eq!(URI.is_match(content), expected);
    }

    #[test]
    fn failed_scan_covers_later_positions() {
        let lines = vec![SourceLine::new("<!-- a <!-- b", None)];
        let mut scanner = Scanner::new(&lines);
        let mut exhausted = ExhaustedScans::default();
        let start = scanner.position();
        assert!(!scan_past(&mut scanner, &mut exhausted, "-->"));
        assert!(exhausted.contains("-->", start));

        scanner.set_position(start);
        scanner.match_while(|c| c != 'b');
        assert!(exhausted.contains("-->", scanner.position()));
        assert!(!exhausted.contains(">", scanner.position()));
        assert!(!scan_past(&mut scanner, &mut exhausted, "-->"));
    }

    #[test]
    fn email_autolinks() {
        assert!(EMAIL.is_match("foo@bar.example.com"));
        assert!(EMAIL.is_match("foo+special@Bar.baz-bar0.com"));
        assert!(!EMAIL.is_match("foo\\+@bar.example.com"));
    }
}
