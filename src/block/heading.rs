use super::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlockParser, ParserState};
use crate::chars::{CODE_BLOCK_INDENT, is_space_or_tab};
use crate::inline::InlineParser;
use crate::node::{NodeId, NodeValue, Tree};
use crate::scanner::Scanner;
use crate::source::{SourceLine, SourceLines};

struct HeadingParser {
    level: u8,
    content: SourceLines,
}

impl BlockParser for HeadingParser {
    fn block_value(&self) -> NodeValue {
        NodeValue::Heading { level: self.level }
    }

    fn try_continue(&mut self, _state: &ParserState<'_>, _block: NodeId) -> Option<BlockContinue> {
        // A heading is always a single line (setext underline included).
        None
    }

    fn parse_inlines(&self, inline_parser: &InlineParser<'_>, tree: &mut Tree, block: NodeId) {
        inline_parser.parse(tree, &self.content, block);
    }
}

pub(crate) struct HeadingFactory;

impl BlockParserFactory for HeadingFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlockParser<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let line = state.line();
        let content = line.content();
        let next_non_space = state.next_non_space_index();

        if state.next_non_space_char() == Some('#')
            && let Some(heading) = atx_heading(&line.substring(next_non_space, content.len()))
        {
            return Some(BlockStart::of(heading).at_index(content.len()));
        }

        let level = setext_heading_level(&content[next_non_space..])?;
        let paragraph = matched.paragraph_lines()?;
        Some(
            BlockStart::of(HeadingParser {
                level,
                content: paragraph.clone(),
            })
            .at_index(content.len())
            .replace_active_block_parser(),
        )
    }
}

/// `#` to `######`, then a space, tab or end of line. An optional closing
/// run of `#` must be preceded by whitespace and followed only by whitespace.
fn atx_heading(line: &SourceLine) -> Option<HeadingParser> {
    let lines = [line.clone()];
    let mut scanner = Scanner::new(&lines);
    let level = scanner.match_multiple('#');
    if level == 0 || level > 6 {
        return None;
    }
    let level = level as u8;
    if !scanner.has_next() {
        return Some(HeadingParser {
            level,
            content: SourceLines::empty(),
        });
    }
    if !is_space_or_tab(scanner.peek()) {
        return None;
    }

    scanner.whitespace();
    let start = scanner.position();
    let mut end = start;
    let mut hash_can_end = true;
    while scanner.has_next() {
        match scanner.peek() {
            '#' if hash_can_end => {
                scanner.match_multiple('#');
                let whitespace = scanner.whitespace();
                // Anything after the run makes it part of the content.
                if scanner.has_next() {
                    end = scanner.position();
                }
                hash_can_end = whitespace > 0;
            }
            ' ' | '\t' => {
                hash_can_end = true;
                scanner.advance();
            }
            _ => {
                hash_can_end = false;
                scanner.advance();
                end = scanner.position();
            }
        }
    }

    let content = scanner.source(start, end);
    Some(HeadingParser {
        level,
        content: if content.content().is_empty() {
            SourceLines::empty()
        } else {
            content
        },
    })
}

/// Level of a setext underline (`===` is 1, `---` is 2), allowing trailing spaces and tabs.
fn setext_heading_level(rest: &str) -> Option<u8> {
    let marker = rest.chars().next()?;
    let level = match marker {
        '=' => 1,
        '-' => 2,
        _ => return None,
    };
    let after_marker = rest.trim_start_matches(marker);
    after_marker
        .trim_start_matches(is_space_or_tab)
        .is_empty()
        .then_some(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("# foo", Some((1, "foo")))]
    #[case("###### foo", Some((6, "foo")))]
    #[case("####### foo", None)]
    #[case("#5 bolt", None)]
    #[case("#", Some((1, "")))]
    #[case("## foo ##   ", Some((2, "foo")))]
    #[case("# foo#", Some((1, "foo#")))]
    #[case("### foo ### b", Some((3, "foo ### b")))]
    #[case("# foo \\#", Some((1, "foo \\#")))]
    #[case("## ", Some((2, "")))]
    fn atx(#[case] line: &str, #[case] expected: Option<(u8, &str)>) {
        let heading = atx_heading(&SourceLine::new(line, None));
        let actual = heading.map(|h| (h.level, h.content.content()));
        assert_eq!(actual, expected.map(|(level, text)| (level, text.to_string())));
    }

    #[rstest]
    #[case("===", Some(1))]
    #[case("-", Some(2))]
    #[case("---  \t", Some(2))]
    #[case("=-", None)]
    #[case("--- -", None)]
    #[case("==x", None)]
    fn setext(#[case] rest: &str, #[case] expected: Option<u8>) {
        assert_eq!(setext_heading_level(rest), expected);
    }
}
