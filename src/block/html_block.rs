use super::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlockParser, ParserState};
use crate::chars::CODE_BLOCK_INDENT;
use crate::node::{NodeId, NodeValue, Tree};
use crate::source::SourceLine;
use once_cell::sync::Lazy;
use regex::Regex;

const TAG_NAME: &str = "[A-Za-z][A-Za-z0-9-]*";
const ATTRIBUTE_NAME: &str = "[a-zA-Z_:][a-zA-Z0-9:._-]*";
const ATTRIBUTE_VALUE: &str = r#"(?:[^"'=<>`\x00-\x20]+|'[^']*'|"[^"]*")"#;

const BLOCK_TAGS: &str = "address|article|aside|base|basefont|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer|form|frame|frameset|h1|h2|h3|h4|h5|h6|head|header|hr|html|iframe|legend|li|link|main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|search|section|summary|table|tbody|td|tfoot|th|thead|title|tr|track|ul";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("HTML block pattern should compile")
}

/// Opener and optional closer for each of the seven HTML block kinds, in priority order.
static BLOCK_PATTERNS: Lazy<Vec<(Regex, Option<Regex>)>> = Lazy::new(|| {
    let attribute = format!(r"(?:\s+{ATTRIBUTE_NAME}(?:\s*=\s*{ATTRIBUTE_VALUE})?)");
    let open_tag = format!(r"<{TAG_NAME}{attribute}*\s*/?>");
    let close_tag = format!(r"</{TAG_NAME}\s*>");
    vec![
        (
            compile(r"(?i)^<(?:script|pre|style|textarea)(?:\s|>|$)"),
            Some(compile(r"(?i)</(?:script|pre|style|textarea)>")),
        ),
        (compile("^<!--"), Some(compile("-->"))),
        (compile(r"^<\?"), Some(compile(r"\?>"))),
        (compile("^<![A-Za-z]"), Some(compile(">"))),
        (compile(r"^<!\[CDATA\["), Some(compile(r"\]\]>"))),
        (compile(&format!(r"(?i)^</?(?:{BLOCK_TAGS})(?:\s|/?>|$)")), None),
        (compile(&format!(r"(?i)^(?:{open_tag}|{close_tag})\s*$")), None),
    ]
});

/// Index of the last kind, which cannot interrupt a paragraph.
const OPEN_OR_CLOSING_TAG: usize = 6;

struct HtmlBlockParser {
    closer: Option<&'static Regex>,
    finished: bool,
    lines: Vec<String>,
}

impl BlockParser for HtmlBlockParser {
    fn block_value(&self) -> NodeValue {
        NodeValue::HtmlBlock {
            literal: String::new(),
        }
    }

    fn try_continue(&mut self, state: &ParserState<'_>, _block: NodeId) -> Option<BlockContinue> {
        if self.finished {
            return None;
        }
        // Kinds without a closer end at a blank line.
        if state.is_blank() && self.closer.is_none() {
            return None;
        }
        Some(BlockContinue::AtIndex(state.index()))
    }

    fn add_line(&mut self, line: SourceLine) {
        if self.closer.is_some_and(|closer| closer.is_match(line.content())) {
            self.finished = true;
        }
        self.lines.push(line.content().to_string());
    }

    fn close_block(&mut self, tree: &mut Tree, block: NodeId) {
        if let NodeValue::HtmlBlock { literal } = tree.value_mut(block) {
            *literal = self.lines.join("\n");
        }
    }
}

pub(crate) struct HtmlBlockFactory;

impl BlockParserFactory for HtmlBlockFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlockParser<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT || state.next_non_space_char() != Some('<') {
            return None;
        }
        let rest = &state.line().content()[state.next_non_space_index()..];
        let interrupts_paragraph = state.tree().value(matched.block()).is_paragraph()
            || state.active_can_have_lazy_continuation_lines();
        let patterns: &'static [(Regex, Option<Regex>)] = &BLOCK_PATTERNS;
        let (_, closer) = patterns
            .iter()
            .enumerate()
            .filter(|(kind, _)| !(*kind == OPEN_OR_CLOSING_TAG && interrupts_paragraph))
            .map(|(_, pattern)| pattern)
            .find(|(opener, _)| opener.is_match(rest))?;
        // The block keeps the line's leading spaces.
        Some(
            BlockStart::of(HtmlBlockParser {
                closer: closer.as_ref(),
                finished: false,
                lines: Vec::new(),
            })
            .at_index(state.index()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kind(line: &str) -> Option<usize> {
        BLOCK_PATTERNS.iter().position(|(opener, _)| opener.is_match(line))
    }

    #[test]
    fn openers_by_kind() {
        assert_eq!(kind("<script type=\"x\">"), Some(0));
        assert_eq!(kind("<PRE>"), Some(0));
        assert_eq!(kind("<!-- c"), Some(1));
        assert_eq!(kind("<?php"), Some(2));
        assert_eq!(kind("<!doctype html>"), Some(3));
        assert_eq!(kind("<![CDATA[x"), Some(4));
        assert_eq!(kind("<div class=\"a\">"), Some(5));
        assert_eq!(kind("</search>"), Some(5));
        assert_eq!(kind("<custom-tag a='b' />"), Some(6));
        assert_eq!(kind("<custom-tag> text"), None);
        assert_eq!(kind("<scripty>"), Some(6));
    }

    #[test]
    fn closers_match_anywhere_on_line() {
        let closer = BLOCK_PATTERNS[0].1.as_ref().unwrap();
        assert!(closer.is_match("x = 1;</SCRIPT> after"));
        assert!(BLOCK_PATTERNS[5].1.is_none());
    }

    #[rstest]
    #[case(0, "</textarea>", true)]
    #[case(0, "</textarea >", false)]
    #[case(1, "a --> b", true)]
    #[case(1, "a -- > b", false)]
    #[case(2, "x ?>", true)]
    #[case(2, "x ? >", false)]
    #[case(3, "html>", true)]
    #[case(3, "html", false)]
    #[case(4, "]]> tail", true)]
    #[case(4, "]] >", false)]
    fn closers_by_kind(#[case] kind: usize, #[case] line: &str, #[case] closes: bool) {
        let closer = BLOCK_PATTERNS[kind].1.as_ref().unwrap();
        assert_eq!(closer.is_match(line), closes);
    }

    #[test]
    fn open_or_closing_tag_needs_the_whole_line() {
        assert_eq!(kind("</custom-tag>  "), Some(OPEN_OR_CLOSING_TAG));
        assert_eq!(kind("<x-y data-a=b\tc>"), Some(OPEN_OR_CLOSING_TAG));
        assert_eq!(kind("<x-y data-a=\"b\"c>"), None);
        assert_eq!(kind("<x-y></x-y>"), None);
        assert!(BLOCK_PATTERNS[OPEN_OR_CLOSING_TAG].1.is_none());
    }
}
