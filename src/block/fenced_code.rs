use super::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlockParser, ParserState};
use crate::chars::{CODE_BLOCK_INDENT, is_space_or_tab};
use crate::escaping::unescape_string;
use crate::node::{NodeId, NodeValue, Tree};
use crate::source::SourceLine;

struct FencedCodeParser {
    fence_char: char,
    fence_length: usize,
    fence_indent: usize,
    /// Rest of the opening fence line, which becomes the info string.
    first_line: Option<String>,
    other_lines: String,
}

impl FencedCodeParser {
    /// A closing fence: at least as long as the opener, followed only by spaces or tabs.
    fn is_closing(&self, rest: &str) -> bool {
        let after_fence = rest.trim_start_matches(self.fence_char);
        let fences = rest.len() - after_fence.len();
        fences >= self.fence_length && after_fence.trim_start_matches(is_space_or_tab).is_empty()
    }
}

impl BlockParser for FencedCodeParser {
    fn block_value(&self) -> NodeValue {
        NodeValue::FencedCodeBlock {
            fence_char: self.fence_char,
            fence_length: self.fence_length,
            fence_indent: self.fence_indent,
            info: String::new(),
            literal: String::new(),
        }
    }

    fn try_continue(&mut self, state: &ParserState<'_>, _block: NodeId) -> Option<BlockContinue> {
        let line = state.line().content();
        let next_non_space = state.next_non_space_index();
        if state.indent() < CODE_BLOCK_INDENT
            && next_non_space < line.len()
            && self.is_closing(&line[next_non_space..])
        {
            return Some(BlockContinue::Finished);
        }

        // Skip up to the opening fence's indent worth of spaces.
        let skip = line[state.index()..]
            .bytes()
            .take(self.fence_indent)
            .take_while(|&b| b == b' ')
            .count();
        Some(BlockContinue::AtIndex(state.index() + skip))
    }

    fn add_line(&mut self, line: SourceLine) {
        if self.first_line.is_none() {
            self.first_line = Some(line.content().to_string());
        } else {
            self.other_lines.push_str(line.content());
            self.other_lines.push('\n');
        }
    }

    fn close_block(&mut self, tree: &mut Tree, block: NodeId) {
        let first_line = self.first_line.take().unwrap_or_default();
        if let NodeValue::FencedCodeBlock { info, literal, .. } = tree.value_mut(block) {
            *info = unescape_string(first_line.trim()).into_owned();
            *literal = std::mem::take(&mut self.other_lines);
        }
    }
}

pub(crate) struct FencedCodeFactory;

impl BlockParserFactory for FencedCodeFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlockParser<'_>) -> Option<BlockStart> {
        let indent = state.indent();
        if indent >= CODE_BLOCK_INDENT {
            return None;
        }
        let next_non_space = state.next_non_space_index();
        let parser = check_opener(&state.line().content()[next_non_space..], indent)?;
        let after_fence = next_non_space + parser.fence_length;
        Some(BlockStart::of(parser).at_index(after_fence))
    }
}

/// At least three backticks or three tildes, not mixed. A backtick fence's
/// info string may not contain backticks.
fn check_opener(rest: &str, indent: usize) -> Option<FencedCodeParser> {
    let fence_char = rest.chars().next().filter(|&c| c == '`' || c == '~')?;
    let fence_length = rest.len() - rest.trim_start_matches(fence_char).len();
    if fence_length < 3 {
        return None;
    }
    if fence_char == '`' && rest[fence_length..].contains('`') {
        return None;
    }
    Some(FencedCodeParser {
        fence_char,
        fence_length,
        fence_indent: indent,
        first_line: None,
        other_lines: String::new(),
    })
}
