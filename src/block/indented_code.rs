use super::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlockParser, ParserState};
use crate::chars::CODE_BLOCK_INDENT;
use crate::node::{NodeId, NodeValue, Tree};
use crate::source::SourceLine;

#[derive(Default)]
struct IndentedCodeParser {
    lines: Vec<String>,
}

impl BlockParser for IndentedCodeParser {
    fn block_value(&self) -> NodeValue {
        NodeValue::IndentedCodeBlock {
            literal: String::new(),
        }
    }

    fn try_continue(&mut self, state: &ParserState<'_>, _block: NodeId) -> Option<BlockContinue> {
        if state.indent() >= CODE_BLOCK_INDENT {
            Some(BlockContinue::AtColumn(state.column() + CODE_BLOCK_INDENT))
        } else if state.is_blank() {
            Some(BlockContinue::AtIndex(state.next_non_space_index()))
        } else {
            None
        }
    }

    fn add_line(&mut self, line: SourceLine) {
        self.lines.push(line.content().to_string());
    }

    fn close_block(&mut self, tree: &mut Tree, block: NodeId) {
        // Trailing blank lines belong to whatever follows.
        let last_content = self
            .lines
            .iter()
            .rposition(|line| !line.trim_matches(|c| c == ' ' || c == '\t').is_empty())
            .map_or(0, |i| i + 1);
        let mut literal = String::new();
        for line in &self.lines[..last_content] {
            literal.push_str(line);
            literal.push('\n');
        }
        if let NodeValue::IndentedCodeBlock { literal: value } = tree.value_mut(block) {
            *value = literal;
        }
    }
}

pub(crate) struct IndentedCodeFactory;

impl BlockParserFactory for IndentedCodeFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlockParser<'_>) -> Option<BlockStart> {
        // An indented line cannot interrupt a paragraph.
        if state.indent() < CODE_BLOCK_INDENT || state.is_blank() || state.active_block_value().is_paragraph() {
            return None;
        }
        Some(BlockStart::of(IndentedCodeParser::default()).at_column(state.column() + CODE_BLOCK_INDENT))
    }
}
