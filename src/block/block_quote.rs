use super::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlockParser, ParserState};
use crate::chars::{CODE_BLOCK_INDENT, is_space_or_tab};
use crate::node::{NodeId, NodeValue, Tree};

struct BlockQuoteParser;

/// `>` within the indent limit at the next non-space position.
fn is_marker(state: &ParserState<'_>) -> bool {
    state.indent() < CODE_BLOCK_INDENT && state.next_non_space_char() == Some('>')
}

/// Column after the marker and one optional following space or tab.
fn content_column(state: &ParserState<'_>) -> usize {
    let mut column = state.column() + state.indent() + 1;
    let after_marker = state.next_non_space_index() + 1;
    if state.line().content()[after_marker..]
        .chars()
        .next()
        .is_some_and(is_space_or_tab)
    {
        column += 1;
    }
    column
}

impl BlockParser for BlockQuoteParser {
    fn block_value(&self) -> NodeValue {
        NodeValue::BlockQuote
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, _tree: &mut Tree, _block: NodeId, _child: &NodeValue) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>, _block: NodeId) -> Option<BlockContinue> {
        is_marker(state).then(|| BlockContinue::AtColumn(content_column(state)))
    }
}

pub(crate) struct BlockQuoteFactory;

impl BlockParserFactory for BlockQuoteFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlockParser<'_>) -> Option<BlockStart> {
        is_marker(state).then(|| BlockStart::of(BlockQuoteParser).at_column(content_column(state)))
    }
}
