//! Block phase: line-by-line construction of the block structure.
pub(crate) mod document;

mod block_quote;
mod fenced_code;
mod heading;
mod html_block;
mod indented_code;
mod link_ref_def;
mod list;
mod paragraph;
mod thematic_break;

pub(crate) use block_quote::BlockQuoteFactory;
pub(crate) use fenced_code::FencedCodeFactory;
pub(crate) use heading::HeadingFactory;
pub(crate) use html_block::HtmlBlockFactory;
pub(crate) use indented_code::IndentedCodeFactory;
pub(crate) use list::ListFactory;
pub(crate) use paragraph::ParagraphParser;
pub(crate) use thematic_break::ThematicBreakFactory;

use crate::definitions::LinkReferenceDefinition;
use crate::inline::InlineParser;
use crate::node::{NodeId, NodeValue, Tree};
use crate::source::{SourceLine, SourceLines, SourceSpan};

/// Position of the document parser within the current line.
#[derive(Debug, Clone, Default)]
pub(crate) struct LineCursor {
    pub(crate) line: SourceLine,
    pub(crate) line_index: usize,
    pub(crate) input_index: usize,
    pub(crate) index: usize,
    pub(crate) column: usize,
    pub(crate) column_is_in_tab: bool,
    pub(crate) next_non_space: usize,
    pub(crate) next_non_space_column: usize,
    pub(crate) indent: usize,
    pub(crate) blank: bool,
}

/// Read-only view of the parse state handed to block parsers and factories.
pub struct ParserState<'a> {
    pub(crate) cursor: &'a LineCursor,
    pub(crate) tree: &'a Tree,
    pub(crate) active_block: NodeId,
    pub(crate) active_lazy: bool,
}

impl<'a> ParserState<'a> {
    /// The current line, after NUL replacement.
    pub fn line(&self) -> &'a SourceLine {
        &self.cursor.line
    }

    /// Byte index within the line up to which content has been consumed.
    pub fn index(&self) -> usize {
        self.cursor.index
    }

    /// Column of [`Self::index`], with tabs expanded to the next multiple of 4.
    pub fn column(&self) -> usize {
        self.cursor.column
    }

    /// Index of the next character that is neither a space nor a tab.
    pub fn next_non_space_index(&self) -> usize {
        self.cursor.next_non_space
    }

    /// Columns between [`Self::column`] and the next non-space character.
    pub fn indent(&self) -> usize {
        self.cursor.indent
    }

    /// Whether the rest of the line is spaces and tabs only.
    pub fn is_blank(&self) -> bool {
        self.cursor.blank
    }

    /// The deepest open block, which is not necessarily the matched one.
    pub fn active_block(&self) -> NodeId {
        self.active_block
    }

    pub fn active_block_value(&self) -> &'a NodeValue {
        self.tree.value(self.active_block)
    }

    pub fn active_can_have_lazy_continuation_lines(&self) -> bool {
        self.active_lazy
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// Character at the next non-space index, if any.
    pub fn next_non_space_char(&self) -> Option<char> {
        self.cursor.line.content()[self.cursor.next_non_space..]
            .chars()
            .next()
    }
}

/// How an open block consumed the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContinue {
    AtIndex(usize),
    AtColumn(usize),
    /// The block is complete with this line; it and its children are closed.
    Finished,
}

/// Result of a successful [`BlockParserFactory::try_start`].
pub struct BlockStart {
    pub(crate) parsers: Vec<Box<dyn BlockParser>>,
    pub(crate) new_index: Option<usize>,
    pub(crate) new_column: Option<usize>,
    pub(crate) replace_active_block_parser: bool,
}

impl BlockStart {
    pub fn of(parser: impl BlockParser + 'static) -> Self {
        Self::of_many(vec![Box::new(parser)])
    }

    /// Several nested blocks at once, outermost first.
    pub fn of_many(parsers: Vec<Box<dyn BlockParser>>) -> Self {
        BlockStart {
            parsers,
            new_index: None,
            new_column: None,
            replace_active_block_parser: false,
        }
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.new_index = Some(index);
        self
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.new_column = Some(column);
        self
    }

    /// Replace the active block (a paragraph) instead of nesting inside it.
    pub fn replace_active_block_parser(mut self) -> Self {
        self.replace_active_block_parser = true;
        self
    }
}

/// The deepest block that matched the current line during the continuation pass.
pub struct MatchedBlockParser<'a> {
    pub(crate) block: NodeId,
    pub(crate) paragraph_lines: Option<&'a SourceLines>,
}

impl<'a> MatchedBlockParser<'a> {
    pub fn block(&self) -> NodeId {
        self.block
    }

    /// Paragraph content gathered so far, when the matched block is a
    /// paragraph that still has content after removing link reference
    /// definitions.
    pub fn paragraph_lines(&self) -> Option<&'a SourceLines> {
        self.paragraph_lines
    }
}

/// Parser for one open block. The block's node is created from
/// [`BlockParser::block_value`] when the parser is activated, and its id is
/// passed back in on every call.
pub trait BlockParser {
    fn block_value(&self) -> NodeValue;

    fn is_container(&self) -> bool {
        false
    }

    fn can_have_lazy_continuation_lines(&self) -> bool {
        false
    }

    fn can_contain(&mut self, _tree: &mut Tree, _block: NodeId, _child: &NodeValue) -> bool {
        false
    }

    /// `None` when the line does not continue this block.
    fn try_continue(&mut self, state: &ParserState<'_>, block: NodeId) -> Option<BlockContinue>;

    fn add_line(&mut self, _line: SourceLine) {}

    fn add_source_span(&mut self, tree: &mut Tree, block: NodeId, span: SourceSpan) {
        tree.add_source_span(block, span);
    }

    fn paragraph_lines(&self) -> Option<&SourceLines> {
        None
    }

    /// Link reference definitions found in this block, handed over once on close.
    fn take_definitions(&mut self) -> Vec<LinkReferenceDefinition> {
        Vec::new()
    }

    fn close_block(&mut self, _tree: &mut Tree, _block: NodeId) {}

    fn parse_inlines(&self, _inline_parser: &InlineParser<'_>, _tree: &mut Tree, _block: NodeId) {}
}

/// Decides whether a new block starts at the current position.
pub trait BlockParserFactory: Send + Sync {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlockParser<'_>) -> Option<BlockStart>;
}

/// The root block. It matches every line and accepts any child.
pub(crate) struct DocumentBlockParser;

impl BlockParser for DocumentBlockParser {
    fn block_value(&self) -> NodeValue {
        NodeValue::Document
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, _tree: &mut Tree, _block: NodeId, _child: &NodeValue) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>, _block: NodeId) -> Option<BlockContinue> {
        Some(BlockContinue::AtIndex(state.index()))
    }
}
