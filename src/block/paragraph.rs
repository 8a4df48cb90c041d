use super::link_ref_def::LinkReferenceDefinitionParser;
use super::{BlockContinue, BlockParser, ParserState};
use crate::definitions::LinkReferenceDefinition;
use crate::inline::InlineParser;
use crate::node::{NodeId, NodeValue, Tree};
use crate::source::{SourceLine, SourceLines, SourceSpan};

/// Paragraph text, with any leading link reference definitions split off.
pub(crate) struct ParagraphParser {
    definitions: LinkReferenceDefinitionParser,
}

impl ParagraphParser {
    pub(crate) fn new() -> Self {
        ParagraphParser {
            definitions: LinkReferenceDefinitionParser::new(),
        }
    }
}

impl BlockParser for ParagraphParser {
    fn block_value(&self) -> NodeValue {
        NodeValue::Paragraph
    }

    fn can_have_lazy_continuation_lines(&self) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>, _block: NodeId) -> Option<BlockContinue> {
        (!state.is_blank()).then(|| BlockContinue::AtIndex(state.index()))
    }

    fn add_line(&mut self, line: SourceLine) {
        self.definitions.parse(line);
    }

    fn add_source_span(&mut self, _tree: &mut Tree, _block: NodeId, span: SourceSpan) {
        // Spans are split between definitions and the paragraph later.
        self.definitions.add_source_span(span);
    }

    fn paragraph_lines(&self) -> Option<&SourceLines> {
        Some(self.definitions.paragraph_lines())
    }

    fn take_definitions(&mut self) -> Vec<LinkReferenceDefinition> {
        self.definitions.take_definitions()
    }

    fn close_block(&mut self, tree: &mut Tree, block: NodeId) {
        if self.definitions.paragraph_lines().is_empty() {
            // Only definitions: no paragraph is left.
            tree.unlink(block);
        } else {
            tree.set_source_spans(block, self.definitions.paragraph_source_spans().to_vec());
        }
    }

    fn parse_inlines(&self, inline_parser: &InlineParser<'_>, tree: &mut Tree, block: NodeId) {
        let lines = self.definitions.paragraph_lines();
        if !lines.is_empty() {
            inline_parser.parse(tree, lines, block);
        }
    }
}
