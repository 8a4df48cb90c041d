/// Drives the block phase: open-block stack, continuation and block starts
use super::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, DocumentBlockParser, LineCursor,
    MatchedBlockParser, ParagraphParser, ParserState,
};
use crate::chars::{CODE_BLOCK_INDENT, columns_to_next_tab_stop, is_letter};
use crate::config::IncludeSourceSpans;
use crate::definitions::LinkReferenceDefinitions;
use crate::document::Document;
use crate::inline::{InlineContext, InlineParser};
use crate::node::{NodeId, Tree};
use crate::source::{SourceLine, SourceSpan};
use log::{debug, trace};
use std::borrow::Cow;
use std::sync::Arc;

/// Every parser ever activated, in activation order, with its block.
struct ParserSlot {
    parser: Box<dyn BlockParser>,
    block: NodeId,
    /// Set when a block start replaced this parser; it is then skipped for inlines.
    replaced: bool,
}

/// An entry of the open-block stack.
struct OpenBlockParser {
    slot: usize,
    /// Index in the current line where this block's content starts, for source spans.
    source_index: usize,
}

pub(crate) struct DocumentParser<'p> {
    factories: &'p [Arc<dyn BlockParserFactory>],
    inline_context: &'p InlineContext,
    include_source_spans: IncludeSourceSpans,
    tree: Tree,
    root: NodeId,
    parsers: Vec<ParserSlot>,
    open: Vec<OpenBlockParser>,
    cursor: LineCursor,
    line_count: usize,
    definitions: LinkReferenceDefinitions,
}

impl<'p> DocumentParser<'p> {
    pub(crate) fn new(
        factories: &'p [Arc<dyn BlockParserFactory>],
        inline_context: &'p InlineContext,
        include_source_spans: IncludeSourceSpans,
    ) -> Self {
        let document = DocumentBlockParser;
        let mut tree = Tree::new();
        let root = tree.create(document.block_value());
        DocumentParser {
            factories,
            inline_context,
            include_source_spans,
            tree,
            root,
            parsers: vec![ParserSlot {
                parser: Box::new(document),
                block: root,
                replaced: false,
            }],
            open: vec![OpenBlockParser {
                slot: 0,
                source_index: 0,
            }],
            cursor: LineCursor::default(),
            line_count: 0,
            definitions: LinkReferenceDefinitions::new(),
        }
    }

    /// Feed one line (without its terminator) starting at byte `input_index` of the input.
    pub(crate) fn parse_line(&mut self, line: &str, input_index: usize) {
        self.set_line(line, input_index);

        // The document always matches, so start at 1.
        let mut matches = 1;
        for i in 1..self.open.len() {
            self.cursor.find_next_non_space();
            let slot = self.open[i].slot;
            let block = self.parsers[slot].block;
            let (active_block, active_lazy) = self.active_block_info();
            let state = ParserState {
                cursor: &self.cursor,
                tree: &self.tree,
                active_block,
                active_lazy,
            };
            let Some(result) = self.parsers[slot].parser.try_continue(&state, block) else {
                break;
            };
            self.open[i].source_index = self.cursor.index;
            match result {
                BlockContinue::Finished => {
                    self.add_source_spans();
                    self.close_block_parsers(self.open.len() - i);
                    return;
                }
                BlockContinue::AtIndex(index) => self.cursor.set_new_index(index),
                BlockContinue::AtColumn(column) => self.cursor.set_new_column(column),
            }
            matches += 1;
        }

        let mut unmatched = self.open.len() - matches;
        let mut matched_slot = self.open[matches - 1].slot;
        let mut started_new_block = false;
        let mut last_index = self.cursor.index;

        // Unless the last matched block is a leaf such as code, look for new block starts.
        let mut try_block_starts = {
            let slot = &self.parsers[matched_slot];
            self.tree.value(slot.block).is_paragraph() || slot.parser.is_container()
        };
        while try_block_starts {
            last_index = self.cursor.index;
            self.cursor.find_next_non_space();

            if self.cursor.blank
                || (self.cursor.indent < CODE_BLOCK_INDENT && self.cursor.next_char_is_letter())
            {
                self.cursor.set_new_index(self.cursor.next_non_space);
                break;
            }

            let Some(block_start) = self.find_block_start(matched_slot) else {
                self.cursor.set_new_index(self.cursor.next_non_space);
                break;
            };

            started_new_block = true;
            let source_index = self.cursor.index;

            // Blocks left unmatched must be closed before the new one is added.
            if unmatched > 0 {
                self.close_block_parsers(unmatched);
                unmatched = 0;
            }

            let BlockStart {
                parsers,
                new_index,
                new_column,
                replace_active_block_parser,
            } = block_start;
            if let Some(index) = new_index {
                self.cursor.set_new_index(index);
            } else if let Some(column) = new_column {
                self.cursor.set_new_column(column);
            }

            let replaced_spans =
                replace_active_block_parser.then(|| self.prepare_active_block_parser_for_replacement());

            try_block_starts = false;
            for parser in parsers {
                let slot = self.add_child(parser, source_index);
                if let Some(spans) = &replaced_spans {
                    self.tree.set_source_spans(self.parsers[slot].block, spans.clone());
                }
                try_block_starts = self.parsers[slot].parser.is_container();
                matched_slot = slot;
            }
        }

        let active = self.active_slot();
        if !started_new_block
            && !self.cursor.blank
            && self.parsers[active].parser.can_have_lazy_continuation_lines()
        {
            // Lazy paragraph continuation
            if let Some(open) = self.open.last_mut() {
                open.source_index = last_index;
            }
            self.add_line();
        } else {
            if unmatched > 0 {
                self.close_block_parsers(unmatched);
            }
            if !self.parsers[matched_slot].parser.is_container() {
                self.add_line();
            } else if !self.cursor.blank {
                self.add_child(Box::new(ParagraphParser::new()), last_index);
                self.add_line();
            } else {
                // e.g. a blank line right after an empty list item marker
                self.add_source_spans();
            }
        }
    }

    /// Close every open block, then parse inline content of every surviving block.
    pub(crate) fn finish(mut self) -> Document {
        self.close_block_parsers(self.open.len());
        debug!(
            "block phase done: {} lines, {} blocks, {} definitions",
            self.line_count,
            self.parsers.iter().filter(|slot| !slot.replaced).count(),
            self.definitions.len()
        );

        let inline_parser = InlineParser::new(
            self.inline_context,
            &self.definitions,
            self.include_source_spans == IncludeSourceSpans::BlocksAndInlines,
        );
        for slot in self.parsers.iter().filter(|slot| !slot.replaced) {
            slot.parser.parse_inlines(&inline_parser, &mut self.tree, slot.block);
        }
        Document::new(self.tree, self.root, self.definitions)
    }

    fn set_line(&mut self, line: &str, input_index: usize) {
        let content = prepare_line(line).into_owned();
        let span = (self.include_source_spans != IncludeSourceSpans::None)
            .then(|| SourceSpan::new(self.line_count, 0, input_index, content.len()));
        self.cursor = LineCursor {
            line: SourceLine::new(content, span),
            line_index: self.line_count,
            input_index,
            ..LineCursor::default()
        };
        self.line_count += 1;
    }

    fn active_slot(&self) -> usize {
        self.open.last().map_or(0, |open| open.slot)
    }

    fn active_block_info(&self) -> (NodeId, bool) {
        let slot = &self.parsers[self.active_slot()];
        (slot.block, slot.parser.can_have_lazy_continuation_lines())
    }

    fn find_block_start(&self, matched_slot: usize) -> Option<BlockStart> {
        let matched = &self.parsers[matched_slot];
        let matched = MatchedBlockParser {
            block: matched.block,
            paragraph_lines: matched.parser.paragraph_lines().filter(|lines| !lines.is_empty()),
        };
        let (active_block, active_lazy) = self.active_block_info();
        let state = ParserState {
            cursor: &self.cursor,
            tree: &self.tree,
            active_block,
            active_lazy,
        };
        self.factories
            .iter()
            .find_map(|factory| factory.try_start(&state, &matched))
    }

    /// Close and detach the active block so a new block can take its place.
    /// Returns the replaced block's source spans.
    fn prepare_active_block_parser_for_replacement(&mut self) -> Vec<SourceSpan> {
        if self.open.len() <= 1 {
            return Vec::new();
        }
        let Some(open) = self.open.pop() else {
            return Vec::new();
        };
        let slot = &mut self.parsers[open.slot];
        // Definitions at the start of a replaced paragraph are kept.
        for definition in slot.parser.take_definitions() {
            self.definitions.add(definition);
        }
        slot.parser.close_block(&mut self.tree, slot.block);
        self.tree.unlink(slot.block);
        slot.replaced = true;
        trace!("replaced block {:?} on line {}", slot.block, self.cursor.line_index);
        self.tree.source_spans(slot.block).to_vec()
    }

    /// Close blocks until the active one can contain the new block, then open it.
    fn add_child(&mut self, parser: Box<dyn BlockParser>, source_index: usize) -> usize {
        let value = parser.block_value();
        loop {
            let slot = &mut self.parsers[self.open.last().map_or(0, |open| open.slot)];
            if slot.parser.can_contain(&mut self.tree, slot.block, &value) {
                break;
            }
            self.close_block_parsers(1);
        }
        let parent = self.parsers[self.active_slot()].block;
        let block = self.tree.create(value);
        self.tree.append_child(parent, block);
        self.parsers.push(ParserSlot {
            parser,
            block,
            replaced: false,
        });
        let slot = self.parsers.len() - 1;
        self.open.push(OpenBlockParser { slot, source_index });
        slot
    }

    fn close_block_parsers(&mut self, count: usize) {
        for _ in 0..count {
            let Some(open) = self.open.pop() else {
                return;
            };
            let slot = &mut self.parsers[open.slot];
            for definition in slot.parser.take_definitions() {
                self.definitions.add(definition);
            }
            slot.parser.close_block(&mut self.tree, slot.block);
        }
    }

    /// Hand the rest of the line to the active block.
    fn add_line(&mut self) {
        let cursor = &self.cursor;
        let line = cursor.line.content();
        let content = if cursor.column_is_in_tab {
            // The cursor sits inside a partially consumed tab: the columns up
            // to the next tab stop become spaces.
            let after_tab = cursor.index + 1;
            let spaces = columns_to_next_tab_stop(cursor.column);
            let mut content = " ".repeat(spaces);
            content.push_str(&line[after_tab.min(line.len())..]);
            content
        } else {
            line[cursor.index..].to_string()
        };
        // Span length can differ from the content length in the tab case.
        let span = (self.include_source_spans == IncludeSourceSpans::BlocksAndInlines).then(|| {
            SourceSpan::new(
                cursor.line_index,
                cursor.index,
                cursor.input_index + cursor.index,
                content.len(),
            )
        });
        let active = self.active_slot();
        self.parsers[active].parser.add_line(SourceLine::new(content, span));
        self.add_source_spans();
    }

    fn add_source_spans(&mut self) {
        if self.include_source_spans == IncludeSourceSpans::None {
            return;
        }
        let line_length = self.cursor.line.content().len();
        // The document itself gets no spans.
        for open in self.open.iter().skip(1) {
            let length = line_length.saturating_sub(open.source_index);
            if length == 0 {
                continue;
            }
            let span = SourceSpan::new(
                self.cursor.line_index,
                open.source_index,
                self.cursor.input_index + open.source_index,
                length,
            );
            let slot = &mut self.parsers[open.slot];
            slot.parser.add_source_span(&mut self.tree, slot.block, span);
        }
    }
}

/// Replace NUL with U+FFFD, allocating only when the line contains one.
fn prepare_line(line: &str) -> Cow<'_, str> {
    if line.contains('\0') {
        Cow::Owned(line.replace('\0', "\u{fffd}"))
    } else {
        Cow::Borrowed(line)
    }
}

impl LineCursor {
    pub(crate) fn next_char_is_letter(&self) -> bool {
        self.line.content()[self.next_non_space..]
            .chars()
            .next()
            .is_some_and(is_letter)
    }

    fn find_next_non_space(&mut self) {
        let bytes = self.line.content().as_bytes();
        let mut i = self.index;
        let mut columns = self.column;
        self.blank = true;
        while let Some(&b) = bytes.get(i) {
            match b {
                b' ' => columns += 1,
                b'\t' => columns += columns_to_next_tab_stop(columns),
                _ => {
                    self.blank = false;
                    break;
                }
            }
            i += 1;
        }
        self.next_non_space = i;
        self.next_non_space_column = columns;
        self.indent = columns - self.column;
    }

    fn set_new_index(&mut self, new_index: usize) {
        if new_index >= self.next_non_space {
            // No need to walk the whitespace again
            self.index = self.next_non_space;
            self.column = self.next_non_space_column;
        }
        let length = self.line.content().len();
        while self.index < new_index && self.index != length {
            self.advance();
        }
        // An index target never lands inside a tab.
        self.column_is_in_tab = false;
    }

    fn set_new_column(&mut self, new_column: usize) {
        if new_column >= self.next_non_space_column {
            self.index = self.next_non_space;
            self.column = self.next_non_space_column;
        }
        let length = self.line.content().len();
        while self.column < new_column && self.index != length {
            self.advance();
        }
        if self.column > new_column {
            // Overshot: the last character was a tab, stay on it.
            self.index -= 1;
            self.column = new_column;
            self.column_is_in_tab = true;
        } else {
            self.column_is_in_tab = false;
        }
    }

    fn advance(&mut self) {
        let Some(c) = self.line.content()[self.index..].chars().next() else {
            return;
        };
        self.index += c.len_utf8();
        if c == '\t' {
            self.column += columns_to_next_tab_stop(self.column);
        } else {
            self.column += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_cursor(line: &str) -> LineCursor {
        let mut cursor = LineCursor {
            line: SourceLine::new(line, None),
            ..LineCursor::default()
        };
        cursor.find_next_non_space();
        cursor
    }

    #[test]
    fn tab_counts_to_next_stop() {
        let cursor = line_cursor("\tfoo");
        assert_eq!(cursor.indent, 4);
        assert_eq!(cursor.next_non_space, 1);

        let cursor = line_cursor("  \tfoo");
        assert_eq!(cursor.indent, 4);
        assert_eq!(cursor.next_non_space_column, 4);
    }

    #[test]
    fn column_inside_tab_is_partial() {
        let mut cursor = line_cursor(" \tfoo");
        cursor.set_new_column(2);
        assert!(cursor.column_is_in_tab);
        assert_eq!(cursor.index, 1);
        assert_eq!(cursor.column, 2);
        assert_eq!(columns_to_next_tab_stop(cursor.column), 2);
    }

    #[test]
    fn index_target_clears_tab_state() {
        let mut cursor = line_cursor("\t\tfoo");
        cursor.set_new_column(2);
        assert!(cursor.column_is_in_tab);
        cursor.find_next_non_space();
        cursor.set_new_index(cursor.next_non_space);
        assert!(!cursor.column_is_in_tab);
        assert_eq!(cursor.column, 8);
    }

    #[test]
    fn nul_is_replaced_lazily() {
        assert!(matches!(prepare_line("plain"), Cow::Borrowed(_)));
        assert_eq!(prepare_line("a\0b"), "a\u{fffd}b");
    }
}
