//! Inline phase: turns the text of a leaf block into inline nodes.
mod bracket;
mod content;
pub(crate) mod delimiter;
pub(crate) mod link_scanner;

use crate::definitions::LinkReferenceDefinitions;
use crate::node::{NodeId, NodeValue, Tree};
use crate::scanner::{END, Position, Scanner};
use crate::source::SourceLines;
use bracket::Bracket;
use delimiter::{DelimiterProcessors, DelimiterRun};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Parses inline content starting at a single trigger character, such as
/// `` ` `` for code spans.
pub trait InlineContentParser: Send + Sync {
    fn trigger_characters(&self) -> &[char];

    /// Parse at the scanner's position, which is on a trigger character.
    /// `None` means no match; the scanner is rewound by the caller.
    fn try_parse(&self, state: &mut InlineParserState<'_, '_>) -> Option<ParsedInline>;
}

/// What an [`InlineContentParser`] works with: the scanner over the block's
/// text and the tree to create nodes in.
pub struct InlineParserState<'r, 'a> {
    scanner: &'r mut Scanner<'a>,
    tree: &'r mut Tree,
    exhausted: &'r mut ExhaustedScans,
    include_source_spans: bool,
}

impl<'a> InlineParserState<'_, 'a> {
    pub fn scanner(&mut self) -> &mut Scanner<'a> {
        &mut *self.scanner
    }

    pub fn tree(&mut self) -> &mut Tree {
        &mut *self.tree
    }

    /// A detached `Text` node, with the spans of `source` when inline spans are tracked.
    pub fn text(&mut self, literal: impl Into<String>, source: &SourceLines) -> NodeId {
        let node = self.tree.create(NodeValue::text(literal));
        if self.include_source_spans {
            self.tree.set_source_spans(node, source.source_spans());
        }
        node
    }
}

/// Terminators such as `-->` that a scan already looked for up to the end
/// of the block, keyed to the earliest position that scan started from.
/// Any later search for the same terminator fails without rescanning.
#[derive(Debug, Default)]
pub(crate) struct ExhaustedScans {
    from: HashMap<&'static str, Position>,
}

impl ExhaustedScans {
    pub(crate) fn contains(&self, terminator: &'static str, position: Position) -> bool {
        self.from.get(terminator).is_some_and(|&from| from <= position)
    }

    pub(crate) fn insert(&mut self, terminator: &'static str, position: Position) {
        let from = self.from.entry(terminator).or_insert(position);
        *from = (*from).min(position);
    }
}

/// A successfully parsed inline: the detached node and where parsing continues.
#[derive(Debug, Clone, Copy)]
pub struct ParsedInline {
    node: NodeId,
    position: Position,
}

impl ParsedInline {
    pub fn of(node: NodeId, position: Position) -> Self {
        ParsedInline { node, position }
    }
}

/// Inline configuration shared by every document a parser produces.
pub(crate) struct InlineContext {
    delimiters: DelimiterProcessors,
    content_parsers: HashMap<char, Vec<Arc<dyn InlineContentParser>>>,
    /// Characters that end a plain text run.
    special_characters: HashSet<char>,
}

impl InlineContext {
    /// Custom content parsers are tried before the built-in ones.
    pub(crate) fn new(custom_content_parsers: &[Arc<dyn InlineContentParser>], delimiters: DelimiterProcessors) -> Self {
        let mut content_parsers: HashMap<char, Vec<Arc<dyn InlineContentParser>>> = HashMap::new();
        for parser in custom_content_parsers.iter().cloned().chain(content::built_in()) {
            for &c in parser.trigger_characters() {
                content_parsers.entry(c).or_default().push(Arc::clone(&parser));
            }
        }

        let special_characters = ['[', ']', '!', '\n']
            .into_iter()
            .chain(delimiters.characters())
            .chain(content_parsers.keys().copied())
            .collect();

        InlineContext {
            delimiters,
            content_parsers,
            special_characters,
        }
    }
}

/// Parses the inline content of blocks once the block phase is complete.
pub struct InlineParser<'a> {
    context: &'a InlineContext,
    definitions: &'a LinkReferenceDefinitions,
    include_source_spans: bool,
}

impl<'a> InlineParser<'a> {
    pub(crate) fn new(
        context: &'a InlineContext,
        definitions: &'a LinkReferenceDefinitions,
        include_source_spans: bool,
    ) -> Self {
        InlineParser {
            context,
            definitions,
            include_source_spans,
        }
    }

    /// Parse `lines` and append the resulting inline nodes to `block`.
    pub fn parse(&self, tree: &mut Tree, lines: &SourceLines, block: NodeId) {
        let mut run = InlineRun {
            context: self.context,
            definitions: self.definitions,
            include_source_spans: self.include_source_spans,
            tree,
            block,
            scanner: Scanner::new(lines.lines()),
            delimiters: Vec::new(),
            last_delimiter: None,
            brackets: Vec::new(),
            last_bracket: None,
            exhausted: ExhaustedScans::default(),
            trailing_spaces: 0,
        };
        while run.parse_inline() {}
        run.process_delimiters(None);
        merge_text_nodes(run.tree, block);
    }
}

/// State of one inline parse. Delimiters and brackets live in vectors and
/// link to each other by index; removed entries are only unhooked.
struct InlineRun<'a> {
    context: &'a InlineContext,
    definitions: &'a LinkReferenceDefinitions,
    include_source_spans: bool,
    tree: &'a mut Tree,
    block: NodeId,
    scanner: Scanner<'a>,
    delimiters: Vec<DelimiterRun>,
    last_delimiter: Option<usize>,
    brackets: Vec<Bracket>,
    last_bracket: Option<usize>,
    exhausted: ExhaustedScans,
    /// Spaces trimmed from the text before the next line break.
    trailing_spaces: usize,
}

impl InlineRun<'_> {
    /// Parse the next inline at the scanner. `false` at the end of input.
    fn parse_inline(&mut self) -> bool {
        let c = self.scanner.peek();
        match c {
            END => return false,
            '[' => self.parse_open_bracket(),
            '!' => self.parse_bang(),
            ']' => self.parse_close_bracket(),
            '\n' => self.parse_line_break(),
            _ if !self.context.special_characters.contains(&c) => self.parse_text(),
            _ => self.parse_special(c),
        }
        true
    }

    /// Content parsers first, then a delimiter run, then plain text.
    fn parse_special(&mut self, c: char) {
        let context = self.context;
        if let Some(parsers) = context.content_parsers.get(&c) {
            let start = self.scanner.position();
            for parser in parsers {
                let mut state = InlineParserState {
                    scanner: &mut self.scanner,
                    tree: &mut *self.tree,
                    exhausted: &mut self.exhausted,
                    include_source_spans: self.include_source_spans,
                };
                let Some(parsed) = parser.try_parse(&mut state) else {
                    self.scanner.set_position(start);
                    continue;
                };
                self.scanner.set_position(parsed.position);
                if self.include_source_spans && self.tree.source_spans(parsed.node).is_empty() {
                    let spans = self.scanner.source(start, parsed.position).source_spans();
                    self.tree.set_source_spans(parsed.node, spans);
                }
                self.tree.append_child(self.block, parsed.node);
                return;
            }
        }

        if let Some(processor) = context.delimiters.get(c)
            && self.parse_delimiters(processor, c)
        {
            return;
        }
        self.parse_text();
    }

    /// A run of characters up to the next special one. Spaces before a
    /// line break are trimmed and remembered for the break.
    fn parse_text(&mut self) {
        let start = self.scanner.position();
        self.scanner.advance();
        let mut c = self.scanner.peek();
        while c != END && !self.context.special_characters.contains(&c) {
            self.scanner.advance();
            c = self.scanner.peek();
        }

        let source = self.scanner.source(start, self.scanner.position());
        let mut content = source.content();
        if c == '\n' {
            let end = content.trim_end_matches(' ').len();
            self.trailing_spaces = content.len() - end;
            content.truncate(end);
        } else if c == END {
            let end = content.trim_end_matches([' ', '\t']).len();
            content.truncate(end);
        }
        if content.is_empty() {
            return;
        }
        let node = self.text(content, &source);
        self.tree.append_child(self.block, node);
    }

    fn parse_line_break(&mut self) {
        self.scanner.advance();
        let value = if self.trailing_spaces >= 2 {
            NodeValue::HardLineBreak
        } else {
            NodeValue::SoftLineBreak
        };
        self.trailing_spaces = 0;
        let node = self.tree.create(value);
        self.tree.append_child(self.block, node);
    }

    fn text(&mut self, literal: impl Into<String>, source: &SourceLines) -> NodeId {
        let node = self.tree.create(NodeValue::text(literal));
        if self.include_source_spans {
            self.tree.set_source_spans(node, source.source_spans());
        }
        node
    }
}

/// Join adjacent `Text` siblings anywhere below `root`, along with their spans.
fn merge_text_nodes(tree: &mut Tree, root: NodeId) {
    let parents: Vec<NodeId> = tree
        .descendants(root)
        .filter(|&id| tree.first_child(id).is_some())
        .collect();
    for parent in parents {
        let mut child = tree.first_child(parent);
        while let Some(first) = child {
            if tree.text(first).is_some() {
                while let Some(next) = tree.next_sibling(first) {
                    let Some(text) = tree.text(next).map(str::to_string) else {
                        break;
                    };
                    let spans = tree.source_spans(next).to_vec();
                    if let NodeValue::Text { literal } = tree.value_mut(first) {
                        literal.push_str(&text);
                    }
                    tree.merge_source_spans(first, spans);
                    tree.unlink(next);
                }
            }
            child = tree.next_sibling(first);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLine;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> (Tree, NodeId) {
        let context = InlineContext::new(&[], DelimiterProcessors::with_emphasis());
        let definitions = LinkReferenceDefinitions::new();
        let parser = InlineParser::new(&context, &definitions, false);
        let mut tree = Tree::new();
        let block = tree.create(NodeValue::Paragraph);
        let lines: SourceLines = input.split('\n').map(|l| SourceLine::new(l, None)).collect();
        parser.parse(&mut tree, &lines, block);
        (tree, block)
    }

    fn children(tree: &Tree, parent: NodeId) -> Vec<NodeValue> {
        tree.children(parent).map(|id| tree.value(id).clone()).collect()
    }

    #[test]
    fn adjacent_text_is_merged() {
        let (tree, block) = parse("a ] b ! c");
        assert_eq!(children(&tree, block), vec![NodeValue::text("a ] b ! c")]);
    }

    #[test]
    fn trailing_spaces_decide_line_break() {
        let (tree, block) = parse("a  \nb\nc");
        assert_eq!(
            children(&tree, block),
            vec![
                NodeValue::text("a"),
                NodeValue::HardLineBreak,
                NodeValue::text("b"),
                NodeValue::SoftLineBreak,
                NodeValue::text("c"),
            ]
        );
    }

    #[test]
    fn final_line_trims_tabs() {
        let (tree, block) = parse("end \t");
        assert_eq!(children(&tree, block), vec![NodeValue::text("end")]);
    }
}
