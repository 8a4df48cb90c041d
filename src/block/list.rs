use super::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlockParser, ParserState};
use crate::chars::{CODE_BLOCK_INDENT, columns_to_next_tab_stop};
use crate::node::{ListKind, NodeId, NodeValue, Tree};

struct ListBlockParser {
    kind: ListKind,
    had_blank_line: bool,
    lines_after_blank: usize,
}

impl BlockParser for ListBlockParser {
    fn block_value(&self) -> NodeValue {
        // Tight until a blank line proves otherwise.
        NodeValue::List {
            kind: self.kind,
            tight: true,
        }
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, tree: &mut Tree, block: NodeId, child: &NodeValue) -> bool {
        if !matches!(child, NodeValue::ListItem { .. }) {
            return false;
        }
        // A blank line right before the next item makes the list loose.
        if self.had_blank_line && self.lines_after_blank == 1 {
            set_loose(tree, block);
            self.had_blank_line = false;
        }
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>, _block: NodeId) -> Option<BlockContinue> {
        if state.is_blank() {
            self.had_blank_line = true;
            self.lines_after_blank = 0;
        } else if self.had_blank_line {
            self.lines_after_blank += 1;
        }
        // The list has no marker of its own; a block start that is not an
        // item closes it through can_contain.
        Some(BlockContinue::AtIndex(state.index()))
    }
}

struct ListItemParser {
    marker_indent: usize,
    content_indent: usize,
    had_blank_line: bool,
}

impl BlockParser for ListItemParser {
    fn block_value(&self) -> NodeValue {
        NodeValue::ListItem {
            marker_indent: self.marker_indent,
            content_indent: self.content_indent,
        }
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, tree: &mut Tree, block: NodeId, _child: &NodeValue) -> bool {
        if self.had_blank_line
            && let Some(parent) = tree.parent(block)
        {
            set_loose(tree, parent);
        }
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>, block: NodeId) -> Option<BlockContinue> {
        if state.is_blank() {
            // A blank line after an empty item ends it.
            state.tree().first_child(block)?;
            // Blank lines inside code blocks do not loosen the list.
            self.had_blank_line = matches!(
                state.active_block_value(),
                NodeValue::Paragraph | NodeValue::ListItem { .. }
            );
            return Some(BlockContinue::AtIndex(state.next_non_space_index()));
        }
        (state.indent() >= self.content_indent)
            .then(|| BlockContinue::AtColumn(state.column() + self.content_indent))
    }
}

fn set_loose(tree: &mut Tree, list: NodeId) {
    if let NodeValue::List { tight, .. } = tree.value_mut(list) {
        *tight = false;
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ListMarker {
    kind: ListKind,
    index_after_marker: usize,
}

fn is_space_tab_or_end(line: &str, index: usize) -> bool {
    matches!(line.as_bytes().get(index), None | Some(b' ' | b'\t'))
}

fn parse_list_marker(line: &str, index: usize) -> Option<ListMarker> {
    let marker = line[index..].chars().next()?;
    match marker {
        '-' | '+' | '*' => is_space_tab_or_end(line, index + 1).then_some(ListMarker {
            kind: ListKind::Bullet { marker },
            index_after_marker: index + 1,
        }),
        _ => parse_ordered_marker(line, index),
    }
}

/// One to nine digits followed by `.` or `)`.
fn parse_ordered_marker(line: &str, index: usize) -> Option<ListMarker> {
    let rest = &line[index..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let delimiter = rest[digits..].chars().next().filter(|c| matches!(c, '.' | ')'))?;
    let after = index + digits + 1;
    if !is_space_tab_or_end(line, after) {
        return None;
    }
    let start = rest[..digits].parse().ok()?;
    Some(ListMarker {
        kind: ListKind::Ordered { start, delimiter },
        index_after_marker: after,
    })
}

/// Marker kind plus the column where the item's content starts.
fn parse_list(line: &str, marker_index: usize, marker_column: usize, in_paragraph: bool) -> Option<(ListKind, usize)> {
    let marker = parse_list_marker(line, marker_index)?;
    // Markers contain no tabs, so their length is their width in columns.
    let column_after_marker = marker_column + marker.index_after_marker - marker_index;

    let mut content_column = column_after_marker;
    let mut has_content = false;
    for c in line[marker.index_after_marker..].chars() {
        match c {
            '\t' => content_column += columns_to_next_tab_stop(content_column),
            ' ' => content_column += 1,
            _ => {
                has_content = true;
                break;
            }
        }
    }

    if in_paragraph {
        // Only `1.` and items with content may interrupt a paragraph.
        if matches!(marker.kind, ListKind::Ordered { start, .. } if start != 1) || !has_content {
            return None;
        }
    }

    if !has_content || content_column - column_after_marker > CODE_BLOCK_INDENT {
        // Blank item or indented code after the marker: content starts one column in.
        content_column = column_after_marker + 1;
    }
    Some((marker.kind, content_column))
}

fn lists_match(a: ListKind, b: ListKind) -> bool {
    match (a, b) {
        (ListKind::Bullet { marker: a }, ListKind::Bullet { marker: b }) => a == b,
        (ListKind::Ordered { delimiter: a, .. }, ListKind::Ordered { delimiter: b, .. }) => a == b,
        _ => false,
    }
}

pub(crate) struct ListFactory;

impl BlockParserFactory for ListFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: &MatchedBlockParser<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let marker_column = state.column() + state.indent();
        let in_paragraph = matched.paragraph_lines().is_some();
        let (kind, content_column) = parse_list(
            state.line().content(),
            state.next_non_space_index(),
            marker_column,
            in_paragraph,
        )?;

        let item = ListItemParser {
            marker_indent: state.indent(),
            content_indent: content_column - state.column(),
            had_blank_line: false,
        };
        let continues_list = matches!(
            state.tree().value(matched.block()),
            NodeValue::List { kind: existing, .. } if lists_match(*existing, kind)
        );
        let start = if continues_list {
            BlockStart::of(item)
        } else {
            BlockStart::of_many(vec![
                Box::new(ListBlockParser {
                    kind,
                    had_blank_line: false,
                    lines_after_blank: 0,
                }),
                Box::new(item),
            ])
        };
        Some(start.at_column(content_column))
    }
}
