/// Link and image brackets: `[`, `![` and the `]` that may close them
use super::InlineRun;
use super::link_scanner::{scan_link_destination, scan_link_label_content, scan_link_title};
use crate::escaping::unescape_string;
use crate::node::{NodeId, NodeValue};
use crate::scanner::{Position, Scanner};

const MAX_LABEL_LENGTH: usize = 999;

/// An opening `[` or `![` waiting for its `]`.
pub(super) struct Bracket {
    /// The text node holding the bracket itself.
    node: NodeId,
    marker_position: Position,
    content_position: Position,
    image: bool,
    previous: Option<usize>,
    /// Top of the delimiter stack when the bracket was opened.
    previous_delimiter: Option<usize>,
    /// Cleared once a link is found inside; links cannot nest.
    allowed: bool,
    /// Another bracket was opened after this one, so its text cannot be a label.
    bracket_after: bool,
}

impl InlineRun<'_> {
    pub(super) fn parse_open_bracket(&mut self) {
        let start = self.scanner.position();
        self.scanner.advance();
        self.open_bracket(start, false);
    }

    /// `!` opens an image when followed by `[`, otherwise it is text.
    pub(super) fn parse_bang(&mut self) {
        let start = self.scanner.position();
        self.scanner.advance();
        if self.scanner.advance_if('[') {
            self.open_bracket(start, true);
        } else {
            let source = self.scanner.source(start, self.scanner.position());
            let node = self.text("!", &source);
            self.tree.append_child(self.block, node);
        }
    }

    fn open_bracket(&mut self, start: Position, image: bool) {
        let content_position = self.scanner.position();
        let source = self.scanner.source(start, content_position);
        let node = self.text(source.content(), &source);
        self.tree.append_child(self.block, node);

        if let Some(last) = self.last_bracket {
            self.brackets[last].bracket_after = true;
        }
        self.brackets.push(Bracket {
            node,
            marker_position: start,
            content_position,
            image,
            previous: self.last_bracket,
            previous_delimiter: self.last_delimiter,
            allowed: true,
            bracket_after: false,
        });
        self.last_bracket = Some(self.brackets.len() - 1);
    }

    /// Close the innermost bracket as a link or image if a destination can
    /// be found inline or by reference; otherwise `]` is literal text.
    pub(super) fn parse_close_bracket(&mut self) {
        let before_close = self.scanner.position();
        self.scanner.advance();
        let after_close = self.scanner.position();

        let Some(opener_index) = self.last_bracket else {
            self.close_bracket_as_text(before_close, after_close);
            return;
        };
        if !self.brackets[opener_index].allowed {
            self.remove_last_bracket();
            self.close_bracket_as_text(before_close, after_close);
            return;
        }

        let destination = self
            .inline_destination(after_close)
            .or_else(|| self.reference_destination(opener_index, before_close, after_close));
        let Some((destination, title)) = destination else {
            self.remove_last_bracket();
            self.close_bracket_as_text(before_close, after_close);
            return;
        };

        let opener = &self.brackets[opener_index];
        let (opener_node, image, previous_delimiter, marker_position) =
            (opener.node, opener.image, opener.previous_delimiter, opener.marker_position);
        let value = if image {
            NodeValue::Image { destination, title }
        } else {
            NodeValue::Link { destination, title }
        };
        let link = self.tree.create(value);
        while let Some(node) = self.tree.next_sibling(opener_node) {
            self.tree.append_child(link, node);
        }
        self.tree.append_child(self.block, link);
        if self.include_source_spans {
            let spans = self.scanner.source(marker_position, self.scanner.position()).source_spans();
            self.tree.set_source_spans(link, spans);
        }

        // Emphasis inside the link text resolves on its own.
        self.process_delimiters(previous_delimiter);
        self.tree.unlink(opener_node);
        self.remove_last_bracket();

        if !image {
            let mut bracket = self.last_bracket;
            while let Some(index) = bracket {
                if !self.brackets[index].image {
                    self.brackets[index].allowed = false;
                }
                bracket = self.brackets[index].previous;
            }
        }
    }

    /// `(destination "title")` right after the `]`. On failure the scanner is
    /// back after the `]`.
    fn inline_destination(&mut self, after_close: Position) -> Option<(String, Option<String>)> {
        if !self.scanner.advance_if('(') {
            return None;
        }
        self.scanner.whitespace();
        let Some(destination) = parse_link_destination(&mut self.scanner) else {
            self.scanner.set_position(after_close);
            return None;
        };
        let mut title = None;
        // A title has to be separated from the destination.
        if self.scanner.whitespace() >= 1 {
            title = parse_link_title(&mut self.scanner);
            self.scanner.whitespace();
        }
        if !self.scanner.advance_if(')') {
            self.scanner.set_position(after_close);
            return None;
        }
        Some((destination, title))
    }

    /// Full `[text][label]`, collapsed `[text][]` or shortcut `[text]` reference.
    fn reference_destination(
        &mut self,
        opener_index: usize,
        before_close: Position,
        after_close: Position,
    ) -> Option<(String, Option<String>)> {
        let mut label = parse_link_label(&mut self.scanner);
        if label.is_none() {
            self.scanner.set_position(after_close);
        }
        let opener = &self.brackets[opener_index];
        // The bracket text is only a label when it contains no other bracket.
        if label.as_deref().is_none_or(str::is_empty) && !opener.bracket_after {
            label = Some(self.scanner.source(opener.content_position, before_close).content());
        }
        let definition = self.definitions.get(&label?)?;
        Some((definition.destination.clone(), definition.title.clone()))
    }

    fn close_bracket_as_text(&mut self, before_close: Position, after_close: Position) {
        self.scanner.set_position(after_close);
        let source = self.scanner.source(before_close, after_close);
        let node = self.text("]", &source);
        self.tree.append_child(self.block, node);
    }

    fn remove_last_bracket(&mut self) {
        if let Some(last) = self.last_bracket {
            self.last_bracket = self.brackets[last].previous;
        }
    }
}

fn parse_link_destination(scanner: &mut Scanner<'_>) -> Option<String> {
    let pointy = scanner.peek() == '<';
    let start = scanner.position();
    if !scan_link_destination(scanner) {
        return None;
    }
    let raw = scanner.source(start, scanner.position()).content();
    let destination = if pointy { &raw[1..raw.len() - 1] } else { &raw[..] };
    Some(unescape_string(destination).into_owned())
}

fn parse_link_title(scanner: &mut Scanner<'_>) -> Option<String> {
    let start = scanner.position();
    if !scan_link_title(scanner) {
        return None;
    }
    let raw = scanner.source(start, scanner.position()).content();
    Some(unescape_string(&raw[1..raw.len() - 1]).into_owned())
}

/// `[label]` with at most 999 characters inside; the content without brackets.
fn parse_link_label(scanner: &mut Scanner<'_>) -> Option<String> {
    if !scanner.advance_if('[') {
        return None;
    }
    let start = scanner.position();
    if !scan_link_label_content(scanner) {
        return None;
    }
    let end = scanner.position();
    if !scanner.advance_if(']') {
        return None;
    }
    let content = scanner.source(start, end).content();
    (content.chars().count() <= MAX_LABEL_LENGTH).then_some(content)
}
