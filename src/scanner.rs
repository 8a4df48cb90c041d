/// Cursor over one or more source lines
use crate::source::{SourceLine, SourceLines};

/// Returned by [`Scanner::peek`] once every line has been consumed.
pub const END: char = '\0';

/// A saved scanner location; restoring it rewinds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    line_index: usize,
    index: usize,
}

/// Walks lines character by character. Line boundaries read as a single `\n`.
pub struct Scanner<'a> {
    lines: &'a [SourceLine],
    line_index: usize,
    index: usize,
    line: &'a str,
}

impl<'a> Scanner<'a> {
    pub fn new(lines: &'a [SourceLine]) -> Self {
        Scanner {
            lines,
            line_index: 0,
            index: 0,
            line: lines.first().map_or("", SourceLine::content),
        }
    }

    pub fn peek(&self) -> char {
        match self.line[self.index..].chars().next() {
            Some(c) => c,
            None if self.line_index + 1 < self.lines.len() => '\n',
            None => END,
        }
    }

    /// The character before the cursor, `\n` at the start of a later line, [`END`] at the very start.
    pub fn peek_previous(&self) -> char {
        if self.index > 0 {
            self.line[..self.index].chars().next_back().unwrap_or(END)
        } else if self.line_index > 0 {
            '\n'
        } else {
            END
        }
    }

    pub fn has_next(&self) -> bool {
        self.index < self.line.len() || self.line_index + 1 < self.lines.len()
    }

    pub fn advance(&mut self) {
        match self.line[self.index..].chars().next() {
            Some(c) => self.index += c.len_utf8(),
            None => {
                if self.line_index + 1 < self.lines.len() {
                    self.line_index += 1;
                    self.line = self.lines[self.line_index].content();
                    self.index = 0;
                }
            }
        }
    }

    /// Consume `c` if it is next.
    pub fn advance_if(&mut self, c: char) -> bool {
        if self.peek() == c {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume `content` if the rest of the current line starts with it.
    pub fn advance_if_str(&mut self, content: &str) -> bool {
        if self.line[self.index..].starts_with(content) {
            self.index += content.len();
            true
        } else {
            false
        }
    }

    pub fn match_multiple(&mut self, c: char) -> usize {
        self.match_while(|next| next == c)
    }

    pub fn match_while(&mut self, predicate: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        loop {
            let c = self.peek();
            if c == END || !predicate(c) {
                return count;
            }
            count += 1;
            self.advance();
        }
    }

    /// Skip spaces, tabs, line endings, vertical tabs and form feeds.
    pub fn whitespace(&mut self) -> usize {
        self.match_while(|c| matches!(c, ' ' | '\t' | '\n' | '\u{b}' | '\u{c}' | '\r'))
    }

    /// Move up to the next `c` and return how many characters were skipped.
    pub fn find(&mut self, c: char) -> Option<usize> {
        self.find_matching(|next| next == c)
    }

    pub fn find_matching(&mut self, predicate: impl Fn(char) -> bool) -> Option<usize> {
        let mut count = 0;
        loop {
            let c = self.peek();
            if c == END {
                return None;
            }
            if predicate(c) {
                return Some(count);
            }
            count += 1;
            self.advance();
        }
    }

    pub fn position(&self) -> Position {
        Position {
            line_index: self.line_index,
            index: self.index,
        }
    }

    pub fn set_position(&mut self, position: Position) {
        self.line_index = position.line_index;
        self.index = position.index;
        self.line = self.lines.get(self.line_index).map_or("", SourceLine::content);
    }

    /// The source between two positions, split back into lines.
    pub fn source(&self, begin: Position, end: Position) -> SourceLines {
        if self.lines.is_empty() {
            return SourceLines::empty();
        }
        if begin.line_index == end.line_index {
            let line = &self.lines[begin.line_index];
            return SourceLines::of(line.substring(begin.index, end.index));
        }
        let mut source = SourceLines::empty();
        let first = &self.lines[begin.line_index];
        source.add_line(first.substring(begin.index, first.content().len()));
        for line in &self.lines[begin.line_index + 1..end.line_index] {
            source.add_line(line.clone());
        }
        source.add_line(self.lines[end.line_index].substring(0, end.index));
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &[&str]) -> Vec<SourceLine> {
        input.iter().map(|s| SourceLine::new(*s, None)).collect()
    }

    #[test]
    fn line_boundaries_read_as_newline() {
        let lines = lines(&["ab", "c"]);
        let mut scanner = Scanner::new(&lines);
        assert_eq!(scanner.peek(), 'a');
        scanner.advance();
        scanner.advance();
        assert_eq!(scanner.peek(), '\n');
        scanner.advance();
        assert_eq!(scanner.peek_previous(), '\n');
        assert_eq!(scanner.peek(), 'c');
        scanner.advance();
        assert!(!scanner.has_next());
        assert_eq!(scanner.peek(), END);
    }

    #[test]
    fn source_spans_multiple_lines() {
        let lines = lines(&["foo bar", "baz", "qux"]);
        let mut scanner = Scanner::new(&lines);
        scanner.find('b');
        let start = scanner.position();
        scanner.find('u');
        let source = scanner.source(start, scanner.position());
        assert_eq!(source.content(), "bar\nbaz\nq");
    }

    #[test]
    fn rewinding_restores_exact_position() {
        let lines = lines(&["héllo"]);
        let mut scanner = Scanner::new(&lines);
        scanner.advance();
        let saved = scanner.position();
        assert_eq!(scanner.match_while(|c| c.is_alphabetic()), 4);
        scanner.set_position(saved);
        assert_eq!(scanner.peek(), 'é');
        assert_eq!(scanner.peek_previous(), 'h');
    }

    #[test]
    fn empty_input_is_at_end() {
        let scanner = Scanner::new(&[]);
        assert!(!scanner.has_next());
        assert_eq!(scanner.peek(), END);
        assert_eq!(scanner.peek_previous(), END);
    }
}
