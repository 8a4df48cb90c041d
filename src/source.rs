/// Source lines and the spans that tie nodes back to the input
use serde::{Deserialize, Serialize};

/// A range of one input line: `length` characters starting at `column_index`.
///
/// `input_index` is the same start expressed as an offset into the whole input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub line_index: usize,
    pub column_index: usize,
    pub input_index: usize,
    pub length: usize,
}

impl SourceSpan {
    pub fn new(line_index: usize, column_index: usize, input_index: usize, length: usize) -> Self {
        SourceSpan {
            line_index,
            column_index,
            input_index,
            length,
        }
    }

    fn end_column(&self) -> usize {
        self.column_index + self.length
    }
}

/// Append spans, merging each one into the previous span when it continues it on the same line.
pub(crate) fn merge_spans<I>(target: &mut Vec<SourceSpan>, spans: I)
where
    I: IntoIterator<Item = SourceSpan>,
{
    for span in spans {
        match target.last_mut() {
            Some(last) if last.line_index == span.line_index && last.end_column() == span.column_index => {
                last.length += span.length;
            }
            _ => target.push(span),
        }
    }
}

/// One line of content (without its line terminator) and where it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLine {
    content: String,
    span: Option<SourceSpan>,
}

impl SourceLine {
    pub fn new(content: impl Into<String>, span: Option<SourceSpan>) -> Self {
        SourceLine {
            content: content.into(),
            span,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn span(&self) -> Option<SourceSpan> {
        self.span
    }

    /// Byte range `begin..end` of this line, with the span narrowed to match.
    pub fn substring(&self, begin: usize, end: usize) -> SourceLine {
        let span = self.span.and_then(|span| {
            let length = end - begin;
            (length != 0).then(|| {
                SourceSpan::new(
                    span.line_index,
                    span.column_index + begin,
                    span.input_index + begin,
                    length,
                )
            })
        });
        SourceLine::new(&self.content[begin..end], span)
    }
}

/// An ordered run of lines that is treated as one unit, e.g. the text of a paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLines {
    lines: Vec<SourceLine>,
}

impl SourceLines {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(line: SourceLine) -> Self {
        SourceLines { lines: vec![line] }
    }

    pub fn add_line(&mut self, line: SourceLine) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// The lines joined with `\n`.
    pub fn content(&self) -> String {
        let mut content = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i != 0 {
                content.push('\n');
            }
            content.push_str(line.content());
        }
        content
    }

    pub fn source_spans(&self) -> Vec<SourceSpan> {
        self.lines.iter().filter_map(SourceLine::span).collect()
    }
}

impl FromIterator<SourceLine> for SourceLines {
    fn from_iter<T: IntoIterator<Item = SourceLine>>(iter: T) -> Self {
        SourceLines {
            lines: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_narrows_span() {
        let line = SourceLine::new("hello world", Some(SourceSpan::new(2, 4, 30, 11)));
        let sub = line.substring(6, 11);
        assert_eq!(sub.content(), "world");
        assert_eq!(sub.span(), Some(SourceSpan::new(2, 10, 36, 5)));
        assert_eq!(line.substring(3, 3).span(), None);
    }

    #[test]
    fn content_joins_with_newlines() {
        let lines: SourceLines = ["a", "b", "c"]
            .into_iter()
            .map(|s| SourceLine::new(s, None))
            .collect();
        assert_eq!(lines.content(), "a\nb\nc");
    }

    #[test]
    fn adjacent_spans_merge() {
        let mut spans = vec![SourceSpan::new(0, 0, 0, 3)];
        merge_spans(
            &mut spans,
            [SourceSpan::new(0, 3, 3, 2), SourceSpan::new(1, 0, 6, 4)],
        );
        assert_eq!(
            spans,
            vec![SourceSpan::new(0, 0, 0, 5), SourceSpan::new(1, 0, 6, 4)]
        );
    }
}
