/// Scanning of link labels, destinations and titles, shared by inline links and definitions
use crate::chars::is_escapable;
use crate::scanner::Scanner;

const MAX_PAREN_DEPTH: usize = 32;

fn skip_escape(scanner: &mut Scanner<'_>) {
    scanner.advance();
    if is_escapable(scanner.peek()) {
        scanner.advance();
    }
}

/// Content of a link label up to (not including) the closing `]`. An
/// unescaped `[` makes it invalid.
pub(crate) fn scan_link_label_content(scanner: &mut Scanner<'_>) -> bool {
    while scanner.has_next() {
        match scanner.peek() {
            '\\' => skip_escape(scanner),
            ']' => return true,
            '[' => return false,
            _ => scanner.advance(),
        }
    }
    true
}

/// Either `<...>` without line breaks, or a run without spaces or control
/// characters in which parentheses are balanced.
pub(crate) fn scan_link_destination(scanner: &mut Scanner<'_>) -> bool {
    if !scanner.has_next() {
        return false;
    }
    if scanner.advance_if('<') {
        while scanner.has_next() {
            match scanner.peek() {
                '\\' => skip_escape(scanner),
                '\n' | '<' => return false,
                '>' => {
                    scanner.advance();
                    return true;
                }
                _ => scanner.advance(),
            }
        }
        return false;
    }
    scan_link_destination_with_balanced_parens(scanner)
}

fn scan_link_destination_with_balanced_parens(scanner: &mut Scanner<'_>) -> bool {
    let mut parens = 0;
    let mut empty = true;
    while scanner.has_next() {
        match scanner.peek() {
            ' ' => return !empty && parens == 0,
            '\\' => skip_escape(scanner),
            '(' => {
                parens += 1;
                if parens > MAX_PAREN_DEPTH {
                    return false;
                }
                scanner.advance();
            }
            ')' => {
                if parens == 0 {
                    return true;
                }
                parens -= 1;
                scanner.advance();
            }
            c if c.is_control() => return !empty && parens == 0,
            _ => scanner.advance(),
        }
        empty = false;
    }
    parens == 0
}

/// A complete title including its delimiters: `"..."`, `'...'` or `(...)`.
pub(crate) fn scan_link_title(scanner: &mut Scanner<'_>) -> bool {
    let end_delimiter = match scanner.peek() {
        '"' => '"',
        '\'' => '\'',
        '(' => ')',
        _ => return false,
    };
    scanner.advance();
    if !scan_link_title_content(scanner, end_delimiter) || !scanner.has_next() {
        return false;
    }
    scanner.advance();
    true
}

/// Title content up to the closing delimiter, which is left unconsumed.
pub(crate) fn scan_link_title_content(scanner: &mut Scanner<'_>, end_delimiter: char) -> bool {
    while scanner.has_next() {
        match scanner.peek() {
            '\\' => skip_escape(scanner),
            c if c == end_delimiter => return true,
            // An unescaped `(` cannot appear in a parenthesised title.
            '(' if end_delimiter == ')' => return false,
            _ => scanner.advance(),
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLine;
    use rstest::rstest;

    /// Run `scan` over `input` and return what it consumed, if it succeeded.
    fn scanned(input: &str, scan: impl Fn(&mut Scanner<'_>) -> bool) -> Option<String> {
        let lines: Vec<SourceLine> = input.split('\n').map(|l| SourceLine::new(l, None)).collect();
        let mut scanner = Scanner::new(&lines);
        let start = scanner.position();
        scan(&mut scanner).then(|| scanner.source(start, scanner.position()).content())
    }

    #[rstest]
    #[case("/url", Some("/url"))]
    #[case("/url \"title\"", Some("/url"))]
    #[case("<a b>", Some("<a b>"))]
    #[case("<a\nb>", None)]
    #[case("<a<b>", None)]
    #[case("foo(and(bar))", Some("foo(and(bar))"))]
    #[case("foo(and(bar)", None)]
    #[case("a)b", Some("a"))]
    #[case("\\(foo", Some("\\(foo"))]
    fn destinations(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(scanned(input, scan_link_destination).as_deref(), expected);
    }

    #[test]
    fn destination_nesting_is_bounded() {
        let deep = format!("{}x{}", "(".repeat(33), ")".repeat(33));
        assert_eq!(scanned(&deep, scan_link_destination), None);
        let ok = format!("{}x{}", "(".repeat(32), ")".repeat(32));
        assert_eq!(scanned(&ok, scan_link_destination), Some(ok.clone()));
    }

    #[rstest]
    #[case("\"a \\\" b\"", Some("\"a \\\" b\""))]
    #[case("'multi\nline'", Some("'multi\nline'"))]
    #[case("(a(b)", None)]
    #[case("(a\\(b)", Some("(a\\(b)"))]
    #[case("\"open", None)]
    fn titles(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(scanned(input, scan_link_title).as_deref(), expected);
    }

    #[test]
    fn label_content_stops_at_bracket() {
        assert_eq!(scanned("foo\\]bar]", scan_link_label_content).as_deref(), Some("foo\\]bar"));
        assert_eq!(scanned("foo[bar]", scan_link_label_content), None);
    }
}
