/// Backslash escapes, character references and label normalisation
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use unicode_casefold::UnicodeCaseFold;

pub(crate) const ENTITY: &str = r"&(?:#x[a-f0-9]{1,6}|#[0-9]{1,7}|[a-z][a-z0-9]{1,31});";

static ENTITY_OR_ESCAPED_CHAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r##"(?i)\\[!"#$%&'()*+,./:;<=>?@\[\\\]^_`{{|}}~-]|{ENTITY}"##))
        .expect("escape pattern should compile")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ \t\r\n]+").expect("whitespace pattern should compile")
});

/// Resolve backslash escapes and character references, as used for link
/// destinations, titles and info strings.
pub fn unescape_string(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') && !s.contains('&') {
        return Cow::Borrowed(s);
    }
    ENTITY_OR_ESCAPED_CHAR.replace_all(s, |caps: &Captures<'_>| {
        let matched = &caps[0];
        match matched.strip_prefix('\\') {
            Some(escaped) => escaped.to_string(),
            None => entity_to_string(matched),
        }
    })
}

/// Decode one `&...;` reference. Unknown named references come back unchanged.
pub fn entity_to_string(input: &str) -> String {
    let Some(body) = input
        .strip_prefix('&')
        .and_then(|rest| rest.strip_suffix(';'))
    else {
        return input.to_string();
    };

    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => numeric.parse::<u32>(),
        };
        let c = code
            .ok()
            .filter(|&code| code != 0)
            .and_then(char::from_u32)
            .unwrap_or('\u{fffd}');
        return c.to_string();
    }

    let decoded = html_escape::decode_html_entities(input);
    if decoded != input && decoded.chars().count() <= 2 {
        decoded.into_owned()
    } else {
        input.to_string()
    }
}

/// Key under which a link label is stored and looked up: trimmed, case folded
/// and with internal whitespace runs collapsed to one space.
pub fn normalize_label(input: &str) -> String {
    let folded: String = input
        .trim_matches(|c: char| c <= ' ')
        .chars()
        .case_fold()
        .collect();
    WHITESPACE.replace_all(&folded, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescapes_backslashes_and_entities() {
        assert_eq!(unescape_string(r"\*not emphasis\*"), "*not emphasis*");
        assert_eq!(unescape_string(r"a\bc"), r"a\bc");
        assert_eq!(unescape_string("&amp; &copy; &#35; &#X22;"), "& © # \"");
        assert_eq!(unescape_string("&nosuchentity;"), "&nosuchentity;");
        assert!(matches!(unescape_string("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn invalid_code_points_become_replacement() {
        assert_eq!(entity_to_string("&#0;"), "\u{fffd}");
        assert_eq!(entity_to_string("&#xD800;"), "\u{fffd}");
        assert_eq!(entity_to_string("&#1234567;"), "\u{fffd}");
    }

    #[test]
    fn labels_fold_case_and_whitespace() {
        assert_eq!(normalize_label("  Foo \n\t BAR "), "foo bar");
        assert_eq!(normalize_label("ẞ"), normalize_label("SS"));
        assert_eq!(normalize_label(" \n "), "");
    }
}
