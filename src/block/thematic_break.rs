use super::{BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlockParser, ParserState};
use crate::chars::{CODE_BLOCK_INDENT, is_space_or_tab};
use crate::node::{NodeId, NodeValue};

struct ThematicBreakParser;

impl BlockParser for ThematicBreakParser {
    fn block_value(&self) -> NodeValue {
        NodeValue::ThematicBreak
    }

    fn try_continue(&mut self, _state: &ParserState<'_>, _block: NodeId) -> Option<BlockContinue> {
        None
    }
}

pub(crate) struct ThematicBreakFactory;

impl BlockParserFactory for ThematicBreakFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlockParser<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let line = state.line().content();
        is_thematic_break(&line[state.next_non_space_index()..])
            .then(|| BlockStart::of(ThematicBreakParser).at_index(line.len()))
    }
}

/// Three or more of the same `-`, `_` or `*`, optionally separated by spaces or tabs.
fn is_thematic_break(rest: &str) -> bool {
    let Some(marker) = rest.chars().next().filter(|c| matches!(c, '-' | '_' | '*')) else {
        return false;
    };
    let mut count = 0;
    for c in rest.chars() {
        if c == marker {
            count += 1;
        } else if !is_space_or_tab(c) {
            return false;
        }
    }
    count >= 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("***", true)]
    #[case("- - -", true)]
    #[case("_\t_ _  ", true)]
    #[case("--", false)]
    #[case("+++", false)]
    #[case("*-*", false)]
    #[case("--- a", false)]
    fn markers(#[case] rest: &str, #[case] expected: bool) {
        assert_eq!(is_thematic_break(rest), expected);
    }
}
