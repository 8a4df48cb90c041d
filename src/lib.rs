/// A CommonMark parser producing an arena-backed document tree
pub mod ast;
mod block;
mod chars;
pub mod config;
pub mod definitions;
pub mod document;
pub mod error;
mod escaping;
mod inline;
pub mod node;
pub mod parser;
pub mod scanner;
pub mod source;

pub use block::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlockParser, ParserState,
};
pub use config::{BlockType, IncludeSourceSpans, ParserConfig};
pub use document::Document;
pub use error::{ConfigError, Error, Result};
pub use inline::delimiter::{DelimiterProcessor, DelimiterRun, EmphasisDelimiterProcessor};
pub use inline::{InlineContentParser, InlineParser, InlineParserState, ParsedInline};
pub use node::{ListKind, NodeId, NodeValue, Tree};
pub use parser::{Parser, ParserBuilder};

/// Parse markdown text with the default configuration
pub fn parse(markdown: &str) -> Document {
    Parser::new().parse(markdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Any input parses, and every node below the root is reachable from it.
    #[test_fuzz::test_fuzz]
    fn parse_target(input: String) {
        let document = parse(&input);
        let tree = document.tree();
        for id in tree.descendants(document.root()) {
            if id != document.root() {
                assert!(tree.parent(id).is_some());
            }
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse("").to_ast(), ast::Node::Document(vec![]));
    }

    #[test]
    fn test_fuzz_seeds() {
        for seed in [
            "",
            "\t\t>\t-\t```",
            "[[[[]]]]](((",
            "*_*_**__**",
            "<!-- unterminated\n\n- \n  * [a]: <b",
            "&#0; &#x110000; &nosuch;",
        ] {
            parse_target(seed.to_string());
        }
    }
}
