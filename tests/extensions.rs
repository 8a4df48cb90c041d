use arbormark::ast::Node;
use arbormark::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, ConfigError, DelimiterProcessor, DelimiterRun,
    InlineContentParser, InlineParserState, MatchedBlockParser, NodeId, NodeValue, ParsedInline, Parser,
    ParserState, Tree,
};
use pretty_assertions::assert_eq;

fn text(s: &str) -> Node {
    Node::Text(s.to_string())
}

fn custom(name: &str, children: Vec<Node>) -> Node {
    Node::CustomInline {
        name: name.to_string(),
        children,
    }
}

/// A one-line block for lines starting with `marker`.
struct MarkerLine {
    name: &'static str,
}

impl BlockParser for MarkerLine {
    fn block_value(&self) -> NodeValue {
        NodeValue::CustomBlock {
            name: self.name.to_string(),
        }
    }

    fn try_continue(&mut self, _state: &ParserState<'_>, _block: NodeId) -> Option<BlockContinue> {
        None
    }
}

struct MarkerLineFactory {
    marker: &'static str,
    name: &'static str,
}

impl BlockParserFactory for MarkerLineFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: &MatchedBlockParser<'_>) -> Option<BlockStart> {
        let content = state.line().content();
        if state.indent() >= 4 || !content[state.next_non_space_index()..].starts_with(self.marker) {
            return None;
        }
        Some(BlockStart::of(MarkerLine { name: self.name }).at_index(content.len()))
    }
}

#[test]
fn custom_block_factory_creates_blocks() {
    let parser = Parser::builder()
        .custom_block_parser_factory(MarkerLineFactory {
            marker: "%%",
            name: "comment",
        })
        .build();
    assert_eq!(
        parser.parse("%% hidden\ntext").to_ast(),
        Node::Document(vec![
            Node::CustomBlock {
                name: "comment".to_string(),
                children: vec![],
            },
            Node::Paragraph(vec![text("text")]),
        ])
    );
}

#[test]
fn custom_block_factory_runs_before_built_ins() {
    let input = "a\n\n***";
    assert_eq!(
        Parser::new().parse(input).to_ast(),
        Node::Document(vec![Node::Paragraph(vec![text("a")]), Node::ThematicBreak])
    );

    let parser = Parser::builder()
        .custom_block_parser_factory(MarkerLineFactory {
            marker: "***",
            name: "separator",
        })
        .build();
    assert_eq!(
        parser.parse(input).to_ast(),
        Node::Document(vec![
            Node::Paragraph(vec![text("a")]),
            Node::CustomBlock {
                name: "separator".to_string(),
                children: vec![],
            },
        ])
    );
}

/// Wraps the text between matching runs in a `CustomInline` node.
struct Wrapping {
    opening: char,
    closing: char,
    min_length: usize,
    name: &'static str,
}

impl Wrapping {
    fn symmetric(c: char, min_length: usize, name: &'static str) -> Self {
        Wrapping {
            opening: c,
            closing: c,
            min_length,
            name,
        }
    }
}

impl DelimiterProcessor for Wrapping {
    fn opening_character(&self) -> char {
        self.opening
    }

    fn closing_character(&self) -> char {
        self.closing
    }

    fn min_length(&self) -> usize {
        self.min_length
    }

    fn process(&self, tree: &mut Tree, opener: &DelimiterRun, closer: &DelimiterRun) -> usize {
        if opener.length() < self.min_length || closer.length() < self.min_length {
            return 0;
        }
        let node = tree.create(NodeValue::CustomInline {
            name: self.name.to_string(),
        });
        tree.wrap_between(node, opener.opener(), closer.closer());
        tree.insert_after(opener.opener(), node);
        self.min_length
    }
}

#[test]
fn custom_delimiter_processor_wraps_content() {
    let parser = Parser::builder()
        .custom_delimiter_processor(Wrapping::symmetric('~', 2, "strikethrough"))
        .unwrap()
        .build();
    assert_eq!(
        parser.parse("a ~~b~~ ~c~").to_ast(),
        Node::Document(vec![Node::Paragraph(vec![
            text("a "),
            custom("strikethrough", vec![text("b")]),
            text(" ~c~"),
        ])])
    );
}

#[test]
fn processors_sharing_a_character_are_staggered() {
    let parser = Parser::builder()
        .custom_delimiter_processor(Wrapping::symmetric('~', 1, "subscript"))
        .unwrap()
        .custom_delimiter_processor(Wrapping::symmetric('~', 2, "strikethrough"))
        .unwrap()
        .build();
    assert_eq!(
        parser.parse("~~a~~ ~b~").to_ast(),
        Node::Document(vec![Node::Paragraph(vec![
            custom("strikethrough", vec![text("a")]),
            text(" "),
            custom("subscript", vec![text("b")]),
        ])])
    );
}

#[test]
fn asymmetric_processor_uses_both_characters() {
    let parser = Parser::builder()
        .custom_delimiter_processor(Wrapping {
            opening: '{',
            closing: '}',
            min_length: 1,
            name: "braced",
        })
        .unwrap()
        .build();
    assert_eq!(
        parser.parse("{a *b*}").to_ast(),
        Node::Document(vec![Node::Paragraph(vec![custom(
            "braced",
            vec![text("a "), Node::Emphasis(vec![text("b")])],
        )])])
    );
}

#[test]
fn duplicate_min_length_is_rejected_at_registration() {
    let error = Parser::builder()
        .custom_delimiter_processor(Wrapping::symmetric('~', 2, "one"))
        .unwrap()
        .custom_delimiter_processor(Wrapping::symmetric('~', 2, "two"))
        .err();
    assert!(matches!(
        error,
        Some(ConfigError::DuplicateDelimiterProcessor {
            delimiter: '~',
            min_length: 2
        })
    ));

    // The built-in emphasis processors take part in the check.
    let error = Parser::builder()
        .custom_delimiter_processor(Wrapping::symmetric('*', 1, "star"))
        .err();
    assert!(matches!(
        error,
        Some(ConfigError::DuplicateDelimiterProcessor { delimiter: '*', .. })
    ));
}

#[test]
fn asymmetric_processor_cannot_reuse_a_character() {
    let error = Parser::builder()
        .custom_delimiter_processor(Wrapping {
            opening: '_',
            closing: '|',
            min_length: 1,
            name: "clash",
        })
        .err();
    assert!(matches!(
        error,
        Some(ConfigError::DelimiterCharacterConflict { delimiter: '_' })
    ));
}

/// `@name` mentions.
struct MentionParser;

impl InlineContentParser for MentionParser {
    fn trigger_characters(&self) -> &[char] {
        &['@']
    }

    fn try_parse(&self, state: &mut InlineParserState<'_, '_>) -> Option<ParsedInline> {
        let scanner = state.scanner();
        scanner.advance();
        let start = scanner.position();
        if scanner.match_while(|c| c.is_ascii_alphanumeric()) == 0 {
            return None;
        }
        let end = scanner.position();
        let source = scanner.source(start, end);

        let mention = state.tree().create(NodeValue::CustomInline {
            name: "mention".to_string(),
        });
        let name = state.text(source.content(), &source);
        state.tree().append_child(mention, name);
        Some(ParsedInline::of(mention, end))
    }
}

#[test]
fn custom_inline_content_parser() {
    let parser = Parser::builder().custom_inline_content_parser(MentionParser).build();
    assert_eq!(
        parser.parse("hi @alice, and @ nobody").to_ast(),
        Node::Document(vec![Node::Paragraph(vec![
            text("hi "),
            custom("mention", vec![text("alice")]),
            text(", and @ nobody"),
        ])])
    );
    // Inside code spans the trigger has no effect.
    assert_eq!(
        parser.parse("`@alice`").to_ast(),
        Node::Document(vec![Node::Paragraph(vec![Node::Code("@alice".to_string())])])
    );
}

#[test]
fn parser_is_shareable_across_threads() {
    let parser = std::sync::Arc::new(Parser::builder().custom_inline_content_parser(MentionParser).build());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let parser = std::sync::Arc::clone(&parser);
            std::thread::spawn(move || parser.parse(&format!("@user{i}")).to_ast())
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.join().unwrap(),
            Node::Document(vec![Node::Paragraph(vec![custom(
                "mention",
                vec![text(&format!("user{i}"))]
            )])])
        );
    }
}
