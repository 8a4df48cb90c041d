/// Parser entry points and the builder that configures them
use crate::block::document::DocumentParser;
use crate::block::{
    BlockParserFactory, BlockQuoteFactory, FencedCodeFactory, HeadingFactory, HtmlBlockFactory,
    IndentedCodeFactory, ListFactory, ThematicBreakFactory,
};
use crate::config::{BlockType, IncludeSourceSpans, ParserConfig};
use crate::document::Document;
use crate::error::{ConfigError, Result};
use crate::inline::delimiter::{DelimiterProcessor, DelimiterProcessors};
use crate::inline::{InlineContentParser, InlineContext};
use log::debug;
use std::io::{BufRead, ErrorKind};
use std::sync::Arc;

/// Parses Markdown into a [`Document`]. A parser is immutable once built and
/// can be reused for any number of inputs.
pub struct Parser {
    factories: Vec<Arc<dyn BlockParserFactory>>,
    inline_context: InlineContext,
    include_source_spans: IncludeSourceSpans,
}

impl Parser {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ParserBuilder {
        ParserBuilder::new()
    }

    /// Parse a complete input. `\n`, `\r\n` and a lone `\r` all end a line.
    pub fn parse(&self, input: &str) -> Document {
        let mut document = self.document_parser();
        let mut line_start = 0;
        while let Some(offset) = input[line_start..].find(['\n', '\r']) {
            let line_end = line_start + offset;
            document.parse_line(&input[line_start..line_end], line_start);
            line_start = if input[line_end..].starts_with("\r\n") {
                line_end + 2
            } else {
                line_end + 1
            };
        }
        if line_start < input.len() {
            document.parse_line(&input[line_start..], line_start);
        }
        document.finish()
    }

    /// Parse input that is already split into lines, without terminators.
    pub fn parse_lines<I, S>(&self, lines: I) -> Document
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut document = self.document_parser();
        let mut input_index = 0;
        for line in lines {
            let line = line.as_ref();
            document.parse_line(line, input_index);
            input_index += line.len() + 1;
        }
        document.finish()
    }

    /// Parse from a reader, one line at a time. Invalid UTF-8 is replaced
    /// with U+FFFD; read errors are returned.
    pub fn parse_reader(&self, mut reader: impl BufRead) -> Result<Document> {
        let mut document = self.document_parser();
        let mut line = Vec::new();
        let mut line_start = 0;
        let mut consumed = 0;
        // A `\r` was the last byte seen, so a following `\n` belongs to it.
        let mut pending_cr = false;

        loop {
            let buffer = match reader.fill_buf() {
                Ok(buffer) => buffer,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if buffer.is_empty() {
                break;
            }
            let length = buffer.len();
            for &byte in buffer {
                consumed += 1;
                if std::mem::take(&mut pending_cr) && byte == b'\n' {
                    line_start = consumed;
                    continue;
                }
                if byte == b'\n' || byte == b'\r' {
                    document.parse_line(&String::from_utf8_lossy(&line), line_start);
                    line.clear();
                    line_start = consumed;
                    pending_cr = byte == b'\r';
                } else {
                    line.push(byte);
                }
            }
            reader.consume(length);
        }
        if !line.is_empty() {
            document.parse_line(&String::from_utf8_lossy(&line), line_start);
        }
        Ok(document.finish())
    }

    fn document_parser(&self) -> DocumentParser<'_> {
        DocumentParser::new(&self.factories, &self.inline_context, self.include_source_spans)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects extensions and options for a [`Parser`]. Extensions are
/// validated as they are added, so [`ParserBuilder::build`] cannot fail.
pub struct ParserBuilder {
    custom_factories: Vec<Arc<dyn BlockParserFactory>>,
    enabled_block_types: Vec<BlockType>,
    delimiters: DelimiterProcessors,
    custom_inline_parsers: Vec<Arc<dyn InlineContentParser>>,
    include_source_spans: IncludeSourceSpans,
}

impl ParserBuilder {
    pub fn new() -> Self {
        ParserBuilder {
            custom_factories: Vec::new(),
            enabled_block_types: BlockType::ALL.to_vec(),
            delimiters: DelimiterProcessors::with_emphasis(),
            custom_inline_parsers: Vec::new(),
            include_source_spans: IncludeSourceSpans::None,
        }
    }

    /// Start from a data-only configuration.
    pub fn from_config(config: &ParserConfig) -> std::result::Result<Self, ConfigError> {
        let mut builder = Self::new().include_source_spans(config.include_source_spans);
        if let Some(block_types) = config.block_types()? {
            builder = builder.enabled_block_types(block_types);
        }
        Ok(builder)
    }

    /// Custom factories are tried before the built-in ones, in the order added.
    pub fn custom_block_parser_factory(mut self, factory: impl BlockParserFactory + 'static) -> Self {
        self.custom_factories.push(Arc::new(factory));
        self
    }

    /// Restrict the built-in block types. Paragraphs are always enabled.
    pub fn enabled_block_types(mut self, block_types: impl IntoIterator<Item = BlockType>) -> Self {
        let enabled: Vec<BlockType> = block_types.into_iter().collect();
        self.enabled_block_types = BlockType::ALL
            .into_iter()
            .filter(|block_type| enabled.contains(block_type))
            .collect();
        self
    }

    /// Fails when the processor's characters clash with one already registered,
    /// including the built-in `*` and `_` processors.
    pub fn custom_delimiter_processor(
        mut self,
        processor: impl DelimiterProcessor + 'static,
    ) -> std::result::Result<Self, ConfigError> {
        self.delimiters.add(Arc::new(processor))?;
        Ok(self)
    }

    /// Custom content parsers are tried before the built-in ones for the same character.
    pub fn custom_inline_content_parser(mut self, parser: impl InlineContentParser + 'static) -> Self {
        self.custom_inline_parsers.push(Arc::new(parser));
        self
    }

    pub fn include_source_spans(mut self, include_source_spans: IncludeSourceSpans) -> Self {
        self.include_source_spans = include_source_spans;
        self
    }

    pub fn build(self) -> Parser {
        let mut factories = self.custom_factories;
        let custom_count = factories.len();
        factories.extend(self.enabled_block_types.iter().map(|&block_type| built_in_factory(block_type)));
        debug!(
            "parser built: {} custom block factories, block types [{}], delimiters [{}], {} custom inline parsers, spans {:?}",
            custom_count,
            self.enabled_block_types
                .iter()
                .map(|block_type| block_type.name())
                .collect::<Vec<_>>()
                .join(", "),
            self.delimiters.characters().collect::<String>(),
            self.custom_inline_parsers.len(),
            self.include_source_spans,
        );

        Parser {
            factories,
            inline_context: InlineContext::new(&self.custom_inline_parsers, self.delimiters),
            include_source_spans: self.include_source_spans,
        }
    }
}

impl Default for ParserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn built_in_factory(block_type: BlockType) -> Arc<dyn BlockParserFactory> {
    match block_type {
        BlockType::BlockQuote => Arc::new(BlockQuoteFactory),
        BlockType::Heading => Arc::new(HeadingFactory),
        BlockType::FencedCodeBlock => Arc::new(FencedCodeFactory),
        BlockType::HtmlBlock => Arc::new(HtmlBlockFactory),
        BlockType::ThematicBreak => Arc::new(ThematicBreakFactory),
        BlockType::List => Arc::new(ListFactory),
        BlockType::IndentedCodeBlock => Arc::new(IndentedCodeFactory),
    }
}
