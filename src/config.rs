/// Data-only parser configuration, loadable from JSON
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How much source position information ends up on nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeSourceSpans {
    #[default]
    None,
    Blocks,
    BlocksAndInlines,
}

/// The built-in block types that can be switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    BlockQuote,
    Heading,
    FencedCodeBlock,
    HtmlBlock,
    ThematicBreak,
    List,
    IndentedCodeBlock,
}

impl BlockType {
    /// All built-in types in the order their factories are consulted.
    pub const ALL: [BlockType; 7] = [
        BlockType::BlockQuote,
        BlockType::Heading,
        BlockType::FencedCodeBlock,
        BlockType::HtmlBlock,
        BlockType::ThematicBreak,
        BlockType::List,
        BlockType::IndentedCodeBlock,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BlockType::BlockQuote => "block_quote",
            BlockType::Heading => "heading",
            BlockType::FencedCodeBlock => "fenced_code_block",
            BlockType::HtmlBlock => "html_block",
            BlockType::ThematicBreak => "thematic_break",
            BlockType::List => "list",
            BlockType::IndentedCodeBlock => "indented_code_block",
        }
    }
}

impl FromStr for BlockType {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ConfigError::UnknownBlockType {
                name: name.to_string(),
                allowed: BlockType::ALL.iter().map(|t| t.name()).collect(),
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub include_source_spans: IncludeSourceSpans,
    /// Names of the built-in block types to enable; `None` enables all of them.
    pub enabled_block_types: Option<Vec<String>>,
}

impl ParserConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve the configured names, rejecting any that are not built-in types.
    pub fn block_types(&self) -> Result<Option<Vec<BlockType>>, ConfigError> {
        self.enabled_block_types
            .as_ref()
            .map(|names| names.iter().map(|name| name.parse()).collect())
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config = ParserConfig::from_json("{}").unwrap();
        assert_eq!(config, ParserConfig::default());
        assert_eq!(config.block_types().unwrap(), None);
    }

    #[test]
    fn reads_span_level_and_block_types() {
        let config = ParserConfig::from_json(
            r#"{"include_source_spans": "blocks_and_inlines", "enabled_block_types": ["heading", "list"]}"#,
        )
        .unwrap();
        assert_eq!(config.include_source_spans, IncludeSourceSpans::BlocksAndInlines);
        assert_eq!(
            config.block_types().unwrap(),
            Some(vec![BlockType::Heading, BlockType::List])
        );
    }

    #[test]
    fn unknown_block_type_lists_allowed_names() {
        let err = "table".parse::<BlockType>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'table'"));
        assert!(message.contains("block_quote, heading, fenced_code_block"));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            ParserConfig::from_json("{\"include_source_spans\": 3}"),
            Err(ConfigError::InvalidConfig(_))
        ));
    }
}
