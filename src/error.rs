/// Error types. Parsing never fails; only configuration and I/O can.
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("delimiter processor for '{delimiter}' with minimum length {min_length} is already registered")]
    DuplicateDelimiterProcessor { delimiter: char, min_length: usize },

    #[error("delimiter '{delimiter}' is already used with a different counterpart character")]
    DelimiterCharacterConflict { delimiter: char },

    #[error("unknown block type '{name}', expected one of: {}", allowed.join(", "))]
    UnknownBlockType {
        name: String,
        allowed: Vec<&'static str>,
    },

    #[error("invalid parser configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
