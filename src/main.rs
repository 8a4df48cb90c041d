use arbormark::{Parser, ParserBuilder, ParserConfig, Result};
use log::info;
use std::env;
use std::fs;
use std::io::{self, Write};

/// Reads Markdown from stdin and prints the document tree as JSON.
/// An optional argument names a JSON parser configuration file.
fn main() -> Result<()> {
    env_logger::init();

    let parser = match env::args().nth(1) {
        Some(path) => {
            info!("loading parser configuration from {path}");
            let config = ParserConfig::from_json(&fs::read_to_string(&path)?)?;
            ParserBuilder::from_config(&config)?.build()
        }
        None => Parser::new(),
    };

    let document = parser.parse_reader(io::stdin().lock())?;
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &document.to_ast()).map_err(io::Error::from)?;
    writeln!(stdout)?;
    Ok(())
}
