use arbormark::ast::Node;
use arbormark::parse;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
struct GoldenCase {
    markdown: String,
    ast: Node,
    example: u32,
    section: String,
}

#[test]
fn golden_document_trees() {
    let data = fs::read_to_string("tests/data/cases.json").expect("Failed to read cases.json");
    let cases: Vec<GoldenCase> = serde_json::from_str(&data).expect("Failed to parse cases.json");

    let mut failures = Vec::new();
    for case in &cases {
        let result = parse(&case.markdown).to_ast();
        if result != case.ast {
            // Print first few failures for debugging
            if failures.len() < 5 {
                eprintln!("\nExample {} failed ({})", case.example, case.section);
                eprintln!("  Input: {:?}", case.markdown);
                eprintln!("  Expected: {:?}", case.ast);
                eprintln!("  Got: {:?}", result);
            }
            failures.push(case.example);
        }
    }

    eprintln!(
        "\nGolden cases: {} passed, {} failed",
        cases.len() - failures.len(),
        failures.len()
    );
    assert!(failures.is_empty(), "failed examples: {failures:?}");
}
