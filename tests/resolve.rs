mod common;

use std::sync::Arc;

use common::TestWorkspace;
use datadock::engine::LocalEngine;
use datadock::error::IngestError;
use datadock::resolve::Resolver;
use datadock::strategy::catalog;

fn resolver() -> Resolver {
    Resolver::new(Arc::new(LocalEngine::new()))
}

#[test]
fn quoted_commas_do_not_split_fields() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "quoted.csv",
        "name,notes\nalpha,\"first, second\"\nbeta,\"third, fourth\"\n",
    );

    let resolution = resolver().resolve(&input).expect("resolution");
    assert_eq!(resolution.columns, vec!["name", "notes"]);
    assert_eq!(
        resolution.sample[0][1].as_deref(),
        Some("first, second")
    );
}

#[test]
fn pipe_delimited_files_resolve_to_multiple_columns() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("pipes.txt", "sku|qty|price\nA-1|3|9.99\nB-2|1|4.50\n");

    let resolution = resolver().resolve(&input).expect("resolution");
    assert_eq!(resolution.columns.len(), 3);
    assert_eq!(resolution.delimiter, b'|');
}

#[test]
fn single_data_row_falls_through_to_the_headerless_strategy() {
    let workspace = TestWorkspace::new();
    // One line only: every header-consuming strategy yields zero rows, so
    // the headerless fallback must treat the line as data.
    let input = workspace.write("single.csv", "1,2,3\n");

    let resolution = resolver().resolve(&input).expect("resolution");
    assert_eq!(resolution.strategy.name, "no_header");
    assert_eq!(resolution.columns, vec!["column_0", "column_1", "column_2"]);
    assert_eq!(resolution.sample.len(), 1);
}

#[test]
fn crlf_line_endings_resolve_normally() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("crlf.csv", "id,name\r\n1,alpha\r\n2,beta\r\n");

    let resolution = resolver().resolve(&input).expect("resolution");
    assert_eq!(resolution.columns, vec!["id", "name"]);

    let count = resolver().count_rows(&input, &resolution).expect("count");
    assert_eq!(count, 2);
}

#[test]
fn very_wide_text_fields_do_not_reject_the_file() {
    let workspace = TestWorkspace::new();
    let wide = "x".repeat(200_000);
    let input = workspace.write("wide.csv", &format!("id,body\n1,{wide}\n2,short\n"));

    let resolution = resolver().resolve(&input).expect("resolution");
    assert_eq!(resolution.columns.len(), 2);
    assert_eq!(
        resolver().count_rows(&input, &resolution).expect("count"),
        2
    );
}

#[test]
fn whitespace_only_file_fails_with_a_structured_reason() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("blank.csv", "\n\n\n");

    match resolver().resolve(&input) {
        Err(IngestError::Resolution { .. }) => {}
        other => panic!("expected a resolution failure, got {other:?}"),
    }
}

#[test]
fn chosen_strategy_is_always_a_catalog_entry() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("plain.csv", "a,b\n1,2\n");

    let resolution = resolver().resolve(&input).expect("resolution");
    assert!(catalog().iter().any(|s| s.name == resolution.strategy.name));
}
