mod common;

use common::{TestStack, TestWorkspace};
use datadock::catalog::{DatasetStatus, StorageFormat};
use datadock::error::IngestError;
use serde_json::json;

const FIVE_ROW_CSV: &str = "first_col_name,,third_col_name\n\
                            1,a,x\n2,b,y\n3,c,z\n4,d,w\n5,e,v\n";

#[tokio::test]
async fn upload_then_analysis_reaches_ready_with_exact_counts() {
    let workspace = TestWorkspace::new();
    let stack = TestStack::new(&workspace, 1024 * 1024);
    let body = FIVE_ROW_CSV.as_bytes();

    let record = stack
        .service
        .upload(body, "report.csv", "alice")
        .await
        .expect("upload accepted");
    assert_eq!(record.status, DatasetStatus::Processing);
    assert_eq!(record.columns.len(), 0, "columns unknown until analysis");

    stack.pool.shutdown().await;

    let terminal = stack
        .service
        .get(record.id, "alice")
        .await
        .expect("record present");
    assert_eq!(terminal.status, DatasetStatus::Ready);
    assert_eq!(terminal.row_count, 5);
    assert_eq!(terminal.column_count, 3);
    assert_eq!(
        terminal.columns,
        vec!["first_col_name", "column_1", "third_col_name"]
    );
    assert!(!terminal.row_count_estimated);
    assert!(terminal.error_message.is_none());
    assert_eq!(terminal.storage_format, StorageFormat::Columnar);
    assert!(terminal.backup_location.is_some());
}

#[tokio::test]
async fn analysis_is_idempotent_across_retries() {
    let workspace = TestWorkspace::new();
    let stack = TestStack::new(&workspace, 1024 * 1024);

    let record = stack
        .service
        .upload(FIVE_ROW_CSV.as_bytes(), "report.csv", "alice")
        .await
        .expect("upload accepted");

    let analyzer = stack.service.analyzer().clone();
    analyzer.analyze(record.id, "alice").await.expect("first run");
    let first = stack.service.get(record.id, "alice").await.unwrap();

    analyzer
        .analyze(record.id, "alice")
        .await
        .expect("retried run");
    let second = stack.service.get(record.id, "alice").await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.row_count, second.row_count);
    assert_eq!(first.columns, second.columns);
    assert_eq!(first.column_count, second.column_count);

    stack.pool.shutdown().await;
}

#[tokio::test]
async fn unparseable_upload_surfaces_a_sanitized_error_state() {
    let workspace = TestWorkspace::new();
    let stack = TestStack::new(&workspace, 1024 * 1024);

    let record = stack
        .service
        .upload(&b""[..], "broken.csv", "alice")
        .await
        .expect("upload is accepted even when the file cannot be parsed");

    stack.pool.shutdown().await;

    let terminal = stack.service.get(record.id, "alice").await.unwrap();
    assert_eq!(terminal.status, DatasetStatus::Error);
    let message = terminal.error_message.expect("error message present");
    assert!(!message.is_empty());
    // Guidance, not a raw error chain.
    assert!(!message.contains("No such file"));
    assert!(!message.to_ascii_lowercase().contains("panic"));
    assert_eq!(terminal.storage_format, StorageFormat::Delimited);
}

#[tokio::test]
async fn delete_removes_every_referenced_blob_before_the_record() {
    let workspace = TestWorkspace::new();
    let stack = TestStack::new(&workspace, 1024 * 1024);

    let record = stack
        .service
        .upload(FIVE_ROW_CSV.as_bytes(), "report.csv", "alice")
        .await
        .expect("upload accepted");
    stack.pool.shutdown().await;
    assert_eq!(stack.stored_keys().len(), 2, "original plus columnar copy");

    stack
        .service
        .delete(record.id, "alice")
        .await
        .expect("delete");

    assert!(stack.stored_keys().is_empty(), "no orphaned blobs");
    assert!(matches!(
        stack.service.get(record.id, "alice").await,
        Err(IngestError::NotFound)
    ));
}

#[tokio::test]
async fn spreadsheet_state_is_owner_scoped_and_clearable() {
    let workspace = TestWorkspace::new();
    let stack = TestStack::new(&workspace, 1024 * 1024);

    let record = stack
        .service
        .upload(FIVE_ROW_CSV.as_bytes(), "report.csv", "alice")
        .await
        .expect("upload accepted");

    let payload = json!({
        "cells": {"A1": {"value": "Updated", "formula": null}},
        "columnWidths": {"A": 120}
    });
    stack
        .service
        .save_state(record.id, "alice", payload.clone())
        .await
        .expect("save state");

    let loaded = stack
        .service
        .load_state(record.id, "alice")
        .await
        .expect("load state")
        .expect("state present");
    assert_eq!(loaded.data, payload);

    assert!(matches!(
        stack.service.load_state(record.id, "mallory").await,
        Err(IngestError::NotFound)
    ));

    stack
        .service
        .clear_state(record.id, "alice")
        .await
        .expect("clear state");
    assert!(stack
        .service
        .load_state(record.id, "alice")
        .await
        .expect("load after clear")
        .is_none());

    stack.pool.shutdown().await;
}

#[tokio::test]
async fn listing_is_scoped_to_the_owner_and_newest_first() {
    let workspace = TestWorkspace::new();
    let stack = TestStack::new(&workspace, 1024 * 1024);

    stack
        .service
        .upload(FIVE_ROW_CSV.as_bytes(), "first.csv", "alice")
        .await
        .expect("upload accepted");
    stack
        .service
        .upload(FIVE_ROW_CSV.as_bytes(), "second.csv", "alice")
        .await
        .expect("upload accepted");
    stack
        .service
        .upload(FIVE_ROW_CSV.as_bytes(), "other.csv", "bob")
        .await
        .expect("upload accepted");

    let listed = stack.service.list("alice").await.expect("list");
    assert_eq!(listed.len(), 2);
    assert!(listed[0].created_at >= listed[1].created_at);
    assert!(listed.iter().all(|record| record.owner == "alice"));

    stack.pool.shutdown().await;
}
