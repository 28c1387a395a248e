//! Transfer and purge against an in-memory bucket and a mocked signed-URL host

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datalake2bq_core::{ReqwestHttpClient, SchemaType, SignedTransfer};
use datalake2bq_storage::{StagingReclaimer, TransferError, TransferWorker};
use futures::future::join_all;
use httpmock::prelude::*;
use opendal::{services, Operator};
use parquet::arrow::ArrowWriter;
use std::sync::Arc;
use std::time::Duration;

fn parquet_fixture(rows: usize) -> Vec<u8> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("conversationId", DataType::Utf8, false),
        Field::new("updateTimestamp", DataType::Int64, false),
    ]));
    let ids: Vec<String> = (0..rows).map(|i| format!("conv-{i}")).collect();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(Int64Array::from_iter_values(0..rows as i64)),
        ],
    )
    .unwrap();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    buffer
}

fn memory_operator() -> Operator {
    Operator::new(services::Memory::default()).unwrap().finish()
}

fn worker(op: &Operator) -> TransferWorker {
    let http = Arc::new(ReqwestHttpClient::new(Duration::from_secs(5)).unwrap());
    TransferWorker::new(http, op.clone())
}

fn signed(server: &MockServer, id: &str) -> SignedTransfer {
    SignedTransfer {
        id: id.to_string(),
        url: server.url(format!("/signed/{id}?sig=abc")),
    }
}

#[tokio::test]
async fn test_transfer_stages_parquet_under_schema_prefix() {
    let server = MockServer::start_async().await;
    let payload = parquet_fixture(3);
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/signed/a1").query_param("sig", "abc");
            then.status(200).body(payload.clone());
        })
        .await;

    let op = memory_operator();
    let staged = worker(&op)
        .transfer(&signed(&server, "a1"), &SchemaType::new("conversations"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(
        staged.object_path,
        "conversations_parquet/a1_conversations.parquet"
    );
    assert_eq!(staged.row_count, 3);
    assert_eq!(staged.size_bytes, payload.len() as u64);

    let stored = op.read(&staged.object_path).await.unwrap().to_vec();
    assert_eq!(stored, payload);
}

#[tokio::test]
async fn test_transfer_rejects_non_success_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/signed/gone");
            then.status(403).body("<Error>ExpiredToken</Error>");
        })
        .await;

    let op = memory_operator();
    let err = worker(&op)
        .transfer(&signed(&server, "gone"), &SchemaType::new("segments"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Status { status: 403, .. }));
    assert!(!op
        .exists("segments_parquet/gone_segments.parquet")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_transfer_rejects_payload_that_is_not_parquet() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/signed/junk");
            then.status(200).body("definitely not parquet");
        })
        .await;

    let op = memory_operator();
    let err = worker(&op)
        .transfer(&signed(&server, "junk"), &SchemaType::new("segments"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::InvalidPayload { .. }));
    assert!(op.list_with("/").recursive(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_refuses_ids_that_escape_the_prefix() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).body(parquet_fixture(1));
        })
        .await;

    let op = memory_operator();
    let transfer = SignedTransfer {
        id: "../evil".to_string(),
        url: server.url("/signed/evil"),
    };
    let err = worker(&op)
        .transfer(&transfer, &SchemaType::new("conversations"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Write { .. }));
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_concurrent_transfers_keep_schema_types_apart() {
    let server = MockServer::start_async().await;
    let payload = parquet_fixture(2);
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/signed/");
            then.status(200).body(payload);
        })
        .await;

    let op = memory_operator();
    let worker = worker(&op);
    let jobs = [
        ("c1", "conversations"),
        ("s1", "segments"),
        ("c2", "conversations"),
        ("s2", "segments"),
    ];
    let results = join_all(jobs.iter().map(|(id, schema)| {
        let worker = worker.clone();
        let transfer = signed(&server, id);
        let schema = SchemaType::new(*schema);
        async move { worker.transfer(&transfer, &schema).await }
    }))
    .await;
    assert!(results.iter().all(Result::is_ok));

    let mut conversations: Vec<String> = op
        .list("conversations_parquet/")
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.metadata().is_file())
        .map(|e| e.path().to_string())
        .collect();
    conversations.sort();
    assert_eq!(
        conversations,
        vec![
            "conversations_parquet/c1_conversations.parquet",
            "conversations_parquet/c2_conversations.parquet",
        ]
    );

    let segments = op.list("segments_parquet/").await.unwrap();
    assert!(segments
        .iter()
        .filter(|e| e.metadata().is_file())
        .all(|e| {
            e.path().starts_with("segments_parquet/") && e.path().ends_with("_segments.parquet")
        }));
}

#[tokio::test]
async fn test_purge_deletes_only_its_own_prefix() {
    let op = memory_operator();
    for path in [
        "conversations_parquet/a_conversations.parquet",
        "conversations_parquet/b_conversations.parquet",
        "conversations_parquet/nested/c_conversations.parquet",
        "segments_parquet/d_segments.parquet",
    ] {
        op.write(path, b"x".to_vec()).await.unwrap();
    }

    let reclaimer = StagingReclaimer::new(op.clone());
    let deleted = reclaimer
        .purge(&SchemaType::new("conversations"))
        .await
        .unwrap();

    assert_eq!(deleted, 3);
    assert!(!op
        .exists("conversations_parquet/a_conversations.parquet")
        .await
        .unwrap());
    assert!(op
        .exists("segments_parquet/d_segments.parquet")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_purge_of_empty_prefix_is_idempotent() {
    let op = memory_operator();
    let reclaimer = StagingReclaimer::new(op.clone());
    let schema = SchemaType::new("sessions");

    assert_eq!(reclaimer.purge(&schema).await.unwrap(), 0);

    op.write("sessions_parquet/x_sessions.parquet", b"x".to_vec())
        .await
        .unwrap();
    assert_eq!(reclaimer.purge(&schema).await.unwrap(), 1);
    assert_eq!(reclaimer.purge(&schema).await.unwrap(), 0);
}

#[tokio::test]
async fn test_purge_on_filesystem_backend() {
    let dir = tempfile::tempdir().unwrap();
    let op = Operator::new(services::Fs::default().root(&dir.path().to_string_lossy()))
        .unwrap()
        .finish();
    op.write("userPresence_parquet/u1_userPresence.parquet", b"x".to_vec())
        .await
        .unwrap();

    let reclaimer = StagingReclaimer::new(op);
    assert_eq!(
        reclaimer
            .purge(&SchemaType::new("userPresence"))
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        reclaimer
            .purge(&SchemaType::new("userRoutingStatus"))
            .await
            .unwrap(),
        0
    );
    assert!(!dir
        .path()
        .join("userPresence_parquet/u1_userPresence.parquet")
        .exists());
}
