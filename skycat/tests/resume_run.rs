// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Exercises `ChunkLogs` building and restarting against the durable `.clg`
//! files a real run would leave on disk, end to end with `ChunkTracking`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use skycat::application::chunk_tracking::ChunkTracking;
use skycat::infrastructure::chunk_logs::{ChunkLogPaths, ChunkLogs};
use skycat_domain::chunk_id::ChunkId;
use skycat_domain::error::CoreError;
use skycat_domain::ports::ingest::{ChunkTarget, IngestError};
use skycat_domain::ports::{ChunkLogPort, IngestPort};
use skycat_domain::transaction::{TransactionId, INVALID_ID};
use tempfile::tempdir;

struct NoIngest;

#[async_trait]
impl IngestPort for NoIngest {
    async fn check_liveness(&self) -> Result<(), IngestError> {
        Ok(())
    }
    async fn register_database(&self, _: &str) -> Result<(), IngestError> {
        Ok(())
    }
    async fn register_table(&self, _: &str) -> Result<(), IngestError> {
        Ok(())
    }
    async fn begin_transaction(&self, _: &str) -> Result<TransactionId, IngestError> {
        Ok(TransactionId::new(1))
    }
    async fn end_transaction(&self, _: TransactionId, _: &str, _: bool) -> Result<(), IngestError> {
        Ok(())
    }
    async fn locate_chunk_target(&self, _: TransactionId, _: ChunkId) -> Result<ChunkTarget, IngestError> {
        Ok(ChunkTarget {
            host: "worker.example".into(),
            port: 9000,
        })
    }
    async fn publish_database(&self, _: &str) -> Result<(), IngestError> {
        Ok(())
    }
}

fn ids(range: std::ops::RangeInclusive<u32>) -> HashSet<ChunkId> {
    range.map(ChunkId::new).collect()
}

#[tokio::test]
async fn a_crash_mid_run_resumes_from_the_written_logs() {
    let valid = ids(0..=19);
    let run_dir = tempdir().unwrap();

    // First run: process half the chunks, then "crash" by dropping
    // everything without closing the open transaction.
    let logs = ChunkLogs::build(ChunkLogPaths::default(), None, &valid).await.unwrap();
    let logs = Arc::new(logs.create_output(run_dir.path()).await.unwrap());

    let tracking = ChunkTracking::new(
        logs.result_set().clone(),
        Arc::clone(&logs) as Arc<dyn ChunkLogPort>,
        Some(Arc::new(NoIngest) as Arc<dyn IngestPort>),
        5,
        "fakedb",
    );

    let mut finished_first_run = HashSet::new();
    for _ in 0..2 {
        let (batch, txn_id) = tracking.get_chunks_for_client("client1", "127.0.0.1:1", 5).await.unwrap();
        assert_ne!(txn_id, INVALID_ID);
        tracking.client_results(txn_id, &batch, &batch).await.unwrap();
        finished_first_run.extend(batch);
    }
    assert_eq!(finished_first_run.len(), 10);

    // One more transaction handed out but never reported back — these
    // chunks must survive only in `assigned.clg`, not `completed.clg`.
    let (in_flight, _) = tracking.get_chunks_for_client("client2", "127.0.0.1:2", 5).await.unwrap();
    assert_eq!(in_flight.len(), 5);
    drop(tracking);

    // Second run: rebuild against the same directory.
    let paths = ChunkLogPaths {
        target: Some(run_dir.path().join("target.clg")),
        completed: Some(run_dir.path().join("completed.clg")),
        assigned: Some(run_dir.path().join("assigned.clg")),
        limbo: Some(run_dir.path().join("limbo.clg")),
    };
    let resumed = ChunkLogs::build(paths, None, &valid).await.unwrap();

    // The 10 finished chunks are gone from the work set; the 5 left
    // assigned-but-uncompleted are also excluded pending human review, per
    // the restart/resume contract — only genuinely untouched chunks remain.
    assert_eq!(resumed.result_set().len(), 5);
    for chunk in &finished_first_run {
        assert!(!resumed.result_set().contains(chunk));
    }
    for chunk in &in_flight {
        assert!(!resumed.result_set().contains(chunk));
    }
}

#[tokio::test]
async fn raw_selection_combined_with_a_resume_directory_intersects() {
    let valid = ids(0..=9);
    let run_dir = tempdir().unwrap();
    tokio::fs::write(run_dir.path().join("target.clg"), "0\n1\n2\n3\n4\n5").await.unwrap();
    tokio::fs::write(run_dir.path().join("completed.clg"), "0\n1").await.unwrap();

    let paths = ChunkLogPaths {
        target: Some(run_dir.path().join("target.clg")),
        completed: Some(run_dir.path().join("completed.clg")),
        assigned: None,
        limbo: None,
    };
    let logs = ChunkLogs::build(paths, Some("2,3,8"), &valid).await.unwrap();

    let expected: HashSet<ChunkId> = [2, 3].into_iter().map(ChunkId::new).collect();
    assert_eq!(logs.result_set(), &expected);
}

#[tokio::test]
async fn parse_error_in_raw_is_rejected_before_touching_disk() {
    let valid = ids(0..=5);
    let err = ChunkLogs::build(ChunkLogPaths::default(), Some("3w0"), &valid).await.unwrap_err();
    assert!(matches!(err, CoreError::ParseError { .. }));
}
