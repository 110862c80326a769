// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `IngestPort` — the abstraction `ChunkTracking` uses to talk to the
//! external ingest service, so the state machine can be exercised with a
//! fake in tests without an HTTP call leaving the process.

use async_trait::async_trait;
use thiserror::Error;

use crate::chunk_id::ChunkId;
use crate::transaction::TransactionId;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("ingest service unreachable: {0}")]
    Unreachable(String),
    #[error("ingest service returned a non-success response: {0}")]
    NonSuccess(String),
}

/// Where a worker should upload the materialized files for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkTarget {
    pub host: String,
    pub port: u16,
}

#[async_trait]
pub trait IngestPort: Send + Sync {
    /// GET `meta/version`. Returns `Ok(())` if the service reports
    /// `success: true`.
    async fn check_liveness(&self) -> Result<(), IngestError>;

    /// POST `ingest/database`.
    async fn register_database(&self, db_config_json: &str) -> Result<(), IngestError>;

    /// POST `ingest/table`.
    async fn register_table(&self, table_schema_json: &str) -> Result<(), IngestError>;

    /// POST `ingest/trans`. Returns the ingest-assigned transaction id.
    async fn begin_transaction(&self, database: &str) -> Result<TransactionId, IngestError>;

    /// PUT `ingest/trans/{id}?abort={0|1}`.
    async fn end_transaction(&self, id: TransactionId, database: &str, abort: bool) -> Result<(), IngestError>;

    /// POST `ingest/chunk`. Locates the worker-visible endpoint a chunk's
    /// files should be uploaded to for the given open transaction.
    async fn locate_chunk_target(&self, transaction_id: TransactionId, chunk: ChunkId) -> Result<ChunkTarget, IngestError>;

    /// PUT `ingest/database/{db}`.
    async fn publish_database(&self, database: &str) -> Result<(), IngestError>;
}
