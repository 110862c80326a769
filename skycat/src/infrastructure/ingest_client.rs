// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `HttpIngestClient` — the real `IngestPort` adapter, a thin JSON/HTTP
//! client over `reqwest` against the ingest service's REST API (§4.D).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use skycat_domain::chunk_id::ChunkId;
use skycat_domain::ports::ingest::{ChunkTarget, IngestError, IngestPort};
use skycat_domain::transaction::TransactionId;

pub struct HttpIngestClient {
    client: reqwest::Client,
    base_url: String,
    auth_key: String,
}

impl HttpIngestClient {
    pub fn new(host: &str, port: u16, auth_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{host}:{port}/"),
            auth_key: auth_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Deserialize)]
struct SuccessEnvelope {
    success: bool,
}

#[derive(Deserialize)]
struct BeginTransactionResponse {
    databases: std::collections::HashMap<String, DatabaseTransactions>,
}

#[derive(Deserialize)]
struct DatabaseTransactions {
    transactions: Vec<TransactionEntry>,
}

#[derive(Deserialize)]
struct TransactionEntry {
    id: i64,
}

#[derive(Deserialize)]
struct LocateChunkResponse {
    location: ChunkLocation,
}

#[derive(Deserialize)]
struct ChunkLocation {
    host: String,
    port: u16,
}

#[async_trait]
impl IngestPort for HttpIngestClient {
    async fn check_liveness(&self) -> Result<(), IngestError> {
        let resp: SuccessEnvelope = self
            .client
            .get(self.url("meta/version"))
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| IngestError::NonSuccess(e.to_string()))?;
        if resp.success {
            Ok(())
        } else {
            Err(IngestError::NonSuccess("meta/version reported success=false".into()))
        }
    }

    async fn register_database(&self, db_config_json: &str) -> Result<(), IngestError> {
        post_expect_success(&self.client, &self.url("ingest/database"), db_config_json).await
    }

    async fn register_table(&self, table_schema_json: &str) -> Result<(), IngestError> {
        post_expect_success(&self.client, &self.url("ingest/table"), table_schema_json).await
    }

    async fn begin_transaction(&self, database: &str) -> Result<TransactionId, IngestError> {
        let body = json!({ "database": database, "auth_key": self.auth_key });
        let resp = self
            .client
            .post(self.url("ingest/trans"))
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(IngestError::NonSuccess(format!("ingest/trans returned {}", resp.status())));
        }
        let parsed: BeginTransactionResponse = resp.json().await.map_err(|e| IngestError::NonSuccess(e.to_string()))?;
        let id = parsed
            .databases
            .get(database)
            .and_then(|d| d.transactions.first())
            .map(|t| t.id)
            .ok_or_else(|| IngestError::NonSuccess("ingest/trans response missing a transaction id".into()))?;
        Ok(TransactionId::new(id))
    }

    async fn end_transaction(&self, id: TransactionId, database: &str, abort: bool) -> Result<(), IngestError> {
        let body = json!({ "database": database, "auth_key": self.auth_key });
        let resp = self
            .client
            .put(self.url(&format!("ingest/trans/{}?abort={}", id.0, if abort { 1 } else { 0 })))
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(IngestError::NonSuccess(format!("ingest/trans/{} returned {}", id.0, resp.status())))
        }
    }

    async fn locate_chunk_target(&self, transaction_id: TransactionId, chunk: ChunkId) -> Result<ChunkTarget, IngestError> {
        let body = json!({
            "transaction_id": transaction_id.0,
            "chunk": chunk.0,
            "auth_key": self.auth_key,
        });
        let resp: LocateChunkResponse = self
            .client
            .post(self.url("ingest/chunk"))
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| IngestError::NonSuccess(e.to_string()))?;
        Ok(ChunkTarget {
            host: resp.location.host,
            port: resp.location.port,
        })
    }

    async fn publish_database(&self, database: &str) -> Result<(), IngestError> {
        let body = json!({ "auth_key": self.auth_key });
        let resp = self
            .client
            .put(self.url(&format!("ingest/database/{database}")))
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(IngestError::NonSuccess(format!("ingest/database/{database} returned {}", resp.status())))
        }
    }
}

async fn post_expect_success(client: &reqwest::Client, url: &str, body: &str) -> Result<(), IngestError> {
    let resp = client
        .post(url)
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .map_err(|e| IngestError::Unreachable(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(IngestError::NonSuccess(format!("{url} returned {}", resp.status())));
    }
    let parsed: SuccessEnvelope = resp.json().await.map_err(|e| IngestError::NonSuccess(e.to_string()))?;
    if parsed.success {
        Ok(())
    } else {
        Err(IngestError::NonSuccess(format!("{url} reported success=false")))
    }
}
