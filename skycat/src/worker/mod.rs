// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Worker session (§4.G): connects to the coordinator, receives config and
//! work, invokes the external generator, and reports back.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use skycat_domain::chunk_id::ChunkId;
use skycat_domain::error::CoreError;
use skycat_domain::protocol::{Frame, S_CNKLST, S_INIT_R, S_PCFG_A};
use skycat_domain::timing::TimingRecord;
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::error::InfraError;
use crate::infrastructure::external_generator;
use crate::infrastructure::protocol_codec::Connection;

pub struct WorkerConfig {
    pub host: String,
    pub port: u16,
    pub work_dir: PathBuf,
    pub max_chunks_per_request: u32,
    pub generator_bin: PathBuf,
}

/// Runs one complete worker session: connect, init exchange, config bundle
/// download, then the request/generate/report loop until the coordinator
/// signals end-of-work with an empty chunk list.
pub async fn run(config: WorkerConfig) -> Result<(), InfraError> {
    tokio::fs::create_dir_all(&config.work_dir).await?;

    let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
    let mut conn = Connection::new(stream);

    conn.send(Frame::CInitR).await?;
    let (cfg_blob, objects, visits, seed) = match conn.recv_expecting(S_INIT_R).await? {
        Frame::SInitR {
            objects, visits, seed, cfg_blob, ..
        } => (cfg_blob, objects, visits, seed),
        _ => unreachable!("recv_expecting guarantees the S_INIT_R variant"),
    };
    info!(objects, visits, seed, "received init parameters");
    let cfg_path = config.work_dir.join("generator.cfg");
    tokio::fs::write(&cfg_path, cfg_blob).await?;

    download_bundle(&mut conn, &config.work_dir.join("partitioner")).await?;
    download_bundle(&mut conn, &config.work_dir.join("pregenerated")).await?;

    loop {
        conn.send(Frame::CChunkR {
            max_count: config.max_chunks_per_request,
        })
        .await?;

        let (transaction_id, chunk_ids) = match conn.recv().await? {
            Frame::SCnkLst { transaction_id, chunk_ids } => (transaction_id, chunk_ids),
            other => return Err(CoreError::ProtocolError(format!("expected {S_CNKLST}, got {}", other.tag())).into()),
        };

        if chunk_ids.is_empty() {
            info!("coordinator signalled end of work");
            return Ok(());
        }

        let (completed, timing) = generate_assigned_chunks(&config, &cfg_path, &chunk_ids).await;

        conn.send(Frame::CTiming {
            serialized_timing: serde_json::to_string(&timing).map_err(|e| CoreError::ProtocolError(e.to_string()))?,
        })
        .await?;
        conn.send(Frame::CCkComp {
            chunk_ids: completed.iter().copied().collect(),
        })
        .await?;
        conn.send(Frame::CCkCFin).await?;

        if completed.is_empty() {
            return Err(CoreError::ProtocolError(format!(
                "every chunk in transaction {transaction_id} failed to generate"
            ))
            .into());
        }
    }
}

async fn generate_assigned_chunks(config: &WorkerConfig, cfg_path: &PathBuf, chunk_ids: &[ChunkId]) -> (HashSet<ChunkId>, TimingRecord) {
    let mut completed = HashSet::new();
    let mut timing = TimingRecord::new();

    for &chunk_id in chunk_ids {
        let start = Instant::now();
        let result = external_generator::generate_chunk(&config.generator_bin, cfg_path, chunk_id.get(), &config.work_dir).await;
        timing.add("generate", start.elapsed());
        timing.increment();
        match result {
            Ok(()) => {
                completed.insert(chunk_id);
            }
            Err(err) => warn!(%chunk_id, error = %err, "chunk generation failed, omitting from completion report"),
        }
    }
    (completed, timing)
}

/// Receives a server-pushed file bundle (partitioner configs or
/// pregenerated files): one `S_PCFG_A` per entry, terminated by an
/// empty-filename frame, writing each file under `dest_dir`.
async fn download_bundle(conn: &mut Connection<TcpStream>, dest_dir: &std::path::Path) -> Result<(), InfraError> {
    tokio::fs::create_dir_all(dest_dir).await?;
    loop {
        match conn.recv().await? {
            Frame::SPcfgA { filename, .. } if filename.is_empty() => return Ok(()),
            Frame::SPcfgA { filename, contents, .. } => {
                tokio::fs::write(dest_dir.join(&filename), contents).await?;
            }
            other => return Err(CoreError::ProtocolError(format!("expected {S_PCFG_A}, got {}", other.tag())).into()),
        }
    }
}
