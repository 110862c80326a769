// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Per-connection session protocol (§4.F). One task per accepted
//! connection; on any transport, protocol, or ingest error the session
//! aborts its in-flight transaction and exits without affecting any other
//! session.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use skycat_domain::chunk_id::ChunkId;
use skycat_domain::error::CoreError;
use skycat_domain::protocol::{Frame, C_CHUNKR, C_CKCFIN, C_CKCOMP, C_INIT_R, C_TIMING};
use skycat_domain::timing::TimingRecord;
use skycat_domain::transaction::INVALID_ID;
use tokio::net::TcpStream;
use tracing::{info, instrument};

use crate::coordinator::Coordinator;
use crate::error::InfraError;
use crate::infrastructure::protocol_codec::Connection;

#[instrument(skip(coordinator, stream), fields(client = %name))]
pub async fn run_session(coordinator: Arc<Coordinator>, stream: TcpStream, peer_addr: SocketAddr, name: String) -> Result<(), InfraError> {
    let mut conn = Connection::new(stream);
    let mut current_transaction = INVALID_ID;

    let result = drive_session(&coordinator, &mut conn, peer_addr, &name, &mut current_transaction).await;

    if result.is_err() && current_transaction != INVALID_ID {
        if let Err(abort_err) = coordinator.tracking().abort_and_close(current_transaction).await {
            tracing::error!(error = %abort_err, "failed to abort transaction after session error");
        }
    }
    result
}

async fn drive_session(
    coordinator: &Arc<Coordinator>,
    conn: &mut Connection<TcpStream>,
    peer_addr: SocketAddr,
    name: &str,
    current_transaction: &mut skycat_domain::transaction::TransactionId,
) -> Result<(), InfraError> {
    conn.recv_expecting(C_INIT_R).await?;

    let init = &coordinator_init_frame(coordinator, name);
    conn.send(init.clone()).await?;

    send_file_bundle(conn, &coordinator.partitioner_bundle()).await?;
    send_file_bundle(conn, &coordinator.pregenerated_bundle()).await?;

    loop {
        let max_count = match conn.recv().await? {
            Frame::CChunkR { max_count } => max_count as usize,
            other => {
                return Err(CoreError::ProtocolError(format!("expected {C_CHUNKR}, got {}", other.tag())).into());
            }
        };

        let (batch, transaction_id) = coordinator.tracking().get_chunks_for_client(name, &peer_addr.to_string(), max_count).await?;
        *current_transaction = transaction_id;

        conn.send(Frame::SCnkLst {
            transaction_id,
            chunk_ids: batch.iter().copied().collect(),
        })
        .await?;

        if batch.is_empty() {
            info!("end of work signalled");
            return Ok(());
        }

        let timing = match conn.recv().await? {
            Frame::CTiming { serialized_timing } => {
                serde_json::from_str::<TimingRecord>(&serialized_timing).map_err(|e| CoreError::ProtocolError(e.to_string()))?
            }
            other => return Err(CoreError::ProtocolError(format!("expected {C_TIMING}, got {}", other.tag())).into()),
        };
        coordinator.combine_timing(&timing).await;

        let completed = recv_completion_burst(conn).await?;
        coordinator.tracking().client_results(transaction_id, &batch, &completed).await?;
        if !completed.is_empty() {
            let ids: Vec<ChunkId> = completed.iter().copied().collect();
            coordinator.upload_chunks(transaction_id, &ids).await?;
        }
        *current_transaction = INVALID_ID;
    }
}

async fn recv_completion_burst(conn: &mut Connection<TcpStream>) -> Result<HashSet<ChunkId>, InfraError> {
    let mut completed = HashSet::new();
    loop {
        match conn.recv().await? {
            Frame::CCkComp { chunk_ids } => completed.extend(chunk_ids),
            Frame::CCkCFin => return Ok(completed),
            other => return Err(CoreError::ProtocolError(format!("expected {C_CKCOMP} or {C_CKCFIN}, got {}", other.tag())).into()),
        }
    }
}

async fn send_file_bundle(conn: &mut Connection<TcpStream>, bundle: &skycat_domain::generator_spec::FileBundle) -> Result<(), InfraError> {
    for (index, filename, contents) in bundle.iter() {
        conn.send(Frame::SPcfgA {
            index,
            filename: filename.to_string(),
            contents: contents.to_string(),
        })
        .await?;
    }
    conn.send(Frame::SPcfgA {
        index: bundle.len() as u32,
        filename: String::new(),
        contents: String::new(),
    })
    .await
}

fn coordinator_init_frame(coordinator: &Coordinator, name: &str) -> Frame {
    let init = coordinator.init();
    Frame::SInitR {
        name: name.to_string(),
        objects: init.objects,
        visits: init.visits,
        seed: init.seed,
        cfg_blob: init.cfg_blob.clone(),
        ingest_dict: init.ingest_dict.clone(),
    }
}
