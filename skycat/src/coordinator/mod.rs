// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Coordinator: the TCP accept loop and shared per-process state. One task
//! per accepted connection runs the session protocol (`session.rs`); the
//! accept loop itself, the client-name counter, the active-session count,
//! and the timing aggregator each own their own lock, and none of them is
//! held while the tracking mutex inside `ChunkTracking` is held (§5).

pub mod session;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use skycat_domain::chunk_id::ChunkId;
use skycat_domain::generator_spec::FileBundle;
use skycat_domain::ports::IngestPort;
use skycat_domain::timing::TimingRecord;
use skycat_domain::transaction::TransactionId;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::application::chunk_tracking::ChunkTracking;
use crate::error::InfraError;
use crate::infrastructure::chunk_logs::ChunkLogs;
use crate::infrastructure::file_ingest_tool;

pub struct CoordinatorInit {
    pub objects: u64,
    pub visits: u64,
    pub seed: u64,
    pub cfg_blob: String,
    pub ingest_dict: String,
    pub partitioner_bundle: FileBundle,
    pub pregenerated_bundle: FileBundle,
    pub database: String,
    pub table_name: String,
    /// Directory workers and the coordinator both see (shared scratch
    /// storage) where generated chunk files land, named by a fixed
    /// `chunk_<id>.csv` convention known to both sides.
    pub shared_output_dir: PathBuf,
    pub file_ingest_tool_bin: PathBuf,
}

pub struct Coordinator {
    listener: TcpListener,
    local_addr: SocketAddr,
    tracking: Arc<ChunkTracking>,
    chunk_logs: Arc<ChunkLogs>,
    ingest: Option<Arc<dyn IngestPort>>,
    init: CoordinatorInit,
    client_counter: AtomicU64,
    active_sessions: AtomicU64,
    timing: Mutex<TimingRecord>,
    shutting_down: AtomicBool,
}

impl Coordinator {
    pub async fn bind(
        port: u16,
        tracking: Arc<ChunkTracking>,
        chunk_logs: Arc<ChunkLogs>,
        ingest: Option<Arc<dyn IngestPort>>,
        init: CoordinatorInit,
    ) -> Result<Self, InfraError> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            tracking,
            chunk_logs,
            ingest,
            init,
            client_counter: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
            timing: Mutex::new(TimingRecord::new()),
            shutting_down: AtomicBool::new(false),
        })
    }

    /// Requests the accept loop stop taking new connections and exit once
    /// in-flight sessions drain, by unblocking one pending `accept` with a
    /// self-connect (§4.I, §5).
    pub async fn request_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.wake_accept_loop().await;
    }

    /// Uploads every completed chunk's file via `locate_chunk_target` + the
    /// external file-ingest tool. Runs after a transaction has recorded a
    /// chunk as `FINISHED`; a failed upload is a fatal error for the
    /// transaction (§4.D) — the caller aborts it on the first `Err` returned
    /// here, leaving any chunk not yet reached by this loop unuploaded.
    pub async fn upload_chunks(&self, transaction_id: TransactionId, chunk_ids: &[ChunkId]) -> Result<(), InfraError> {
        let Some(ingest) = &self.ingest else { return Ok(()) };
        for &chunk_id in chunk_ids {
            let target = ingest.locate_chunk_target(transaction_id, chunk_id).await.map_err(|err| {
                warn!(%chunk_id, error = %err, "failed to locate ingest target for chunk");
                err
            })?;
            let path = self.init.shared_output_dir.join(format!("chunk_{}.csv", chunk_id.get()));
            file_ingest_tool::upload_file(
                &self.init.file_ingest_tool_bin,
                &target.host,
                target.port,
                transaction_id.0,
                &self.init.table_name,
                &path,
            )
            .await
            .map_err(|err| {
                warn!(%chunk_id, error = %err, "file-ingest upload failed");
                err
            })?;
        }
        Ok(())
    }

    fn next_client_name(&self) -> String {
        let n = self.client_counter.fetch_add(1, Ordering::SeqCst);
        format!("client{n}")
    }

    /// Runs the accept loop until every session has observed end-of-work and
    /// the active-session count has drained to zero, at which point the
    /// coordinator self-connects to unblock `accept` one last time.
    pub async fn run(self: Arc<Self>) -> Result<(), InfraError> {
        loop {
            let (stream, peer_addr) = self.listener.accept().await?;

            let work_done = self.active_sessions.load(Ordering::SeqCst) == 0 && self.tracking.remaining_chunk_count() == 0;
            let shutdown_requested = self.shutting_down.load(Ordering::SeqCst);
            if (work_done || shutdown_requested) && self.is_self_connect(peer_addr).await {
                info!(shutdown_requested, "shutdown self-connect observed, stopping accept loop");
                break;
            }

            self.active_sessions.fetch_add(1, Ordering::SeqCst);
            let name = self.next_client_name();
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                let result = session::run_session(Arc::clone(&this), stream, peer_addr, name.clone()).await;
                if let Err(err) = result {
                    warn!(client = %name, error = %err, "session ended with an error");
                }
                this.active_sessions.fetch_sub(1, Ordering::SeqCst);
                if this.active_sessions.load(Ordering::SeqCst) == 0 && this.tracking.remaining_chunk_count() == 0 {
                    this.wake_accept_loop().await;
                }
            });
        }
        Ok(())
    }

    /// A best-effort check for whether `peer_addr` is this process
    /// connecting to itself to unblock a pending `accept`. Real traffic from
    /// an actual worker is distinguished upstream by `remaining_chunk_count`
    /// already having reached zero.
    async fn is_self_connect(&self, peer_addr: SocketAddr) -> bool {
        peer_addr.ip() == self.local_addr.ip() || peer_addr.ip().is_loopback()
    }

    async fn wake_accept_loop(&self) {
        if let Err(err) = TcpStream::connect(self.local_addr).await {
            warn!(error = %err, "failed to self-connect to unblock the accept loop");
        }
    }

    pub fn chunk_logs(&self) -> &Arc<ChunkLogs> {
        &self.chunk_logs
    }

    pub fn tracking(&self) -> &Arc<ChunkTracking> {
        &self.tracking
    }

    pub fn init(&self) -> &CoordinatorInit {
        &self.init
    }

    pub fn partitioner_bundle(&self) -> &FileBundle {
        &self.init.partitioner_bundle
    }

    pub fn pregenerated_bundle(&self) -> &FileBundle {
        &self.init.pregenerated_bundle
    }

    pub async fn combine_timing(&self, other: &TimingRecord) {
        self.timing.lock().await.combine(other);
    }

    pub async fn timing_snapshot(&self) -> TimingRecord {
        self.timing.lock().await.clone()
    }
}
