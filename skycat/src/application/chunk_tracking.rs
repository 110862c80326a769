// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `ChunkTracking` — the authoritative in-memory state of every chunk,
//! grouped into transactions. The heart of the core: the state machine and
//! allocation policy described in the component design.
//!
//! Locking discipline: `inner` is a plain `parking_lot::Mutex` taken only
//! for synchronous mutation. Every operation that also needs to call the
//! ingest service drops the guard before the `.await` and reacquires it
//! (re-checking `closed`/`aborted`) to commit the resulting state — a lock
//! is never held across I/O. A second mutex (`build_lock`) serializes the
//! slower "start a new transaction" path so two callers racing to replace an
//! exhausted transaction don't both call `begin_transaction`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use skycat_domain::chunk_id::ChunkId;
use skycat_domain::chunk_info::ChunkInfo;
use skycat_domain::generation_stage::GenerationStage;
use skycat_domain::ports::{ChunkLogPort, IngestPort};
use skycat_domain::transaction::{Transaction, TransactionId, INVALID_ID};
use std::collections::HashSet;
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

use crate::error::InfraError;

struct Inner {
    to_send_set: HashSet<ChunkId>,
    chunks: HashMap<ChunkId, ChunkInfo>,
    transactions: HashMap<TransactionId, Transaction>,
    current: Option<TransactionId>,
    next_fake_id: i64,
}

pub struct ChunkTracking {
    chunks_entire_set: HashSet<ChunkId>,
    inner: Mutex<Inner>,
    build_lock: AsyncMutex<()>,
    chunk_logs: Arc<dyn ChunkLogPort>,
    ingest: Option<Arc<dyn IngestPort>>,
    transaction_size: usize,
    database: String,
}

impl ChunkTracking {
    pub fn new(
        result_set: HashSet<ChunkId>,
        chunk_logs: Arc<dyn ChunkLogPort>,
        ingest: Option<Arc<dyn IngestPort>>,
        transaction_size: usize,
        database: impl Into<String>,
    ) -> Self {
        let chunks = result_set.iter().map(|id| (*id, ChunkInfo::new(*id))).collect();
        Self {
            chunks_entire_set: result_set.clone(),
            inner: Mutex::new(Inner {
                to_send_set: result_set,
                chunks,
                transactions: HashMap::new(),
                current: None,
                next_fake_id: -1,
            }),
            build_lock: AsyncMutex::new(()),
            chunk_logs,
            ingest,
            transaction_size,
            database: database.into(),
        }
    }

    pub fn chunks_entire_set(&self) -> &HashSet<ChunkId> {
        &self.chunks_entire_set
    }

    pub fn remaining_chunk_count(&self) -> usize {
        let inner = self.inner.lock();
        let in_flight = inner
            .current
            .and_then(|id| inner.transactions.get(&id))
            .map(|t| t.chunks_remaining().len())
            .unwrap_or(0);
        inner.to_send_set.len() + in_flight
    }

    pub fn all_finished(&self) -> bool {
        let inner = self.inner.lock();
        inner.chunks.values().all(|c| c.gen_stage.is_terminal())
    }

    /// §4.E `get_chunks_for_client`.
    pub async fn get_chunks_for_client(
        &self,
        client_id: &str,
        client_addr: &str,
        max_count: usize,
    ) -> Result<(HashSet<ChunkId>, TransactionId), InfraError> {
        let transaction_id = self.ensure_transaction().await?;

        if !transaction_id.is_valid() {
            return Ok((HashSet::new(), INVALID_ID));
        }

        let allocated = {
            let mut inner = self.inner.lock();
            let txn = inner
                .transactions
                .get_mut(&transaction_id)
                .expect("ensure_transaction always records the transaction it returns");
            let allocated = txn.allocate(max_count);
            for id in &allocated {
                if let Some(info) = inner.chunks.get_mut(id) {
                    info.assign_to(client_id, client_addr);
                }
            }
            allocated
        };

        if !allocated.is_empty() {
            self.chunk_logs.add_assigned(&allocated).await?;
        }
        Ok((allocated, transaction_id))
    }

    /// Returns the id of a transaction with chunks ready to allocate,
    /// building a fresh one if the current transaction is absent, aborted,
    /// or exhausted.
    async fn ensure_transaction(&self) -> Result<TransactionId, InfraError> {
        {
            let inner = self.inner.lock();
            if let Some(id) = inner.current {
                if id == INVALID_ID {
                    return Ok(id);
                }
                if let Some(txn) = inner.transactions.get(&id) {
                    if !txn.aborted && !txn.chunks_remaining().is_empty() {
                        return Ok(id);
                    }
                }
            }
        }

        let _build_guard = self.build_lock.lock().await;

        // Re-check: another caller may have already built a usable
        // transaction while we were waiting for build_lock.
        {
            let inner = self.inner.lock();
            if let Some(id) = inner.current {
                if id == INVALID_ID {
                    return Ok(id);
                }
                if let Some(txn) = inner.transactions.get(&id) {
                    if !txn.aborted && !txn.chunks_remaining().is_empty() {
                        return Ok(id);
                    }
                }
            }
        }

        let batch = {
            let mut inner = self.inner.lock();
            let batch: HashSet<ChunkId> = inner.to_send_set.iter().copied().take(self.transaction_size).collect();
            for id in &batch {
                inner.to_send_set.remove(id);
                if let Some(info) = inner.chunks.get_mut(id) {
                    info.gen_stage = GenerationStage::Transaction;
                }
            }
            batch
        };

        if batch.is_empty() {
            let mut inner = self.inner.lock();
            inner.current = Some(INVALID_ID);
            return Ok(INVALID_ID);
        }

        let id = match &self.ingest {
            Some(ingest) => ingest.begin_transaction(&self.database).await?,
            None => {
                let mut inner = self.inner.lock();
                let id = TransactionId::new(inner.next_fake_id);
                inner.next_fake_id -= 1;
                id
            }
        };

        let mut inner = self.inner.lock();
        inner.transactions.insert(id, Transaction::new(id, batch));
        inner.current = Some(id);
        Ok(id)
    }

    /// §4.E `client_results`.
    pub async fn client_results(
        &self,
        transaction_id: TransactionId,
        expected: &HashSet<ChunkId>,
        completed: &HashSet<ChunkId>,
    ) -> Result<(), InfraError> {
        if transaction_id == INVALID_ID {
            if !expected.is_empty() || !completed.is_empty() {
                warn!(?transaction_id, "non-empty chunk report against the invalid transaction id, ignoring");
            }
            return self.close_transaction(transaction_id).await;
        }

        let diff: HashSet<ChunkId> = expected.symmetric_difference(completed).copied().collect();

        {
            let mut inner = self.inner.lock();
            for id in completed {
                if let Some(info) = inner.chunks.get_mut(id) {
                    info.gen_stage = GenerationStage::Finished;
                }
            }
            if let Some(txn) = inner.transactions.get_mut(&transaction_id) {
                txn.record_completed(completed);
            }
        }

        if !diff.is_empty() {
            {
                let mut inner = self.inner.lock();
                for id in &diff {
                    if let Some(info) = inner.chunks.get_mut(id) {
                        info.gen_stage = GenerationStage::Limbo;
                    }
                }
                if let Some(txn) = inner.transactions.get_mut(&transaction_id) {
                    txn.aborted = true;
                }
            }
            self.chunk_logs.add_limbo(&diff).await?;
            // The chunks that genuinely completed still get persisted even
            // though the transaction as a whole aborts — see DESIGN.md.
            if !completed.is_empty() {
                self.chunk_logs.add_completed(completed).await?;
            }
            return self.close_transaction(transaction_id).await;
        }

        let finished = {
            let inner = self.inner.lock();
            inner.transactions.get(&transaction_id).map(|t| t.is_finished()).unwrap_or(false)
        };
        if finished {
            self.close_transaction(transaction_id).await?;
        }
        if !completed.is_empty() {
            self.chunk_logs.add_completed(completed).await?;
        }
        Ok(())
    }

    /// §4.E `abort_and_close`: used by the session handler on any I/O or
    /// protocol fault, including a dropped connection mid-transaction.
    pub async fn abort_and_close(&self, transaction_id: TransactionId) -> Result<(), InfraError> {
        if transaction_id == INVALID_ID {
            return Ok(());
        }

        let limbo_ids = {
            let mut inner = self.inner.lock();
            let Some(txn) = inner.transactions.get_mut(&transaction_id) else {
                return Ok(());
            };
            if txn.aborted || txn.closed {
                return Ok(());
            }
            txn.aborted = true;
            let limbo_ids = txn.allocated_unaccounted_for();
            let reverted = txn.take_remaining();
            for id in &limbo_ids {
                if let Some(info) = inner.chunks.get_mut(id) {
                    info.gen_stage = GenerationStage::Limbo;
                }
            }
            for id in &reverted {
                if let Some(info) = inner.chunks.get_mut(id) {
                    info.gen_stage = GenerationStage::Unassigned;
                }
                inner.to_send_set.insert(*id);
            }
            limbo_ids
        };

        if !limbo_ids.is_empty() {
            self.chunk_logs.add_limbo(&limbo_ids).await?;
        }
        self.close_transaction(transaction_id).await
    }

    /// §4.E `_close_transaction`: idempotent, releases the state lock across
    /// the ingest RPC and re-checks `closed` on reacquire.
    async fn close_transaction(&self, transaction_id: TransactionId) -> Result<(), InfraError> {
        if transaction_id == INVALID_ID {
            return Ok(());
        }

        let aborted = {
            let inner = self.inner.lock();
            match inner.transactions.get(&transaction_id) {
                Some(txn) if !txn.closed => txn.aborted,
                _ => return Ok(()),
            }
        };

        if let Some(ingest) = &self.ingest {
            ingest.end_transaction(transaction_id, &self.database, aborted).await?;
        }

        let mut inner = self.inner.lock();
        if let Some(txn) = inner.transactions.get_mut(&transaction_id) {
            if !txn.closed {
                txn.closed = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skycat_domain::ports::ingest::{ChunkTarget, IngestError};
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FakeChunkLogs {
        assigned: Mutex<HashSet<ChunkId>>,
        completed: Mutex<HashSet<ChunkId>>,
        limbo: Mutex<HashSet<ChunkId>>,
    }

    impl FakeChunkLogs {
        fn new() -> Self {
            Self {
                assigned: Mutex::new(HashSet::new()),
                completed: Mutex::new(HashSet::new()),
                limbo: Mutex::new(HashSet::new()),
            }
        }
    }

    #[async_trait]
    impl ChunkLogPort for FakeChunkLogs {
        async fn add_assigned(&self, ids: &HashSet<ChunkId>) -> Result<(), skycat_domain::error::CoreError> {
            self.assigned.lock().extend(ids.iter().copied());
            Ok(())
        }
        async fn add_completed(&self, ids: &HashSet<ChunkId>) -> Result<(), skycat_domain::error::CoreError> {
            self.completed.lock().extend(ids.iter().copied());
            Ok(())
        }
        async fn add_limbo(&self, ids: &HashSet<ChunkId>) -> Result<(), skycat_domain::error::CoreError> {
            self.limbo.lock().extend(ids.iter().copied());
            Ok(())
        }
    }

    struct FakeIngest {
        next_id: AtomicI64,
    }

    impl FakeIngest {
        fn new() -> Self {
            Self { next_id: AtomicI64::new(1) }
        }
    }

    #[async_trait]
    impl IngestPort for FakeIngest {
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
            Ok(TransactionId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
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

    fn tracking(result_set: HashSet<ChunkId>, transaction_size: usize) -> ChunkTracking {
        ChunkTracking::new(
            result_set,
            Arc::new(FakeChunkLogs::new()),
            Some(Arc::new(FakeIngest::new())),
            transaction_size,
            "fakedb",
        )
    }

    fn ids(range: std::ops::RangeInclusive<u32>) -> HashSet<ChunkId> {
        range.map(ChunkId::new).collect()
    }

    #[tokio::test]
    async fn full_run_finishes_every_chunk() {
        let tracking = tracking(ids(0..=9), 4);
        let mut all_completed = HashSet::new();
        loop {
            let (batch, txn_id) = tracking.get_chunks_for_client("client1", "127.0.0.1:1", 10).await.unwrap();
            if batch.is_empty() {
                assert_eq!(txn_id, INVALID_ID);
                break;
            }
            tracking.client_results(txn_id, &batch, &batch).await.unwrap();
            all_completed.extend(batch);
        }
        assert_eq!(all_completed, ids(0..=9));
        assert!(tracking.all_finished());
        assert_eq!(tracking.remaining_chunk_count(), 0);
    }

    #[tokio::test]
    async fn partial_completion_commits_completed_and_limbos_the_rest() {
        let tracking = tracking(ids(100..=102), 10);
        let (batch, txn_id) = tracking.get_chunks_for_client("client1", "addr", 10).await.unwrap();
        assert_eq!(batch, ids(100..=102));

        let completed: HashSet<ChunkId> = [100, 101].into_iter().map(ChunkId::new).collect();
        tracking.client_results(txn_id, &batch, &completed).await.unwrap();

        let inner = tracking.inner.lock();
        assert_eq!(inner.chunks[&ChunkId::new(100)].gen_stage, GenerationStage::Finished);
        assert_eq!(inner.chunks[&ChunkId::new(101)].gen_stage, GenerationStage::Finished);
        assert_eq!(inner.chunks[&ChunkId::new(102)].gen_stage, GenerationStage::Limbo);
    }

    #[tokio::test]
    async fn connection_drop_mid_transaction_limbos_allocated_chunks() {
        let tracking = tracking(ids(200..=201), 10);
        let (batch, txn_id) = tracking.get_chunks_for_client("client1", "addr", 10).await.unwrap();
        assert_eq!(batch, ids(200..=201));

        tracking.abort_and_close(txn_id).await.unwrap();

        let inner = tracking.inner.lock();
        assert_eq!(inner.chunks[&ChunkId::new(200)].gen_stage, GenerationStage::Limbo);
        assert_eq!(inner.chunks[&ChunkId::new(201)].gen_stage, GenerationStage::Limbo);
    }

    #[tokio::test]
    async fn empty_result_set_signals_end_of_work_immediately() {
        let tracking = tracking(HashSet::new(), 10);
        let (batch, txn_id) = tracking.get_chunks_for_client("client1", "addr", 10).await.unwrap();
        assert!(batch.is_empty());
        assert_eq!(txn_id, INVALID_ID);
    }
}
