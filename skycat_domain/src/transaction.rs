// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `Transaction` — a batch of chunks tied to an ingest-service transaction
//! id. Commits or aborts atomically from the coordinator's point of view.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chunk_id::ChunkId;

/// Sentinel marking an empty allocation with no real transaction behind it.
///
/// Mirrors the source's `-sys.maxsize - 1`: the most negative value
/// representable, chosen so it can never collide with a real ingest id
/// (always positive) or a fake id (the negative sequence counts down from
/// -1, never reaching `i64::MIN`).
pub const INVALID_ID: TransactionId = TransactionId(i64::MIN);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

impl TransactionId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn is_valid(self) -> bool {
        self != INVALID_ID
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    total_chunks: HashSet<ChunkId>,
    chunks_remaining: HashSet<ChunkId>,
    completed_chunks: HashSet<ChunkId>,
    pub aborted: bool,
    pub closed: bool,
}

impl Transaction {
    /// Builds a transaction from a freshly-drawn batch; `id` is set once the
    /// owning `ChunkTracking` has obtained it from ingest (or from the fake
    /// sequence), which may be after the batch itself was drawn.
    pub fn new(id: TransactionId, chunks: HashSet<ChunkId>) -> Self {
        Self {
            id,
            chunks_remaining: chunks.clone(),
            total_chunks: chunks,
            completed_chunks: HashSet::new(),
            aborted: false,
            closed: false,
        }
    }

    pub fn total_chunks(&self) -> &HashSet<ChunkId> {
        &self.total_chunks
    }

    pub fn chunks_remaining(&self) -> &HashSet<ChunkId> {
        &self.chunks_remaining
    }

    pub fn completed_chunks(&self) -> &HashSet<ChunkId> {
        &self.completed_chunks
    }

    pub fn is_finished(&self) -> bool {
        self.aborted || self.completed_chunks == self.total_chunks
    }

    /// Removes up to `max_count` chunks from `chunks_remaining` and returns
    /// them. The caller is responsible for transitioning their
    /// `GenerationStage` to `Assigned`.
    pub fn allocate(&mut self, max_count: usize) -> HashSet<ChunkId> {
        let take: HashSet<ChunkId> = self.chunks_remaining.iter().copied().take(max_count).collect();
        for id in &take {
            self.chunks_remaining.remove(id);
        }
        take
    }

    /// Records a batch of worker-reported completions.
    pub fn record_completed(&mut self, ids: &HashSet<ChunkId>) {
        self.completed_chunks.extend(ids.iter().copied());
    }

    /// Chunks that were allocated to a client but never reported back
    /// (neither completed nor in the symmetric-difference diff): `total -
    /// remaining - completed`. Used when a transaction aborts mid-flight to
    /// find which chunks must go to LIMBO rather than back to UNASSIGNED.
    pub fn allocated_unaccounted_for(&self) -> HashSet<ChunkId> {
        self.total_chunks
            .iter()
            .copied()
            .filter(|id| !self.chunks_remaining.contains(id) && !self.completed_chunks.contains(id))
            .collect()
    }

    /// Empties `chunks_remaining`, returning the chunks that were never
    /// handed to any client — these revert to UNASSIGNED when the
    /// transaction aborts.
    pub fn take_remaining(&mut self) -> HashSet<ChunkId> {
        std::mem::take(&mut self.chunks_remaining)
    }
}
