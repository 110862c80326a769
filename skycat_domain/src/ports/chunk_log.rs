// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `ChunkLogPort` — the durable write-through surface `ChunkTracking` uses
//! to persist assignment/completion/limbo transitions. The real
//! implementation (`skycat::infrastructure::chunk_logs::ChunkLogs`) appends
//! to the four `.clg` files under the tracking mutex; a test fake can record
//! calls in memory instead.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::chunk_id::ChunkId;
use crate::error::CoreError;

#[async_trait]
pub trait ChunkLogPort: Send + Sync {
    async fn add_assigned(&self, ids: &HashSet<ChunkId>) -> Result<(), CoreError>;
    async fn add_completed(&self, ids: &HashSet<ChunkId>) -> Result<(), CoreError>;
    async fn add_limbo(&self, ids: &HashSet<ChunkId>) -> Result<(), CoreError>;
}
