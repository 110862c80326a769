// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `ChunkInfo` — the per-chunk mutable record owned exclusively by
//! `ChunkTracking` (in the `skycat` crate). Created once per chunk at
//! tracking-construction time and never destroyed.

use crate::chunk_id::ChunkId;
use crate::generation_stage::GenerationStage;

#[derive(Debug, Clone)]
pub struct ChunkInfo {
    pub chunk_id: ChunkId,
    pub gen_stage: GenerationStage,
    pub client_id: Option<String>,
    pub client_addr: Option<String>,
}

impl ChunkInfo {
    pub fn new(chunk_id: ChunkId) -> Self {
        Self {
            chunk_id,
            gen_stage: GenerationStage::Unassigned,
            client_id: None,
            client_addr: None,
        }
    }

    pub fn assign_to(&mut self, client_id: impl Into<String>, client_addr: impl Into<String>) {
        self.gen_stage = GenerationStage::Assigned;
        self.client_id = Some(client_id.into());
        self.client_addr = Some(client_addr.into());
    }
}
