// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `ChunkId` — identity only, no ordering semantics beyond set membership.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A non-negative integer identifying a spatial partition of the catalog.
///
/// `ChunkId` is intentionally a thin wrapper around `u32` rather than a bare
/// integer: it keeps chunk identity from being confused with other integer
/// quantities in the core (transaction ids, counts, indices) at the type
/// level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub u32);

impl ChunkId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ChunkId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ChunkId> for u32 {
    fn from(id: ChunkId) -> Self {
        id.0
    }
}
