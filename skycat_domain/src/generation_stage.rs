// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Per-chunk lifecycle stage. `FINISHED` and `LIMBO` are terminal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStage {
    Unassigned,
    Transaction,
    Assigned,
    Finished,
    Limbo,
}

impl GenerationStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Limbo)
    }
}
