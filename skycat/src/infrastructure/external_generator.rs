// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Worker-side subprocess orchestration: spawn the external generator for
//! one chunk, wait, check its exit code. Straight "spawn, wait, check exit
//! code" — no unusual control flow (§9 design notes).

use std::path::Path;

use tokio::process::Command;

use crate::error::InfraError;

/// Runs the external generator binary for `chunk_id` against `cfg_path`,
/// in `work_dir`. A non-zero exit is a `Generation` error; the caller omits
/// the chunk from its completion report, which sends it to LIMBO
/// server-side.
pub async fn generate_chunk(generator_bin: &Path, cfg_path: &Path, chunk_id: u32, work_dir: &Path) -> Result<(), InfraError> {
    let status = Command::new(generator_bin)
        .arg(chunk_id.to_string())
        .arg(cfg_path)
        .current_dir(work_dir)
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(InfraError::Generation {
            chunk_id,
            reason: format!("generator exited with {status}"),
        })
    }
}
