// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Coordinator-side subprocess orchestration: upload one file to the ingest
//! service's located worker endpoint by shelling out to the external
//! file-ingest tool. The coordinator runs this, not the worker, because it
//! is the side holding the open transaction id (§4.D, §9).

use std::path::Path;

use tokio::process::Command;

use crate::error::InfraError;

/// Invokes the external file-ingest tool with `(host, port, transaction_id,
/// table, path)`. A non-zero exit is fatal to the owning transaction.
pub async fn upload_file(
    tool_bin: &Path,
    host: &str,
    port: u16,
    transaction_id: i64,
    table: &str,
    path: &Path,
) -> Result<(), InfraError> {
    let status = Command::new(tool_bin)
        .arg(host)
        .arg(port.to_string())
        .arg(transaction_id.to_string())
        .arg(table)
        .arg(path)
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(InfraError::Config(format!(
            "file-ingest tool exited with {status} for table {table} transaction {transaction_id}"
        )))
    }
}
