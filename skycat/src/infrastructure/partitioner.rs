// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Coordinator-side call into the spatial partitioning library (§1, out of
//! scope for the core). The core treats `enumerate_all_chunks` as an opaque
//! subprocess, the same way it treats the numeric column generators: shell
//! out, capture stdout, parse.

use std::collections::HashSet;
use std::path::Path;

use skycat_domain::chunk_id::ChunkId;
use tokio::process::Command;

use crate::error::InfraError;

/// Invokes the external partitioner binary with the partitioner config
/// directory and parses its stdout as newline-separated chunk ids. This is
/// `enumerate_all_chunks` from the partitioning library's interface; the
/// core never computes spatial geometry itself.
pub async fn enumerate_all_chunks(partitioner_bin: &Path, cfg_dir: &Path) -> Result<HashSet<ChunkId>, InfraError> {
    let output = Command::new(partitioner_bin).arg(cfg_dir).output().await?;
    if !output.status.success() {
        return Err(InfraError::Config(format!(
            "partitioner exited with {} enumerating chunks from {}",
            output.status,
            cfg_dir.display()
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_chunk_list(&stdout)
}

fn parse_chunk_list(text: &str) -> Result<HashSet<ChunkId>, InfraError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<u32>()
                .map(ChunkId::new)
                .map_err(|_| InfraError::Config(format!("malformed chunk token {line:?} from partitioner: not an integer")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_newline_separated_ids() {
        let chunks = parse_chunk_list("10\n11\n12\n").unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.contains(&ChunkId::new(11)));
    }

    #[test]
    fn skips_blank_lines() {
        let chunks = parse_chunk_list("10\n\n11\n\n").unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn rejects_non_integer_tokens() {
        let err = parse_chunk_list("10\n3w0\n").unwrap_err();
        assert!(matches!(err, InfraError::Config(_)));
    }
}
