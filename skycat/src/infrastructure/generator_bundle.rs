// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Loads the partitioner-config and pregenerated-file directories into the
//! dense, zero-based `FileBundle`s shipped to every worker verbatim.

use std::path::Path;

use skycat_domain::generator_spec::FileBundle;

use crate::error::InfraError;

/// Reads every regular file directly under `dir` (no recursion) into a
/// `FileBundle`, in directory-listing order. The order only needs to be
/// stable within a single run — workers index into the bundle by position,
/// not by name.
pub async fn load_dir(dir: &Path) -> Result<FileBundle, InfraError> {
    let mut bundle = FileBundle::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.path());
        }
    }
    names.sort();
    for path in names {
        let contents = tokio::fs::read_to_string(&path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        bundle.push(filename, contents);
    }
    Ok(bundle)
}
