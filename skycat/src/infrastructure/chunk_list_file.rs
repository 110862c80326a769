// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Durable, append-tolerant backing for a single `.clg` file.
//!
//! The on-disk representation is a superset-tolerant multi-valued log:
//! duplicate ids on disk are not an error, and `add` after `write` appends
//! only the novel ids rather than rewriting the whole file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use skycat_domain::chunk_id::ChunkId;
use skycat_domain::chunk_set;
use skycat_domain::error::CoreError;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug)]
pub struct ChunkListFile {
    path: PathBuf,
    ids: HashSet<ChunkId>,
    file_wopen: bool,
}

impl ChunkListFile {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: HashSet::new(),
            file_wopen: false,
        }
    }

    pub fn from_ids(path: impl Into<PathBuf>, ids: HashSet<ChunkId>) -> Self {
        Self {
            path: path.into(),
            ids,
            file_wopen: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ids(&self) -> &HashSet<ChunkId> {
        &self.ids
    }

    /// Reads the whole file and parses it. A missing file is `FileNotFound`,
    /// not an empty set — callers that tolerate an absent log should check
    /// existence themselves before calling `read`.
    pub async fn read(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let raw = fs::read_to_string(&path)
            .await
            .map_err(|_| CoreError::FileNotFound(path.display().to_string()))?;
        let ids = chunk_set::parse_lines(&raw)?;
        Ok(Self {
            path,
            ids,
            file_wopen: false,
        })
    }

    pub fn intersect_with_valid(&mut self, valid: &HashSet<ChunkId>) {
        self.ids.retain(|id| valid.contains(id));
    }

    /// Overwrites the file with the current set, newline-separated in
    /// ascending order, and marks the file open for subsequent appends.
    pub async fn write(&mut self) -> Result<(), CoreError> {
        let text = chunk_set::serialize(&self.ids);
        fs::write(&self.path, text)
            .await
            .map_err(|e| CoreError::parse(self.path.display().to_string(), e.to_string()))?;
        self.file_wopen = true;
        Ok(())
    }

    /// Unions `ids` into the in-memory set; if the file has been opened via
    /// `write`, appends only the novel ids with a leading newline so a
    /// subsequent `read` sees them.
    pub async fn add(&mut self, ids: &HashSet<ChunkId>) -> Result<(), CoreError> {
        let novel: Vec<ChunkId> = ids.difference(&self.ids).copied().collect();
        self.ids.extend(ids.iter().copied());
        if self.file_wopen && !novel.is_empty() {
            let mut sorted = novel;
            sorted.sort_unstable();
            let mut text = String::new();
            for id in sorted {
                text.push('\n');
                text.push_str(&id.to_string());
            }
            let mut file = fs::OpenOptions::new()
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| CoreError::parse(self.path.display().to_string(), e.to_string()))?;
            file.write_all(text.as_bytes())
                .await
                .map_err(|e| CoreError::parse(self.path.display().to_string(), e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("target.clg");
        let ids: HashSet<ChunkId> = [1, 2, 3].into_iter().map(ChunkId::new).collect();
        let mut file = ChunkListFile::from_ids(&path, ids.clone());
        file.write().await.unwrap();

        let reread = ChunkListFile::read(&path).await.unwrap();
        assert_eq!(reread.ids(), &ids);
    }

    #[tokio::test]
    async fn add_after_write_appends_only_novel_ids_and_is_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("assigned.clg");
        let mut file = ChunkListFile::from_ids(&path, [1, 2].into_iter().map(ChunkId::new).collect());
        file.write().await.unwrap();

        file.add(&[2, 3].into_iter().map(ChunkId::new).collect()).await.unwrap();
        file.add(&[3, 4].into_iter().map(ChunkId::new).collect()).await.unwrap();

        let reread = ChunkListFile::read(&path).await.unwrap();
        assert_eq!(reread.ids(), &[1, 2, 3, 4].into_iter().map(ChunkId::new).collect());
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let dir = tempdir().unwrap();
        let err = ChunkListFile::read(dir.path().join("nope.clg")).await.unwrap_err();
        assert!(matches!(err, CoreError::FileNotFound(_)));
    }
}
