// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `ChunkLogs` — composes the four `.clg` files (`target`, `completed`,
//! `assigned`, `limbo`) into the effective work set for a run, and provides
//! the write-through operations `ChunkTracking` persists state changes
//! through.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use skycat_domain::chunk_id::ChunkId;
use skycat_domain::chunk_set;
use skycat_domain::error::CoreError;
use skycat_domain::ports::ChunkLogPort;
use tokio::sync::Mutex;

use crate::infrastructure::chunk_list_file::ChunkListFile;

pub struct ChunkLogs {
    target: Mutex<ChunkListFile>,
    completed: Mutex<ChunkListFile>,
    assigned: Mutex<ChunkListFile>,
    limbo: Mutex<ChunkListFile>,
    result_set: HashSet<ChunkId>,
}

/// Paths to the four logs, any of which may be absent on a fresh run.
#[derive(Debug, Clone, Default)]
pub struct ChunkLogPaths {
    pub target: Option<PathBuf>,
    pub completed: Option<PathBuf>,
    pub assigned: Option<PathBuf>,
    pub limbo: Option<PathBuf>,
}

impl ChunkLogs {
    /// Implements the build algorithm of the composed work set: parse
    /// `--raw`, read whichever log files exist, intersect the target with
    /// the partitioner's valid-chunk universe, and subtract prior progress.
    pub async fn build(
        paths: ChunkLogPaths,
        raw: Option<&str>,
        all_valid_chunks: &HashSet<ChunkId>,
    ) -> Result<Self, CoreError> {
        let raw_set = raw.map(chunk_set::parse_csv).transpose()?;

        let mut target = match (&paths.target, &raw_set) {
            (Some(path), Some(raw_set)) => {
                let mut file = ChunkListFile::read(path).await?;
                file.intersect_with_valid(raw_set);
                file
            }
            (Some(path), None) => ChunkListFile::read(path).await?,
            (None, Some(raw_set)) => ChunkListFile::from_ids(
                paths.target.clone().unwrap_or_else(|| PathBuf::from("target.clg")),
                raw_set.clone(),
            ),
            (None, None) => ChunkListFile::from_ids(
                paths.target.clone().unwrap_or_else(|| PathBuf::from("target.clg")),
                all_valid_chunks.clone(),
            ),
        };
        target.intersect_with_valid(all_valid_chunks);

        let completed = read_or_empty(&paths.completed, "completed.clg").await?;
        let assigned = read_or_empty(&paths.assigned, "assigned.clg").await?;
        let limbo = read_or_empty(&paths.limbo, "limbo.clg").await?;

        let result_set: HashSet<ChunkId> = target
            .ids()
            .iter()
            .copied()
            .filter(|id| !completed.ids().contains(id) && !assigned.ids().contains(id) && !limbo.ids().contains(id))
            .collect();

        Ok(Self {
            target: Mutex::new(target),
            completed: Mutex::new(completed),
            assigned: Mutex::new(assigned),
            limbo: Mutex::new(limbo),
            result_set,
        })
    }

    pub fn result_set(&self) -> &HashSet<ChunkId> {
        &self.result_set
    }

    /// Materializes a fresh set of `.clg` files rooted at `dir`, seeded with
    /// this run's in-memory sets, and opens them for append.
    pub async fn create_output(&self, dir: &Path) -> Result<Self, CoreError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| CoreError::parse(dir.display().to_string(), e.to_string()))?;

        let mut target = ChunkListFile::from_ids(dir.join("target.clg"), self.target.lock().await.ids().clone());
        let mut completed = ChunkListFile::from_ids(dir.join("completed.clg"), self.completed.lock().await.ids().clone());
        let mut assigned = ChunkListFile::from_ids(dir.join("assigned.clg"), self.assigned.lock().await.ids().clone());
        let mut limbo = ChunkListFile::from_ids(dir.join("limbo.clg"), self.limbo.lock().await.ids().clone());

        target.write().await?;
        completed.write().await?;
        assigned.write().await?;
        limbo.write().await?;

        Ok(Self {
            target: Mutex::new(target),
            completed: Mutex::new(completed),
            assigned: Mutex::new(assigned),
            limbo: Mutex::new(limbo),
            result_set: self.result_set.clone(),
        })
    }

    /// The "problem set" (assigned but neither completed nor limbo) and the
    /// "not-started set" (target minus completed minus problem).
    pub async fn report(&self) -> String {
        let target = self.target.lock().await;
        let completed = self.completed.lock().await;
        let assigned = self.assigned.lock().await;
        let limbo = self.limbo.lock().await;

        let problem: HashSet<ChunkId> = assigned
            .ids()
            .iter()
            .copied()
            .filter(|id| !completed.ids().contains(id))
            .chain(limbo.ids().iter().copied())
            .collect();
        let not_started: HashSet<ChunkId> = target
            .ids()
            .iter()
            .copied()
            .filter(|id| !completed.ids().contains(id) && !problem.contains(id))
            .collect();

        format!(
            "target={} completed={} assigned={} limbo={} problem={} not_started={}",
            target.ids().len(),
            completed.ids().len(),
            assigned.ids().len(),
            limbo.ids().len(),
            problem.len(),
            not_started.len(),
        )
    }
}

async fn read_or_empty(path: &Option<PathBuf>, default_name: &str) -> Result<ChunkListFile, CoreError> {
    match path {
        Some(path) if tokio::fs::try_exists(path).await.unwrap_or(false) => ChunkListFile::read(path).await,
        Some(path) => Ok(ChunkListFile::empty(path.clone())),
        None => Ok(ChunkListFile::empty(PathBuf::from(default_name))),
    }
}

#[async_trait]
impl ChunkLogPort for ChunkLogs {
    async fn add_assigned(&self, ids: &HashSet<ChunkId>) -> Result<(), CoreError> {
        self.assigned.lock().await.add(ids).await
    }

    async fn add_completed(&self, ids: &HashSet<ChunkId>) -> Result<(), CoreError> {
        // Deliberately does not also add to `assigned` — the server already
        // did that on handout. See the open-question resolution recorded
        // alongside the build algorithm.
        self.completed.lock().await.add(ids).await
    }

    async fn add_limbo(&self, ids: &HashSet<ChunkId>) -> Result<(), CoreError> {
        self.limbo.lock().await.add(ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn valid(n: u32) -> HashSet<ChunkId> {
        (0..n).map(ChunkId::new).collect()
    }

    #[tokio::test]
    async fn empty_raw_no_logs_yields_full_valid_set() {
        let logs = ChunkLogs::build(ChunkLogPaths::default(), Some(""), &valid(10)).await.unwrap();
        assert_eq!(logs.result_set(), &valid(10));
    }

    #[tokio::test]
    async fn range_and_singletons_raw() {
        let logs = ChunkLogs::build(ChunkLogPaths::default(), Some("3:7,10,10,12"), &valid(16)).await.unwrap();
        let expected: HashSet<ChunkId> = [3, 4, 5, 6, 7, 10, 12].into_iter().map(ChunkId::new).collect();
        assert_eq!(logs.result_set(), &expected);
    }

    #[tokio::test]
    async fn resume_subtracts_prior_progress() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target.clg");
        let completed = dir.path().join("completed.clg");
        let assigned = dir.path().join("assigned.clg");
        let limbo = dir.path().join("limbo.clg");

        tokio::fs::write(&target, "0\n1\n2\n3\n4\n5\n6\n7\n8\n9").await.unwrap();
        tokio::fs::write(&completed, "0\n1\n2").await.unwrap();
        tokio::fs::write(&assigned, "3\n4").await.unwrap();
        tokio::fs::write(&limbo, "5").await.unwrap();

        let paths = ChunkLogPaths {
            target: Some(target),
            completed: Some(completed),
            assigned: Some(assigned),
            limbo: Some(limbo),
        };
        let logs = ChunkLogs::build(paths, None, &valid(10)).await.unwrap();
        let expected: HashSet<ChunkId> = [6, 7, 8, 9].into_iter().map(ChunkId::new).collect();
        assert_eq!(logs.result_set(), &expected);

        let report = logs.report().await;
        assert!(report.contains("problem=3"));
        assert!(report.contains("not_started=4"));
    }
}
