// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shapes describing the generator configuration and auxiliary file bundles
//! shipped from coordinator to worker. The generator itself (the pure
//! function `generate(chunk_id, spec) -> files`) is an external collaborator;
//! this module only carries the data the core passes through unmodified.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The init-exchange parameters sent to a worker in `S_INIT_R`: a session
/// name, the fixed object/visit/seed triple, the opaque generator config
/// blob, and whatever the ingest client needs the worker to know (currently
/// nothing beyond liveness, carried as an empty string placeholder so the
/// wire shape has a stable field even before ingest parameters grow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitParams {
    pub name: String,
    pub objects: u64,
    pub visits: u64,
    pub seed: u64,
    pub cfg_blob: String,
    pub ingest_dict: String,
}

/// A dense, zero-based bundle of auxiliary files (partitioner configs, or
/// pregenerated tables such as the visit list) shipped to every worker
/// verbatim. Indices are assigned once at coordinator startup and are stable
/// for the life of the run.
#[derive(Debug, Clone, Default)]
pub struct FileBundle {
    files: BTreeMap<u32, (String, String)>,
}

impl FileBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filename: impl Into<String>, contents: impl Into<String>) {
        let index = self.files.len() as u32;
        self.files.insert(index, (filename.into(), contents.into()));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<(&str, &str)> {
        self.files.get(&index).map(|(name, contents)| (name.as_str(), contents.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, &str)> {
        self.files.iter().map(|(idx, (name, contents))| (*idx, name.as_str(), contents.as_str()))
    }
}
