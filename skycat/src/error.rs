// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure-level error taxonomy: the failures that only arise once
//! I/O is involved. These wrap or convert to `skycat_domain::CoreError` at
//! the boundary where a session or startup routine decides what to do next.

use skycat_domain::error::CoreError;
use skycat_domain::ports::ingest::IngestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("generator subprocess failed for chunk {chunk_id}: {reason}")]
    Generation { chunk_id: u32, reason: String },

    #[error("frame error: {0}")]
    Frame(#[from] skycat_domain::protocol::FrameError),
}

impl From<serde_yaml::Error> for InfraError {
    fn from(err: serde_yaml::Error) -> Self {
        InfraError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(err: reqwest::Error) -> Self {
        InfraError::Ingest(IngestError::Unreachable(err.to_string()))
    }
}
