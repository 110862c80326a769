// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain-level error taxonomy.
//!
//! These are the failures that can occur purely from the rules of the chunk
//! state machine and the chunk-log text format, with no I/O involved.
//! Infrastructure-level failures (a socket reset, a non-200 from ingest) live
//! in `skycat::error` and convert into one of these variants, or are carried
//! alongside them, at the boundary where a session decides to abort.

use thiserror::Error;

use crate::chunk_id::ChunkId;
use crate::transaction::TransactionId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("malformed chunk token {token:?}: {reason}")]
    ParseError { token: String, reason: String },

    #[error("chunk log file not found: {0}")]
    FileNotFound(String),

    #[error("protocol violation: {0}")]
    ProtocolError(String),

    #[error("transaction {0} is already closed")]
    TransactionClosed(TransactionId),

    #[error("chunk {0:?} is not part of any open transaction")]
    UnknownChunk(ChunkId),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl CoreError {
    pub fn parse(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            token: token.into(),
            reason: reason.into(),
        }
    }
}
