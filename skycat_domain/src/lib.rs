// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sky Catalog Domain
//!
//! Pure business logic for the distributed chunk-generation coordinator: the
//! chunk state machine, the durable chunk-set representation, the wire
//! protocol's message shapes, and the ports (traits) that infrastructure
//! adapters implement. Nothing in this crate performs I/O — no sockets, no
//! file handles, no HTTP, no async runtime. That keeps the state machine
//! testable without a network or a filesystem and keeps the infrastructure
//! layer free to swap adapters (a fake ingest client in tests, a real
//! `reqwest` client in production) without touching this crate.

pub mod chunk_id;
pub mod chunk_info;
pub mod chunk_set;
pub mod error;
pub mod generation_stage;
pub mod generator_spec;
pub mod ports;
pub mod protocol;
pub mod timing;
pub mod transaction;

pub use chunk_id::ChunkId;
pub use chunk_info::ChunkInfo;
pub use error::CoreError;
pub use generation_stage::GenerationStage;
pub use timing::TimingRecord;
pub use transaction::{Transaction, TransactionId, INVALID_ID};
