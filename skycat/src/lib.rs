// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sky Catalog Coordinator — infrastructure and application layer
//!
//! Wires the pure state machine in `skycat_domain` to real I/O: TCP sockets,
//! the ingest HTTP service, the durable `.clg` chunk logs, and the external
//! generator/file-ingest subprocesses. `skycat_bootstrap` drives the two
//! binaries (`skycat-coordinator`, `skycat-worker`) that this crate exposes
//! through the `coordinator` and `worker` modules.

pub mod application;
pub mod coordinator;
pub mod error;
pub mod infrastructure;
pub mod presentation;
pub mod worker;

pub use error::InfraError;
