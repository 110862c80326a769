// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Process exit codes (BSD `sysexits.h` subset). A top-level error is
//! classified here rather than via a bare `std::process::exit(1)`, so
//! configuration mistakes, an unreachable ingest service, and a protocol
//! fault are distinguishable to whatever invokes this process.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    #[default]
    Success = 0,
    /// Unclassified failure.
    General = 1,
    /// Bad CLI arguments.
    UsageError = 64,
    /// Malformed YAML config, a bad `--raw` string, a missing chunk log.
    Config = 78,
    /// Ingest service unreachable or returned a non-success response.
    Unavailable = 69,
    /// Framing/tag violation on the wire.
    Protocol = 76,
    /// An invariant the state machine assumes was violated.
    Software = 70,
    Interrupted = 130,
    Terminated = 143,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Classifies a top-level error by matching on its rendered message,
    /// since the bootstrap crate cannot depend on the enterprise crate's
    /// concrete error types without introducing a cycle.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let msg = error.to_string().to_lowercase();
        if msg.contains("malformed") || msg.contains("not an integer") || msg.contains("parse") {
            ExitCode::Config
        } else if msg.contains("invalid configuration") || msg.contains("config") || msg.contains("not found") {
            ExitCode::Config
        } else if msg.contains("ingest service") {
            ExitCode::Unavailable
        } else if msg.contains("frame error") || msg.contains("protocol violation") {
            ExitCode::Protocol
        } else {
            ExitCode::General
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "success",
            ExitCode::General => "general error",
            ExitCode::UsageError => "command line usage error",
            ExitCode::Config => "configuration error",
            ExitCode::Unavailable => "external service unavailable",
            ExitCode::Protocol => "protocol error",
            ExitCode::Software => "internal software error",
            ExitCode::Interrupted => "interrupted by SIGINT",
            ExitCode::Terminated => "terminated by SIGTERM",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn classifies_config_errors() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "invalid configuration: server.port must be non-zero");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Config);
    }

    #[test]
    fn classifies_ingest_unavailable() {
        let err = io::Error::new(io::ErrorKind::Other, "ingest service unreachable: connection refused");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Unavailable);
    }

    #[test]
    fn distinct_codes_for_parse_vs_ingest() {
        let parse_err = io::Error::new(io::ErrorKind::InvalidData, "malformed chunk token \"3w0\": not an integer");
        let ingest_err = io::Error::new(io::ErrorKind::Other, "ingest service returned a non-success response: 500");
        assert_ne!(ExitCode::from_error(&parse_err), ExitCode::from_error(&ingest_err));
    }
}
