// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Command-line argument parsing for both binaries, via `clap`.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "skycat-coordinator")]
#[command(about = concat!("Sky catalog coordinator v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct CoordinatorArgs {
    /// Path to the coordinator's YAML configuration document.
    #[arg(long = "configfile")]
    pub config_file: PathBuf,

    /// Bypass the ingest HTTP client entirely; transactions get fake
    /// negative ids and no ingest RPC is ever made.
    #[arg(long = "skipIngest", default_value_t = false)]
    pub skip_ingest: bool,

    /// Skip registering table schemas with ingest at startup.
    #[arg(long = "skipSchema", default_value_t = false)]
    pub skip_schema: bool,

    /// Directory to create fresh `.clg` logs in.
    #[arg(long = "outDir")]
    pub out_dir: Option<PathBuf>,

    /// Directory of pre-existing `.clg` logs to resume a run from.
    #[arg(long = "inDir")]
    pub in_dir: Option<PathBuf>,

    /// Comma-separated chunk ids/ranges selecting the target set, combinable
    /// with `--inDir`.
    #[arg(long = "raw")]
    pub raw: Option<String>,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "skycat-worker")]
#[command(about = concat!("Sky catalog worker v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct WorkerArgs {
    /// Coordinator hostname or address; may also be supplied by `--configfile`.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Coordinator TCP port; may also be supplied by `--configfile`.
    #[arg(long = "port")]
    pub port: Option<u16>,

    /// Local scratch directory for generator output and received configs;
    /// may also be supplied by `--configfile`.
    #[arg(long = "workDir")]
    pub work_dir: Option<PathBuf>,

    /// Per-request chunk cap (`K` in the protocol's `C_CHUNKR`); defaults to
    /// 50 if given on neither the command line nor `--configfile`.
    #[arg(long = "maxChunks")]
    pub max_chunks: Option<u32>,

    /// External generator binary to invoke per chunk; defaults to
    /// `fake_data_generator` if given on neither the command line nor
    /// `--configfile`.
    #[arg(long = "generatorBin")]
    pub generator_bin: Option<PathBuf>,

    /// Optional YAML file of local overrides for `host`/`port`/`workDir`/
    /// `maxChunks`/`generatorBin`. A flag given on the command line always
    /// wins over the same setting in this file.
    #[arg(long = "configfile")]
    pub config_file: Option<PathBuf>,
}

pub fn parse_coordinator_args() -> CoordinatorArgs {
    CoordinatorArgs::parse()
}

pub fn parse_worker_args() -> WorkerArgs {
    WorkerArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_args_parse_long_flags() {
        let args = CoordinatorArgs::parse_from([
            "skycat-coordinator",
            "--configfile",
            "cfg.yaml",
            "--skipIngest",
            "--raw",
            "3:7,10",
        ]);
        assert_eq!(args.config_file, PathBuf::from("cfg.yaml"));
        assert!(args.skip_ingest);
        assert!(!args.skip_schema);
        assert_eq!(args.raw.as_deref(), Some("3:7,10"));
    }

    #[test]
    fn worker_args_parse_long_flags() {
        let args = WorkerArgs::parse_from([
            "skycat-worker",
            "--host",
            "coordinator.example",
            "--port",
            "7654",
            "--workDir",
            "/tmp/work",
        ]);
        assert_eq!(args.host.as_deref(), Some("coordinator.example"));
        assert_eq!(args.port, Some(7654));
        assert_eq!(args.max_chunks, None);
        assert_eq!(args.config_file, None);
    }

    #[test]
    fn worker_args_parse_configfile() {
        let args = WorkerArgs::parse_from(["skycat-worker", "--configfile", "worker.yaml"]);
        assert_eq!(args.config_file, Some(PathBuf::from("worker.yaml")));
        assert_eq!(args.host, None);
    }
}
