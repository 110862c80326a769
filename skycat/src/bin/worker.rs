// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `skycat-worker` entry point: connect to a coordinator and generate
//! whatever chunks it assigns until told work is done.

use skycat::error::InfraError;
use skycat::infrastructure::config::WorkerFileConfig;
use skycat::worker::{self, WorkerConfig};
use skycat_bootstrap::cli::{self, WorkerArgs};
use skycat_bootstrap::exit_code::ExitCode;

#[tokio::main]
async fn main() {
    skycat_bootstrap::logger::init();
    let args = cli::parse_worker_args();

    let outcome = match build_config(args).await {
        Ok(config) => worker::run(config).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(()) => std::process::exit(ExitCode::Success.as_i32()),
        Err(err) => {
            let err = anyhow::Error::from(err);
            let code = ExitCode::from_error(&*err);
            tracing::error!(error = %err, exit_code = %code, "worker exiting with an error");
            std::process::exit(code.as_i32());
        }
    }
}

/// Resolves the worker's effective configuration: a CLI flag always wins;
/// otherwise `--configfile`'s matching field is used, if given; otherwise
/// the built-in default for `maxChunks`/`generatorBin`.
async fn build_config(args: WorkerArgs) -> Result<WorkerConfig, InfraError> {
    let file_config = match &args.config_file {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path).await?;
            WorkerFileConfig::load(&raw)?
        }
        None => WorkerFileConfig::default(),
    };

    let host = args.host.or(file_config.host).ok_or_else(|| InfraError::Config("--host is required (CLI or --configfile)".into()))?;
    let port = args.port.or(file_config.port).ok_or_else(|| InfraError::Config("--port is required (CLI or --configfile)".into()))?;
    let work_dir = args
        .work_dir
        .or(file_config.work_dir)
        .ok_or_else(|| InfraError::Config("--workDir is required (CLI or --configfile)".into()))?;
    let max_chunks_per_request = args.max_chunks.or(file_config.max_chunks).unwrap_or(50);
    let generator_bin = args
        .generator_bin
        .or(file_config.generator_bin)
        .unwrap_or_else(|| std::path::PathBuf::from("fake_data_generator"));

    Ok(WorkerConfig {
        host,
        port,
        work_dir,
        max_chunks_per_request,
        generator_bin,
    })
}
