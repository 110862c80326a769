// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `skycat-coordinator` entry point: load config, build the chunk-set and
//! tracking state from durable logs, bind the accept loop, and run until
//! every chunk has reached a terminal state.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use skycat::application::chunk_tracking::ChunkTracking;
use skycat::coordinator::{Coordinator, CoordinatorInit};
use skycat::error::InfraError;
use skycat::infrastructure::chunk_logs::{ChunkLogPaths, ChunkLogs};
use skycat::infrastructure::ingest_client::HttpIngestClient;
use skycat::infrastructure::{generator_bundle, partitioner};
use skycat::presentation::report::print_shutdown_report;
use skycat_bootstrap::cli::{self, CoordinatorArgs};
use skycat_bootstrap::exit_code::ExitCode;
use skycat_bootstrap::signals;
use skycat_domain::ports::IngestPort;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    skycat_bootstrap::logger::init();
    let args = cli::parse_coordinator_args();
    match run(args).await {
        Ok(()) => std::process::exit(ExitCode::Success.as_i32()),
        Err(err) => {
            let err = anyhow::Error::from(err);
            let code = ExitCode::from_error(&*err);
            tracing::error!(error = %err, exit_code = %code, "coordinator exiting with an error");
            std::process::exit(code.as_i32());
        }
    }
}

async fn run(args: CoordinatorArgs) -> Result<(), InfraError> {
    let raw_yaml = tokio::fs::read_to_string(&args.config_file).await?;
    let config = skycat::infrastructure::config::CoordinatorConfig::load(&raw_yaml)?;
    let base_dir = args.config_file.parent().map(PathBuf::from).unwrap_or_default();

    let ingest: Option<Arc<dyn IngestPort>> = if args.skip_ingest {
        None
    } else {
        let client = HttpIngestClient::new(&config.ingest.host, config.ingest.port, &config.ingest.auth_key);
        client.check_liveness().await?;
        Some(Arc::new(client))
    };

    if let Some(ingest) = &ingest {
        if !args.skip_schema {
            register_ingest_schemas(ingest.as_ref(), &base_dir.join(&config.ingest.cfg_dir), &config.ingest.db_name).await?;
        }
    }

    let partitioner_bin = PathBuf::from("enumerate_all_chunks");
    let all_valid_chunks = partitioner::enumerate_all_chunks(&partitioner_bin, &base_dir.join(&config.partitioner.cfg_dir)).await?;

    let paths = ChunkLogPaths {
        target: args.in_dir.as_ref().map(|d| d.join("target.clg")),
        completed: args.in_dir.as_ref().map(|d| d.join("completed.clg")),
        assigned: args.in_dir.as_ref().map(|d| d.join("assigned.clg")),
        limbo: args.in_dir.as_ref().map(|d| d.join("limbo.clg")),
    };
    let chunk_logs = ChunkLogs::build(paths, args.raw.as_deref(), &all_valid_chunks).await?;
    let out_dir = args.out_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let chunk_logs = Arc::new(chunk_logs.create_output(&out_dir).await?);

    let tracking = Arc::new(ChunkTracking::new(
        chunk_logs.result_set().clone(),
        Arc::clone(&chunk_logs) as Arc<dyn skycat_domain::ports::ChunkLogPort>,
        ingest.clone(),
        config.fake_data_generator.transaction_size,
        config.ingest.db_name.clone(),
    ));

    let fake_cfg_path = base_dir.join(&config.fake_data_generator.cfg_file_name);
    let cfg_blob = tokio::fs::read_to_string(&fake_cfg_path).await?;
    let partitioner_bundle = generator_bundle::load_dir(&base_dir.join(&config.partitioner.cfg_dir)).await?;
    let pregenerated_bundle = generator_bundle::load_dir(&base_dir.join(&config.pregenerated.cfg_dir)).await?;

    let ingest_dict = json!({
        "host": config.ingest.host,
        "port": config.ingest.port,
        "db": config.ingest.db_name,
        "skip": args.skip_ingest,
    })
    .to_string();

    let init = CoordinatorInit {
        objects: config.fake_data_generator.objects,
        visits: config.fake_data_generator.visits,
        seed: config.fake_data_generator.seed,
        cfg_blob,
        ingest_dict,
        partitioner_bundle,
        pregenerated_bundle,
        database: config.ingest.db_name.clone(),
        table_name: config.ingest.db_name.clone(),
        shared_output_dir: out_dir.clone(),
        file_ingest_tool_bin: PathBuf::from("qserv-replica-file-ingest"),
    };

    let coordinator = Arc::new(Coordinator::bind(config.server.port, tracking, chunk_logs, ingest.clone(), init).await?);
    info!(port = config.server.port, "coordinator listening");

    let handler = signals::create_signal_handler();
    let running = Arc::clone(&coordinator);
    let mut accept_task = tokio::spawn(async move { running.run().await });

    let shutdown_target = Arc::clone(&coordinator);
    let signal_wait = handler.wait_for_signal(Box::new(move || {
        let target = Arc::clone(&shutdown_target);
        tokio::spawn(async move { target.request_shutdown().await });
    }));
    tokio::pin!(signal_wait);

    tokio::select! {
        result = &mut accept_task => {
            match result {
                Ok(inner) => inner?,
                Err(err) => return Err(InfraError::Config(format!("accept loop task panicked: {err}"))),
            }
        }
        _ = &mut signal_wait => {
            warn!("shutdown signal received, draining in-flight sessions");
            match accept_task.await {
                Ok(inner) => inner?,
                Err(err) => return Err(InfraError::Config(format!("accept loop task panicked: {err}"))),
            }
        }
    }

    let chunk_logs_report = coordinator.chunk_logs().report().await;
    let timing = coordinator.timing_snapshot().await;
    let all_finished = coordinator.tracking().all_finished();
    print_shutdown_report(&chunk_logs_report, &timing, all_finished);

    if all_finished {
        if let Some(ingest) = &ingest {
            ingest.publish_database(&config.ingest.db_name).await?;
        }
    }

    Ok(())
}

/// Registers the database description and every table schema in
/// `cfg_dir`, following the ingest config directory's file convention:
/// `<dbName>.json` is the database description, every other `.json` file
/// that does not end in `_template.json` is a table schema, posted in
/// sorted order for determinism.
async fn register_ingest_schemas(ingest: &dyn IngestPort, cfg_dir: &std::path::Path, db_name: &str) -> Result<(), InfraError> {
    let db_file_name = format!("{db_name}.json");

    let mut entries = tokio::fs::read_dir(cfg_dir).await?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if name.ends_with("_template.json") {
            continue;
        }
        files.push(path);
    }
    files.sort();

    let db_path = cfg_dir.join(&db_file_name);
    let db_body = tokio::fs::read_to_string(&db_path).await?;
    ingest.register_database(&db_body).await?;

    for path in &files {
        if path.file_name().and_then(|n| n.to_str()) == Some(db_file_name.as_str()) {
            continue;
        }
        let body = tokio::fs::read_to_string(path).await?;
        ingest.register_table(&body).await?;
    }
    Ok(())
}
