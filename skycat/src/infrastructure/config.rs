// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Coordinator configuration: the YAML document of the external interfaces
//! section, deserialized into typed structs with field-level validation
//! performed immediately after load so a bad config fails before any socket
//! or transaction is opened.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::InfraError;

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    pub server: ServerConfig,
    #[serde(rename = "fakeDataGenerator")]
    pub fake_data_generator: FakeDataGeneratorConfig,
    pub partitioner: DirConfig,
    pub pregenerated: DirConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FakeDataGeneratorConfig {
    #[serde(rename = "cfgFileName")]
    pub cfg_file_name: PathBuf,
    pub objects: u64,
    pub visits: u64,
    pub seed: u64,
    pub transaction_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirConfig {
    #[serde(rename = "cfgDir")]
    pub cfg_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    pub host: String,
    pub port: u16,
    #[serde(rename = "authKey")]
    pub auth_key: String,
    #[serde(rename = "dbName")]
    pub db_name: String,
    #[serde(rename = "cfgDir")]
    pub cfg_dir: PathBuf,
}

impl CoordinatorConfig {
    pub fn load(raw: &str) -> Result<Self, InfraError> {
        let config: CoordinatorConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), InfraError> {
        if self.server.port == 0 {
            return Err(InfraError::Config("server.port must be non-zero".into()));
        }
        if self.fake_data_generator.transaction_size == 0 {
            return Err(InfraError::Config("fakeDataGenerator.transaction_size must be non-zero".into()));
        }
        if self.ingest.host.trim().is_empty() {
            return Err(InfraError::Config("ingest.host must not be empty".into()));
        }
        if self.ingest.port == 0 {
            return Err(InfraError::Config("ingest.port must be non-zero".into()));
        }
        if self.ingest.db_name.trim().is_empty() {
            return Err(InfraError::Config("ingest.dbName must not be empty".into()));
        }
        Ok(())
    }
}

/// Worker `--configfile` document: every field is an optional override for
/// the matching CLI flag, applied only where the CLI flag was not given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(rename = "workDir")]
    pub work_dir: Option<PathBuf>,
    #[serde(rename = "maxChunks")]
    pub max_chunks: Option<u32>,
    #[serde(rename = "generatorBin")]
    pub generator_bin: Option<PathBuf>,
}

impl WorkerFileConfig {
    pub fn load(raw: &str) -> Result<Self, InfraError> {
        Ok(serde_yaml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_yaml() -> &'static str {
        r#"
server:
  port: 7654
fakeDataGenerator:
  cfgFileName: gen.cfg
  objects: 1000
  visits: 10
  seed: 42
  transaction_size: 50
partitioner:
  cfgDir: ./partitioner
pregenerated:
  cfgDir: ./pregenerated
ingest:
  host: ingest.example.org
  port: 25080
  authKey: secret
  dbName: fakedb
  cfgDir: ./ingest-schemas
"#
    }

    #[test]
    fn loads_a_valid_config() {
        let config = CoordinatorConfig::load(valid_yaml()).unwrap();
        assert_eq!(config.server.port, 7654);
        assert_eq!(config.ingest.db_name, "fakedb");
    }

    #[test]
    fn rejects_zero_port() {
        let bad = valid_yaml().replace("port: 7654", "port: 0");
        let err = CoordinatorConfig::load(&bad).unwrap_err();
        assert!(matches!(err, InfraError::Config(_)));
    }

    #[test]
    fn rejects_missing_ingest_host() {
        let bad = valid_yaml().replace("host: ingest.example.org", "host: \"\"");
        let err = CoordinatorConfig::load(&bad).unwrap_err();
        assert!(matches!(err, InfraError::Config(_)));
    }

    #[test]
    fn worker_file_config_allows_partial_overrides() {
        let config = WorkerFileConfig::load("host: coordinator.example\nmaxChunks: 20\n").unwrap();
        assert_eq!(config.host.as_deref(), Some("coordinator.example"));
        assert_eq!(config.max_chunks, Some(20));
        assert_eq!(config.port, None);
    }
}
