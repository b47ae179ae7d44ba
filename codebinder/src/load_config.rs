/// `load_config` module: loads a static YAML config file and maps it onto
/// the strongly-typed pipeline configuration of a job request.
///
/// This is the only place where untrusted YAML is parsed; everything past
/// this boundary works with rich internal structs. All keys are optional —
/// an absent section leaves the corresponding defaults untouched.
///
/// # Accepted schema
/// ```yaml
/// collect:
///   extra_excluded_dirs: ["docs", "fixtures"]
/// estimate:
///   bytes_per_char: 2
///   unit_overhead: 5000
///   unit_floor: 30720
/// pack:
///   header_cost: 1048576
/// ```
///
/// # Errors
/// All errors use `anyhow::Error` for context-rich diagnostics, surfaced at
/// the CLI boundary.
use std::fs;
use std::path::Path;

use anyhow::Result;
use codebinder_core::job::JobRequest;
use serde::Deserialize;
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub collect: Option<CollectSection>,
    #[serde(default)]
    pub estimate: Option<EstimateSection>,
    #[serde(default)]
    pub pack: Option<PackSection>,
}

#[derive(Debug, Deserialize)]
pub struct CollectSection {
    #[serde(default)]
    pub extra_excluded_dirs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EstimateSection {
    pub bytes_per_char: Option<u64>,
    pub unit_overhead: Option<u64>,
    pub unit_floor: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PackSection {
    pub header_cost: Option<u64>,
}

/// Load a YAML config file into a [`CliConfig`].
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    match serde_yaml::from_str(&config_content) {
        Ok(config) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(config)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Fold the loaded overrides into a job request.
pub fn apply(config: &CliConfig, request: &mut JobRequest) {
    if let Some(collect) = &config.collect {
        request
            .extra_excluded_dirs
            .extend(collect.extra_excluded_dirs.iter().cloned());
    }
    if let Some(estimate) = &config.estimate {
        if let Some(v) = estimate.bytes_per_char {
            request.pipeline.estimate.bytes_per_char = v;
        }
        if let Some(v) = estimate.unit_overhead {
            request.pipeline.estimate.unit_overhead = v;
        }
        if let Some(v) = estimate.unit_floor {
            request.pipeline.estimate.unit_floor = v;
        }
    }
    if let Some(pack) = &config.pack {
        if let Some(v) = pack.header_cost {
            request.pipeline.header_cost = v;
        }
    }
}
