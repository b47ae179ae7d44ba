//! Pipeline configuration shared by the job worker and the CLI.

use tracing::{debug, info};

use crate::collect::CollectConfig;
use crate::estimate::EstimateParams;

/// All tuning knobs of the collect-estimate-pack stages in one place, so
/// every stage receives explicit configuration instead of reading module
/// state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub collect: CollectConfig,
    pub estimate: EstimateParams,
    /// Cost seeded into every bin for the fixed artifact preamble.
    pub header_cost: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collect: CollectConfig::default(),
            estimate: EstimateParams::default(),
            header_cost: 1024 * 1024,
        }
    }
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            header_cost = self.header_cost,
            unit_floor = self.estimate.unit_floor,
            excluded_dirs = self.collect.excluded_dirs.len(),
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}
