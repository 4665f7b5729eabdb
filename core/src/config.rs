use crate::{aggregation::CommissionPolicy, store::SaveMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT_PATH: &str = "data/transactions.csv";
pub const DEFAULT_DB_PATH: &str = "data/pipeline.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub db_path: String,
    pub save_mode: SaveMode,
    pub commission: CommissionPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            db_path: DEFAULT_DB_PATH.to_string(),
            save_mode: SaveMode::default(),
            commission: CommissionPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Omitted fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        Self::from_json(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: PipelineConfig = serde_json::from_str(content)?;
        config.commission.check()?;
        Ok(config)
    }

    pub fn with_input(mut self, input_path: impl Into<PathBuf>) -> Self {
        self.input_path = input_path.into();
        self
    }

    pub fn with_save_mode(mut self, save_mode: SaveMode) -> Self {
        self.save_mode = save_mode;
        self
    }
}
