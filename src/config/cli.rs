use crate::domain::model::CollectSettings;
use crate::utils::error::{HarvestError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "table-harvest")]
#[command(about = "Collect platform API data into local tables")]
pub struct CliConfig {
    /// Platform id (e.g. wechat_video, douyin, weibo)
    #[arg(long)]
    pub platform: Option<String>,

    /// Function id under the platform (e.g. user_videos, hot_list)
    #[arg(long)]
    pub function: Option<String>,

    /// Request parameter as KEY=VALUE, repeatable; VALUE may be JSON
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Collect mode: times or all
    #[arg(long, default_value = "times")]
    pub mode: String,

    /// Number of requests in times mode
    #[arg(long, default_value = "1")]
    pub times: usize,

    /// Bearer token, falls back to the TABLE_HARVEST_TOKEN env var
    #[arg(long)]
    pub token: Option<String>,

    /// Migrate collected records into this existing table
    #[arg(long)]
    pub table: Option<String>,

    /// Create a new table (unique name) and migrate into it
    #[arg(long)]
    pub create_table: bool,

    /// Directory of the local table store
    #[arg(long, default_value = "./tables")]
    pub tables_dir: String,

    /// Extra registry TOML file, repeatable
    #[arg(long = "registry", value_name = "FILE")]
    pub registry_files: Vec<String>,

    /// List platforms and functions, then exit
    #[arg(long)]
    pub list: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable system monitoring
    #[arg(long)]
    pub monitor: bool,
}

impl CliConfig {
    /// 解析 --param KEY=VALUE。VALUE 先當 JSON 解析，失敗則視為字串
    pub fn parsed_params(&self) -> Result<serde_json::Map<String, Value>> {
        let mut params = serde_json::Map::new();
        for raw in &self.params {
            let Some((key, value)) = raw.split_once('=') else {
                return Err(HarvestError::InvalidConfigValueError {
                    field: "param".to_string(),
                    value: raw.clone(),
                    reason: "Expected KEY=VALUE format".to_string(),
                });
            };
            if key.trim().is_empty() {
                return Err(HarvestError::InvalidConfigValueError {
                    field: "param".to_string(),
                    value: raw.clone(),
                    reason: "Parameter key cannot be empty".to_string(),
                });
            }
            let parsed = serde_json::from_str(value)
                .unwrap_or_else(|_| Value::String(value.to_string()));
            params.insert(key.to_string(), parsed);
        }
        Ok(params)
    }

    pub fn collect_settings(&self) -> CollectSettings {
        if self.mode == "all" {
            CollectSettings::all()
        } else {
            CollectSettings::times(self.times)
        }
    }

    /// --token 優先，其次 TABLE_HARVEST_TOKEN 環境變數
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("TABLE_HARVEST_TOKEN").ok())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.mode != "times" && self.mode != "all" {
            return Err(HarvestError::InvalidConfigValueError {
                field: "mode".to_string(),
                value: self.mode.clone(),
                reason: "Supported modes: times, all".to_string(),
            });
        }

        validation::validate_positive_number("times", self.times, 1)?;
        validation::validate_path("tables_dir", &self.tables_dir)?;
        validation::validate_file_extensions("registry", &self.registry_files, &["toml"])?;

        if self.table.is_some() && self.create_table {
            return Err(HarvestError::ConfigValidationError {
                field: "table".to_string(),
                message: "--table and --create-table are mutually exclusive".to_string(),
            });
        }

        Ok(())
    }
}
