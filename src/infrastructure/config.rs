use crate::domain::geometry::{GridSpec, GRID_COLS, GRID_ROWS, ROW_HEIGHT};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub grid: GridSettings,
    #[serde(default)]
    pub options: OptionsSettings,
    #[serde(default)]
    pub page: PageSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GridSettings {
    #[serde(default = "default_cols")]
    pub cols: u32,
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_row_height")]
    pub row_height: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            cols: GRID_COLS,
            rows: GRID_ROWS,
            row_height: ROW_HEIGHT,
        }
    }
}

impl GridSettings {
    pub fn spec(&self) -> GridSpec {
        GridSpec {
            cols: self.cols,
            rows: self.rows,
            row_height: self.row_height,
        }
    }
}

/// Shape of the distinct-values query behind filter options.
#[derive(Debug, Deserialize, Clone)]
pub struct OptionsSettings {
    #[serde(default = "default_options_table")]
    pub table: String,
    #[serde(default = "default_options_limit")]
    pub limit: u32,
}

impl Default for OptionsSettings {
    fn default() -> Self {
        Self {
            table: default_options_table(),
            limit: default_options_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PageSettings {
    #[serde(default)]
    pub name: String,
    /// Preset filter values, keyed by placeholder name.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cols() -> u32 {
    GRID_COLS
}

fn default_rows() -> u32 {
    GRID_ROWS
}

fn default_row_height() -> f64 {
    ROW_HEIGHT
}

fn default_options_table() -> String {
    "forecast".to_string()
}

fn default_options_limit() -> u32 {
    1000
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
