//! On-disk training artifacts.
//!
//! A run is written to `<output_dir>/<key>/<timestamp>/` as:
//! - `forecast.csv`: `date,yhat,p10,p90`
//! - `metadata.json`: configuration, backtest metrics, features, history length
//! - `model.json`: feature names, coefficients and sigma
//! - `model_summary.txt`

use crate::config::ForecastConfig;
use crate::error::Result;
use crate::forecaster::ForecastOutcome;
use crate::utils::BacktestMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Identity of an artifact directory: `p<product>_<country>_<channel>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub product_id: Option<String>,
    pub country: String,
    pub channel: String,
}

impl ArtifactKey {
    pub fn new(product_id: Option<&str>, country: &str, channel: &str) -> Self {
        Self {
            product_id: product_id.map(str::to_string),
            country: country.to_string(),
            channel: channel.to_string(),
        }
    }

    /// Directory name; CSV-sourced runs without a product id use `csv`.
    pub fn dir_name(&self) -> String {
        format!(
            "p{}_{}_{}",
            self.product_id.as_deref().unwrap_or("csv"),
            self.country,
            self.channel
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub key: ArtifactKey,
    pub config: ForecastConfig,
    pub metrics: BacktestMetrics,
    pub features: Vec<String>,
    pub endog_len: usize,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Write every artifact of `outcome` and return the run directory.
pub fn write_artifacts(
    output_dir: impl AsRef<Path>,
    key: &ArtifactKey,
    outcome: &ForecastOutcome,
    config: &ForecastConfig,
    created_at: DateTime<Utc>,
) -> Result<PathBuf> {
    let timestamp = created_at.format(TIMESTAMP_FORMAT).to_string();
    let dir = output_dir.as_ref().join(key.dir_name()).join(&timestamp);
    fs::create_dir_all(&dir)?;

    let mut writer = csv::Writer::from_path(dir.join("forecast.csv"))?;
    writer.write_record(["date", "yhat", "p10", "p90"])?;
    for point in outcome.forecast.points() {
        writer.write_record([
            point.date.to_string(),
            point.yhat.to_string(),
            point.p10.to_string(),
            point.p90.to_string(),
        ])?;
    }
    writer.flush()?;

    let metadata = ArtifactMetadata {
        key: key.clone(),
        config: config.clone(),
        metrics: outcome.metrics.clone(),
        features: outcome.model.feature_names().to_vec(),
        endog_len: outcome.endog_len,
        created_at: timestamp,
    };
    serde_json::to_writer_pretty(File::create(dir.join("metadata.json"))?, &metadata)?;
    serde_json::to_writer_pretty(File::create(dir.join("model.json"))?, &outcome.model)?;
    fs::write(dir.join("model_summary.txt"), outcome.model_summary())?;

    info!(path = %dir.display(), "wrote artifacts");
    Ok(dir)
}
