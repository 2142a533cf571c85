//! # train_forecast
//!
//! Command-line trainer: fit the demand model on one CSV history and write
//! artifacts, or run a batch over a directory of per-product CSV files.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use demand_forecast::artifacts::{write_artifacts, ArtifactKey};
use demand_forecast::config::ForecastConfig;
use demand_forecast::forecaster::DemandForecaster;
use demand_forecast::io::{load_sales_csv, CsvSource};
use demand_forecast::service::{BatchRequest, BatchRunner, MemorySink};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "train_forecast")]
#[command(about = "Daily demand forecasting with ridge regression", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit one history and write forecast artifacts
    Train {
        /// Input CSV with a header row
        #[arg(long)]
        from_csv: PathBuf,

        /// Product identifier used in the artifact key
        #[arg(long)]
        product_id: Option<String>,

        /// Sales channel used in the artifact key
        #[arg(long, default_value = "GLOBAL")]
        channel: String,

        /// Drop rows before this date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Drop rows after this date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Artifact root directory
        #[arg(long, default_value = "forecasting/artifacts")]
        output_dir: PathBuf,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Forecast several products read from `<data-dir>/<product_id>.csv`
    Batch {
        /// Directory holding one CSV per product
        #[arg(long)]
        data_dir: PathBuf,

        #[arg(long)]
        account_id: String,

        /// Product identifiers (repeatable)
        #[arg(long = "product-id", required = true)]
        product_ids: Vec<String>,

        /// Run identifier stamped on every row (default: UTC timestamp)
        #[arg(long)]
        run_id: Option<String>,

        #[command(flatten)]
        model: ModelArgs,
    },
}

/// Model options; each one overrides the configuration file.
#[derive(Args)]
struct ModelArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Country code for the holiday indicator
    #[arg(long)]
    country: Option<String>,

    /// Days to forecast (1-90)
    #[arg(long)]
    horizon: Option<usize>,

    #[arg(long)]
    target_col: Option<String>,

    #[arg(long)]
    date_col: Option<String>,

    /// Exogenous column (repeatable, in matrix order)
    #[arg(long = "exog")]
    exog: Vec<String>,

    /// Ridge penalty
    #[arg(long)]
    l2: Option<f64>,
}

impl ModelArgs {
    fn resolve(&self) -> Result<ForecastConfig> {
        let mut config = match &self.config {
            Some(path) => ForecastConfig::from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ForecastConfig::default(),
        };

        if let Some(country) = &self.country {
            config.country = Some(country.clone());
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(target) = &self.target_col {
            config.target_column = target.clone();
        }
        if let Some(date) = &self.date_col {
            config.date_column = date.clone();
        }
        if !self.exog.is_empty() {
            config.exog_columns = self.exog.clone();
        }
        if let Some(l2) = self.l2 {
            config.l2 = l2;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn train(
    from_csv: PathBuf,
    product_id: Option<String>,
    channel: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    output_dir: PathBuf,
    model: ModelArgs,
) -> Result<()> {
    let config = model.resolve()?;
    let Some(country) = config.country.clone() else {
        bail!("--country is required for training");
    };

    let mut records = load_sales_csv(&from_csv, &config)
        .with_context(|| format!("failed to read {}", from_csv.display()))?;
    records.retain(|r| {
        start_date.map_or(true, |start| r.date >= start) && end_date.map_or(true, |end| r.date <= end)
    });
    info!(rows = records.len(), path = %from_csv.display(), "loaded history");

    let forecaster = DemandForecaster::new(config.clone())?;
    let outcome = forecaster.run(&records).context("forecast failed")?;
    info!(
        mape = outcome.metrics.mape,
        wmape = outcome.metrics.wmape,
        mae = outcome.metrics.mae,
        "backtest"
    );

    let key = ArtifactKey::new(product_id.as_deref(), &country, &channel);
    let dir = write_artifacts(&output_dir, &key, &outcome, &config, Utc::now())
        .context("failed to write artifacts")?;
    println!("Saved artifacts to: {}", dir.display());
    Ok(())
}

fn batch(
    data_dir: PathBuf,
    account_id: String,
    product_ids: Vec<String>,
    run_id: Option<String>,
    model: ModelArgs,
) -> Result<()> {
    let config = model.resolve()?;
    let run_id = run_id.unwrap_or_else(|| format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S")));

    let request = BatchRequest {
        account_id,
        product_ids,
        horizon_days: config.horizon,
        country: config.country.clone(),
    };
    let source = CsvSource::new(data_dir, config.clone());
    let sink = MemorySink::new();

    let report = BatchRunner::new(config)
        .run(&request, &run_id, &source, &sink)
        .context("batch request rejected")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            from_csv,
            product_id,
            channel,
            start_date,
            end_date,
            output_dir,
            model,
        } => train(from_csv, product_id, channel, start_date, end_date, output_dir, model),
        Commands::Batch {
            data_dir,
            account_id,
            product_ids,
            run_id,
            model,
        } => batch(data_dir, account_id, product_ids, run_id, model),
    }
}
