use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::info;
use spc_pipeline::schema::EXPECTED_EVENTS;
use spc_pipeline::{
    Frequency, MeasureCatalog, PipelineConfig, SpcPipeline, prepare_records, read_table,
    write_table,
};

/// Build the combined monthly, quarterly and yearly SPC dataset
#[derive(Parser, Debug)]
#[command(name = "spc-pipeline", version, about)]
struct Cli {
    /// Raw records (CSV or Parquet)
    #[arg(long, env = "SPC_INPUT")]
    input: PathBuf,

    /// Destination of the SPC dataset (CSV or Parquet)
    #[arg(long, env = "SPC_OUTPUT")]
    output: PathBuf,

    /// JSON pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON measure catalog; the built-in hospital catalog when omitted
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Column holding the record date
    #[arg(long)]
    date_column: Option<String>,

    #[arg(long)]
    month_window: Option<usize>,

    #[arg(long)]
    quarter_window: Option<usize>,

    #[arg(long)]
    year_window: Option<usize>,

    /// Append an Is_Anomaly column
    #[arg(long)]
    flag_anomalies: bool,
}

impl Cli {
    /// Defaults, overridden by the config file, overridden by flags
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(column) = &self.date_column {
            config.date_column.clone_from(column);
        }
        for (frequency, window) in [
            (Frequency::Month, self.month_window),
            (Frequency::Quarter, self.quarter_window),
            (Frequency::Year, self.year_window),
        ] {
            if let Some(window) = window {
                config.set_window_size(frequency, window);
            }
        }
        if self.flag_anomalies {
            config.flag_anomalies = true;
        }
        Ok(config)
    }

    fn catalog(&self) -> anyhow::Result<MeasureCatalog> {
        match &self.catalog {
            Some(path) => MeasureCatalog::from_json_file(path)
                .with_context(|| format!("loading measure catalog {}", path.display())),
            None => Ok(MeasureCatalog::hospital()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let start = Instant::now();

    let config = cli.pipeline_config()?;
    info!("{config}");
    let pipeline = SpcPipeline::new(config).context("invalid pipeline configuration")?;
    let catalog = cli.catalog()?;

    let raw = read_table(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let expected_events = pipeline
        .config()
        .sum_columns
        .iter()
        .any(|c| c == EXPECTED_EVENTS)
        .then_some(EXPECTED_EVENTS);
    let records = prepare_records(&raw, &catalog, expected_events).context("preparing records")?;

    let dataset = pipeline.run(&records).context("building SPC dataset")?;
    write_table(&cli.output, &dataset)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    info!(
        "Wrote {} SPC rows to {} in {:?}",
        dataset.num_rows(),
        cli.output.display(),
        start.elapsed()
    );
    Ok(())
}
