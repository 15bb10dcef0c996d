use std::path::PathBuf;

use clap::Args;
use common::config::{
    Aggregation, Alignment, CollisionPolicy, Config, Direction, MetricKind, RawConfig, RwMode,
    SourceKind,
};
use eyre::{Result, WrapErr};
use serde::de::DeserializeOwned;
use tokio::fs::read_to_string;
use tracing::debug;

/// Dataset options. Every flag overrides the same key of the `--config` file.
#[derive(Debug, Default, Args)]
pub struct DatasetArgs {
    /// YAML file with the same keys as the flags below
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Directories searched recursively for FIO output
    #[arg(short, long = "input-directory")]
    pub input_directory: Vec<PathBuf>,
    /// `log` for per-interval logs, `summary` for json+ results
    #[arg(long, value_parser = serde_value::<SourceKind>)]
    pub source: Option<SourceKind>,
    #[arg(long)]
    pub rw: Option<RwMode>,
    /// iops, bw, lat, slat or clat
    #[arg(short = 't', long = "type", value_delimiter = ',')]
    pub metric_types: Vec<MetricKind>,
    #[arg(short = 'd', long, value_delimiter = ',')]
    pub iodepth: Vec<u32>,
    #[arg(short = 'n', long, value_delimiter = ',')]
    pub numjobs: Vec<u32>,
    /// read and/or write
    #[arg(short, long, value_delimiter = ',')]
    pub filter: Vec<Direction>,
    /// Latency percentile charted instead of the mean
    #[arg(short, long)]
    pub percentile: Option<f64>,
    #[arg(long)]
    pub moving_average: Option<usize>,
    /// Parent directories that make up a label
    #[arg(long)]
    pub label_depth: Option<usize>,
    /// Characters kept of each label segment
    #[arg(long)]
    pub label_segment_size: Option<usize>,
    #[arg(long)]
    pub max_depth: Option<u32>,
    #[arg(long)]
    pub max_jobs: Option<u32>,
    #[arg(long, value_parser = serde_value::<Alignment>)]
    pub alignment: Option<Alignment>,
    #[arg(long, value_parser = serde_value::<Aggregation>)]
    pub aggregation: Option<Aggregation>,
    #[arg(long, value_parser = serde_value::<CollisionPolicy>)]
    pub on_collision: Option<CollisionPolicy>,
}

/// Parses a flag value with the same spelling the YAML file uses.
fn serde_value<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_owned())).map_err(|x| x.to_string())
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    (!values.is_empty()).then_some(values)
}

impl DatasetArgs {
    pub fn into_raw(self) -> RawConfig {
        RawConfig {
            input_directory: non_empty(self.input_directory),
            source: self.source,
            rw: self.rw,
            metric_types: non_empty(self.metric_types),
            iodepth: non_empty(self.iodepth),
            numjobs: non_empty(self.numjobs),
            filter: non_empty(self.filter),
            percentile: self.percentile,
            moving_average: self.moving_average,
            label_depth: self.label_depth,
            label_segment_size: self.label_segment_size,
            max_depth: self.max_depth,
            max_jobs: self.max_jobs,
            alignment: self.alignment,
            aggregation: self.aggregation,
            on_collision: self.on_collision,
        }
    }

    /// Reads the optional config file, overlays the flags and validates the result.
    pub async fn load(self) -> Result<Config> {
        let file = match &self.config {
            Some(path) => {
                let text = read_to_string(path)
                    .await
                    .wrap_err_with(|| format!("Reading {}", path.display()))?;
                serde_yml::from_str::<RawConfig>(&text)
                    .wrap_err_with(|| format!("Parsing {}", path.display()))?
            }
            None => RawConfig::default(),
        };
        let config = file.overlay(self.into_raw()).build()?;
        debug!("Config: {config:?}");
        Ok(config)
    }
}
