use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    KIB_PER_MIB, NS_PER_US,
    error::{Error, Result},
};

/// Which of the two FIO output flavours a run consumes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Per-interval `*_{iops,bw,lat,clat,slat}.N.log` files
    #[default]
    Log,
    /// `--output-format=json+` result documents
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RwMode {
    Read,
    Write,
    #[serde(rename = "rw", alias = "readwrite")]
    ReadWrite,
    Randread,
    Randwrite,
    #[serde(rename = "randrw")]
    RandReadWrite,
}

impl RwMode {
    /// The value FIO uses for `--rw` and in result file names.
    pub fn as_fio(&self) -> &'static str {
        match self {
            RwMode::Read => "read",
            RwMode::Write => "write",
            RwMode::ReadWrite => "rw",
            RwMode::Randread => "randread",
            RwMode::Randwrite => "randwrite",
            RwMode::RandReadWrite => "randrw",
        }
    }

    pub fn from_fio(value: &str) -> Option<Self> {
        match value {
            "read" => Some(RwMode::Read),
            "write" => Some(RwMode::Write),
            "rw" | "readwrite" => Some(RwMode::ReadWrite),
            "randread" => Some(RwMode::Randread),
            "randwrite" => Some(RwMode::Randwrite),
            "randrw" => Some(RwMode::RandReadWrite),
            _ => None,
        }
    }

    /// Directions this pattern issues I/O in.
    pub fn directions(&self) -> &'static [Direction] {
        match self {
            RwMode::Read | RwMode::Randread => &[Direction::Read],
            RwMode::Write | RwMode::Randwrite => &[Direction::Write],
            RwMode::ReadWrite | RwMode::RandReadWrite => &[Direction::Read, Direction::Write],
        }
    }
}

impl fmt::Display for RwMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_fio())
    }
}

impl FromStr for RwMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RwMode::from_fio(s).ok_or_else(|| Error::Configuration {
            field: "rw",
            reason: format!("unknown I/O pattern {s:?}"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Read,
    Write,
    Trim,
}

impl Direction {
    /// Direction column code used in FIO log files.
    pub fn from_log_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Direction::Read),
            1 => Some(Direction::Write),
            2 => Some(Direction::Trim),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
            Direction::Trim => "trim",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "read" => Ok(Direction::Read),
            "write" => Ok(Direction::Write),
            _ => Err(Error::Configuration {
                field: "filter",
                reason: format!("expected read or write, got {s:?}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Iops,
    Bw,
    Lat,
    Slat,
    Clat,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Iops,
        MetricKind::Bw,
        MetricKind::Lat,
        MetricKind::Slat,
        MetricKind::Clat,
    ];

    pub fn is_latency(&self) -> bool {
        matches!(self, MetricKind::Lat | MetricKind::Slat | MetricKind::Clat)
    }

    /// Suffix FIO appends to log file names, ie. `_clat` in `x_clat.1.log`
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Iops => "iops",
            MetricKind::Bw => "bw",
            MetricKind::Lat => "lat",
            MetricKind::Slat => "slat",
            MetricKind::Clat => "clat",
        }
    }

    /// Converts a raw FIO reading into the unit every dataset carries:
    /// microseconds for latencies, MiB/s for bandwidth, IOPS unchanged.
    pub fn normalize(&self, raw: f64) -> f64 {
        match self {
            MetricKind::Iops => raw,
            MetricKind::Bw => raw / KIB_PER_MIB,
            MetricKind::Lat | MetricKind::Slat | MetricKind::Clat => raw / NS_PER_US,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::Iops => "IOPS",
            MetricKind::Bw => "MiB/s",
            MetricKind::Lat | MetricKind::Slat | MetricKind::Clat => "us",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Configuration {
                field: "type",
                reason: format!("unknown metric type {s:?}"),
            })
    }
}

/// How log series sharing a label are joined on their timestamps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Keep only timestamps every series has
    #[default]
    Intersection,
    /// Keep every timestamp, aggregating over the series that have it
    Union,
}

/// How values at one aligned timestamp are combined.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Mean,
    /// Total across jobs, ie. aggregate throughput
    Sum,
}

/// What the flattener does when two documents resolve to the same grid cell.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    #[default]
    Fail,
    /// Documents are visited in path order, the later path wins
    KeepLast,
}

/// Fallbacks for every option [`RawConfig`] leaves unset.
pub struct Defaults {
    pub source: SourceKind,
    pub metric_types: &'static [MetricKind],
    pub iodepth: &'static [u32],
    pub numjobs: &'static [u32],
    pub filter: &'static [Direction],
    pub percentile: Option<f64>,
    pub moving_average: Option<usize>,
    pub label_depth: usize,
    pub label_segment_size: usize,
    pub alignment: Alignment,
    pub aggregation: Aggregation,
    pub on_collision: CollisionPolicy,
}

pub const DEFAULTS: Defaults = Defaults {
    source: SourceKind::Log,
    metric_types: &[MetricKind::Iops],
    iodepth: &[1, 2, 4, 8, 16, 32, 64],
    numjobs: &[1, 2, 4, 8, 16, 32, 64],
    filter: &[Direction::Read, Direction::Write],
    percentile: None,
    moving_average: None,
    label_depth: 0,
    label_segment_size: 1000,
    alignment: Alignment::Intersection,
    aggregation: Aggregation::Mean,
    on_collision: CollisionPolicy::Fail,
};

/// Unvalidated options, as they arrive from a YAML file or the command line.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub input_directory: Option<Vec<PathBuf>>,
    pub source: Option<SourceKind>,
    pub rw: Option<RwMode>,
    #[serde(rename = "type")]
    pub metric_types: Option<Vec<MetricKind>>,
    pub iodepth: Option<Vec<u32>>,
    pub numjobs: Option<Vec<u32>>,
    pub filter: Option<Vec<Direction>>,
    pub percentile: Option<f64>,
    pub moving_average: Option<usize>,
    pub label_depth: Option<usize>,
    pub label_segment_size: Option<usize>,
    pub max_depth: Option<u32>,
    pub max_jobs: Option<u32>,
    pub alignment: Option<Alignment>,
    pub aggregation: Option<Aggregation>,
    pub on_collision: Option<CollisionPolicy>,
}

/// Validated, immutable run configuration. Only obtainable through [`RawConfig::build`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Config {
    pub input_directory: Vec<PathBuf>,
    pub source: SourceKind,
    pub rw: RwMode,
    pub metric_types: Vec<MetricKind>,
    /// Sorted, deduplicated, already truncated to `max_depth`
    pub iodepth: Vec<u32>,
    /// Sorted, deduplicated, already truncated to `max_jobs`
    pub numjobs: Vec<u32>,
    pub filter: Vec<Direction>,
    pub percentile: Option<f64>,
    pub moving_average: Option<usize>,
    pub label_depth: usize,
    pub label_segment_size: usize,
    pub max_depth: Option<u32>,
    pub max_jobs: Option<u32>,
    pub alignment: Alignment,
    pub aggregation: Aggregation,
    pub on_collision: CollisionPolicy,
}

impl RawConfig {
    /// Fields set in `other` replace the ones in `self`.
    pub fn overlay(self, other: RawConfig) -> RawConfig {
        RawConfig {
            input_directory: other.input_directory.or(self.input_directory),
            source: other.source.or(self.source),
            rw: other.rw.or(self.rw),
            metric_types: other.metric_types.or(self.metric_types),
            iodepth: other.iodepth.or(self.iodepth),
            numjobs: other.numjobs.or(self.numjobs),
            filter: other.filter.or(self.filter),
            percentile: other.percentile.or(self.percentile),
            moving_average: other.moving_average.or(self.moving_average),
            label_depth: other.label_depth.or(self.label_depth),
            label_segment_size: other.label_segment_size.or(self.label_segment_size),
            max_depth: other.max_depth.or(self.max_depth),
            max_jobs: other.max_jobs.or(self.max_jobs),
            alignment: other.alignment.or(self.alignment),
            aggregation: other.aggregation.or(self.aggregation),
            on_collision: other.on_collision.or(self.on_collision),
        }
    }

    pub fn build(self) -> Result<Config> {
        let input_directory = self.input_directory.unwrap_or_default();
        if input_directory.is_empty() {
            return Err(config_error("input_directory", "at least one directory is required"));
        }
        let rw = self
            .rw
            .ok_or_else(|| config_error("rw", "an I/O pattern is required"))?;

        let mut metric_types = self
            .metric_types
            .unwrap_or_else(|| DEFAULTS.metric_types.to_vec());
        metric_types.sort();
        metric_types.dedup();
        if metric_types.is_empty() {
            return Err(config_error("type", "at least one metric type is required"));
        }

        let iodepth = bounded_list(
            "iodepth",
            self.iodepth.unwrap_or_else(|| DEFAULTS.iodepth.to_vec()),
            self.max_depth,
        )?;
        let numjobs = bounded_list(
            "numjobs",
            self.numjobs.unwrap_or_else(|| DEFAULTS.numjobs.to_vec()),
            self.max_jobs,
        )?;

        let mut filter = match self.filter {
            Some(filter) => filter,
            None => DEFAULTS
                .filter
                .iter()
                .copied()
                .filter(|d| rw.directions().contains(d))
                .collect(),
        };
        filter.sort();
        filter.dedup();
        if filter.is_empty() {
            return Err(config_error("filter", "at least one of read, write is required"));
        }
        for direction in &filter {
            if *direction == Direction::Trim {
                return Err(config_error("filter", "only read and write can be filtered on"));
            }
            if !rw.directions().contains(direction) {
                return Err(config_error(
                    "filter",
                    format!("rw={rw} never issues {direction} I/O"),
                ));
            }
        }

        let percentile = self.percentile.or(DEFAULTS.percentile);
        if let Some(p) = percentile
            && !(p > 0.0 && p <= 100.0)
        {
            return Err(config_error("percentile", format!("{p} is not within (0, 100]")));
        }

        let moving_average = self.moving_average.or(DEFAULTS.moving_average);
        if moving_average == Some(0) {
            return Err(config_error("moving_average", "window must be at least 1"));
        }

        let label_segment_size = self
            .label_segment_size
            .unwrap_or(DEFAULTS.label_segment_size);
        if label_segment_size == 0 {
            return Err(config_error("label_segment_size", "must be at least 1"));
        }

        Ok(Config {
            input_directory,
            source: self.source.unwrap_or(DEFAULTS.source),
            rw,
            metric_types,
            iodepth,
            numjobs,
            filter,
            percentile,
            moving_average,
            label_depth: self.label_depth.unwrap_or(DEFAULTS.label_depth),
            label_segment_size,
            max_depth: self.max_depth,
            max_jobs: self.max_jobs,
            alignment: self.alignment.unwrap_or(DEFAULTS.alignment),
            aggregation: self.aggregation.unwrap_or(DEFAULTS.aggregation),
            on_collision: self.on_collision.unwrap_or(DEFAULTS.on_collision),
        })
    }
}

fn config_error(field: &'static str, reason: impl Into<String>) -> Error {
    Error::Configuration {
        field,
        reason: reason.into(),
    }
}

fn bounded_list(field: &'static str, mut values: Vec<u32>, max: Option<u32>) -> Result<Vec<u32>> {
    if values.is_empty() {
        return Err(config_error(field, "at least one value is required"));
    }
    if values.contains(&0) {
        return Err(config_error(field, "values must be at least 1"));
    }
    values.sort_unstable();
    values.dedup();
    if let Some(max) = max {
        values.retain(|x| *x <= max);
        if values.is_empty() {
            return Err(config_error(field, format!("every requested value exceeds {max}")));
        }
    }
    Ok(values)
}
