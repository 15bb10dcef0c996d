//! The in-memory model handed from the ingestion engine to presentation.
//!
//! A [`Dataset`] is built once per invocation and exposes no mutating API:
//! either a set of time-aligned [`MergedSeries`] (log input) or a dense
//! [`Grid`] of per-run measurements (summary input).

use std::{collections::BTreeMap, fmt, path::PathBuf};

use serde::{Serialize, Serializer};

use crate::{
    config::{Direction, MetricKind, RwMode},
    util::{mean, stddev},
};

/// Identifies one logical benchmark series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunKey {
    pub rw: RwMode,
    pub direction: Direction,
    pub metric: MetricKind,
    pub iodepth: u32,
    pub numjobs: u32,
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} iodepth={} numjobs={} {} {}",
            self.rw, self.iodepth, self.numjobs, self.direction, self.metric
        )
    }
}

/// One reading. `timestamp` is milliseconds since the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: u64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: u64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Samples read from one source file, timestamps non-decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub key: RunKey,
    pub source: PathBuf,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SeriesKey {
    pub label: String,
    pub key: RunKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

/// One or more [`Series`] combined onto a common, strictly increasing time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedSeries {
    label: String,
    key: RunKey,
    sources: Vec<PathBuf>,
    moving_average: Option<usize>,
    samples: Vec<Sample>,
}

impl MergedSeries {
    pub fn new(
        label: String,
        key: RunKey,
        sources: Vec<PathBuf>,
        moving_average: Option<usize>,
        samples: Vec<Sample>,
    ) -> Self {
        debug_assert!(
            samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "merged timestamps must be strictly increasing"
        );
        Self {
            label,
            key,
            sources,
            moving_average,
            samples,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn key(&self) -> RunKey {
        self.key
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Window the values were smoothed with, if any
    pub fn moving_average(&self) -> Option<usize> {
        self.moving_average
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.iter().map(|x| x.timestamp)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|x| x.value)
    }

    /// Mean, extremes and standard deviation of the final values.
    pub fn stats(&self) -> Option<SeriesStats> {
        let values = self.values().collect::<Vec<_>>();
        Some(SeriesStats {
            mean: mean(&values)?,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            stddev: stddev(&values)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub value: f64,
    pub stddev: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentReason {
    /// No document covered this combination
    NoDocument,
    /// A document exists but lacks the direction or metric section
    MissingSection,
    /// The latency section has no percentile at or above the requested one
    MissingPercentile,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Present(Measurement),
    Absent(AbsentReason),
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Present(m) => Some(m.value),
            Cell::Absent(_) => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Cell::Present(_))
    }
}

/// Dense mapping over every requested (direction, metric, depth, jobs) combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    rw: RwMode,
    depths: Vec<u32>,
    jobs: Vec<u32>,
    #[serde(serialize_with = "as_entries")]
    cells: BTreeMap<RunKey, Cell>,
}

impl Grid {
    pub fn builder(
        rw: RwMode,
        directions: &[Direction],
        metrics: &[MetricKind],
        depths: &[u32],
        jobs: &[u32],
    ) -> GridBuilder {
        let mut cells = BTreeMap::new();
        for &direction in directions {
            for &metric in metrics {
                for &iodepth in depths {
                    for &numjobs in jobs {
                        let key = RunKey {
                            rw,
                            direction,
                            metric,
                            iodepth,
                            numjobs,
                        };
                        cells.insert(key, Cell::Absent(AbsentReason::NoDocument));
                    }
                }
            }
        }
        GridBuilder {
            grid: Grid {
                rw,
                depths: depths.to_vec(),
                jobs: jobs.to_vec(),
                cells,
            },
        }
    }

    pub fn rw(&self) -> RwMode {
        self.rw
    }

    pub fn depths(&self) -> &[u32] {
        &self.depths
    }

    pub fn jobs(&self) -> &[u32] {
        &self.jobs
    }

    /// `None` only for keys outside the requested space.
    pub fn get(&self, key: &RunKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&RunKey, &Cell)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn present_count(&self) -> usize {
        self.cells.values().filter(|x| x.is_present()).count()
    }

    pub fn absent_count(&self) -> usize {
        self.len() - self.present_count()
    }

    /// Depth-major rows, one column per job count, for surface and heatmap charts.
    pub fn matrix(&self, direction: Direction, metric: MetricKind) -> Vec<Vec<Option<f64>>> {
        self.depths
            .iter()
            .map(|&iodepth| {
                self.jobs
                    .iter()
                    .map(|&numjobs| {
                        let key = RunKey {
                            rw: self.rw,
                            direction,
                            metric,
                            iodepth,
                            numjobs,
                        };
                        self.cells.get(&key).and_then(Cell::value)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Mutable stage of a [`Grid`]; cells outside the requested space are refused.
#[derive(Debug)]
pub struct GridBuilder {
    grid: Grid,
}

impl GridBuilder {
    /// Returns false when `key` is outside the grid.
    pub fn set(&mut self, key: RunKey, cell: Cell) -> bool {
        match self.grid.cells.get_mut(&key) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    pub fn finish(self) -> Grid {
        self.grid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Series(#[serde(serialize_with = "as_entries")] BTreeMap<SeriesKey, MergedSeries>),
    Grid(Grid),
}

impl Dataset {
    /// True when there is nothing to chart.
    pub fn is_empty(&self) -> bool {
        match self {
            Dataset::Series(series) => series.values().all(MergedSeries::is_empty),
            Dataset::Grid(grid) => grid.present_count() == 0,
        }
    }
}

fn as_entries<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    K: Serialize,
    V: Serialize,
{
    serializer.collect_seq(map.iter())
}
