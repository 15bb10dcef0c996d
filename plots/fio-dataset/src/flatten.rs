//! Walks parsed summary documents into a dense [`Grid`].

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};

use common::{
    config::{CollisionPolicy, Config, Direction, MetricKind},
    dataset::{AbsentReason, Cell, Grid, Measurement, RunKey},
    error::{Error, Result},
};
use fio::result::RunParams;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::parser::{MetricRecord, SummaryRecord};

/// Emits one grid cell per requested RunKey. Documents are visited in path
/// order so the outcome never depends on directory iteration order.
pub fn flatten(records: &[SummaryRecord], config: &Config) -> Result<Grid> {
    let mut builder = Grid::builder(
        config.rw,
        &config.filter,
        &config.metric_types,
        &config.iodepth,
        &config.numjobs,
    );
    let mut owners: HashMap<RunKey, PathBuf> = HashMap::new();

    for record in records.iter().sorted_by(|a, b| a.path.cmp(&b.path)) {
        let params = record.params;
        if !requested(&params, config) {
            debug!(
                "{}: {}-{}-{} is outside the requested grid",
                record.path.display(),
                params.rw,
                params.iodepth,
                params.numjobs
            );
            continue;
        }

        for &direction in &config.filter {
            for &metric in &config.metric_types {
                let key = RunKey {
                    rw: params.rw,
                    direction,
                    metric,
                    iodepth: params.iodepth,
                    numjobs: params.numjobs,
                };
                if let Some(first) = owners.get(&key) {
                    match config.on_collision {
                        CollisionPolicy::Fail => {
                            return Err(Error::GridCollision {
                                key,
                                first: first.clone(),
                                second: record.path.clone(),
                            });
                        }
                        CollisionPolicy::KeepLast => warn!(
                            "[{key}] from {} replaces {}",
                            record.path.display(),
                            first.display()
                        ),
                    }
                }
                builder.set(key, cell(record, direction, metric, config.percentile));
                owners.insert(key, record.path.clone());
            }
        }
    }

    let grid = builder.finish();
    debug!(
        "Grid has {} present and {} absent cells",
        grid.present_count(),
        grid.absent_count()
    );
    Ok(grid)
}

fn requested(params: &RunParams, config: &Config) -> bool {
    params.rw == config.rw
        && config.iodepth.contains(&params.iodepth)
        && config.numjobs.contains(&params.numjobs)
}

fn cell(
    record: &SummaryRecord,
    direction: Direction,
    metric: MetricKind,
    percentile: Option<f64>,
) -> Cell {
    let Some(stats) = record.metrics.get(&(direction, metric)) else {
        warn!("{}: no {direction} {metric} section", record.path.display());
        return Cell::Absent(AbsentReason::MissingSection);
    };
    match percentile {
        Some(p) if metric.is_latency() => match stats.percentile_at_or_above(p) {
            Some(value) => Cell::Present(Measurement {
                value,
                stddev: None,
            }),
            None => {
                warn!(
                    "{}: no {direction} {metric} percentile at or above {p}",
                    record.path.display()
                );
                Cell::Absent(AbsentReason::MissingPercentile)
            }
        },
        _ => Cell::Present(Measurement {
            value: stats.mean,
            stddev: stats.stddev,
        }),
    }
}

/// Latency distribution of one run from `json+` bins, as sorted `(us, count)` pairs.
pub fn histogram(
    record: &SummaryRecord,
    direction: Direction,
    metric: MetricKind,
) -> Option<&[(f64, u64)]> {
    let stats: &MetricRecord = record.metrics.get(&(direction, metric))?;
    (!stats.bins.is_empty()).then_some(stats.bins.as_slice())
}

/// Histograms for every requested latency metric and direction, keyed like grid cells.
pub fn histograms(
    records: &[SummaryRecord],
    config: &Config,
) -> BTreeMap<RunKey, Vec<(f64, u64)>> {
    let mut out = BTreeMap::new();
    for record in records.iter().sorted_by(|a, b| a.path.cmp(&b.path)) {
        let params = record.params;
        if !requested(&params, config) {
            continue;
        }
        for &direction in &config.filter {
            for &metric in config.metric_types.iter().filter(|x| x.is_latency()) {
                if let Some(bins) = histogram(record, direction, metric) {
                    let key = RunKey {
                        rw: params.rw,
                        direction,
                        metric,
                        iodepth: params.iodepth,
                        numjobs: params.numjobs,
                    };
                    out.insert(key, bins.to_vec());
                }
            }
        }
    }
    out
}
