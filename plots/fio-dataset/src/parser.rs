//! Turns one located file into records the merger or flattener consume.
//!
//! Both parsers hand out values already normalized per [`MetricKind`], so the
//! downstream stages never look at FIO units or file layouts.

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};

use common::{
    config::{Config, Direction, MetricKind},
    dataset::{RunKey, Sample, Series},
    error::{Error, Result, RowError},
    util::{mean, open_file, pooled_stddev, read_json_file},
};
use fio::{
    SummaryFileName,
    log::{LogRow, reader},
    result::{DirectionStats, FioResult, Job, RunParams, percentile_at_or_above},
};
use tracing::{debug, warn};

use crate::{
    label::derive_label,
    locator::{Candidate, CandidateKind},
};

/// Malformed rows reported individually before only the total is logged.
const ROW_WARNINGS: usize = 5;

pub trait RecordParser {
    type Record;

    fn parse(&self, candidate: &Candidate) -> Result<Self::Record>;
}

/// Reads per-interval log files into one [`Series`] per requested direction.
#[derive(Debug)]
pub struct LogParser<'a> {
    config: &'a Config,
}

impl<'a> LogParser<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }
}

impl RecordParser for LogParser<'_> {
    type Record = Vec<Series>;

    fn parse(&self, candidate: &Candidate) -> Result<Vec<Series>> {
        let CandidateKind::Log(name) = candidate.kind else {
            return Err(parse_error(candidate, "not a log file"));
        };
        let path = &candidate.path;
        let mut rdr = reader(open_file(path)?);

        let mut samples: BTreeMap<Direction, Vec<Sample>> = BTreeMap::new();
        let mut usable = 0usize;
        let mut skipped = 0usize;
        let mut first_error = None;
        for (idx, record) in rdr.records().enumerate() {
            let row_number = idx + 1;
            let row = record
                .map_err(|err| RowError::NotNumeric {
                    column: "row",
                    value: err.to_string(),
                })
                .and_then(|record| LogRow::parse(&record))
                .and_then(|row| {
                    let previous = samples
                        .get(&row.direction)
                        .and_then(|x| x.last())
                        .map(|x| x.timestamp);
                    match previous {
                        Some(previous) if row.time_ms < previous => Err(RowError::OutOfOrder {
                            timestamp: row.time_ms,
                            previous,
                        }),
                        _ => Ok(row),
                    }
                });
            match row {
                Ok(row) => {
                    usable += 1;
                    if self.config.filter.contains(&row.direction) {
                        samples
                            .entry(row.direction)
                            .or_default()
                            .push(Sample::new(row.time_ms, name.metric.normalize(row.value)));
                    }
                }
                Err(err) => {
                    skipped += 1;
                    if skipped <= ROW_WARNINGS {
                        warn!("{}: skipping row {row_number}: {err}", path.display());
                    }
                    first_error.get_or_insert((row_number, err));
                }
            }
        }

        if usable == 0 {
            let detail = match first_error {
                Some((row, err)) => {
                    format!("no usable rows, {skipped} malformed (first at row {row}: {err})")
                }
                None => "file is empty".to_owned(),
            };
            return Err(parse_error(candidate, detail));
        }
        if skipped > ROW_WARNINGS {
            warn!("{}: skipped {skipped} malformed rows in total", path.display());
        }

        let label = derive_label(
            path,
            self.config.label_depth,
            self.config.label_segment_size,
        );
        let series = samples
            .into_iter()
            .map(|(direction, samples)| Series {
                label: label.clone(),
                key: RunKey {
                    rw: name.rw,
                    direction,
                    metric: name.metric,
                    iodepth: name.iodepth,
                    numjobs: name.numjobs,
                },
                source: path.clone(),
                samples,
            })
            .collect::<Vec<_>>();
        if series.is_empty() {
            debug!(
                "{}: {usable} rows, none in directions {:?}",
                path.display(),
                self.config.filter
            );
        }
        Ok(series)
    }
}

/// One metric of one direction, normalized and aggregated over a document's jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub mean: f64,
    pub stddev: Option<f64>,
    /// Sorted `(percentile, value)` pairs
    pub percentiles: Vec<(f64, f64)>,
    /// Sorted `(value, count)` pairs
    pub bins: Vec<(f64, u64)>,
}

impl MetricRecord {
    /// Exact percentile if listed, else the nearest one above it.
    pub fn percentile_at_or_above(&self, requested: f64) -> Option<f64> {
        percentile_at_or_above(&self.percentiles, requested)
    }
}

/// A parsed summary document reduced to its normalized metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub path: PathBuf,
    pub params: RunParams,
    pub metrics: BTreeMap<(Direction, MetricKind), MetricRecord>,
}

#[derive(Debug, Default)]
pub struct SummaryParser;

impl RecordParser for SummaryParser {
    type Record = SummaryRecord;

    fn parse(&self, candidate: &Candidate) -> Result<SummaryRecord> {
        let CandidateKind::Summary(name) = candidate.kind else {
            return Err(parse_error(candidate, "not a summary document"));
        };
        let result: FioResult = read_json_file(&candidate.path)?;
        let params = result
            .run_params()
            .map_err(|detail| parse_error(candidate, detail))?;
        let described = SummaryFileName {
            rw: params.rw,
            iodepth: params.iodepth,
            numjobs: params.numjobs,
        };
        if described != name {
            warn!(
                "{}: document describes {}; using the document",
                candidate.path.display(),
                described.file_name()
            );
        }
        for job in result.mismatched_jobs() {
            warn!(
                "{}: job {} ran with other parameters than {}, aggregating it anyway",
                candidate.path.display(),
                job.jobname,
                described.file_name()
            );
        }
        for job in result.jobs.iter().filter(|x| x.error != 0) {
            warn!(
                "{}: job {} reported error {}",
                candidate.path.display(),
                job.jobname,
                job.error
            );
        }

        let mut metrics = BTreeMap::new();
        for direction in [Direction::Read, Direction::Write, Direction::Trim] {
            let sections = result
                .jobs
                .iter()
                .filter_map(|job: &Job| job.direction(direction))
                .collect::<Vec<_>>();
            if sections.is_empty() {
                continue;
            }
            for metric in MetricKind::ALL {
                if let Some(record) = metric_record(&sections, metric) {
                    metrics.insert((direction, metric), record);
                }
            }
        }

        Ok(SummaryRecord {
            path: candidate.path.clone(),
            params,
            metrics,
        })
    }
}

/// Aggregates one metric over the jobs of a document: throughput is summed,
/// latencies are averaged. `None` when no job carries the section.
fn metric_record(sections: &[&DirectionStats], metric: MetricKind) -> Option<MetricRecord> {
    if !metric.is_latency() {
        let (values, stddevs): (Vec<f64>, Vec<Option<f64>>) = sections
            .iter()
            .map(|x| match metric {
                MetricKind::Iops => (x.iops, x.iops_stddev),
                _ => (x.bw, x.bw_dev),
            })
            .unzip();
        let stddevs = stddevs.into_iter().collect::<Option<Vec<_>>>();
        return Some(MetricRecord {
            mean: metric.normalize(values.iter().sum()),
            // variances of independent jobs add up
            stddev: stddevs
                .map(|x| metric.normalize(x.iter().map(|s| s * s).sum::<f64>().sqrt())),
            percentiles: Vec::new(),
            bins: Vec::new(),
        });
    }

    let stats = sections
        .iter()
        .filter_map(|x| x.latency(metric))
        .collect::<Vec<_>>();
    if stats.is_empty() {
        return None;
    }
    let means = stats.iter().map(|x| x.mean).collect::<Vec<_>>();
    let stddevs = stats.iter().map(|x| x.stddev).collect::<Vec<_>>();

    // fio prints 6 decimals, so this is lossless as a map key
    let mut percentiles: BTreeMap<u64, (f64, Vec<f64>)> = BTreeMap::new();
    for table in stats.iter().map(|x| x.percentiles()) {
        for (p, ns) in table {
            percentiles
                .entry((p * 1_000_000.0).round() as u64)
                .or_insert_with(|| (p, Vec::new()))
                .1
                .push(ns as f64);
        }
    }
    let mut bins: HashMap<u64, u64> = HashMap::new();
    for (ns, count) in stats.iter().flat_map(|x| x.bins()) {
        *bins.entry(ns).or_default() += count;
    }
    let mut bins = bins
        .into_iter()
        .map(|(ns, count)| (metric.normalize(ns as f64), count))
        .collect::<Vec<_>>();
    bins.sort_by(|a, b| a.0.total_cmp(&b.0));

    Some(MetricRecord {
        mean: metric.normalize(mean(&means)?),
        stddev: pooled_stddev(&stddevs).map(|x| metric.normalize(x)),
        percentiles: percentiles
            .into_values()
            .filter_map(|(p, values)| Some((p, metric.normalize(mean(&values)?))))
            .collect(),
        bins,
    })
}

fn parse_error(candidate: &Candidate, detail: impl Into<String>) -> Error {
    Error::Parse {
        path: candidate.path.clone(),
        detail: detail.into(),
    }
}
