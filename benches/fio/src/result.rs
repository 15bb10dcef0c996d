use std::collections::{BTreeMap, HashMap};

use common::config::{Direction, MetricKind, RwMode};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A `--output-format=json` or `json+` result document. Only the parts the
/// dataset builder reads are modelled; everything else is ignored.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FioResult {
    #[serde(rename = "fio version")]
    pub fio_version: Option<String>,
    pub timestamp: Option<i64>,
    #[serde(rename = "global options", default)]
    pub global_options: HashMap<String, String>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub jobname: String,
    #[serde(default)]
    pub error: i64,
    #[serde(rename = "job options", default)]
    pub job_options: HashMap<String, String>,
    pub read: Option<DirectionStats>,
    pub write: Option<DirectionStats>,
    pub trim: Option<DirectionStats>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionStats {
    pub io_bytes: i64,
    pub total_ios: i64,
    /// KiB/s
    pub bw: f64,
    pub bw_dev: Option<f64>,
    pub iops: f64,
    pub iops_stddev: Option<f64>,
    pub runtime: i64,
    pub slat_ns: Option<LatencyStats>,
    pub clat_ns: Option<LatencyStats>,
    pub lat_ns: Option<LatencyStats>,
}

/// Nanosecond latency statistics.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    #[serde(rename = "N")]
    pub n: i64,
    /// Keyed like `"99.000000"`
    pub percentile: Option<BTreeMap<String, u64>>,
    /// Latency in ns -> completed I/Os, `json+` only
    pub bins: Option<BTreeMap<String, u64>>,
}

/// Run parameters a document was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    pub rw: RwMode,
    pub iodepth: u32,
    pub numjobs: u32,
}

impl FioResult {
    /// Reads `rw`, `iodepth` and `numjobs` from the first job's options, falling
    /// back to the global options. Missing depth and job counts default to 1 as in FIO.
    pub fn run_params(&self) -> Result<RunParams, String> {
        let job = self.jobs.first().ok_or("document has no jobs")?;
        self.job_params(job)
    }

    /// Parameters of one job: its own options over the global ones.
    pub fn job_params(&self, job: &Job) -> Result<RunParams, String> {
        let option = |name: &str| {
            job.job_options
                .get(name)
                .or_else(|| self.global_options.get(name))
                .map(|x| x.trim())
        };
        let rw = option("rw")
            .or_else(|| option("readwrite"))
            .ok_or("missing `rw` option")?;
        let rw = RwMode::from_fio(rw).ok_or_else(|| format!("unknown `rw` value {rw:?}"))?;
        let number = |name: &str| match option(name) {
            Some(value) => value
                .parse::<u32>()
                .map_err(|_| format!("`{name}` is not a positive integer: {value:?}")),
            None => Ok(1),
        };
        Ok(RunParams {
            rw,
            iodepth: number("iodepth")?,
            numjobs: number("numjobs")?,
        })
    }

    /// Jobs whose parameters differ from the first job's.
    pub fn mismatched_jobs(&self) -> Vec<&Job> {
        let Ok(first) = self.run_params() else {
            return Vec::new();
        };
        self.jobs
            .iter()
            .skip(1)
            .filter(|job| self.job_params(job) != Ok(first))
            .collect()
    }
}

/// Value at `requested`, or at the nearest listed percentile above it.
/// `table` holds `(percentile, value)` pairs sorted by percentile.
pub fn percentile_at_or_above<T: Copy>(table: &[(f64, T)], requested: f64) -> Option<T> {
    table
        .iter()
        .find(|(p, _)| (p - requested).abs() < 1e-9)
        .or_else(|| table.iter().find(|(p, _)| *p > requested))
        .map(|(_, v)| *v)
}

impl Job {
    pub fn direction(&self, direction: Direction) -> Option<&DirectionStats> {
        match direction {
            Direction::Read => self.read.as_ref(),
            Direction::Write => self.write.as_ref(),
            Direction::Trim => self.trim.as_ref(),
        }
    }
}

impl DirectionStats {
    /// Latency section for a latency-class metric, `None` for iops/bw.
    pub fn latency(&self, metric: MetricKind) -> Option<&LatencyStats> {
        match metric {
            MetricKind::Lat => self.lat_ns.as_ref(),
            MetricKind::Clat => self.clat_ns.as_ref(),
            MetricKind::Slat => self.slat_ns.as_ref(),
            MetricKind::Iops | MetricKind::Bw => None,
        }
    }
}

impl LatencyStats {
    /// Percentile table as sorted `(percentile, ns)` pairs; unparsable keys are dropped.
    pub fn percentiles(&self) -> Vec<(f64, u64)> {
        self.percentile
            .iter()
            .flatten()
            .filter_map(|(k, v)| k.trim().parse::<f64>().ok().map(|p| (p, *v)))
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .collect()
    }

    /// `json+` latency bins as sorted `(ns, count)` pairs.
    pub fn bins(&self) -> Vec<(u64, u64)> {
        self.bins
            .iter()
            .flatten()
            .filter_map(|(k, v)| k.trim().parse::<u64>().ok().map(|ns| (ns, *v)))
            .sorted()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "fio version": "fio-3.36",
        "timestamp": 1700000000,
        "global options": { "iodepth": "8", "direct": "1" },
        "jobs": [{
            "jobname": "randread-8-2",
            "error": 0,
            "job options": { "rw": "randread", "numjobs": "2" },
            "read": {
                "io_bytes": 4096, "total_ios": 1, "bw": 2048, "iops": 512.5, "runtime": 1000,
                "clat_ns": {
                    "min": 1000, "max": 90000, "mean": 12000.5, "stddev": 300.0, "N": 10,
                    "percentile": { "50.000000": 11000, "99.000000": 80000, "99.500000": 85000 },
                    "bins": { "20000": 3, "10000": 7 }
                }
            },
            "write": { "bw": 0, "iops": 0.0 }
        }]
    }"#;

    fn doc() -> FioResult {
        serde_json::from_str(DOC).unwrap()
    }

    #[test]
    fn tolerates_missing_sections() {
        let doc = doc();
        assert!(doc.jobs[0].trim.is_none());
        assert!(doc.jobs[0].write.as_ref().unwrap().clat_ns.is_none());
        assert_eq!(
            doc.jobs[0].direction(Direction::Read).unwrap().iops,
            512.5
        );
    }

    #[test]
    fn run_params_fall_back_to_global_options() {
        assert_eq!(
            doc().run_params().unwrap(),
            RunParams {
                rw: RwMode::Randread,
                iodepth: 8,
                numjobs: 2,
            }
        );
        assert!(FioResult::default().run_params().is_err());
    }

    #[test]
    fn percentile_lookup_prefers_exact_then_above() {
        let doc = doc();
        let clat = doc.jobs[0].read.as_ref().unwrap().clat_ns.as_ref().unwrap();
        let table = clat.percentiles();
        assert_eq!(percentile_at_or_above(&table, 99.0), Some(80000));
        assert_eq!(percentile_at_or_above(&table, 99.2), Some(85000));
        assert_eq!(percentile_at_or_above(&table, 99.9), None);
        assert_eq!(percentile_at_or_above(&[(50.0, 1.5)], 10.0), Some(1.5));
        assert_eq!(clat.bins(), vec![(10000, 7), (20000, 3)]);
    }

    #[test]
    fn jobs_with_other_parameters_are_reported() {
        let mut doc = doc();
        assert!(doc.mismatched_jobs().is_empty());

        let mut same = doc.jobs[0].clone();
        same.jobname = "same".to_owned();
        let mut deeper = doc.jobs[0].clone();
        deeper.jobname = "deeper".to_owned();
        deeper
            .job_options
            .insert("iodepth".to_owned(), "32".to_owned());
        doc.jobs.extend([same, deeper]);

        let mismatched = doc
            .mismatched_jobs()
            .into_iter()
            .map(|x| x.jobname.as_str())
            .collect::<Vec<_>>();
        assert_eq!(mismatched, ["deeper"]);
    }
}
