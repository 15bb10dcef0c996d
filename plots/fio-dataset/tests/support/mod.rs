#![allow(dead_code)]

use std::{fs, path::Path};

use common::config::{Direction, MetricKind, RawConfig, RwMode, SourceKind};

pub fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Log rows for one direction at the given timestamps.
pub fn log_rows(direction: u8, points: &[(u64, f64)]) -> String {
    points
        .iter()
        .map(|(t, v)| format!("{t}, {v}, {direction}, 4096, 0\n"))
        .collect()
}

/// A `json+` document with a read section carrying every latency metric.
pub fn summary_doc(rw: &str, iodepth: u32, numjobs: u32, iops: f64, p99_ns: u64) -> String {
    let latency = format!(
        r#"{{"min": 100, "max": 90000, "mean": 5000, "stddev": 10,
             "N": 100, "percentile": {{"50.000000": 4000, "99.000000": {p99_ns}}},
             "bins": {{"4000": 60, "{p99_ns}": 40}}}}"#
    );
    format!(
        r#"{{
            "fio version": "fio-3.36",
            "global options": {{"iodepth": "{iodepth}", "numjobs": "{numjobs}"}},
            "jobs": [{{
                "jobname": "{rw}-{iodepth}-{numjobs}",
                "error": 0,
                "job options": {{"rw": "{rw}"}},
                "read": {{
                    "bw": 4096, "iops": {iops}, "iops_stddev": 2.0, "bw_dev": 16.0,
                    "lat_ns": {latency}, "clat_ns": {latency}, "slat_ns": {latency}
                }}
            }}]
        }}"#
    )
}

pub fn raw(dir: &Path, source: SourceKind) -> RawConfig {
    RawConfig {
        input_directory: Some(vec![dir.to_path_buf()]),
        source: Some(source),
        rw: Some(RwMode::Randread),
        filter: Some(vec![Direction::Read]),
        metric_types: Some(vec![MetricKind::Lat]),
        iodepth: Some(vec![1]),
        numjobs: Some(vec![1]),
        ..Default::default()
    }
}
