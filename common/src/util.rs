use std::{fs::File, io::BufReader, path::Path};

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation
pub fn stddev(data: &[f64]) -> Option<f64> {
    let mean = mean(data)?;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// Pools per-job standard deviations of equally sized samples.
pub fn pooled_stddev(stddevs: &[f64]) -> Option<f64> {
    let squares = stddevs.iter().map(|x| x * x).collect::<Vec<_>>();
    mean(&squares).map(f64::sqrt)
}

/// Keeps at most `max` characters, never splitting one.
pub fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

pub fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(open_file(path)?);
    serde_json::from_reader(reader).map_err(|err| Error::Parse {
        path: path.to_path_buf(),
        detail: format!("line {} column {}: {err}", err.line(), err.column()),
    })
}
