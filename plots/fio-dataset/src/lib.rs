//! Builds chart-ready datasets from FIO output.
//!
//! `locate -> parse -> merge | flatten -> Dataset`. Files are parsed in
//! parallel; merging and flattening run on a single thread so every label and
//! grid cell has exactly one writer.

use std::collections::BTreeMap;

use common::{
    config::{Config, SourceKind},
    dataset::{Dataset, RunKey},
    error::{Error, Result},
};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info};

pub mod flatten;
pub mod label;
pub mod locator;
pub mod merge;
pub mod parser;

use locator::Candidate;
use parser::{LogParser, RecordParser, SummaryParser, SummaryRecord};

/// Runs the whole pipeline for one configuration. No matching files gives an
/// empty dataset; the first file that fails to parse aborts the run.
pub fn build_dataset(config: &Config) -> Result<Dataset> {
    let candidates = locator::locate(config)?;
    let dataset = match config.source {
        SourceKind::Log => {
            let series = parse_all(&LogParser::new(config), &candidates)?
                .into_iter()
                .flatten()
                .collect::<Vec<_>>();
            debug!("Parsed {} series", series.len());
            Dataset::Series(merge::merge(series, config)?)
        }
        SourceKind::Summary => {
            let records = parse_all(&SummaryParser, &candidates)?;
            Dataset::Grid(flatten::flatten(&records, config)?)
        }
    };
    if dataset.is_empty() {
        info!("No data for rw={} in {:?}", config.rw, config.input_directory);
    }
    Ok(dataset)
}

/// Latency histograms from `json+` summary documents, keyed like grid cells.
pub fn build_histograms(config: &Config) -> Result<BTreeMap<RunKey, Vec<(f64, u64)>>> {
    if config.source != SourceKind::Summary {
        return Err(Error::Configuration {
            field: "source",
            reason: "histograms are read from summary documents".to_owned(),
        });
    }
    let candidates = locator::locate(config)?;
    let records: Vec<SummaryRecord> = parse_all(&SummaryParser, &candidates)?;
    Ok(flatten::histograms(&records, config))
}

fn parse_all<P>(parser: &P, candidates: &[Candidate]) -> Result<Vec<P::Record>>
where
    P: RecordParser + Sync,
    P::Record: Send,
{
    candidates
        .par_iter()
        .map(|candidate| parser.parse(candidate))
        .collect()
}
