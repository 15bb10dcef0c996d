//! Combines the log series of one label into a single time-aligned series.
//!
//! Every group walks `Collecting -> Aligned -> Smoothed -> MergedSeries`; each
//! stage consumes the previous one, so no stage can be skipped or revisited.

use std::{
    collections::{BTreeMap, btree_map::Entry},
    path::PathBuf,
};

use common::{
    config::{Aggregation, Alignment, Config},
    dataset::{MergedSeries, RunKey, Sample, Series, SeriesKey},
    error::Result,
    util::mean,
};
use tracing::{debug, warn};

use crate::label::LabelRegistry;

/// Raw series of one `(label, RunKey)` group, as they come out of the parser.
#[derive(Debug)]
pub struct Collecting {
    label: String,
    key: RunKey,
    series: Vec<Series>,
}

/// Series joined on equal timestamps.
#[derive(Debug)]
pub struct Aligned {
    label: String,
    key: RunKey,
    sources: Vec<PathBuf>,
    samples: Vec<Sample>,
}

#[derive(Debug)]
pub struct Smoothed {
    label: String,
    key: RunKey,
    sources: Vec<PathBuf>,
    window: Option<usize>,
    samples: Vec<Sample>,
}

impl Collecting {
    pub fn new(label: String, key: RunKey) -> Self {
        Self {
            label,
            key,
            series: Vec::new(),
        }
    }

    pub fn push(&mut self, series: Series) {
        debug_assert_eq!(series.key, self.key);
        self.series.push(series);
    }

    /// Strict-equality join on timestamps. With [`Alignment::Intersection`] a
    /// timestamp missing from any series is dropped; with [`Alignment::Union`]
    /// it is kept and aggregated over the series that have it.
    pub fn align(self, alignment: Alignment, aggregation: Aggregation) -> Aligned {
        let total = self.series.len();
        let mut joined: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
        let mut sources = Vec::with_capacity(total);
        for series in self.series {
            for (timestamp, value) in collapse_duplicates(&series.samples) {
                joined.entry(timestamp).or_default().push(value);
            }
            sources.push(series.source);
        }

        let before = joined.len();
        let samples = joined
            .into_iter()
            .filter(|(_, values)| alignment == Alignment::Union || values.len() == total)
            .filter_map(|(timestamp, values)| {
                let value = match aggregation {
                    Aggregation::Mean => mean(&values)?,
                    Aggregation::Sum => values.iter().sum(),
                };
                Some(Sample::new(timestamp, value))
            })
            .collect::<Vec<_>>();
        if samples.len() < before {
            debug!(
                "{} [{}]: dropped {} timestamps not shared by all {total} series",
                self.label,
                self.key,
                before - samples.len()
            );
        }

        Aligned {
            label: self.label,
            key: self.key,
            sources,
            samples,
        }
    }
}

impl Aligned {
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Applies a trailing moving average, or passes values through for `None`.
    pub fn smooth(self, window: Option<usize>) -> Smoothed {
        let samples = match window {
            Some(window) => {
                let values = self.samples.iter().map(|x| x.value).collect::<Vec<_>>();
                self.samples
                    .iter()
                    .zip(moving_average(&values, window))
                    .map(|(sample, value)| Sample::new(sample.timestamp, value))
                    .collect()
            }
            None => self.samples,
        };
        Smoothed {
            label: self.label,
            key: self.key,
            sources: self.sources,
            window,
            samples,
        }
    }
}

impl Smoothed {
    pub fn finalize(self) -> MergedSeries {
        MergedSeries::new(
            self.label,
            self.key,
            self.sources,
            self.window,
            self.samples,
        )
    }
}

/// Trailing mean over `window` values. The first `window - 1` outputs average
/// over the shorter prefix available instead of being dropped.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|idx| {
            let start = (idx + 1).saturating_sub(window);
            let slice = &values[start..=idx];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Averages samples sharing a timestamp; input must be non-decreasing.
fn collapse_duplicates(samples: &[Sample]) -> Vec<(u64, f64)> {
    samples
        .chunk_by(|a, b| a.timestamp == b.timestamp)
        .map(|chunk| {
            let sum = chunk.iter().map(|x| x.value).sum::<f64>();
            (chunk[0].timestamp, sum / chunk.len() as f64)
        })
        .collect()
}

/// Groups series by `(label, RunKey)` and merges each group. Labels must map to
/// exactly one directory.
pub fn merge(series: Vec<Series>, config: &Config) -> Result<BTreeMap<SeriesKey, MergedSeries>> {
    let mut registry = LabelRegistry::default();
    let mut groups: BTreeMap<SeriesKey, Collecting> = BTreeMap::new();
    for item in series {
        registry.register(&item.label, &item.source)?;
        let key = SeriesKey {
            label: item.label.clone(),
            key: item.key,
        };
        match groups.entry(key) {
            Entry::Occupied(mut group) => group.get_mut().push(item),
            Entry::Vacant(slot) => {
                let mut group = Collecting::new(item.label.clone(), item.key);
                group.push(item);
                slot.insert(group);
            }
        }
    }

    let merged = groups
        .into_iter()
        .map(|(key, group)| {
            let merged = group
                .align(config.alignment, config.aggregation)
                .smooth(config.moving_average)
                .finalize();
            if merged.is_empty() {
                warn!(
                    "{} [{}]: no timestamps left after alignment",
                    key.label, key.key
                );
            }
            (key, merged)
        })
        .collect::<BTreeMap<_, _>>();
    debug!("Merged {} series", merged.len());
    Ok(merged)
}
