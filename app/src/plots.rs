use std::{fmt::Write, path::PathBuf};

use chrono::Local;
use common::{
    config::{Config, SourceKind},
    dataset::{Dataset, Grid, MergedSeries, SeriesKey},
    plot::Plot,
};
use eyre::Result;
use serde::Serialize;

const PLOT_NAMES: [&str; 2] = ["table", "json"];

/// Resolves plot names given on the command line; the table is the default.
pub fn plots(names: &[String]) -> Result<Vec<Box<dyn Plot>>> {
    if names.is_empty() {
        return Ok(vec![Box::new(TablePlot)]);
    }
    let mut selected: Vec<Box<dyn Plot>> = Vec::new();
    for name in names {
        if selected.iter().any(|x| x.name() == name.as_str()) {
            continue;
        }
        selected.push(by_name(name)?);
    }
    Ok(selected)
}

fn by_name(name: &str) -> Result<Box<dyn Plot>> {
    Ok(match name {
        "table" => Box::new(TablePlot),
        "json" => Box::new(JsonPlot),
        _ => eyre::bail!("Unknown plot {name:?}, expected one of {PLOT_NAMES:?}"),
    })
}

/// Plain-text summary: per-series statistics for logs, depth x jobs matrices for grids.
#[derive(Debug)]
pub struct TablePlot;

impl Plot for TablePlot {
    fn name(&self) -> &'static str {
        "table"
    }

    fn plot(&self, dataset: &Dataset, config: &Config) -> Result<String> {
        let mut out = String::new();
        match dataset {
            Dataset::Series(series) => {
                for (key, merged) in series {
                    series_row(&mut out, key, merged)?;
                }
            }
            Dataset::Grid(grid) => grid_tables(&mut out, grid, config)?,
        }
        Ok(out)
    }
}

fn series_row(out: &mut String, key: &SeriesKey, merged: &MergedSeries) -> Result<()> {
    let unit = key.key.metric.unit();
    match merged.stats() {
        Some(stats) => writeln!(
            out,
            "{} [{}] n={} mean={:.3} min={:.3} max={:.3} stddev={:.3} {unit}",
            key.label,
            key.key,
            merged.len(),
            stats.mean,
            stats.min,
            stats.max,
            stats.stddev
        )?,
        None => writeln!(out, "{} [{}] n=0", key.label, key.key)?,
    }
    Ok(())
}

fn grid_tables(out: &mut String, grid: &Grid, config: &Config) -> Result<()> {
    for &direction in &config.filter {
        for &metric in &config.metric_types {
            let measure = match config.percentile {
                Some(p) if metric.is_latency() => format!("p{p}"),
                _ => "mean".to_owned(),
            };
            writeln!(
                out,
                "{} {direction} {metric} {measure} ({})",
                grid.rw(),
                metric.unit()
            )?;
            write!(out, "{:>8}", "depth")?;
            for jobs in grid.jobs() {
                write!(out, "{:>12}", format!("jobs={jobs}"))?;
            }
            writeln!(out)?;
            for (depth, row) in grid.depths().iter().zip(grid.matrix(direction, metric)) {
                write!(out, "{depth:>8}")?;
                for cell in row {
                    match cell {
                        Some(value) => write!(out, "{value:>12.3}")?,
                        None => write!(out, "{:>12}", "-")?,
                    }
                }
                writeln!(out)?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonDump<'a> {
    generated: String,
    source: SourceKind,
    config: ConfigEcho<'a>,
    dataset: &'a Dataset,
}

#[derive(Serialize)]
struct ConfigEcho<'a> {
    rw: String,
    percentile: Option<f64>,
    moving_average: Option<usize>,
    input_directory: &'a [PathBuf],
}

/// The whole dataset as JSON, for charting outside this tool.
#[derive(Debug)]
pub struct JsonPlot;

impl Plot for JsonPlot {
    fn name(&self) -> &'static str {
        "json"
    }

    fn plot(&self, dataset: &Dataset, config: &Config) -> Result<String> {
        let dump = JsonDump {
            generated: Local::now().to_rfc3339(),
            source: config.source,
            config: ConfigEcho {
                rw: config.rw.to_string(),
                percentile: config.percentile,
                moving_average: config.moving_average,
                input_directory: &config.input_directory,
            },
            dataset,
        };
        Ok(serde_json::to_string_pretty(&dump)?)
    }
}
