//! Finds benchmark output files below the configured input directories.

use std::path::{Path, PathBuf};

use common::{
    config::{Config, SourceKind},
    error::{Error, Result},
};
use fio::{LogFileName, SummaryFileName};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Log(LogFileName),
    Summary(SummaryFileName),
}

/// A file whose name matches the requested run parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub path: PathBuf,
    pub kind: CandidateKind,
}

/// Fails unless every input path exists and is a directory.
pub fn validate_directories(dirs: &[PathBuf]) -> Result<()> {
    if dirs.is_empty() {
        return Err(Error::Configuration {
            field: "input_directory",
            reason: "no input directory given".to_owned(),
        });
    }
    for dir in dirs {
        if !dir.exists() {
            return Err(Error::Configuration {
                field: "input_directory",
                reason: format!("{} does not exist", dir.display()),
            });
        }
        if !dir.is_dir() {
            return Err(Error::Configuration {
                field: "input_directory",
                reason: format!("{} is not a directory", dir.display()),
            });
        }
    }
    Ok(())
}

/// Walks every input directory and returns the matching files, sorted by path and
/// without duplicates. No match is an empty result, not an error.
pub fn locate(config: &Config) -> Result<Vec<Candidate>> {
    validate_directories(&config.input_directory)?;

    let mut candidates = Vec::new();
    for dir in &config.input_directory {
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(dir.as_path()).to_path_buf();
                Error::Io {
                    path,
                    source: err.into(),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(kind) = classify(entry.path(), config) {
                candidates.push(Candidate {
                    path: entry.into_path(),
                    kind,
                });
            }
        }
    }
    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    candidates.dedup_by(|a, b| a.path == b.path);

    if candidates.is_empty() {
        info!(
            "No {:?} files for rw={} in {:?}",
            config.source, config.rw, config.input_directory
        );
    } else {
        debug!("Located {} files", candidates.len());
    }
    Ok(candidates)
}

/// Matches a file name against the naming convention of the configured source
/// kind and the requested run parameters.
fn classify(path: &Path, config: &Config) -> Option<CandidateKind> {
    let name = path.file_name()?.to_str()?;
    let kind = match config.source {
        SourceKind::Log => {
            let log = LogFileName::parse(name)?;
            let wanted = log.rw == config.rw
                && config.iodepth.contains(&log.iodepth)
                && config.numjobs.contains(&log.numjobs)
                && config.metric_types.contains(&log.metric);
            wanted.then_some(CandidateKind::Log(log))
        }
        SourceKind::Summary => {
            let summary = SummaryFileName::parse(name)?;
            let wanted = summary.rw == config.rw
                && config.iodepth.contains(&summary.iodepth)
                && config.numjobs.contains(&summary.numjobs);
            wanted.then_some(CandidateKind::Summary(summary))
        }
    };
    if kind.is_none() {
        debug!("Skipping {name}: outside the requested runs");
    }
    kind
}
