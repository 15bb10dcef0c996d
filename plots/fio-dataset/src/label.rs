use std::{
    collections::{HashMap, hash_map::Entry},
    fs,
    path::{self, Component, Path, PathBuf},
};

use common::{
    error::{Error, Result},
    util::truncate_chars,
};

/// Separator between the directory segments of a label.
pub const LABEL_SEPARATOR: &str = "/";

/// Directory a file lives in, resolved so `.` and `..` inputs still name real
/// directories. Falls back to the path as given when it cannot be resolved.
pub fn source_dir(file: &Path) -> PathBuf {
    let dir = match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::canonicalize(dir)
        .or_else(|_| path::absolute(dir))
        .unwrap_or_else(|_| dir.to_path_buf())
}

/// Builds a chart label from the directories a file lives in: the last
/// `depth + 1` directory names, each cut to `segment_size` characters.
pub fn derive_label(file: &Path, depth: usize, segment_size: usize) -> String {
    let dir = source_dir(file);
    let segments = dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>();
    let start = segments.len().saturating_sub(depth.saturating_add(1));
    segments[start..]
        .iter()
        .map(|x| truncate_chars(x, segment_size))
        .collect::<Vec<_>>()
        .join(LABEL_SEPARATOR)
}

/// Tracks which directory each label came from, so two directories never
/// end up drawn as one series.
#[derive(Debug, Default)]
pub struct LabelRegistry {
    owners: HashMap<String, PathBuf>,
}

impl LabelRegistry {
    pub fn register(&mut self, label: &str, file: &Path) -> Result<()> {
        let dir = source_dir(file);
        if label.is_empty() {
            return Err(Error::LabelCollision {
                label: label.to_owned(),
                first: dir.clone(),
                second: dir,
            });
        }
        match self.owners.entry(label.to_owned()) {
            Entry::Occupied(owner) if *owner.get() != dir => Err(Error::LabelCollision {
                label: label.to_owned(),
                first: owner.get().clone(),
                second: dir,
            }),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(dir);
                Ok(())
            }
        }
    }
}
