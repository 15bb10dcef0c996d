use core::fmt::Debug;

use eyre::Result;
use tracing::debug;

use crate::{config::Config, dataset::Dataset};

/// A presentation collaborator. Receives the finished [`Dataset`] and only formats it.
pub trait Plot: Debug + Send + Sync {
    /// Name used to select this plot on the command line
    fn name(&self) -> &'static str;
    /// Renders the dataset
    ///
    /// Arguments:
    /// * `dataset` - The finished, read-only dataset
    /// * `config` - The configuration the dataset was built with, for titles and units
    fn plot(&self, dataset: &Dataset, config: &Config) -> Result<String>;
}

/// Runs every plot over the same dataset, in order.
pub fn plot(
    plots: &[Box<dyn Plot>],
    dataset: &Dataset,
    config: &Config,
) -> Result<Vec<(&'static str, String)>> {
    if plots.is_empty() {
        debug!("No plots");
        return Ok(Vec::new());
    }

    plots
        .iter()
        .map(|plot| {
            debug!("Running plot {}", plot.name());
            Ok((plot.name(), plot.plot(dataset, config)?))
        })
        .collect()
}
