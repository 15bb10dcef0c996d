use std::sync::LazyLock;

use common::config::{MetricKind, RwMode};
use regex::Regex;

pub mod log;
pub mod result;

static LOG_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<rw>[a-z]+)-iodepth-(?P<depth>\d+)-numjobs-(?P<jobs>\d+)_(?P<kind>iops|bw|lat|clat|slat)\.(?P<job>\d+)\.log$",
    )
    .unwrap()
});

static SUMMARY_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<rw>[a-z]+)-(?P<depth>\d+)-(?P<jobs>\d+)\.json$").unwrap());

/// Parameters encoded in a log file name such as `randread-iodepth-8-numjobs-2_clat.1.log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogFileName {
    pub rw: RwMode,
    pub iodepth: u32,
    pub numjobs: u32,
    pub metric: MetricKind,
    /// 1-based FIO job index
    pub job: u32,
}

impl LogFileName {
    pub fn parse(name: &str) -> Option<Self> {
        let caps = LOG_FILE_RE.captures(name)?;
        Some(LogFileName {
            rw: RwMode::from_fio(&caps["rw"])?,
            iodepth: caps["depth"].parse().ok()?,
            numjobs: caps["jobs"].parse().ok()?,
            metric: caps["kind"].parse().ok()?,
            job: caps["job"].parse().ok()?,
        })
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}-iodepth-{}-numjobs-{}_{}.{}.log",
            self.rw, self.iodepth, self.numjobs, self.metric, self.job
        )
    }
}

/// Parameters encoded in a summary file name such as `randread-8-2.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SummaryFileName {
    pub rw: RwMode,
    pub iodepth: u32,
    pub numjobs: u32,
}

impl SummaryFileName {
    pub fn parse(name: &str) -> Option<Self> {
        let caps = SUMMARY_FILE_RE.captures(name)?;
        Some(SummaryFileName {
            rw: RwMode::from_fio(&caps["rw"])?,
            iodepth: caps["depth"].parse().ok()?,
            numjobs: caps["jobs"].parse().ok()?,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}-{}.json", self.rw, self.iodepth, self.numjobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_names() {
        let name = LogFileName::parse("randrw-iodepth-16-numjobs-4_clat.3.log").unwrap();
        assert_eq!(
            name,
            LogFileName {
                rw: RwMode::RandReadWrite,
                iodepth: 16,
                numjobs: 4,
                metric: MetricKind::Clat,
                job: 3,
            }
        );
        assert_eq!(name.file_name(), "randrw-iodepth-16-numjobs-4_clat.3.log");
    }

    #[test]
    fn ignores_foreign_names() {
        for name in [
            "randread-iodepth-1-numjobs-1_clat.1.log.gz",
            "randread-iodepth-1-numjobs-1_foo.1.log",
            "seq-iodepth-1-numjobs-1_bw.1.log",
            "randread-iodepth-99999999999-numjobs-1_bw.1.log",
            "results.json",
        ] {
            assert_eq!(LogFileName::parse(name), None, "{name}");
        }
        assert_eq!(SummaryFileName::parse("results.json"), None);
    }

    #[test]
    fn parses_summary_names() {
        assert_eq!(
            SummaryFileName::parse("write-32-8.json"),
            Some(SummaryFileName {
                rw: RwMode::Write,
                iodepth: 32,
                numjobs: 8,
            })
        );
        let name = SummaryFileName::parse("randrw-4-2.json").unwrap();
        assert_eq!(name.file_name(), "randrw-4-2.json");
    }
}
