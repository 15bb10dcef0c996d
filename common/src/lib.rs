pub mod config;
pub mod dataset;
pub mod error;
pub mod plot;
pub mod util;

/// FIO reports latencies in nanoseconds; everything downstream works in microseconds.
pub const NS_PER_US: f64 = 1_000.0;
/// FIO reports bandwidth in KiB/s; everything downstream works in MiB/s.
pub const KIB_PER_MIB: f64 = 1_024.0;
