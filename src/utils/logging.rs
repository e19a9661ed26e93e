// src/utils/logging.rs
//! Logging setup for the miner
//!
//! Both entry points share one line format and write to stdout so hash-rate
//! lines, round changes and submission progress interleave in order.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Initializes logging for the `start` command
///
/// Defaults to `Info`; `RUST_LOG` takes precedence when set.
pub fn init_logging() {
    with_default_level(LevelFilter::Info).init();
}

/// Initializes logging for the `benchmark` command
///
/// Defaults to `Debug` so per-worker hash rates are visible.
pub fn init_bench_logging() {
    with_default_level(LevelFilter::Debug).init();
}

fn with_default_level(level: LevelFilter) -> Builder {
    let mut builder = common_log_config();
    match env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(level),
    };
    builder
}

/// Base builder: `[<ts> <level> <module>:<line>] <message>` on stdout
fn common_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_seconds();
            let level = record.level();
            let module = record.module_path().unwrap_or_default();
            let line = record.line().unwrap_or(0);

            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                ts,
                level,
                module,
                line,
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
