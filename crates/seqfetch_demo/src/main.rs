mod catalog;
mod config;
mod session;

use std::path::PathBuf;

use log::LevelFilter;
use seqfetch_logging::{seqfetch_info, LogDestination};

use crate::config::DemoConfig;

fn main() -> anyhow::Result<()> {
    let level = seqfetch_logging::level_from_env(LevelFilter::Info);
    seqfetch_logging::initialize(LogDestination::Terminal, level);

    let config = match std::env::args_os().nth(1) {
        Some(path) => DemoConfig::load(&PathBuf::from(path))?,
        None => DemoConfig::default(),
    };
    seqfetch_info!("running {} keystrokes", config.keystrokes.len());

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(session::run(&config))?;

    println!(
        "page {}/{} ({} rows total): {}",
        report.pagination.page_num,
        report.pagination.page_count(),
        report.pagination.total,
        report.rows
    );
    println!(
        "{} response(s) committed, {} stale response(s) discarded",
        report.committed, report.discarded
    );
    if let Some(error) = report.error {
        println!("last request failed: {error}");
    }
    Ok(())
}
