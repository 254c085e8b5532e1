use std::path::PathBuf;

use anyhow::Result;

use crate::commands::{CommandReport, describe_pass};
use crate::exporter::config::{PartialExporterConfig, load_config};
use crate::exporter::watcher::Watcher;

#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub db: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub interval: Option<u64>,
    pub once: bool,
}

pub fn run(opts: &WatchOptions) -> Result<CommandReport> {
    let flags = PartialExporterConfig {
        db: opts.db.as_ref().map(|p| p.display().to_string()),
        output: opts.output.as_ref().map(|p| p.display().to_string()),
        interval: opts.interval,
        ..PartialExporterConfig::default()
    };
    let cfg = load_config(&flags)?.config;
    let mut report = CommandReport::new("watch");
    report.detail(format!("db={}", cfg.db.display()));
    report.detail(format!("output={}", cfg.output.display()));
    report.detail(format!("interval_secs={}", cfg.interval_secs));

    tracing::info!(
        interval_secs = cfg.interval_secs,
        output = %cfg.output.display(),
        "watching for new meetings"
    );
    let mut watcher = Watcher::new(&cfg);
    let initial = watcher.start()?;
    describe_pass(&mut report, "initial.", &initial);
    report.detail(format!(
        "cursor={}",
        watcher.cursor().value().unwrap_or("none")
    ));

    if opts.once {
        return Ok(report);
    }

    watcher.run_forever()?;
    Ok(report)
}
