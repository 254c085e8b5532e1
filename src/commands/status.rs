use anyhow::Result;

use crate::commands::CommandReport;
use crate::exporter::config::{PartialExporterConfig, load_config};

pub fn run() -> Result<CommandReport> {
    let resolved = load_config(&PartialExporterConfig::default())?;
    let cfg = &resolved.config;
    let mut report = CommandReport::new("status");

    match &resolved.file_path {
        Some(path) => report.detail(format!("config_file={}", path.display())),
        None => report.detail("config_file=none"),
    }
    report.detail(format!("db={}", cfg.db.display()));
    report.detail(format!("output={}", cfg.output.display()));
    report.detail(format!("interval_secs={}", cfg.interval_secs));
    report.detail(format!("notify={}", cfg.notify));

    if !cfg.db.is_file() {
        report.issue(format!("missing Meetily database ({})", cfg.db.display()));
    }
    if !cfg.output.exists() {
        report.detail("output dir does not exist yet; the first export creates it");
    }

    Ok(report)
}
