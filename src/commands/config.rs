use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::commands::CommandReport;
use crate::exporter::config::{
    PartialExporterConfig, load_config, load_file_layer, resolve_config_path, save_file_layer,
};

#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub db: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub interval: Option<u64>,
    pub notify: Option<bool>,
}

pub fn run(opts: &ConfigOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("config");
    if opts.interval == Some(0) {
        report.issue("invalid poll interval: must be >= 1 second");
        return Ok(report);
    }
    let path = resolve_config_path().context("HOME directory could not be resolved")?;

    let updates = PartialExporterConfig {
        db: opts.db.as_ref().map(|p| p.display().to_string()),
        output: opts.output.as_ref().map(|p| p.display().to_string()),
        interval: opts.interval,
        notify: opts.notify,
    };
    if !updates.is_empty() {
        let mut stored = load_file_layer(&path)?;
        stored.merge_from(&updates);
        save_file_layer(&path, &stored)?;
        report.detail(format!("config saved to {}", path.display()));
    }

    let resolved = load_config(&PartialExporterConfig::default())?;
    let cfg = &resolved.config;
    let origins = &resolved.origins;
    report.detail(format!("db = {} ({})", cfg.db.display(), origins.db));
    report.detail(format!("output = {} ({})", cfg.output.display(), origins.output));
    report.detail(format!("interval = {} ({})", cfg.interval_secs, origins.interval));
    report.detail(format!("notify = {} ({})", cfg.notify, origins.notify));

    Ok(report)
}
