use std::path::PathBuf;

use anyhow::Result;

use crate::commands::{CommandReport, describe_pass};
use crate::exporter::batch::{FullPassOptions, run_full_pass};
use crate::exporter::config::{PartialExporterConfig, load_config};
use crate::exporter::notify::{NOTIFICATION_TITLE, exported_count_message, notify};
use crate::exporter::source::SqliteSource;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub db: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub meeting_id: Option<String>,
    pub force: bool,
}

pub fn run(opts: &ExportOptions) -> Result<CommandReport> {
    let flags = PartialExporterConfig {
        db: opts.db.as_ref().map(|p| p.display().to_string()),
        output: opts.output.as_ref().map(|p| p.display().to_string()),
        ..PartialExporterConfig::default()
    };
    let cfg = load_config(&flags)?.config;
    let mut report = CommandReport::new("export");
    report.detail(format!("db={}", cfg.db.display()));
    report.detail(format!("output={}", cfg.output.display()));

    let source = SqliteSource::open(&cfg.db)?;
    let pass = run_full_pass(
        &source,
        &cfg.output,
        &FullPassOptions {
            force: opts.force,
            meeting_id: opts.meeting_id.clone(),
        },
    )?;
    describe_pass(&mut report, "", &pass);

    if cfg.notify && pass.exported > 0 {
        notify(NOTIFICATION_TITLE, &exported_count_message(pass.exported));
    }
    Ok(report)
}
