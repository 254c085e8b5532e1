pub mod config;
pub mod export;
pub mod status;
pub mod watch;

use serde::Serialize;

use crate::exporter::batch::PassReport;
use crate::exporter::reconcile::ExportOutcome;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Append the per-meeting lines and totals of a pass to `report`.
pub fn describe_pass(report: &mut CommandReport, prefix: &str, pass: &PassReport) {
    if pass.found == 0 {
        report.detail(format!("{prefix}no meetings with completed summaries found"));
        return;
    }
    for entry in &pass.outcomes {
        report.detail(match &entry.outcome {
            ExportOutcome::Skipped { filename } => format!("{prefix}skip {filename} (exists)"),
            ExportOutcome::Written { filename } => format!("{prefix}wrote {filename}"),
            ExportOutcome::Renamed { from, to } => format!("{prefix}rename {from} -> {to}"),
        });
    }
    report.detail(format!("{prefix}found={}", pass.found));
    report.detail(format!("{prefix}exported={}", pass.exported));
    report.detail(format!("{prefix}skipped={}", pass.skipped));
    report.detail(format!("{prefix}renamed={}", pass.renamed));
    if pass.rejected > 0 {
        report.detail(format!(
            "{prefix}rejected={} (unparseable created_at, see log)",
            pass.rejected
        ));
    }
}
