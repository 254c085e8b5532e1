use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::error::ExporterError;
use crate::exporter::filename::ClaimedNames;
use crate::exporter::identity::build_index;
use crate::exporter::reconcile::{ExportOutcome, ReconcileContext, reconcile};
use crate::exporter::source::{MeetingFilter, MeetingRecord, MeetingSource};

/// High-water mark of summary `updated_at` values already reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cursor(Option<String>);

impl Cursor {
    pub fn new(value: Option<String>) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Move forward to `candidate`; never moves backwards.
    pub fn advance(&mut self, candidate: &str) {
        if self.0.as_deref().is_none_or(|current| candidate > current) {
            self.0 = Some(candidate.to_string());
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FullPassOptions {
    pub force: bool,
    pub meeting_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub found: usize,
    pub exported: usize,
    pub skipped: usize,
    pub renamed: usize,
    /// Meetings left out because their `created_at` could not be parsed.
    pub rejected: usize,
    pub last_updated: Option<String>,
    pub outcomes: Vec<MeetingOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingOutcome {
    pub meeting_id: String,
    pub title: String,
    #[serde(flatten)]
    pub outcome: ExportOutcome,
}

impl PassReport {
    pub fn exported_titles(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.exported())
            .map(|o| o.title.as_str())
    }
}

fn is_bad_timestamp(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ExporterError>(),
        Some(ExporterError::InvalidTimestamp { .. })
    )
}

/// Reconcile a batch against a freshly scanned output directory.
///
/// The index and claimed names are rebuilt from disk every time: the
/// directory may have been edited by hand between passes.
fn reconcile_batch(
    source: &dyn MeetingSource,
    output_dir: &Path,
    force: bool,
    meetings: &[MeetingRecord],
) -> Result<PassReport> {
    let mut index = build_index(output_dir);
    let mut claimed = ClaimedNames::from_filenames(index.values());
    let ctx = ReconcileContext {
        source,
        output_dir,
        force,
    };

    let mut report = PassReport {
        found: meetings.len(),
        ..PassReport::default()
    };

    for meeting in meetings {
        let outcome = match reconcile(meeting, &ctx, &mut index, &mut claimed) {
            Ok(outcome) => outcome,
            Err(err) if is_bad_timestamp(&err) => {
                tracing::warn!(meeting_id = %meeting.id, "{err:#}");
                report.rejected += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        match &outcome {
            ExportOutcome::Skipped { .. } => report.skipped += 1,
            ExportOutcome::Written { .. } => report.exported += 1,
            ExportOutcome::Renamed { .. } => {
                report.exported += 1;
                report.renamed += 1;
            }
        }
        report.outcomes.push(MeetingOutcome {
            meeting_id: meeting.id.clone(),
            title: meeting.title.clone(),
            outcome,
        });
    }

    report.last_updated = meetings
        .iter()
        .map(|m| m.updated_at.as_str())
        .max()
        .map(ToOwned::to_owned);
    Ok(report)
}

/// Export every meeting with a completed summary (or just one, when
/// `meeting_id` is given). Nothing on disk is touched when the database
/// has no matching meetings.
pub fn run_full_pass(
    source: &dyn MeetingSource,
    output_dir: &Path,
    opts: &FullPassOptions,
) -> Result<PassReport> {
    let filter = match &opts.meeting_id {
        Some(id) => MeetingFilter::single(id.clone()),
        None => MeetingFilter::all(),
    };
    let meetings = source.completed_meetings(&filter)?;
    if meetings.is_empty() {
        tracing::info!("no meetings with completed summaries found");
        return Ok(PassReport::default());
    }

    tracing::info!(found = meetings.len(), "found meetings");
    let report = reconcile_batch(source, output_dir, opts.force, &meetings)?;
    tracing::info!(exported = report.exported, "exported meetings");
    Ok(report)
}

/// Export meetings whose summaries changed after `cursor`, then advance
/// the cursor to the newest `updated_at` in the batch, rejected rows
/// included. An empty fetch leaves both the cursor and the output directory
/// alone.
pub fn run_incremental_pass(
    source: &dyn MeetingSource,
    output_dir: &Path,
    cursor: &mut Cursor,
) -> Result<PassReport> {
    let meetings = source.completed_meetings(&MeetingFilter::since(cursor.value()))?;
    if meetings.is_empty() {
        return Ok(PassReport::default());
    }

    let report = reconcile_batch(source, output_dir, false, &meetings)?;
    if let Some(last) = &report.last_updated {
        cursor.advance(last);
    }
    Ok(report)
}
