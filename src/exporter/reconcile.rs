use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::ExporterError;
use crate::exporter::filename::{ClaimedNames, allocate};
use crate::exporter::identity::{IdentityIndex, read_identity};
use crate::exporter::render::render_document;
use crate::exporter::source::{MeetingRecord, MeetingSource};
use crate::exporter::util::parse_timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExportOutcome {
    Skipped { filename: String },
    Written { filename: String },
    Renamed { from: String, to: String },
}

impl ExportOutcome {
    /// Whether a document was written to disk.
    pub fn exported(&self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }

    #[cfg(test)]
    pub fn filename(&self) -> &str {
        match self {
            Self::Skipped { filename } | Self::Written { filename } => filename,
            Self::Renamed { to, .. } => to,
        }
    }
}

pub struct ReconcileContext<'a> {
    pub source: &'a dyn MeetingSource,
    pub output_dir: &'a Path,
    pub force: bool,
}

/// Delete the document a meeting used to live in, unless something else
/// has taken over that filename since the index was built.
fn remove_previous(output_dir: &Path, filename: &str, meeting_id: &str) -> Result<()> {
    let path = output_dir.join(filename);
    match read_identity(&path) {
        Some(id) if id == meeting_id => {}
        None if !path.exists() => return Ok(()),
        _ => {
            tracing::warn!(
                file = %filename,
                meeting_id,
                "previous document no longer carries this meeting id; leaving it in place"
            );
            return Ok(());
        }
    }

    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// Bring one meeting's document in line with the database.
///
/// Already-exported meetings are skipped unless `force` is set. Otherwise
/// the meeting's previous name is released, a fresh name is allocated and
/// the document is written. A previous file under a different name is
/// removed only once the new one is on disk. `index` and `claimed` are
/// updated so later meetings in the same pass see this decision.
pub fn reconcile(
    meeting: &MeetingRecord,
    ctx: &ReconcileContext<'_>,
    index: &mut IdentityIndex,
    claimed: &mut ClaimedNames,
) -> Result<ExportOutcome> {
    let previous = index.get(&meeting.id).cloned();
    if let Some(filename) = &previous {
        if !ctx.force {
            tracing::info!(file = %filename, "skip (exists)");
            return Ok(ExportOutcome::Skipped {
                filename: filename.clone(),
            });
        }
    }

    let created_at =
        parse_timestamp(&meeting.created_at).ok_or_else(|| ExporterError::InvalidTimestamp {
            meeting_id: meeting.id.clone(),
            value: meeting.created_at.clone(),
        })?;
    let transcript = ctx.source.transcript(&meeting.id)?;
    let document = render_document(meeting, &transcript);

    if let Some(old) = &previous {
        claimed.release(old);
    }
    let filename = allocate(&meeting.title, &created_at, &meeting.id, claimed);
    claimed.claim(&filename);

    fs::create_dir_all(ctx.output_dir)
        .with_context(|| format!("failed to create {}", ctx.output_dir.display()))?;
    let path = ctx.output_dir.join(&filename);

    // A case-only rename may name the same file on case-insensitive
    // filesystems: move it instead of writing and then deleting.
    let case_renamed_from = previous
        .as_deref()
        .filter(|old| *old != filename && old.to_lowercase() == filename.to_lowercase());
    if let Some(old) = case_renamed_from {
        let old_path = ctx.output_dir.join(old);
        match fs::rename(&old_path, &path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to rename {} to {}", old_path.display(), path.display())
                });
            }
        }
    }

    fs::write(&path, document).with_context(|| format!("failed to write {}", path.display()))?;
    index.insert(meeting.id.clone(), filename.clone());
    tracing::info!(file = %filename, "wrote");

    match previous.as_deref() {
        Some(old) if old != filename => {
            if case_renamed_from.is_none() {
                remove_previous(ctx.output_dir, old, &meeting.id)?;
            }
            tracing::info!(from = %old, to = %filename, "rename");
            Ok(ExportOutcome::Renamed {
                from: old.to_string(),
                to: filename,
            })
        }
        _ => Ok(ExportOutcome::Written { filename }),
    }
}

#[cfg(test)]
mod tests {
    use super::{ExportOutcome, ReconcileContext, reconcile};
    use crate::error::ExporterError;
    use crate::exporter::filename::ClaimedNames;
    use crate::exporter::identity::{IdentityIndex, build_index, read_identity};
    use crate::exporter::source::fixtures::meetily_source;
    use crate::exporter::source::{
        MeetingFilter, MeetingRecord, MeetingSource, TranscriptSegment,
    };
    use anyhow::{Result, bail};
    use std::fs;
    use tempfile::tempdir;

    /// Source whose transcript reads always fail.
    struct BrokenTranscripts;

    impl MeetingSource for BrokenTranscripts {
        fn completed_meetings(&self, _filter: &MeetingFilter) -> Result<Vec<MeetingRecord>> {
            Ok(Vec::new())
        }

        fn transcript(&self, meeting_id: &str) -> Result<Vec<TranscriptSegment>> {
            bail!("database is locked while reading {meeting_id}")
        }

        fn latest_cursor(&self) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn record(id: &str, title: &str, created_at: &str) -> MeetingRecord {
        MeetingRecord {
            id: id.to_string(),
            title: title.to_string(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
            summary: None,
        }
    }

    #[test]
    fn first_export_writes_document_and_updates_state() {
        let tmp = tempdir().expect("tempdir");
        let output = tmp.path().join("output");
        let source = meetily_source();
        let meetings = source.completed_meetings(&MeetingFilter::all()).expect("query");
        let ctx = ReconcileContext {
            source: &source,
            output_dir: &output,
            force: false,
        };
        let mut index = IdentityIndex::new();
        let mut claimed = ClaimedNames::new();

        let outcome = reconcile(&meetings[0], &ctx, &mut index, &mut claimed).expect("reconcile");
        let expected = "2025-01-06 0900 - Standup Monday.md";
        assert_eq!(
            outcome,
            ExportOutcome::Written {
                filename: expected.to_string()
            }
        );
        assert!(outcome.exported());
        assert_eq!(index.get("meeting-aaa").map(String::as_str), Some(expected));
        assert!(claimed.contains(expected));

        let content = fs::read_to_string(output.join(expected)).expect("read");
        assert!(content.contains("meeting-id: meeting-aaa"));
        assert!(content.contains("## Action Items"));
        assert!(content.contains("- Fix login bug"));
        assert!(content.contains(
            "[00:00] (You) Good morning everyone\n\n[00:05] (Others) Hi lets get started"
        ));
    }

    #[test]
    fn known_meeting_is_skipped_without_touching_disk() {
        let tmp = tempdir().expect("tempdir");
        let source = meetily_source();
        let ctx = ReconcileContext {
            source: &source,
            output_dir: tmp.path(),
            force: false,
        };
        let mut index = IdentityIndex::new();
        index.insert("meeting-aaa".to_string(), "Custom Name.md".to_string());
        let mut claimed = ClaimedNames::from_filenames(index.values());

        let meeting = record("meeting-aaa", "Standup Monday", "2025-01-06T09:00:00");
        let outcome = reconcile(&meeting, &ctx, &mut index, &mut claimed).expect("reconcile");
        assert_eq!(
            outcome,
            ExportOutcome::Skipped {
                filename: "Custom Name.md".to_string()
            }
        );
        assert!(!outcome.exported());
        assert_eq!(fs::read_dir(tmp.path()).expect("read dir").count(), 0);
    }

    #[test]
    fn forced_refresh_under_the_same_name_overwrites_in_place() {
        let tmp = tempdir().expect("tempdir");
        let source = meetily_source();
        let name = "2025-01-06 0900 - Standup Monday.md";
        fs::write(tmp.path().join(name), "---\nmeeting-id: meeting-aaa\n---\nstale\n").expect("seed");

        let mut index = build_index(tmp.path());
        let mut claimed = ClaimedNames::from_filenames(index.values());
        let ctx = ReconcileContext {
            source: &source,
            output_dir: tmp.path(),
            force: true,
        };

        let meeting = record("meeting-aaa", "Standup Monday", "2025-01-06T09:00:00");
        let outcome = reconcile(&meeting, &ctx, &mut index, &mut claimed).expect("reconcile");
        assert_eq!(
            outcome,
            ExportOutcome::Written {
                filename: name.to_string()
            }
        );
        let content = fs::read_to_string(tmp.path().join(name)).expect("read");
        assert!(!content.contains("stale"));
        assert_eq!(claimed.len(), 1);
    }

    #[test]
    fn forced_refresh_after_title_change_renames() {
        let tmp = tempdir().expect("tempdir");
        let source = meetily_source();
        let old = "2025-01-06 0900 - Standup Monday.md";
        fs::write(tmp.path().join(old), "---\nmeeting-id: meeting-aaa\n---\n").expect("seed");

        let mut index = build_index(tmp.path());
        let mut claimed = ClaimedNames::from_filenames(index.values());
        let ctx = ReconcileContext {
            source: &source,
            output_dir: tmp.path(),
            force: true,
        };

        let meeting = record("meeting-aaa", "Daily Standup", "2025-01-06T09:00:00");
        let outcome = reconcile(&meeting, &ctx, &mut index, &mut claimed).expect("reconcile");
        let new = "2025-01-06 0900 - Daily Standup.md";
        assert_eq!(
            outcome,
            ExportOutcome::Renamed {
                from: old.to_string(),
                to: new.to_string()
            }
        );
        assert!(!tmp.path().join(old).exists());
        assert_eq!(
            read_identity(&tmp.path().join(new)).as_deref(),
            Some("meeting-aaa")
        );
        assert!(!claimed.contains(old));
        assert!(claimed.contains(new));
        assert_eq!(index.get("meeting-aaa").map(String::as_str), Some(new));
    }

    #[test]
    fn rename_tolerates_an_already_deleted_previous_file() {
        let tmp = tempdir().expect("tempdir");
        let source = meetily_source();
        let mut index = IdentityIndex::new();
        index.insert("meeting-aaa".to_string(), "Gone.md".to_string());
        let mut claimed = ClaimedNames::from_filenames(index.values());
        let ctx = ReconcileContext {
            source: &source,
            output_dir: tmp.path(),
            force: true,
        };

        let meeting = record("meeting-aaa", "Standup Monday", "2025-01-06T09:00:00");
        let outcome = reconcile(&meeting, &ctx, &mut index, &mut claimed).expect("reconcile");
        assert!(matches!(outcome, ExportOutcome::Renamed { .. }));
        assert!(tmp.path().join("2025-01-06 0900 - Standup Monday.md").exists());
    }

    #[test]
    fn rename_leaves_a_file_that_now_belongs_to_someone_else() {
        let tmp = tempdir().expect("tempdir");
        let source = meetily_source();
        let old = "Shared.md";
        fs::write(tmp.path().join(old), "---\nmeeting-id: meeting-zzz\n---\n").expect("seed");

        let mut index = IdentityIndex::new();
        index.insert("meeting-aaa".to_string(), old.to_string());
        let mut claimed = ClaimedNames::from_filenames(index.values());
        let ctx = ReconcileContext {
            source: &source,
            output_dir: tmp.path(),
            force: true,
        };

        let meeting = record("meeting-aaa", "Standup Monday", "2025-01-06T09:00:00");
        reconcile(&meeting, &ctx, &mut index, &mut claimed).expect("reconcile");
        assert_eq!(
            read_identity(&tmp.path().join(old)).as_deref(),
            Some("meeting-zzz")
        );
    }

    #[test]
    fn same_minute_same_title_in_one_pass_get_suffixes() {
        let tmp = tempdir().expect("tempdir");
        let source = meetily_source();
        let ctx = ReconcileContext {
            source: &source,
            output_dir: tmp.path(),
            force: false,
        };
        let mut index = IdentityIndex::new();
        let mut claimed = ClaimedNames::new();

        let first = record("m-1", "Sync", "2025-02-01T10:00:05");
        let second = record("m-2", "sync", "2025-02-01T10:00:40");
        let a = reconcile(&first, &ctx, &mut index, &mut claimed).expect("first");
        let b = reconcile(&second, &ctx, &mut index, &mut claimed).expect("second");

        assert_eq!(a.filename(), "2025-02-01 1000 - Sync.md");
        assert_eq!(b.filename(), "2025-02-01 1000 - sync (2).md");
        assert_eq!(build_index(tmp.path()).len(), 2);
    }

    #[test]
    fn unparseable_created_at_fails_only_when_a_name_is_needed() {
        let tmp = tempdir().expect("tempdir");
        let source = meetily_source();
        let ctx = ReconcileContext {
            source: &source,
            output_dir: tmp.path(),
            force: false,
        };
        let meeting = record("meeting-aaa", "Standup Monday", "garbage");

        let mut index = IdentityIndex::new();
        let mut claimed = ClaimedNames::new();
        let err = reconcile(&meeting, &ctx, &mut index, &mut claimed).expect_err("bad timestamp");
        assert!(matches!(
            err.downcast_ref::<ExporterError>(),
            Some(ExporterError::InvalidTimestamp { meeting_id, .. }) if meeting_id == "meeting-aaa"
        ));
        assert!(index.is_empty());
        assert_eq!(fs::read_dir(tmp.path()).expect("read dir").count(), 0);

        index.insert("meeting-aaa".to_string(), "Standup.md".to_string());
        let outcome = reconcile(&meeting, &ctx, &mut index, &mut claimed).expect("skip");
        assert!(!outcome.exported());
    }

    #[test]
    fn failed_rename_keeps_the_previous_document() {
        let tmp = tempdir().expect("tempdir");
        let old = "2025-01-06 0900 - Standup Monday.md";
        fs::write(tmp.path().join(old), "---\nmeeting-id: meeting-aaa\n---\nkept\n").expect("seed");

        let mut index = build_index(tmp.path());
        let mut claimed = ClaimedNames::from_filenames(index.values());
        let source = BrokenTranscripts;
        let ctx = ReconcileContext {
            source: &source,
            output_dir: tmp.path(),
            force: true,
        };

        let meeting = record("meeting-aaa", "Daily Standup", "2025-01-06T09:00:00");
        assert!(reconcile(&meeting, &ctx, &mut index, &mut claimed).is_err());
        assert!(
            fs::read_to_string(tmp.path().join(old))
                .expect("old document")
                .contains("kept")
        );
        assert!(!tmp.path().join("2025-01-06 0900 - Daily Standup.md").exists());
        assert_eq!(index.get("meeting-aaa").map(String::as_str), Some(old));
    }

    #[test]
    fn case_only_title_change_moves_the_document() {
        let tmp = tempdir().expect("tempdir");
        let source = meetily_source();
        let old = "2025-01-06 0900 - standup monday.md";
        fs::write(tmp.path().join(old), "---\nmeeting-id: meeting-aaa\n---\n").expect("seed");

        let mut index = build_index(tmp.path());
        let mut claimed = ClaimedNames::from_filenames(index.values());
        let ctx = ReconcileContext {
            source: &source,
            output_dir: tmp.path(),
            force: true,
        };

        let meeting = record("meeting-aaa", "Standup Monday", "2025-01-06T09:00:00");
        let outcome = reconcile(&meeting, &ctx, &mut index, &mut claimed).expect("reconcile");
        let new = "2025-01-06 0900 - Standup Monday.md";
        assert_eq!(
            outcome,
            ExportOutcome::Renamed {
                from: old.to_string(),
                to: new.to_string()
            }
        );
        assert_eq!(
            read_identity(&tmp.path().join(new)).as_deref(),
            Some("meeting-aaa")
        );
        assert_eq!(build_index(tmp.path()).len(), 1);
    }
}
