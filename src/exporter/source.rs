//! Read-only access to the Meetily database.
//!
//! The exporter only ever needs two queries (completed meetings, and the
//! transcript of one meeting) plus the watermark used to seed the watch
//! cursor, so they sit behind [`MeetingSource`] and the SQLite
//! implementation stays small.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, Row, params_from_iter};

use crate::error::ExporterError;

#[derive(Debug, Clone, PartialEq)]
pub struct MeetingRecord {
    pub id: String,
    pub title: String,
    /// `meetings.created_at` as stored; parsed only when a filename has to
    /// be allocated.
    pub created_at: String,
    /// `summary_processes.updated_at` exactly as stored; the cursor compares
    /// these the same way SQLite does.
    pub updated_at: String,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerChannel {
    Mic,
    System,
    Other(String),
}

impl SpeakerChannel {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "mic" => Self::Mic,
            "system" => Self::System,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    pub offset_seconds: Option<f64>,
    pub wall_clock: Option<String>,
    pub speaker: Option<SpeakerChannel>,
}

#[derive(Debug, Clone, Default)]
pub struct MeetingFilter {
    pub meeting_id: Option<String>,
    /// Only meetings whose summary was updated strictly after this value.
    pub updated_after: Option<String>,
}

impl MeetingFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn single(meeting_id: impl Into<String>) -> Self {
        Self {
            meeting_id: Some(meeting_id.into()),
            ..Self::default()
        }
    }

    pub fn since(updated_after: Option<&str>) -> Self {
        Self {
            updated_after: updated_after.map(ToOwned::to_owned),
            ..Self::default()
        }
    }
}

pub trait MeetingSource {
    /// Meetings with a completed summary, ascending by summary `updated_at`.
    fn completed_meetings(&self, filter: &MeetingFilter) -> Result<Vec<MeetingRecord>>;

    /// Transcript segments of one meeting, ascending by audio offset.
    fn transcript(&self, meeting_id: &str) -> Result<Vec<TranscriptSegment>>;

    /// Highest `updated_at` among completed summaries.
    fn latest_cursor(&self) -> Result<Option<String>>;
}

pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Open the database read-only. A missing file is reported as
    /// [`ExporterError::DatabaseMissing`] instead of letting SQLite create one.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ExporterError::DatabaseMissing(path.to_path_buf()).into());
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open database {}", path.display()))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn map_meeting_row(row: &Row<'_>) -> rusqlite::Result<MeetingRecord> {
    Ok(MeetingRecord {
        id: row.get(0)?,
        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        created_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        summary: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

impl MeetingSource for SqliteSource {
    fn completed_meetings(&self, filter: &MeetingFilter) -> Result<Vec<MeetingRecord>> {
        let mut sql = String::from(
            "SELECT m.id, m.title, m.created_at, sp.result, sp.updated_at
             FROM meetings m
             JOIN summary_processes sp ON m.id = sp.meeting_id
             WHERE sp.status = 'completed'",
        );
        let mut params = Vec::new();
        if let Some(meeting_id) = &filter.meeting_id {
            sql.push_str(" AND m.id = ?");
            params.push(meeting_id.as_str());
        }
        if let Some(updated_after) = &filter.updated_after {
            sql.push_str(" AND sp.updated_at > ?");
            params.push(updated_after.as_str());
        }
        sql.push_str(" ORDER BY sp.updated_at ASC");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("failed to prepare completed meetings query")?;
        let meetings = stmt
            .query_map(params_from_iter(params), map_meeting_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read completed meetings")?;
        Ok(meetings)
    }

    fn transcript(&self, meeting_id: &str) -> Result<Vec<TranscriptSegment>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT transcript, audio_start_time, timestamp, speaker
                 FROM transcripts
                 WHERE meeting_id = ?1
                 ORDER BY audio_start_time ASC",
            )
            .context("failed to prepare transcript query")?;
        let segments = stmt
            .query_map([meeting_id], |row| {
                Ok(TranscriptSegment {
                    text: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    offset_seconds: row.get(1)?,
                    wall_clock: row.get(2)?,
                    speaker: row
                        .get::<_, Option<String>>(3)?
                        .map(|raw| SpeakerChannel::parse(&raw)),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("failed to read transcript for {meeting_id}"))?;
        Ok(segments)
    }

    fn latest_cursor(&self) -> Result<Option<String>> {
        let cursor = self
            .conn
            .query_row(
                "SELECT MAX(sp.updated_at) FROM summary_processes sp WHERE sp.status = 'completed'",
                [],
                |row| row.get::<_, Option<String>>(0),
            )
            .context("failed to read latest summary cursor")?;
        Ok(cursor)
    }
}
