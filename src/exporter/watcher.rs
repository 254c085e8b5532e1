use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::exporter::batch::{Cursor, FullPassOptions, PassReport, run_full_pass, run_incremental_pass};
use crate::exporter::config::ExporterConfig;
use crate::exporter::notify::{NOTIFICATION_TITLE, exported_count_message, notify};
use crate::exporter::source::{MeetingSource, SqliteSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Idle,
    Fetching,
    Reconciling,
}

/// Polling exporter: one full pass at start-up, then cursor-bounded
/// incremental passes every `interval`.
#[derive(Debug)]
pub struct Watcher {
    db: PathBuf,
    output: PathBuf,
    interval: Duration,
    notify: bool,
    cursor: Cursor,
    phase: WatchPhase,
}

impl Watcher {
    pub fn new(cfg: &ExporterConfig) -> Self {
        Self {
            db: cfg.db.clone(),
            output: cfg.output.clone(),
            interval: Duration::from_secs(cfg.interval_secs),
            notify: cfg.notify,
            cursor: Cursor::default(),
            phase: WatchPhase::Idle,
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    #[cfg(test)]
    pub fn phase(&self) -> WatchPhase {
        self.phase
    }

    fn enter(&mut self, phase: WatchPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "watch phase");
        self.phase = phase;
    }

    /// Export everything and seed the cursor. A missing database is fatal
    /// here and nowhere else.
    pub fn start(&mut self) -> Result<PassReport> {
        self.enter(WatchPhase::Fetching);
        let source = SqliteSource::open(&self.db)?;
        // Read the watermark before exporting: anything completing during
        // the pass is picked up (and skipped) by the next tick.
        let seed = source.latest_cursor()?;

        self.enter(WatchPhase::Reconciling);
        let result = run_full_pass(&source, &self.output, &FullPassOptions::default());
        self.enter(WatchPhase::Idle);
        let report = result?;

        self.cursor = Cursor::new(seed);
        if self.notify && report.exported > 0 {
            notify(NOTIFICATION_TITLE, &exported_count_message(report.exported));
        }
        Ok(report)
    }

    /// One polling round. The cursor only moves when the round succeeds.
    pub fn tick(&mut self) -> Result<PassReport> {
        self.enter(WatchPhase::Fetching);
        let result = SqliteSource::open(&self.db).and_then(|source| {
            self.enter(WatchPhase::Reconciling);
            let mut cursor = self.cursor.clone();
            let report = run_incremental_pass(&source, &self.output, &mut cursor)?;
            self.cursor = cursor;
            Ok(report)
        });
        self.enter(WatchPhase::Idle);
        let report = result?;

        if self.notify {
            for title in report.exported_titles() {
                notify(NOTIFICATION_TITLE, &format!("Exported: {title}"));
            }
        }
        Ok(report)
    }

    /// Poll until the process is killed. Failures inside a round are
    /// logged and the next round retries from the same cursor.
    pub fn run_forever(mut self) -> Result<()> {
        loop {
            thread::sleep(self.interval);
            match self.tick() {
                Ok(report) if report.found > 0 => tracing::info!(
                    found = report.found,
                    exported = report.exported,
                    cursor = self.cursor.value().unwrap_or(""),
                    "watch round"
                ),
                Ok(_) => tracing::debug!("watch round: nothing new"),
                Err(err) => tracing::warn!("watch round failed: {err:#}"),
            }
        }
    }
}
