use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse the ISO-8601 flavours Meetily stores for `created_at`.
///
/// Offsets are dropped rather than converted: the wall-clock time the
/// meeting was recorded at is what ends up in the filename.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.naive_local());
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(raw: &str) -> String {
    let Some(home) = dirs::home_dir() else {
        return raw.to_string();
    };
    if raw == "~" {
        return home.display().to_string();
    }
    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest).display().to_string(),
        None => raw.to_string(),
    }
}

/// Run `cmd` to completion, killing it once `timeout` has elapsed.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output> {
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    let mut child = cmd.spawn()?;
    let started = Instant::now();
    loop {
        if child.try_wait()?.is_some() {
            return Ok(child.wait_with_output()?);
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            anyhow::bail!("command timed out after {}s", timeout.as_secs());
        }
        thread::sleep(Duration::from_millis(50));
    }
}
