use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use crate::exporter::util::run_with_timeout;

pub const NOTIFICATION_TITLE: &str = "Meetily Exporter";
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(2);

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn notification_script(title: &str, message: &str) -> String {
    format!(
        "display notification \"{}\" with title \"{}\"",
        escape_applescript(message),
        escape_applescript(title)
    )
}

fn resolve_notifier() -> Option<PathBuf> {
    which::which("osascript").ok()
}

/// Fire a desktop notification. Never fails: a missing `osascript`, a
/// non-zero exit or a timeout are all dropped.
pub fn notify(title: &str, message: &str) {
    let Some(bin) = resolve_notifier() else {
        tracing::debug!("osascript not found; skipping notification");
        return;
    };
    let mut cmd = Command::new(bin);
    cmd.arg("-e").arg(notification_script(title, message));
    match run_with_timeout(&mut cmd, NOTIFY_TIMEOUT) {
        Ok(out) if !out.status.success() => {
            tracing::debug!(status = %out.status, "osascript exited unsuccessfully");
        }
        Ok(_) => {}
        Err(err) => tracing::debug!("notification dropped: {err:#}"),
    }
}

pub fn exported_count_message(exported: usize) -> String {
    let label = if exported == 1 { "meeting" } else { "meetings" };
    format!("Exported {exported} {label}")
}
