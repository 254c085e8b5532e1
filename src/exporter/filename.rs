use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::exporter::identity::DOCUMENT_EXTENSION;
use crate::exporter::sanitize::sanitize_title;

/// Lowercased filenames already taken during the current pass.
#[derive(Debug, Clone, Default)]
pub struct ClaimedNames {
    names: BTreeSet<String>,
}

impl ClaimedNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_filenames<'a>(filenames: impl IntoIterator<Item = &'a String>) -> Self {
        let mut claimed = Self::new();
        for name in filenames {
            claimed.claim(name);
        }
        claimed
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.names.contains(&filename.to_lowercase())
    }

    pub fn claim(&mut self, filename: &str) {
        self.names.insert(filename.to_lowercase());
    }

    pub fn release(&mut self, filename: &str) {
        self.names.remove(&filename.to_lowercase());
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.names.len()
    }
}

pub fn timestamp_prefix(created_at: &NaiveDateTime) -> String {
    created_at.format("%Y-%m-%d %H%M").to_string()
}

/// Build the document filename for a meeting: `YYYY-MM-DD HHMM - Title.md`.
///
/// Falls back to the meeting id when the title sanitizes to nothing. When
/// the name is already claimed (case-insensitively) a ` (2)`, ` (3)`, ...
/// suffix is tried until a free one turns up. `claimed` is only read.
pub fn allocate(
    title: &str,
    created_at: &NaiveDateTime,
    meeting_id: &str,
    claimed: &ClaimedNames,
) -> String {
    let sanitized = sanitize_title(title);
    let stem = if sanitized.is_empty() {
        meeting_id
    } else {
        sanitized.as_str()
    };
    let prefix = timestamp_prefix(created_at);

    let base = format!("{prefix} - {stem}.{DOCUMENT_EXTENSION}");
    if !claimed.contains(&base) {
        return base;
    }

    let mut n = 2u64;
    loop {
        let candidate = format!("{prefix} - {stem} ({n}).{DOCUMENT_EXTENSION}");
        if !claimed.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
