use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("database not found: {}", .0.display())]
    DatabaseMissing(PathBuf),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("meeting {meeting_id} has unparseable created_at `{value}`")]
    InvalidTimestamp { meeting_id: String, value: String },
}
