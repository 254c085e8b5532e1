use assert_cmd::Command;
use rusqlite::Connection;
use std::path::Path;

pub const MEETILY_FIXTURE: &str = r###"
    CREATE TABLE meetings (
        id TEXT PRIMARY KEY, title TEXT, created_at TEXT
    );
    CREATE TABLE summary_processes (
        meeting_id TEXT, status TEXT, result TEXT, updated_at TEXT
    );
    CREATE TABLE transcripts (
        meeting_id TEXT, transcript TEXT,
        audio_start_time REAL, timestamp TEXT, speaker TEXT
    );

    INSERT INTO meetings VALUES
        ('meeting-aaa', 'Standup Monday', '2025-01-06T09:00:00'),
        ('meeting-bbb', 'Design Review',  '2025-01-07T14:00:00'),
        ('meeting-ccc', 'Sprint Retro',   '2025-01-08T16:00:00');

    INSERT INTO summary_processes VALUES
        ('meeting-ccc', 'processing', NULL, '2025-01-08T16:10:00'),
        ('meeting-aaa', 'completed',
         '{"markdown": "## Action Items\n- Fix login bug"}', '2025-01-06T09:30:00'),
        ('meeting-bbb', 'completed',
         '{"markdown": "## Decisions\n- Use new color palette"}', '2025-01-07T14:45:00');

    INSERT INTO transcripts VALUES
        ('meeting-aaa', 'Good morning everyone', 0.0, '2025-01-06T09:00:00', 'mic'),
        ('meeting-aaa', 'Hi lets get started', 5.5, '2025-01-06T09:00:05', 'system'),
        ('meeting-bbb', 'Lets look at the mockups', 0.0, '2025-01-07T14:00:00', 'mic'),
        ('meeting-bbb', 'I like option B', 12.3, '2025-01-07T14:00:12', 'system');
"###;

pub fn write_meetily_db(path: &Path) -> Connection {
    let conn = Connection::open(path).expect("open db");
    conn.execute_batch(MEETILY_FIXTURE).expect("seed db");
    conn
}

/// The binary with HOME, config and notifications pinned inside `root`.
pub fn exporter_cmd(root: &Path) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("meetily-exporter");
    cmd.current_dir(root)
        .env("HOME", root)
        .env("MEETILY_EXPORTER_HOME", root.join("home"))
        .env("MEETILY_EXPORTER_CONFIG_PATH", root.join("config.toml"))
        .env("MEETILY_EXPORTER_NOTIFY", "false")
        .env("MEETILY_EXPORTER_LOG", "warn")
        .env_remove("MEETILY_EXPORTER_DB")
        .env_remove("MEETILY_EXPORTER_OUTPUT")
        .env_remove("MEETILY_EXPORTER_INTERVAL_SECS");
    cmd
}

pub fn sorted_listing(dir: &Path) -> Vec<String> {
    let mut names = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
        .collect::<Vec<_>>();
    names.sort();
    names
}
