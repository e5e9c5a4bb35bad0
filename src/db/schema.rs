/// Schema for the client database.
pub const SCHEMA: &str = r#"
-- Durable key-value rows (cached responses, saved matches, settings)
CREATE TABLE IF NOT EXISTS kv (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Reminder jobs owned by the durable scheduling engine
CREATE TABLE IF NOT EXISTS reminder_jobs (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    -- Unix epoch milliseconds, UTC
    trigger_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reminder_jobs_trigger
    ON reminder_jobs(trigger_at);
"#;
