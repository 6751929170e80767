//! SQLite schema definition.

/// Schema for the durable key-value store.
///
/// One row per slot; `value` holds the JSON document written by the adapter.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Key-Value Slots
-- ============================================================================

CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
