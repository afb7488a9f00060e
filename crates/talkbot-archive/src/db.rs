use rusqlite::{Connection, Result};

/// Initialise archive tables. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_messages_table(conn)?;
    create_ignored_channels_table(conn)?;
    Ok(())
}

/// `message_id` is UNIQUE but nullable: legacy/manual rows carry no platform
/// id and never conflict with each other.
fn create_messages_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id  INTEGER UNIQUE,
            content     TEXT NOT NULL CHECK (length(content) > 0),
            author_name TEXT NOT NULL,
            author_id   INTEGER NOT NULL,
            channel_id  INTEGER,
            timestamp   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_channel
            ON messages(channel_id);",
    )
}

fn create_ignored_channels_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS ignored_channels (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_id  INTEGER NOT NULL UNIQUE
        );",
    )
}
