use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use talkbot_core::types::MessageRecord;
use tracing::{debug, info, instrument, warn};

use crate::db::init_db;
use crate::error::{ArchiveError, Result};
use crate::types::{BatchReport, InsertOutcome, StoredMessage};

/// Thread-safe archive over a single SQLite connection.
///
/// The `Mutex` serializes every write, so a running import batch and a live
/// insert can never interleave inside one upsert.
pub struct ArchiveStore {
    db: Mutex<Connection>,
}

impl ArchiveStore {
    /// Wrap an open connection, creating the archive tables if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| ArchiveError::Poisoned)
    }

    /// Persist one live message unless its channel is ignored.
    ///
    /// The ignore check and the write run in the same transaction.
    #[instrument(skip(self, record), fields(message_id = ?record.message_id, channel_id = ?record.channel_id))]
    pub fn insert(&self, record: &MessageRecord) -> Result<InsertOutcome> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;

        if let Some(channel_id) = record.channel_id {
            if is_ignored(&tx, channel_id)? {
                debug!("channel ignored at commit time");
                return Ok(InsertOutcome::ChannelIgnored);
            }
        }

        let outcome = upsert(&tx, record)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Upsert a whole batch inside one transaction.
    ///
    /// Each record runs under its own savepoint, which checks the ignore list
    /// before writing. A failing record is rolled back, logged with its
    /// payload and counted; the rest of the batch is still committed.
    #[instrument(skip(self, records), fields(batch = records.len()))]
    pub fn upsert_batch(&self, records: &[MessageRecord]) -> Result<BatchReport> {
        let mut db = self.conn()?;
        let mut tx = db.transaction()?;
        let mut report = BatchReport::default();

        for record in records {
            let sp = tx.savepoint()?;
            if let Some(channel_id) = record.channel_id {
                if is_ignored(&sp, channel_id)? {
                    report.ignored += 1;
                    continue;
                }
            }
            match upsert(&sp, record) {
                Ok(outcome) => {
                    sp.commit()?;
                    match outcome {
                        InsertOutcome::Updated => report.updated += 1,
                        _ => report.inserted += 1,
                    }
                }
                Err(e) => {
                    // Dropping the savepoint rolls this record back.
                    drop(sp);
                    report.failed += 1;
                    let payload = serde_json::to_string(record).unwrap_or_default();
                    warn!(error = %e, %payload, "upsert failed, record skipped");
                }
            }
        }

        tx.commit()?;
        info!(
            inserted = report.inserted,
            updated = report.updated,
            failed = report.failed,
            ignored = report.ignored,
            "batch committed"
        );
        Ok(report)
    }

    /// Mark a channel as ignored. Returns `false` if it already was.
    #[instrument(skip(self))]
    pub fn ignore_channel(&self, channel_id: u64) -> Result<bool> {
        let db = self.conn()?;
        let n = db.execute(
            "INSERT OR IGNORE INTO ignored_channels (channel_id) VALUES (?1)",
            params![to_sql_id(channel_id)],
        )?;
        if n > 0 {
            info!("channel ignored");
        }
        Ok(n > 0)
    }

    /// Remove a channel from the ignore list. Returns `false` if it was not ignored.
    #[instrument(skip(self))]
    pub fn unignore_channel(&self, channel_id: u64) -> Result<bool> {
        let db = self.conn()?;
        let n = db.execute(
            "DELETE FROM ignored_channels WHERE channel_id = ?1",
            params![to_sql_id(channel_id)],
        )?;
        if n > 0 {
            info!("channel no longer ignored");
        }
        Ok(n > 0)
    }

    pub fn is_ignored(&self, channel_id: u64) -> Result<bool> {
        let db = self.conn()?;
        Ok(is_ignored(&db, channel_id)?)
    }

    /// Snapshot of every ignored channel id.
    pub fn ignored_channels(&self) -> Result<HashSet<u64>> {
        let db = self.conn()?;
        let mut stmt = db.prepare("SELECT channel_id FROM ignored_channels")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids.into_iter().map(from_sql_id).collect())
    }

    /// Every stored `content`, in insertion order.
    pub fn contents(&self) -> Result<Vec<String>> {
        let db = self.conn()?;
        let mut stmt = db.prepare("SELECT content FROM messages ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn message_count(&self) -> Result<u64> {
        let db = self.conn()?;
        let n: i64 = db.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Look up a row by its platform message id.
    pub fn get_by_message_id(&self, message_id: u64) -> Result<Option<StoredMessage>> {
        let db = self.conn()?;
        let row = db
            .query_row(
                "SELECT id, message_id, content, author_name, author_id, channel_id, timestamp
                 FROM messages WHERE message_id = ?1",
                params![to_sql_id(message_id)],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, message_id, content, author_name, author_id, channel_id, ts)) = row else {
            return Ok(None);
        };
        let timestamp = DateTime::parse_from_rfc3339(&ts)
            .map_err(|e| ArchiveError::Timestamp(format!("{ts}: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(StoredMessage {
            id,
            message_id: message_id.map(from_sql_id),
            content,
            author_name,
            author_id: from_sql_id(author_id),
            channel_id: channel_id.map(from_sql_id),
            timestamp,
        }))
    }

    /// Delete every archived message. Ignored channels are kept.
    #[instrument(skip(self))]
    pub fn purge_messages(&self) -> Result<usize> {
        let db = self.conn()?;
        let n = db.execute("DELETE FROM messages", [])?;
        warn!(deleted = n, "archive purged");
        Ok(n)
    }
}

fn is_ignored(conn: &Connection, channel_id: u64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM ignored_channels WHERE channel_id = ?1)",
        params![to_sql_id(channel_id)],
        |row| row.get(0),
    )
}

/// Insert, or on `message_id` conflict rewrite `content` only. Identity,
/// channel and timestamp of the first insert are preserved.
fn upsert(conn: &Connection, record: &MessageRecord) -> rusqlite::Result<InsertOutcome> {
    let message_id = record.message_id.map(to_sql_id);
    let existed = match message_id {
        Some(id) => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM messages WHERE message_id = ?1)",
            params![id],
            |row| row.get::<_, bool>(0),
        )?,
        None => false,
    };

    conn.execute(
        "INSERT INTO messages
         (message_id, content, author_name, author_id, channel_id, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(message_id) DO UPDATE SET content = excluded.content",
        params![
            message_id,
            record.content,
            record.author_name,
            to_sql_id(record.author_id),
            record.channel_id.map(to_sql_id),
            record.timestamp.to_rfc3339(),
        ],
    )?;

    Ok(if existed {
        InsertOutcome::Updated
    } else {
        InsertOutcome::Inserted
    })
}

// Snowflakes are stored by bit pattern; SQLite INTEGER is signed 64-bit.
fn to_sql_id(id: u64) -> i64 {
    id as i64
}

fn from_sql_id(id: i64) -> u64 {
    id as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> ArchiveStore {
        ArchiveStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn record(message_id: u64, channel_id: u64, content: &str) -> MessageRecord {
        MessageRecord {
            message_id: Some(message_id),
            content: content.to_string(),
            author_name: "alice".to_string(),
            author_id: 7,
            channel_id: Some(channel_id),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn insert_then_read_back() {
        let store = store();
        let outcome = store.insert(&record(1, 10, "hello there world")).unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);

        let row = store.get_by_message_id(1).unwrap().expect("row");
        assert_eq!(row.content, "hello there world");
        assert_eq!(row.channel_id, Some(10));
        assert_eq!(row.timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn insert_into_ignored_channel_writes_nothing() {
        let store = store();
        assert!(store.ignore_channel(10).unwrap());
        let outcome = store.insert(&record(1, 10, "hello there world")).unwrap();
        assert_eq!(outcome, InsertOutcome::ChannelIgnored);
        assert_eq!(store.message_count().unwrap(), 0);
    }

    #[test]
    fn upsert_conflict_updates_content_only() {
        let store = store();
        store.upsert_batch(&[record(1, 10, "first version")]).unwrap();

        let mut edited = record(1, 99, "second version");
        edited.author_name = "mallory".to_string();
        edited.timestamp = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let report = store.upsert_batch(&[edited]).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.inserted, 0);

        let row = store.get_by_message_id(1).unwrap().expect("row");
        assert_eq!(row.content, "second version");
        assert_eq!(row.author_name, "alice");
        assert_eq!(row.channel_id, Some(10));
        assert_eq!(row.timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        assert_eq!(store.message_count().unwrap(), 1);
    }

    #[test]
    fn failing_record_does_not_abort_batch() {
        let store = store();
        // Empty content violates the CHECK constraint.
        let batch = vec![
            record(1, 10, "good message one"),
            record(2, 10, ""),
            record(3, 10, "good message three"),
        ];
        let report = store.upsert_batch(&batch).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.message_count().unwrap(), 2);
        assert!(store.get_by_message_id(2).unwrap().is_none());
    }

    #[test]
    fn batch_skips_channels_ignored_at_commit_time() {
        let store = store();
        store.ignore_channel(20).unwrap();
        let report = store
            .upsert_batch(&[
                record(1, 10, "kept in channel ten"),
                record(2, 20, "dropped in twenty"),
            ])
            .unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.upserted(), 1);
        assert!(store.get_by_message_id(2).unwrap().is_none());
    }

    #[test]
    fn rows_without_message_id_never_conflict() {
        let store = store();
        let mut a = record(0, 10, "manual row one");
        a.message_id = None;
        let mut b = a.clone();
        b.content = "manual row two".to_string();
        let report = store.upsert_batch(&[a, b]).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(store.message_count().unwrap(), 2);
    }

    #[test]
    fn ignore_and_unignore_report_changes() {
        let store = store();
        assert!(store.ignore_channel(5).unwrap());
        assert!(!store.ignore_channel(5).unwrap());
        assert!(store.is_ignored(5).unwrap());
        assert_eq!(store.ignored_channels().unwrap(), HashSet::from([5]));
        assert!(store.unignore_channel(5).unwrap());
        assert!(!store.unignore_channel(5).unwrap());
        assert!(!store.is_ignored(5).unwrap());
    }

    #[test]
    fn large_snowflakes_survive_round_trip() {
        let store = store();
        let id = 1_234_567_890_123_456_789;
        store.insert(&record(id, u64::MAX - 1, "big id message")).unwrap();
        let row = store.get_by_message_id(id).unwrap().expect("row");
        assert_eq!(row.message_id, Some(id));
        assert_eq!(row.channel_id, Some(u64::MAX - 1));
    }

    #[test]
    fn contents_follow_insertion_order_and_purge_clears() {
        let store = store();
        store.insert(&record(1, 10, "a b c")).unwrap();
        store.insert(&record(2, 10, "b c a")).unwrap();
        assert_eq!(store.contents().unwrap(), vec!["a b c", "b c a"]);
        assert_eq!(store.purge_messages().unwrap(), 2);
        assert!(store.contents().unwrap().is_empty());
    }
}
