use std::{fs, path::Path, sync::Arc};

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};

use super::{RecordStore, StoreQuery, StoreResult};
use crate::search::config::SearchConfig;
use crate::search::types::{parse_timestamp, Record, RecordType};

const RECORD_COLUMNS: &str =
    "id, type, title, summary, field, created_at, updated_at, file_path, metadata";

/// Local record library backed by SQLite.
///
/// Timestamps are stored as UTC RFC 3339 text so that text order is time
/// order. Title, summary and field are also stored lower-cased (folded in
/// Rust, since SQLite's `LIKE` only folds ASCII) and keyword lookups match
/// against those columns.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        log::info!("[RecordStore] Opened {}", db_path.display());
        Self::from_connection(conn)
    }

    /// Open the database at [`SearchConfig::default_db_path`]
    pub fn open_default() -> StoreResult<Self> {
        Self::open(&SearchConfig::default_db_path())
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL DEFAULT 'unknown',
                title TEXT NOT NULL,
                summary TEXT DEFAULT '',
                field TEXT,
                created_at TEXT,
                updated_at TEXT,
                file_path TEXT DEFAULT '',
                metadata TEXT DEFAULT '{}',
                title_folded TEXT NOT NULL DEFAULT '',
                summary_folded TEXT NOT NULL DEFAULT '',
                field_folded TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_records_updated_at ON records(updated_at);
            CREATE INDEX IF NOT EXISTS idx_records_type ON records(type);
            CREATE INDEX IF NOT EXISTS idx_records_field ON records(field);
        ",
        )?;

        ensure_schema_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, action: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.conn.lock();
        action(&conn)
    }

    /// Insert or replace a record by id
    pub fn upsert(&self, record: &Record) -> StoreResult<()> {
        let metadata = serde_json::to_string(&record.metadata)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO records (id, type, title, summary, field, created_at, updated_at, file_path, metadata,
                                      title_folded, summary_folded, field_folded)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(id) DO UPDATE SET
                    type = excluded.type,
                    title = excluded.title,
                    summary = excluded.summary,
                    field = excluded.field,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at,
                    file_path = excluded.file_path,
                    metadata = excluded.metadata,
                    title_folded = excluded.title_folded,
                    summary_folded = excluded.summary_folded,
                    field_folded = excluded.field_folded",
                params![
                    record.id,
                    record.record_type.as_str(),
                    record.title,
                    record.summary,
                    record.field,
                    record.created_at.map(to_iso),
                    record.updated_at.map(to_iso),
                    record.file_path,
                    metadata,
                    fold(&record.title),
                    fold(&record.summary),
                    fold(record.field.as_deref().unwrap_or("")),
                ],
            )?;
            Ok(())
        })
    }

    pub fn upsert_all<'a>(&self, records: impl IntoIterator<Item = &'a Record>) -> StoreResult<usize> {
        let mut count = 0;
        for record in records {
            self.upsert(record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Returns true when a row was deleted
    pub fn remove(&self, id: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM records WHERE id = ?1", [id])?;
            Ok(affected > 0)
        })
    }

    pub fn count(&self) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
            Ok(n.max(0) as usize)
        })
    }

    fn query_records(&self, sql: &str, args: Vec<Value>) -> StoreResult<Vec<Record>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params_from_iter(args), row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

impl RecordStore for SqliteRecordStore {
    fn search(&self, query: &StoreQuery<'_>) -> StoreResult<Vec<Record>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(keyword) = query.keyword {
            args.push(Value::Text(like_pattern(&fold(keyword))));
            let n = args.len();
            clauses.push(format!(
                "(title_folded LIKE ?{n} ESCAPE '\\' OR summary_folded LIKE ?{n} ESCAPE '\\' \
                 OR field_folded LIKE ?{n} ESCAPE '\\')"
            ));
        }
        if let Some(record_type) = query.record_type {
            args.push(Value::Text(record_type.as_str().to_string()));
            clauses.push(format!("type = ?{}", args.len()));
        }
        if let Some(field) = query.field {
            args.push(Value::Text(like_pattern(&fold(field))));
            clauses.push(format!("field_folded LIKE ?{} ESCAPE '\\'", args.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        args.push(Value::Integer(query.limit as i64));
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records {where_clause} ORDER BY updated_at DESC LIMIT ?{}",
            args.len()
        );

        self.query_records(&sql, args)
    }

    fn get_by_id(&self, id: &str) -> StoreResult<Option<Record>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"))?;
            Ok(stmt.query_row([id], row_to_record).optional()?)
        })
    }

    fn search_updated_since(&self, cutoff: DateTime<Utc>, limit: usize) -> StoreResult<Vec<Record>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE updated_at >= ?1 ORDER BY updated_at DESC LIMIT ?2"
        );
        self.query_records(
            &sql,
            vec![Value::Text(to_iso(cutoff)), Value::Integer(limit as i64)],
        )
    }
}

fn to_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// `%text%` with LIKE wildcards escaped by backslash
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn stored_timestamp(id: &str, column: &str, value: Option<String>) -> Option<DateTime<Utc>> {
    let value = value?;
    let parsed = parse_timestamp(&value);
    if parsed.is_none() && !value.trim().is_empty() {
        log::warn!("[RecordStore] Record {} has unparsable {}: {:?}", id, column, value);
    }
    parsed
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let id: String = row.get(0)?;
    let record_type: String = row.get(1)?;
    let metadata_json: Option<String> = row.get(8)?;

    let metadata = match metadata_json.as_deref().map(str::trim) {
        None | Some("") => Default::default(),
        Some(json) => serde_json::from_str(json).unwrap_or_else(|e| {
            log::warn!("[RecordStore] Record {} has invalid metadata: {}", id, e);
            Default::default()
        }),
    };

    Ok(Record {
        record_type: RecordType::from_label(&record_type),
        title: row.get(2)?,
        summary: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        field: row.get(4)?,
        created_at: stored_timestamp(&id, "created_at", row.get(5)?),
        updated_at: stored_timestamp(&id, "updated_at", row.get(6)?),
        file_path: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        metadata,
        id,
    })
}

/// Bring databases created by older releases up to the current schema
fn ensure_schema_migrations(conn: &Connection) -> StoreResult<()> {
    let cols = {
        let mut stmt = conn.prepare("PRAGMA table_info(records)")?;
        let cols = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        cols
    };
    let has = |name: &str| cols.iter().any(|c| c == name);

    if !has("file_path") {
        conn.execute("ALTER TABLE records ADD COLUMN file_path TEXT DEFAULT ''", [])?;
    }
    if !has("metadata") {
        conn.execute("ALTER TABLE records ADD COLUMN metadata TEXT DEFAULT '{}'", [])?;
    }

    let mut needs_fold = false;
    for column in ["title_folded", "summary_folded", "field_folded"] {
        if !has(column) {
            conn.execute(
                &format!("ALTER TABLE records ADD COLUMN {column} TEXT NOT NULL DEFAULT ''"),
                [],
            )?;
            needs_fold = true;
        }
    }
    if needs_fold {
        backfill_folded(conn)?;
    }
    Ok(())
}

fn backfill_folded(conn: &Connection) -> StoreResult<()> {
    let rows = {
        let mut stmt = conn.prepare("SELECT id, title, summary, field FROM records")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let mut stmt = conn.prepare(
        "UPDATE records SET title_folded = ?2, summary_folded = ?3, field_folded = ?4 WHERE id = ?1",
    )?;
    for (id, title, summary, field) in &rows {
        stmt.execute(params![id, fold(title), fold(summary), fold(field)])?;
    }
    log::info!("[RecordStore] Folded search columns for {} records", rows.len());
    Ok(())
}
