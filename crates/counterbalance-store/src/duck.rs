//! DuckDB persistence for orders, reference documents, and the interaction log.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime, Utc};
use counterbalance_core::{
    DocId, Document, EventType, InteractionEvent, OrderAssignment, OrderKey, Query, QueryId,
    decode_order, encode_order, export,
};
use duckdb::{Connection, params, params_from_iter};
use tracing::info;

use crate::StoreError;
use crate::parquet_io::write_parquet;
use crate::seed;
use crate::traits::{DocumentRepository, EventSink, OrderStore};

const SCHEMA_SQL: &str = "
    CREATE SEQUENCE IF NOT EXISTS logs_id_seq START 1;
    CREATE TABLE IF NOT EXISTS logs (
        id BIGINT PRIMARY KEY DEFAULT nextval('logs_id_seq'),
        user_id VARCHAR NOT NULL,
        qid BIGINT NOT NULL DEFAULT 0,
        docno BIGINT NOT NULL DEFAULT 0,
        event_type VARCHAR NOT NULL,
        start_idx BIGINT NOT NULL DEFAULT -1,
        end_idx BIGINT NOT NULL DEFAULT -1,
        duration BIGINT NOT NULL DEFAULT 0,
        pass_flag BOOLEAN NOT NULL DEFAULT false,
        \"timestamp\" TIMESTAMP NOT NULL
    );
    CREATE TABLE IF NOT EXISTS documents (
        id BIGINT PRIMARY KEY,
        qid BIGINT NOT NULL,
        docno BIGINT NOT NULL,
        content VARCHAR
    );
    CREATE TABLE IF NOT EXISTS orders (
        user_id VARCHAR NOT NULL,
        query_id BIGINT NOT NULL,
        doc_order VARCHAR NOT NULL,
        created_at TIMESTAMP NOT NULL,
        PRIMARY KEY (user_id, query_id)
    );
    CREATE TABLE IF NOT EXISTS queries (
        id BIGINT PRIMARY KEY,
        content VARCHAR
    );
";

const TABLES: &[&str] = &["orders", "documents", "queries", "logs"];

/// Tables that can be exported to Parquet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTable {
    Orders,
    Logs,
}

impl ExportTable {
    pub fn name(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Logs => "logs",
        }
    }
}

impl std::str::FromStr for ExportTable {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orders" => Ok(Self::Orders),
            "logs" => Ok(Self::Logs),
            other => Err(StoreError::UnknownTable(other.to_string())),
        }
    }
}

/// Rows inserted by [`DuckStore::seed_if_empty`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub documents: usize,
    pub queries: usize,
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| StoreError::BadTimestamp(raw.to_string()))
}

/// DuckDB store backing the order register, reference data, and event log.
///
/// `orders` carries a `(user_id, query_id)` primary key, which is what makes
/// [`OrderStore::put_if_absent`] a write-once register even across processes
/// sharing a database file.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for file-backed storage that survives across process restarts. Both
/// create any missing tables.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        store.ensure_schema()?;
        info!(path = %path.display(), "opened order database");
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Create any missing tables. Existing tables and rows are left alone.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.lock()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Check whether all four tables exist.
    pub fn has_tables(&self) -> bool {
        TABLES.iter().all(|t| self.count_table(t).is_ok())
    }

    /// Insert the sample corpus into `documents` and `queries`, each only if
    /// that table is empty.
    pub fn seed_if_empty(&self) -> Result<SeedReport, StoreError> {
        let mut report = SeedReport::default();
        if self.documents_count()? == 0 {
            report.documents = self.insert_documents(&seed::sample_documents())?;
        }
        if self.queries_count()? == 0 {
            report.queries = self.insert_queries(&seed::sample_queries())?;
        }
        info!(
            documents = report.documents,
            queries = report.queries,
            "seeded reference data"
        );
        Ok(report)
    }

    pub fn insert_documents(&self, docs: &[Document]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO documents (id, qid, docno, content) VALUES (?, ?, ?, ?)",
            )?;
            for d in docs {
                stmt.execute(params![d.id, d.query_id, d.display_no, d.content])?;
            }
        }
        tx.commit()?;
        Ok(docs.len())
    }

    pub fn insert_queries(&self, queries: &[Query]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO queries (id, content) VALUES (?, ?)")?;
            for q in queries {
                stmt.execute(params![q.id, q.content])?;
            }
        }
        tx.commit()?;
        Ok(queries.len())
    }

    // ── Counts ──

    pub fn orders_count(&self) -> Result<usize, StoreError> {
        self.count_table("orders")
    }

    pub fn documents_count(&self) -> Result<usize, StoreError> {
        self.count_table("documents")
    }

    pub fn queries_count(&self) -> Result<usize, StoreError> {
        self.count_table("queries")
    }

    pub fn logs_count(&self) -> Result<usize, StoreError> {
        self.count_table("logs")
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT FROM {table}");
        let count: i64 = self.lock()?.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ── Full reads for export ──

    /// Every stored assignment, ordered by user then query.
    pub fn assignments(&self) -> Result<Vec<OrderAssignment>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, query_id, doc_order, CAST(created_at AS VARCHAR)
             FROM orders ORDER BY user_id, query_id",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|(user_id, query_id, order, created)| {
                let key = OrderKey::new(user_id, query_id);
                let doc_ids = decode_order(&order).map_err(|source| StoreError::CorruptOrder {
                    key: key.to_string(),
                    source,
                })?;
                Ok(OrderAssignment::new(&key, doc_ids, parse_ts(&created)?))
            })
            .collect()
    }

    /// Every logged event in insertion order.
    pub fn events(&self) -> Result<Vec<InteractionEvent>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, qid, docno, event_type, start_idx, end_idx, duration, pass_flag,
                    CAST(\"timestamp\" AS VARCHAR)
             FROM logs ORDER BY id",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    InteractionEvent {
                        user_id: row.get(0)?,
                        query_id: row.get(1)?,
                        doc_ref: row.get(2)?,
                        event_type: EventType::from(row.get::<_, String>(3)?.as_str()),
                        start_idx: row.get(4)?,
                        end_idx: row.get(5)?,
                        duration: row.get(6)?,
                        pass_flag: row.get(7)?,
                        timestamp: DateTime::<Utc>::default(),
                    },
                    row.get::<_, String>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|(mut event, ts)| {
                event.timestamp = parse_ts(&ts)?;
                Ok(event)
            })
            .collect()
    }

    /// Write `table` to a Parquet file using the export schemas.
    pub fn export_parquet(&self, table: ExportTable, path: &Path) -> Result<usize, StoreError> {
        let batch = match table {
            ExportTable::Orders => export::orders_batch(&self.assignments()?)?,
            ExportTable::Logs => export::logs_batch(&self.events()?)?,
        };
        write_parquet(path, &batch)?;
        info!(table = table.name(), rows = batch.num_rows(), "exported table");
        Ok(batch.num_rows())
    }

    // ── Escape hatch ──

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }
}

impl OrderStore for DuckStore {
    fn get(&self, key: &OrderKey) -> Result<Option<OrderAssignment>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT doc_order, CAST(created_at AS VARCHAR)
             FROM orders WHERE user_id = ? AND query_id = ?",
        )?;
        let mut rows = stmt.query(params![key.user_id, key.query_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let order: String = row.get(0)?;
        let created: String = row.get(1)?;
        let doc_ids = decode_order(&order).map_err(|source| StoreError::CorruptOrder {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(OrderAssignment::new(key, doc_ids, parse_ts(&created)?)))
    }

    fn put_if_absent(&self, assignment: &OrderAssignment) -> Result<bool, StoreError> {
        let inserted = self.lock()?.execute(
            "INSERT INTO orders (user_id, query_id, doc_order, created_at)
             VALUES (?, ?, ?, CAST(? AS TIMESTAMP))
             ON CONFLICT DO NOTHING",
            params![
                assignment.user_id,
                assignment.query_id,
                encode_order(&assignment.doc_ids),
                format_ts(&assignment.created_at),
            ],
        )?;
        Ok(inserted == 1)
    }
}

impl DocumentRepository for DuckStore {
    fn list_candidate_ids(&self, query_id: QueryId) -> Result<Vec<DocId>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id FROM documents WHERE qid = ? ORDER BY docno, id")?;
        let ids = stmt
            .query_map(params![query_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn fetch_by_ids(
        &self,
        query_id: QueryId,
        ids: &[DocId],
    ) -> Result<HashMap<DocId, Document>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!(
            "SELECT id, qid, docno, content FROM documents WHERE qid = ? AND id IN ({placeholders})"
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let values = std::iter::once(query_id).chain(ids.iter().copied());
        let docs = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(Document {
                    id: row.get(0)?,
                    query_id: row.get(1)?,
                    display_no: row.get(2)?,
                    content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(docs.into_iter().map(|d| (d.id, d)).collect())
    }

    fn query_text(&self, query_id: QueryId) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT content FROM queries WHERE id = ?")?;
        let mut rows = stmt.query(params![query_id])?;
        match rows.next()? {
            Some(row) => Ok(row.get::<_, Option<String>>(0)?),
            None => Ok(None),
        }
    }
}

impl EventSink for DuckStore {
    fn append(&self, event: &InteractionEvent) -> Result<(), StoreError> {
        self.lock()?.execute(
            "INSERT INTO logs (user_id, qid, docno, event_type, start_idx, end_idx,
                               duration, pass_flag, \"timestamp\")
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            params![
                event.user_id,
                event.query_id,
                event.doc_ref,
                event.event_type.as_str(),
                event.start_idx,
                event.end_idx,
                event.duration,
                event.pass_flag,
                format_ts(&event.timestamp),
            ],
        )?;
        Ok(())
    }
}
