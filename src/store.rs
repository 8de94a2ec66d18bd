//! Append-only DuckDB store for collected comps, estimates and the watchlist.
//!
//! The estimator only ever writes here; rows are kept for later analysis and
//! are never read back into a live estimation.

use duckdb::{params, types::ValueRef, Connection as DuckDbConnection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{GraphiteError, Result};
use crate::models::{Listing, PriceSummary, PublicEstimate};

/// Write-only contract for historical comps and estimates.
pub trait PersistentStore: Send + Sync {
    /// Insert all `listings` for `query`; returns the number of rows written.
    fn insert_comps(&self, query: &str, listings: &[Listing]) -> Result<usize>;
    fn insert_estimate(&self, query: &str, public: &PublicEstimate, summary: &PriceSummary) -> Result<()>;
}

const SCHEMA: &str = "
    CREATE SEQUENCE IF NOT EXISTS comps_id_seq;
    CREATE TABLE IF NOT EXISTS comps (
        id BIGINT PRIMARY KEY DEFAULT nextval('comps_id_seq'),
        query VARCHAR NOT NULL,
        title VARCHAR,
        price DOUBLE,
        shipping DOUBLE,
        url VARCHAR,
        ended VARCHAR,
        created_at VARCHAR NOT NULL
    );
    CREATE SEQUENCE IF NOT EXISTS estimates_id_seq;
    CREATE TABLE IF NOT EXISTS estimates (
        id BIGINT PRIMARY KEY DEFAULT nextval('estimates_id_seq'),
        query VARCHAR NOT NULL,
        casp DOUBLE,
        accuracy_pct INTEGER,
        confidence DOUBLE,
        public_json VARCHAR,
        summary_json VARCHAR,
        created_at VARCHAR NOT NULL
    );
    CREATE TABLE IF NOT EXISTS watchlist (
        query VARCHAR PRIMARY KEY,
        created_at VARCHAR NOT NULL
    );
";

fn utc_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// DuckDB-backed [`PersistentStore`].
pub struct DuckDbStore {
    conn: Mutex<DuckDbConnection>,
}

impl DuckDbStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(DuckDbConnection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(DuckDbConnection::open_in_memory()?)
    }

    fn init(conn: DuckDbConnection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, DuckDbConnection>> {
        self.conn
            .lock()
            .map_err(|_| GraphiteError::InvalidArgument("store lock poisoned".into()))
    }

    // -- Watchlist ---------------------------------------------------------

    /// Add a query to the watchlist. Blank queries and duplicates are ignored.
    pub fn add_watch(&self, query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Ok(());
        }
        self.conn()?.execute(
            "INSERT OR IGNORE INTO watchlist (query, created_at) VALUES (?, ?)",
            params![query, utc_now()],
        )?;
        Ok(())
    }

    pub fn delete_watch(&self, query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Ok(());
        }
        self.conn()?
            .execute("DELETE FROM watchlist WHERE query = ?", params![query])?;
        Ok(())
    }

    /// Watched queries, most recently added first.
    pub fn list_watches(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT query FROM watchlist ORDER BY created_at DESC, query")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // -- Inspection --------------------------------------------------------

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Intended for inspection and reporting over the stored history.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the statement has run.
        let column_names: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names().into_iter().map(|c| c.to_string()).collect())
            .unwrap_or_default();

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = HashMap::new();
            for (i, name) in column_names.iter().enumerate() {
                map.insert(name.clone(), convert_value_ref(row.get_ref(i)?));
            }
            out.push(map);
        }
        Ok(out)
    }
}

impl PersistentStore for DuckDbStore {
    fn insert_comps(&self, query: &str, listings: &[Listing]) -> Result<usize> {
        if listings.is_empty() {
            return Ok(0);
        }

        let now = utc_now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO comps (query, title, price, shipping, url, ended, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )?;
            for l in listings {
                stmt.execute(params![query, l.title, l.price, l.shipping, l.url, l.ended, now])?;
            }
        }
        tx.commit()?;
        debug!("stored {} comps for {:?}", listings.len(), query);
        Ok(listings.len())
    }

    fn insert_estimate(&self, query: &str, public: &PublicEstimate, summary: &PriceSummary) -> Result<()> {
        let public_json = serde_json::to_string(public)?;
        let summary_json = serde_json::to_string(summary)?;
        let accuracy_pct = i32::from(public.accuracy_pct);
        self.conn()?.execute(
            "INSERT INTO estimates \
             (query, casp, accuracy_pct, confidence, public_json, summary_json, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                query,
                public.casp,
                accuracy_pct,
                summary.confidence,
                public_json,
                summary_json,
                utc_now()
            ],
        )?;
        Ok(())
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UBigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).to_string()),
        _ => serde_json::Value::Null,
    }
}
