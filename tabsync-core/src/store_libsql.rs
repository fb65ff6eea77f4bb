use std::path::Path;

use async_trait::async_trait;
use libsql::params::Params;
use libsql::{Builder, Connection, Database, Value};

use crate::error::{Result, SyncError};
use crate::page::{Cell, Page, Row};
use crate::store::LocalStore;

// SQLite's historical bound on host parameters per statement.
const MAX_VARIABLES: usize = 999;

/// Embedded SQLite file through libsql.
pub struct LibsqlStore {
    _db: Database,
    conn: Connection,
}

impl LibsqlStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        Ok(Self { _db: db, conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl From<Value> for Cell {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Cell::Null,
            Value::Integer(i) => Cell::Integer(i),
            Value::Real(f) => Cell::Real(f),
            Value::Text(s) => Cell::Text(s),
            Value::Blob(b) => Cell::Blob(b),
        }
    }
}

impl From<&Cell> for Value {
    fn from(c: &Cell) -> Self {
        match c {
            Cell::Null => Value::Null,
            Cell::Integer(i) => Value::Integer(*i),
            Cell::Real(f) => Value::Real(*f),
            Cell::Text(s) => Value::Text(s.clone()),
            Cell::Blob(b) => Value::Blob(b.clone()),
        }
    }
}

fn as_u64(v: Value, what: &str) -> Result<u64> {
    match v {
        Value::Integer(i) if i >= 0 => Ok(i as u64),
        other => Err(SyncError::Protocol(format!("{what}: unexpected value {other:?}"))),
    }
}

fn select_sql(table: &str, columns: &[String], order_by: Option<&str>) -> String {
    let cols = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("SELECT {} FROM {}", cols, quote_ident(table));
    if let Some(col) = order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(&quote_ident(col));
    }
    sql.push_str(" LIMIT ? OFFSET ?");
    sql
}

fn insert_sql(table: &str, header: &[String], rows: usize) -> String {
    let cols = header
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let one = format!("({})", vec!["?"; header.len()].join(", "));
    let values = vec![one; rows].join(", ");
    format!("INSERT INTO {} ({}) VALUES {}", quote_ident(table), cols, values)
}

#[async_trait]
impl LocalStore for LibsqlStore {
    async fn tables(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' \
                 AND name NOT LIKE 'sqlite_%' ORDER BY name",
                (),
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            if let Value::Text(name) = row.get_value(0)? {
                out.push(name);
            }
        }
        Ok(out)
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let mut rows = self.conn.query(&sql, ()).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            if let Value::Text(name) = row.get_value(1)? {
                out.push(name);
            }
        }
        Ok(out)
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let mut rows = self.conn.query(&sql, ()).await?;
        match rows.next().await? {
            Some(row) => as_u64(row.get_value(0)?, "row count"),
            None => Ok(0),
        }
    }

    async fn fetch_page(
        &self,
        table: &str,
        columns: &[String],
        order_by: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<Page> {
        if columns.is_empty() {
            return Ok(Page::new(Vec::new(), Vec::new()));
        }
        let sql = select_sql(table, columns, order_by);
        let params = Params::Positional(vec![
            Value::Integer(limit.min(i64::MAX as u64) as i64),
            Value::Integer(offset.min(i64::MAX as u64) as i64),
        ]);
        let mut rows = self.conn.query(&sql, params).await?;
        let mut data = Vec::new();
        while let Some(row) = rows.next().await? {
            let mut r: Row = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                r.push(Cell::from(row.get_value(i as i32)?));
            }
            data.push(r);
        }
        Ok(Page::new(columns.to_vec(), data))
    }

    async fn insert_rows(&self, table: &str, header: &[String], rows: &[Row]) -> Result<u64> {
        if rows.is_empty() || header.is_empty() {
            return Ok(0);
        }
        let per_stmt = (MAX_VARIABLES / header.len()).max(1);
        let tx = self.conn.transaction().await?;
        let mut written = 0u64;
        for batch in rows.chunks(per_stmt) {
            let sql = insert_sql(table, header, batch.len());
            let values: Vec<Value> = batch.iter().flatten().map(Value::from).collect();
            written += tx.execute(&sql, Params::Positional(values)).await?;
        }
        tx.commit().await?;
        Ok(written)
    }
}
