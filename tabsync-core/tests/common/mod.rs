#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use tabsync_core::advisor::AdvisorConfig;
use tabsync_core::codec::{self, Codec};
use tabsync_core::page::{Cell, Chunk, Page, Row};
use tabsync_core::remote::{CHECKSUM_HEADER, VERSION_HEADER};
use tabsync_core::store_libsql::LibsqlStore;
use tabsync_core::{Progress, PROTOCOL_VERSION, Result, SchemaTool, TransferOptions};

pub const SESSION_ID: &str = "1";
pub const ANN_BASIC: &str = "Basic YW5uOnMzY3JldA==";

/// In-process stand-in for the remote session server.
#[derive(Default)]
pub struct MockServer {
    /// Tables in the order the manifest lists them.
    pub served: Vec<(String, Vec<String>, Vec<Row>)>,
    pub schema: Vec<u8>,
    pub indexes: Vec<u8>,
    pub version_mismatch: Option<String>,
    pub required_auth: Option<String>,

    pub requests: Mutex<Vec<String>>,
    pub received: Mutex<BTreeMap<String, Vec<Row>>>,
    pub received_schema: Mutex<Option<Vec<u8>>>,
    pub received_indexes: Mutex<Option<Vec<u8>>>,
    /// Pushes to answer with 412 before accepting, per table.
    pub reject_pushes: Mutex<HashMap<String, u32>>,
    /// Pushes to answer with 500, per table.
    pub fail_pushes: Mutex<HashMap<String, u32>>,
    /// Pulls whose body gets a flipped byte after the checksum is taken.
    pub corrupt_pulls: Mutex<u32>,
    /// Pulls answered with an undecodable body under a matching checksum.
    pub malformed_pulls: Mutex<u32>,
}

impl MockServer {
    pub fn serve_table(mut self, name: &str, header: &[&str], rows: Vec<Row>) -> Self {
        self.served.push((
            name.to_string(),
            header.iter().map(|s| s.to_string()).collect(),
            rows,
        ));
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn log_matching(&self, prefix: &str) -> Vec<String> {
        self.log()
            .into_iter()
            .filter(|r| r.starts_with(prefix))
            .collect()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.log().iter().position(|r| r.starts_with(prefix))
    }

    pub fn rposition(&self, prefix: &str) -> Option<usize> {
        self.log().iter().rposition(|r| r.starts_with(prefix))
    }

    pub fn received_rows(&self, table: &str) -> Vec<Row> {
        self.received
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

type Shared = Arc<MockServer>;

async fn gate(State(s): State<Shared>, req: Request, next: Next) -> Response {
    let line = match req.uri().query() {
        Some(q) => format!("{} {}?{}", req.method(), req.uri().path(), q),
        None => format!("{} {}", req.method(), req.uri().path()),
    };
    s.requests.lock().unwrap().push(line);

    if let Some(want) = &s.required_auth {
        let got = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok());
        if got != Some(want.as_str()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    let version = req
        .headers()
        .get(VERSION_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Some(msg) = &s.version_mismatch {
        return (StatusCode::EXPECTATION_FAILED, msg.clone()).into_response();
    }
    if version != Some(PROTOCOL_VERSION) {
        return (StatusCode::EXPECTATION_FAILED, "missing version header").into_response();
    }
    next.run(req).await
}

async fn root() -> &'static str {
    "ok"
}

async fn open_session() -> String {
    format!("/sessions/{SESSION_ID}")
}

async fn close_session(Path(_id): Path<String>) -> StatusCode {
    StatusCode::OK
}

/// Written by hand so the JSON object keeps `served` order.
async fn manifest(State(s): State<Shared>, Path(_id): Path<String>) -> Response {
    let fields: Vec<String> = s
        .served
        .iter()
        .map(|(name, _, rows)| format!("{}:{}", serde_json::to_string(name).unwrap(), rows.len()))
        .collect();
    (
        [("content-type", "application/json")],
        format!("{{{}}}", fields.join(",")),
    )
        .into_response()
}

#[derive(Deserialize)]
struct OffsetQuery {
    offset: u64,
}

async fn pull(
    State(s): State<Shared>,
    Path((_id, table, chunksize)): Path<(String, String, u64)>,
    Query(q): Query<OffsetQuery>,
) -> Response {
    let Some((_, header, rows)) = s.served.iter().find(|(name, _, _)| *name == table) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let start = (q.offset as usize).min(rows.len());
    let end = (start + chunksize as usize).min(rows.len());
    let chunk = if start == end {
        Chunk::End
    } else {
        Chunk::Rows(Page::new(header.clone(), rows[start..end].to_vec()))
    };
    let mut body = Codec::default().encode(&chunk).unwrap();
    {
        let mut malformed = s.malformed_pulls.lock().unwrap();
        if *malformed > 0 {
            *malformed -= 1;
            // Stored codec id followed by bytes that are not CBOR.
            body = vec![0, 0xff, 0xff, 0xff];
        }
    }
    let checksum = codec::digest(&body);
    {
        let mut corrupt = s.corrupt_pulls.lock().unwrap();
        if *corrupt > 0 {
            *corrupt -= 1;
            let last = body.len() - 1;
            body[last] ^= 0xff;
        }
    }
    (StatusCode::OK, [(CHECKSUM_HEADER, checksum)], body).into_response()
}

async fn push(
    State(s): State<Shared>,
    Path((_id, table)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(n) = s.fail_pushes.lock().unwrap().get_mut(&table) {
        if *n > 0 {
            *n -= 1;
            return (StatusCode::INTERNAL_SERVER_ERROR, "disk full").into_response();
        }
    }
    if let Some(n) = s.reject_pushes.lock().unwrap().get_mut(&table) {
        if *n > 0 {
            *n -= 1;
            return StatusCode::PRECONDITION_FAILED.into_response();
        }
    }
    let checksum = headers
        .get(CHECKSUM_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !codec::verify(&body, checksum) {
        return StatusCode::PRECONDITION_FAILED.into_response();
    }
    match codec::decode(&body) {
        Ok(Chunk::Rows(page)) => {
            s.received
                .lock()
                .unwrap()
                .entry(table)
                .or_default()
                .extend(page.data);
            StatusCode::OK.into_response()
        }
        Ok(Chunk::End) => StatusCode::OK.into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn get_schema(State(s): State<Shared>, Path(_id): Path<String>) -> Vec<u8> {
    s.schema.clone()
}

async fn get_indexes(State(s): State<Shared>, Path(_id): Path<String>) -> Vec<u8> {
    s.indexes.clone()
}

async fn put_schema(State(s): State<Shared>, Path(_id): Path<String>, body: Bytes) -> StatusCode {
    *s.received_schema.lock().unwrap() = Some(body.to_vec());
    StatusCode::OK
}

async fn put_indexes(State(s): State<Shared>, Path(_id): Path<String>, body: Bytes) -> StatusCode {
    *s.received_indexes.lock().unwrap() = Some(body.to_vec());
    StatusCode::OK
}

async fn reset_sequences(Path(_id): Path<String>) -> StatusCode {
    StatusCode::OK
}

/// Starts the mock on an ephemeral port and returns its base URL.
pub async fn spawn(server: MockServer) -> (Shared, String) {
    let state: Shared = Arc::new(server);
    let app = Router::new()
        .route("/", get(root))
        .route("/sessions", post(open_session))
        .route("/sessions/{id}", axum::routing::delete(close_session))
        .route("/sessions/{id}/tables", get(manifest))
        .route("/sessions/{id}/tables/{table}", post(push))
        .route("/sessions/{id}/tables/{table}/{chunksize}", get(pull))
        .route("/sessions/{id}/schema", get(get_schema).post(put_schema))
        .route("/sessions/{id}/indexes", get(get_indexes).post(put_indexes))
        .route("/sessions/{id}/reset_sequences", post(reset_sequences))
        .layer(middleware::from_fn_with_state(state.clone(), gate))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, format!("http://{addr}/"))
}

/// Schema tool that runs the schema payload as SQL against the local store
/// and records every call in order.
pub struct RecordingSchema {
    pub conn: libsql::Connection,
    pub calls: Mutex<Vec<String>>,
    pub dump: Vec<u8>,
}

impl RecordingSchema {
    pub fn new(store: &LibsqlStore) -> Self {
        Self {
            conn: store.connection().clone(),
            calls: Mutex::new(Vec::new()),
            dump: b"-- local schema".to_vec(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaTool for RecordingSchema {
    async fn load_schema(&self, schema: &[u8]) -> Result<()> {
        self.calls.lock().unwrap().push("load_schema".into());
        let sql = String::from_utf8_lossy(schema).into_owned();
        self.conn.execute_batch(&sql).await?;
        Ok(())
    }

    async fn load_indexes(&self, indexes: &[u8]) -> Result<()> {
        self.calls.lock().unwrap().push("load_indexes".into());
        let sql = String::from_utf8_lossy(indexes).into_owned();
        self.conn.execute_batch(&sql).await?;
        Ok(())
    }

    async fn reset_sequences(&self) -> Result<()> {
        self.calls.lock().unwrap().push("reset_sequences".into());
        Ok(())
    }

    async fn dump_schema(&self) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push("dump_schema".into());
        Ok(self.dump.clone())
    }

    async fn dump_indexes(&self) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push("dump_indexes".into());
        Ok(b"-- local indexes".to_vec())
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Progress for RecordingProgress {
    fn total(&self, tables: usize, rows: u64) {
        self.events.lock().unwrap().push(format!("total {tables} {rows}"));
    }

    fn table_started(&self, table: &str, rows: u64) {
        self.events.lock().unwrap().push(format!("start {table} {rows}"));
    }

    fn rows_done(&self, table: &str, rows: u64) {
        self.events.lock().unwrap().push(format!("rows {table} {rows}"));
    }

    fn table_finished(&self, table: &str) {
        self.events.lock().unwrap().push(format!("finish {table}"));
    }
}

pub async fn scratch_store() -> (tempfile::TempDir, PathBuf, LibsqlStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.db");
    let store = LibsqlStore::open(&path).await.unwrap();
    (dir, path, store)
}

/// Options with the batch size pinned so page boundaries are predictable.
pub fn pinned_options(database: PathBuf, chunksize: u64) -> TransferOptions {
    TransferOptions {
        database,
        chunksize,
        advisor: AdvisorConfig {
            min: chunksize,
            max: chunksize,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn user(id: i64, name: &str) -> Row {
    vec![Cell::Integer(id), Cell::Text(name.to_string())]
}

pub async fn read_rows(store: &LibsqlStore, sql: &str) -> Vec<Row> {
    let mut rows = store.connection().query(sql, ()).await.unwrap();
    let mut out = Vec::new();
    while let Some(row) = rows.next().await.unwrap() {
        let mut r = Vec::new();
        for i in 0..row.column_count() {
            r.push(Cell::from(row.get_value(i).unwrap()));
        }
        out.push(r);
    }
    out
}
