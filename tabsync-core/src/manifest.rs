use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub table: String,
    pub rows: u64,
}

/// Tables held by the remote side, fetched once before any rows move.
/// Entries keep the order the server listed them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableManifest {
    pub entries: Vec<ManifestEntry>,
}

impl TableManifest {
    /// Wire form is a JSON object of table name to row count.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| SyncError::Protocol(format!("table manifest: {e}")))
    }

    /// For progress display only; termination never depends on it.
    pub fn total_rows(&self) -> u64 {
        self.entries.iter().map(|e| e.rows).sum()
    }

    pub fn retain_tables(&mut self, only: &[String]) {
        if !only.is_empty() {
            self.entries.retain(|e| only.iter().any(|t| t == &e.table));
        }
    }
}

struct ManifestVisitor;

impl<'de> Visitor<'de> for ManifestVisitor {
    type Value = TableManifest;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of table name to row count")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<TableManifest, A::Error> {
        let mut entries: Vec<ManifestEntry> = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((table, rows)) = map.next_entry::<String, u64>()? {
            if entries.iter().any(|e| e.table == table) {
                return Err(de::Error::custom(format!("table `{table}` listed twice")));
            }
            entries.push(ManifestEntry { table, rows });
        }
        Ok(TableManifest { entries })
    }
}

impl<'de> Deserialize<'de> for TableManifest {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        d.deserialize_map(ManifestVisitor)
    }
}
