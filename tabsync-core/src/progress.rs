/// Receives per-table progress from the transfer loops.
pub trait Progress: Send + Sync {
    fn total(&self, _tables: usize, _rows: u64) {}
    fn table_started(&self, table: &str, rows: u64);
    fn rows_done(&self, table: &str, rows: u64);
    fn table_finished(&self, table: &str);
}

/// Progress as log lines.
pub struct LogProgress;

impl Progress for LogProgress {
    fn total(&self, tables: usize, rows: u64) {
        tracing::info!(tables, rows, "transferring {rows} records");
    }

    fn table_started(&self, table: &str, rows: u64) {
        tracing::info!(%table, rows, "table started");
    }

    fn rows_done(&self, table: &str, rows: u64) {
        tracing::debug!(%table, rows, "rows transferred");
    }

    fn table_finished(&self, table: &str) {
        tracing::info!(%table, "table finished");
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub tables: u64,
    pub rows: u64,
    pub pages: u64,
    pub corrupted_retries: u64,
    pub wire_bytes: u64,
}

impl TransferStats {
    pub fn record_page(&mut self, rows: usize, wire_bytes: usize, retries: u32) {
        self.pages += 1;
        self.rows += rows as u64;
        self.wire_bytes += wire_bytes as u64;
        self.corrupted_retries += retries as u64;
    }

    pub fn merge(&mut self, other: &TransferStats) {
        self.tables += other.tables;
        self.rows += other.rows;
        self.pages += other.pages;
        self.corrupted_retries += other.corrupted_retries;
        self.wire_bytes += other.wire_bytes;
    }
}
