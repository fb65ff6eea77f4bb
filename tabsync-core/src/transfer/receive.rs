use crate::advisor::ChunksizeAdvisor;
use crate::cursor::TransferCursor;
use crate::error::Result;
use crate::options::TransferOptions;
use crate::page::Chunk;
use crate::progress::{Progress, TransferStats};
use crate::remote::Session;
use crate::retry;
use crate::store::LocalStore;

/// Pulls the tables named by the remote manifest into the local store.
pub struct TableReceiver<'a> {
    pub store: &'a dyn LocalStore,
    pub session: &'a Session<'a>,
    pub advisor: &'a ChunksizeAdvisor,
    pub progress: &'a dyn Progress,
    pub opts: &'a TransferOptions,
}

impl TableReceiver<'_> {
    pub async fn receive_all(&self) -> Result<TransferStats> {
        let mut manifest = self.session.manifest().await?;
        manifest.retain_tables(&self.opts.tables);
        self.progress
            .total(manifest.entries.len(), manifest.total_rows());

        let mut stats = TransferStats::default();
        for entry in &manifest.entries {
            stats.merge(&self.receive_table(&entry.table, entry.rows).await?);
        }
        Ok(stats)
    }

    pub async fn receive_table(&self, table: &str, rows: u64) -> Result<TransferStats> {
        let mut cursor = TransferCursor::new(table, self.advisor.clamp(self.opts.chunksize));
        let mut stats = TransferStats {
            tables: 1,
            ..Default::default()
        };
        self.progress.table_started(table, rows);

        loop {
            let ((next, chunk, wire), retries) = self.fetch(&cursor).await?;
            let page = match chunk {
                Chunk::Rows(page) if !page.is_empty() => page,
                // A page with no rows would never move the offset either.
                _ => break,
            };
            let n = page.len();
            let written = self
                .store
                .insert_rows(table, &page.header, &page.data)
                .await?;
            if written != n as u64 {
                tracing::warn!(%table, offset = cursor.offset, rows = n, written, "short insert");
            }

            tracing::debug!(%table, offset = cursor.offset, rows = n, bytes = wire, next, "page applied");
            cursor.advance(n, next);
            stats.record_page(n, wire, retries);
            self.progress.rows_done(table, n as u64);
        }

        self.progress.table_finished(table);
        tracing::info!(%table, rows = cursor.offset, pages = stats.pages, "table received");
        Ok(stats)
    }

    /// Asks for the same offset and size again while the digest does not match.
    async fn fetch(&self, cursor: &TransferCursor) -> Result<((u64, Chunk, usize), u32)> {
        let advisor = self.advisor;
        let session = self.session;
        let table = cursor.table.as_str();
        let (size, offset) = (cursor.batch_size, cursor.offset);
        retry::on_corruption(self.opts.max_corruption_retries, move || async move {
            let (next, res) = advisor
                .next(size, session.pull_chunk(table, size, offset))
                .await;
            let envelope = res?;
            let chunk = envelope.open(table, offset)?;
            Ok((next, chunk, envelope.bytes.len()))
        })
        .await
    }
}
