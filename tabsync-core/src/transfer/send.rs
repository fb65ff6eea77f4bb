use crate::advisor::ChunksizeAdvisor;
use crate::codec::ChunkEnvelope;
use crate::cursor::TransferCursor;
use crate::error::Result;
use crate::options::TransferOptions;
use crate::page::Chunk;
use crate::progress::{Progress, TransferStats};
use crate::remote::Session;
use crate::retry;
use crate::store::LocalStore;

/// Pushes local tables to the remote session one page at a time.
pub struct TableSender<'a> {
    pub store: &'a dyn LocalStore,
    pub session: &'a Session<'a>,
    pub advisor: &'a ChunksizeAdvisor,
    pub progress: &'a dyn Progress,
    pub opts: &'a TransferOptions,
}

impl TableSender<'_> {
    pub async fn send_all(&self) -> Result<TransferStats> {
        let mut plan = Vec::new();
        for table in self.store.tables().await? {
            if self.opts.wants(&table) {
                let rows = self.store.row_count(&table).await?;
                plan.push((table, rows));
            }
        }
        self.progress
            .total(plan.len(), plan.iter().map(|(_, n)| n).sum());

        let mut stats = TransferStats::default();
        for (table, rows) in &plan {
            stats.merge(&self.send_table(table, *rows).await?);
        }
        Ok(stats)
    }

    pub async fn send_table(&self, table: &str, rows: u64) -> Result<TransferStats> {
        let columns = self.store.columns(table).await?;
        let mut cursor =
            TransferCursor::new(table, self.advisor.clamp(self.opts.chunksize)).ordered_by(&columns);
        let mut stats = TransferStats {
            tables: 1,
            ..Default::default()
        };
        self.progress.table_started(table, rows);

        loop {
            let page = self
                .store
                .fetch_page(
                    table,
                    &columns,
                    cursor.order_by.as_deref(),
                    cursor.batch_size,
                    cursor.offset,
                )
                .await?;
            if page.is_empty() {
                break;
            }
            let n = page.len();
            let envelope = ChunkEnvelope::seal(&self.opts.codec, &Chunk::Rows(page))?;
            let (next, retries) = self.transmit(&cursor, &envelope).await?;

            tracing::debug!(
                %table,
                offset = cursor.offset,
                rows = n,
                bytes = envelope.bytes.len(),
                next,
                "page sent"
            );
            cursor.advance(n, next);
            stats.record_page(n, envelope.bytes.len(), retries);
            self.progress.rows_done(table, n as u64);
        }

        self.progress.table_finished(table);
        tracing::info!(%table, rows = cursor.offset, pages = stats.pages, "table sent");
        Ok(stats)
    }

    /// Resends the identical envelope while the server reports a checksum mismatch.
    async fn transmit(&self, cursor: &TransferCursor, envelope: &ChunkEnvelope) -> Result<(u64, u32)> {
        let advisor = self.advisor;
        let session = self.session;
        let table = cursor.table.as_str();
        let (size, offset) = (cursor.batch_size, cursor.offset);
        retry::on_corruption(self.opts.max_corruption_retries, move || async move {
            let (next, res) = advisor
                .next(size, session.push_chunk(table, offset, envelope))
                .await;
            res.map(|()| next)
        })
        .await
    }
}
