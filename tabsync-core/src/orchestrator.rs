use crate::advisor::ChunksizeAdvisor;
use crate::error::Result;
use crate::options::TransferOptions;
use crate::progress::{Progress, TransferStats};
use crate::remote::{Remote, Session};
use crate::schema::SchemaTool;
use crate::store::LocalStore;
use crate::transfer::{TableReceiver, TableSender};

/// Everything a `send` or `receive` talks to.
pub struct Transfer<'a> {
    pub remote: &'a Remote,
    pub store: &'a dyn LocalStore,
    pub schema: &'a dyn SchemaTool,
    pub progress: &'a dyn Progress,
    pub opts: &'a TransferOptions,
}

impl Transfer<'_> {
    /// handshake → table data → remote sequence reset
    pub async fn send(&self) -> Result<TransferStats> {
        self.remote.verify().await?;
        let session = self.remote.open_session().await?;
        let outcome = self.send_in(&session).await;
        finish(session, outcome).await
    }

    /// handshake → schema → table data → indexes → local sequence reset
    pub async fn receive(&self) -> Result<TransferStats> {
        self.remote.verify().await?;
        let session = self.remote.open_session().await?;
        let outcome = self.receive_in(&session).await;
        finish(session, outcome).await
    }

    fn advisor(&self) -> ChunksizeAdvisor {
        ChunksizeAdvisor::new(self.opts.advisor.clone())
    }

    async fn send_in(&self, session: &Session<'_>) -> Result<TransferStats> {
        if self.opts.with_schema {
            let schema = self.schema.dump_schema().await?;
            session.push_schema(&schema).await?;
        }

        let advisor = self.advisor();
        let stats = TableSender {
            store: self.store,
            session,
            advisor: &advisor,
            progress: self.progress,
            opts: self.opts,
        }
        .send_all()
        .await?;

        if self.opts.with_schema {
            let indexes = self.schema.dump_indexes().await?;
            session.push_indexes(&indexes).await?;
        }
        session.reset_sequences().await?;
        Ok(stats)
    }

    async fn receive_in(&self, session: &Session<'_>) -> Result<TransferStats> {
        // Tables must exist before rows arrive.
        let schema = session.schema().await?;
        self.schema.load_schema(&schema).await?;

        let advisor = self.advisor();
        let stats = TableReceiver {
            store: self.store,
            session,
            advisor: &advisor,
            progress: self.progress,
            opts: self.opts,
        }
        .receive_all()
        .await?;

        // Indexes after the bulk load, sequences last.
        let indexes = session.indexes().await?;
        self.schema.load_indexes(&indexes).await?;
        self.schema.reset_sequences().await?;
        Ok(stats)
    }
}

/// Releases the session whatever the outcome; the first error wins.
async fn finish<T>(session: Session<'_>, outcome: Result<T>) -> Result<T> {
    let id = session.id().to_string();
    match (outcome, session.close().await) {
        (Ok(v), Ok(())) => Ok(v),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!(session = %id, error = %close_err, "session close failed");
            Err(e)
        }
    }
}
