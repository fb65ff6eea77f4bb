use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};

use super::{CHECKSUM_HEADER, Remote, check};
use crate::codec::ChunkEnvelope;
use crate::error::{Result, SyncError};
use crate::manifest::TableManifest;

/// Server-side transfer state, released by `close`.
pub struct Session<'r> {
    remote: &'r Remote,
    id: String,
}

impl<'r> Session<'r> {
    pub(crate) fn new(remote: &'r Remote, id: String) -> Self {
        Self { remote, id }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn url(&self, rest: &[&str]) -> Result<Url> {
        let mut segments = vec!["sessions", self.id.as_str()];
        segments.extend_from_slice(rest);
        self.remote.url(&segments)
    }

    async fn get_bytes(&self, rest: &[&str]) -> Result<Vec<u8>> {
        let url = self.url(rest)?;
        let resp = self.remote.send(self.remote.request(Method::GET, url)).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn post_bytes(&self, rest: &[&str], body: &[u8]) -> Result<()> {
        let url = self.url(rest)?;
        let rb = self
            .remote
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body.to_vec());
        self.remote.send(rb).await?;
        Ok(())
    }

    /// Uploads one encoded page. `412 Precondition Failed` means the server
    /// saw different bytes than the checksum promised.
    pub async fn push_chunk(&self, table: &str, offset: u64, envelope: &ChunkEnvelope) -> Result<()> {
        let url = self.url(&["tables", table])?;
        let rb = self
            .remote
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CHECKSUM_HEADER, &envelope.checksum)
            .body(envelope.bytes.clone());
        let resp = rb.send().await?;
        if resp.status() == StatusCode::PRECONDITION_FAILED {
            return Err(SyncError::CorruptedChunk {
                table: table.to_string(),
                offset,
            });
        }
        check(resp).await?;
        Ok(())
    }

    /// Downloads one encoded page; the payload is not verified here.
    pub async fn pull_chunk(&self, table: &str, chunksize: u64, offset: u64) -> Result<ChunkEnvelope> {
        let size = chunksize.to_string();
        let mut url = self.url(&["tables", table, &size])?;
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string());
        let resp = self.remote.send(self.remote.request(Method::GET, url)).await?;
        let checksum = resp
            .headers()
            .get(CHECKSUM_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| {
                SyncError::Protocol(format!("page of {table} at offset {offset} has no checksum"))
            })?;
        let bytes = resp.bytes().await?.to_vec();
        Ok(ChunkEnvelope { bytes, checksum })
    }

    pub async fn manifest(&self) -> Result<TableManifest> {
        TableManifest::from_json(&self.get_bytes(&["tables"]).await?)
    }

    pub async fn schema(&self) -> Result<Vec<u8>> {
        self.get_bytes(&["schema"]).await
    }

    pub async fn indexes(&self) -> Result<Vec<u8>> {
        self.get_bytes(&["indexes"]).await
    }

    pub async fn push_schema(&self, schema: &[u8]) -> Result<()> {
        self.post_bytes(&["schema"], schema).await
    }

    pub async fn push_indexes(&self, indexes: &[u8]) -> Result<()> {
        self.post_bytes(&["indexes"], indexes).await
    }

    pub async fn reset_sequences(&self) -> Result<()> {
        let url = self.url(&["reset_sequences"])?;
        self.remote
            .send(self.remote.request(Method::POST, url))
            .await?;
        Ok(())
    }

    /// Consumes the session; it cannot be used once released.
    pub async fn close(self) -> Result<()> {
        let url = self.url(&[])?;
        self.remote
            .send(self.remote.request(Method::DELETE, url))
            .await?;
        tracing::info!(session = %self.id, "session closed");
        Ok(())
    }
}
