use std::future::Future;

use crate::error::{Result, SyncError};

/// Repeats `attempt` while it reports `CorruptedChunk`.
///
/// `max_retries` of `None` retries for as long as the peer keeps answering.
/// Any other error, or success, ends the loop immediately.
pub async fn on_corruption<T, F, Fut>(max_retries: Option<u32>, mut attempt: F) -> Result<(T, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0u32;
    loop {
        match attempt().await {
            Err(SyncError::CorruptedChunk { table, offset }) => {
                if max_retries.is_some_and(|max| retries >= max) {
                    return Err(SyncError::RetriesExhausted {
                        table,
                        offset,
                        attempts: retries + 1,
                    });
                }
                retries += 1;
                tracing::warn!(%table, offset, retries, "corrupted chunk, retrying");
            }
            other => return other.map(|v| (v, retries)),
        }
    }
}
