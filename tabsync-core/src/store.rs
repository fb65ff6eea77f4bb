// tabsync_core/src/store.rs
use async_trait::async_trait;

use crate::error::Result;
use crate::page::{Page, Row};

/// Narrow view of the local database the transfer loops need.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn tables(&self) -> Result<Vec<String>>;

    async fn columns(&self, table: &str) -> Result<Vec<String>>;

    async fn row_count(&self, table: &str) -> Result<u64>;

    /// Rows `offset..offset + limit` of `table` in `order_by` order.
    async fn fetch_page(
        &self,
        table: &str,
        columns: &[String],
        order_by: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> Result<Page>;

    /// Returns the number of rows written.
    async fn insert_rows(&self, table: &str, header: &[String], rows: &[Row]) -> Result<u64>;
}
