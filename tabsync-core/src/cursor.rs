/// Per-table progress of a send or receive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferCursor {
    pub table: String,
    pub offset: u64,
    pub batch_size: u64,
    pub order_by: Option<String>,
}

impl TransferCursor {
    pub fn new(table: impl Into<String>, batch_size: u64) -> Self {
        Self {
            table: table.into(),
            offset: 0,
            batch_size: batch_size.max(1),
            order_by: None,
        }
    }

    pub fn ordered_by(mut self, columns: &[String]) -> Self {
        self.order_by = order_column(columns).map(str::to_owned);
        self
    }

    /// Only call once the page is inserted locally or acknowledged remotely.
    pub fn advance(&mut self, rows: usize, next_batch: u64) {
        self.offset += rows as u64;
        self.batch_size = next_batch.max(1);
    }
}

/// `id` when the table has one, otherwise the first column.
///
/// The fallback only yields a stable order when that column's values are
/// unique and nobody writes to the table while it is being paged.
pub fn order_column(columns: &[String]) -> Option<&str> {
    columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case("id"))
        .or_else(|| columns.first())
        .map(String::as_str)
}
