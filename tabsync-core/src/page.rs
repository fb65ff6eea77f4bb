// tabsync_core/src/page.rs
use serde::{Deserialize, Serialize};

/// One column value, independent of the database driver.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(#[serde(with = "serde_bytes")] Vec<u8>),
}

pub type Row = Vec<Cell>;

/// A bounded run of rows from one table plus the column names they follow.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub header: Vec<String>,
    pub data: Vec<Row>,
}

impl Page {
    pub fn new(header: Vec<String>, data: Vec<Row>) -> Self {
        Self { header, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Unit of transfer. `End` is the `{}` sentinel that terminates a table,
/// which is not the same thing as a page whose `data` happens to be empty.
#[derive(Clone, Debug, PartialEq)]
pub enum Chunk {
    Rows(Page),
    End,
}

impl Chunk {
    pub fn rows(&self) -> usize {
        match self {
            Chunk::Rows(p) => p.len(),
            Chunk::End => 0,
        }
    }
}

/// Wire shape: `{header, data}` or `{}`.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct WirePage {
    #[serde(default)]
    pub header: Option<Vec<String>>,
    #[serde(default)]
    pub data: Option<Vec<Row>>,
}

#[derive(Serialize)]
pub(crate) struct WirePageRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a [Row]>,
}

impl<'a> From<&'a Chunk> for WirePageRef<'a> {
    fn from(c: &'a Chunk) -> Self {
        match c {
            Chunk::Rows(p) => WirePageRef {
                header: Some(&p.header),
                data: Some(&p.data),
            },
            Chunk::End => WirePageRef {
                header: None,
                data: None,
            },
        }
    }
}

impl TryFrom<WirePage> for Chunk {
    type Error = String;

    fn try_from(w: WirePage) -> std::result::Result<Self, Self::Error> {
        match (w.header, w.data) {
            (None, None) => Ok(Chunk::End),
            (Some(header), Some(data)) => {
                if let Some(bad) = data.iter().position(|r| r.len() != header.len()) {
                    return Err(format!(
                        "row {bad} has {} cells, header has {} columns",
                        data[bad].len(),
                        header.len()
                    ));
                }
                Ok(Chunk::Rows(Page { header, data }))
            }
            (Some(_), None) => Err("page has a header but no data".into()),
            (None, Some(_)) => Err("page has data but no header".into()),
        }
    }
}
