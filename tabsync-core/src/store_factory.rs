use std::path::Path;

use crate::error::Result;
use crate::store::LocalStore;
use crate::store_libsql::LibsqlStore;

pub enum Backend {
    Libsql,
}

pub async fn open_store(backend: Backend, database: &Path) -> Result<Box<dyn LocalStore>> {
    match backend {
        Backend::Libsql => Ok(Box::new(LibsqlStore::open(database).await?)),
    }
}
