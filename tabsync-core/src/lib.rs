#![forbid(unsafe_code)]

pub mod error;
pub mod options;

pub mod advisor;
pub mod codec;
pub mod cursor;
pub mod manifest;
pub mod page;
pub mod progress;
pub mod retry;

pub mod remote;

pub mod schema;
pub mod store;
pub mod store_factory;
pub mod store_libsql;

pub mod orchestrator;
pub mod transfer;

// Re-exports: stable API surface
pub use error::{Result, SyncError};
pub use options::{PROTOCOL_VERSION, RemoteConfig, TransferOptions};
pub use orchestrator::Transfer;
pub use progress::{LogProgress, Progress, TransferStats};
pub use remote::Remote;
pub use schema::{SchemaTool, SubprocessSchemaTool};
pub use store::LocalStore;
pub use store_factory::{Backend, open_store};
