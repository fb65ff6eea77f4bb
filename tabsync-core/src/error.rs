use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Server speaks a different protocol version; carries the server's message.
    #[error("{0}")]
    VersionMismatch(String),

    #[error("Bad credentials given for the remote endpoint")]
    Unauthorized,

    /// Checksum mismatch on a page in transit. Recovered by the transfer loops.
    #[error("Corrupted chunk for table {table} at offset {offset}")]
    CorruptedChunk { table: String, offset: u64 },

    #[error("Gave up on table {table} at offset {offset} after {attempts} corrupted transfers")]
    RetriesExhausted {
        table: String,
        offset: u64,
        attempts: u32,
    },

    #[error("Transmission error: {0}")]
    Transmission(#[from] reqwest::Error),

    #[error("Remote returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Storage error: {0}")]
    Storage(#[from] libsql::Error),

    #[error("Schema tool `{command}` exited with {status}")]
    SchemaToolFailed { command: String, status: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Errors the command must stop on without any further remote calls.
    pub fn is_fatal_handshake(&self) -> bool {
        matches!(self, SyncError::VersionMismatch(_) | SyncError::Unauthorized)
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, SyncError>;
