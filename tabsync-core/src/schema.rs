use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Result, SyncError};

/// Schema, index and sequence handling lives outside the transfer core.
#[async_trait]
pub trait SchemaTool: Send + Sync {
    async fn load_schema(&self, schema: &[u8]) -> Result<()>;
    async fn load_indexes(&self, indexes: &[u8]) -> Result<()>;
    async fn reset_sequences(&self) -> Result<()>;
    async fn dump_schema(&self) -> Result<Vec<u8>>;
    async fn dump_indexes(&self) -> Result<Vec<u8>>;
}

/// Runs `<command...> <subcommand> <database> [file]`.
#[derive(Clone, Debug)]
pub struct SubprocessSchemaTool {
    program: PathBuf,
    prefix: Vec<String>,
    database: String,
}

impl SubprocessSchemaTool {
    /// `command` may carry leading arguments, e.g. `"bundle exec schema"`.
    pub fn new(command: &str, database: &Path) -> Result<Self> {
        let mut words = command.split_whitespace().map(str::to_owned);
        let program = words
            .next()
            .ok_or_else(|| SyncError::Config("empty schema tool command".into()))?;
        Ok(Self {
            program: PathBuf::from(program),
            prefix: words.collect(),
            database: database.to_string_lossy().into_owned(),
        })
    }

    async fn run(&self, subcommand: &str, file: Option<&Path>) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix).arg(subcommand).arg(&self.database);
        if let Some(f) = file {
            cmd.arg(f);
        }
        tracing::debug!(program = %self.program.display(), subcommand, "running schema tool");
        let out = cmd.output().await?;

        // Tool diagnostics go to the user as-is.
        std::io::stderr().write_all(&out.stderr)?;
        if !out.status.success() {
            std::io::stdout().write_all(&out.stdout)?;
            return Err(SyncError::SchemaToolFailed {
                command: format!("{} {}", self.program.display(), subcommand),
                status: out.status.to_string(),
            });
        }
        Ok(out.stdout)
    }

    /// Payload goes through a temp file that lives until the tool exits.
    async fn run_with_payload(&self, subcommand: &str, payload: &[u8]) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new()?;
        tmp.write_all(payload)?;
        tmp.flush()?;
        let stdout = self.run(subcommand, Some(tmp.path())).await?;
        std::io::stdout().write_all(&stdout)?;
        Ok(())
    }
}

#[async_trait]
impl SchemaTool for SubprocessSchemaTool {
    async fn load_schema(&self, schema: &[u8]) -> Result<()> {
        self.run_with_payload("load", schema).await
    }

    async fn load_indexes(&self, indexes: &[u8]) -> Result<()> {
        self.run_with_payload("load_indexes", indexes).await
    }

    async fn reset_sequences(&self) -> Result<()> {
        let stdout = self.run("reset_db_sequences", None).await?;
        std::io::stdout().write_all(&stdout)?;
        Ok(())
    }

    async fn dump_schema(&self) -> Result<Vec<u8>> {
        self.run("dump", None).await
    }

    async fn dump_indexes(&self) -> Result<Vec<u8>> {
        self.run("indexes", None).await
    }
}
