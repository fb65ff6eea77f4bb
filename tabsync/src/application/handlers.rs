use std::time::Duration;

use tabsync_core::advisor::AdvisorConfig;
use tabsync_core::codec::{Codec, CodecId};
use tabsync_core::error::{Result, SyncError};
use tabsync_core::{
    Backend, LogProgress, Remote, RemoteConfig, SubprocessSchemaTool, Transfer, TransferOptions,
    TransferStats, open_store,
};

use crate::presentation::cli::TransferArgs;

fn options_from_args(args: &TransferArgs, with_schema: bool) -> Result<TransferOptions> {
    if args.chunksize == 0 {
        return Err(SyncError::Config("--chunksize must be at least 1".into()));
    }
    let advisor = advisor_bounds(args)?;
    let codec = if args.no_compression {
        Codec::store()
    } else {
        Codec {
            id: CodecId::Zstd,
            level: args.compression_level,
        }
    };
    Ok(TransferOptions {
        database: args.database.clone(),
        chunksize: args.chunksize,
        codec,
        advisor,
        max_corruption_retries: args.max_retries,
        tables: args.tables.clone(),
        with_schema,
    })
}

/// Unset bounds stretch to include `--chunksize`; explicit ones must contain it.
fn advisor_bounds(args: &TransferArgs) -> Result<AdvisorConfig> {
    let defaults = AdvisorConfig::default();
    let min = args.min_chunksize.unwrap_or(defaults.min.min(args.chunksize));
    let max = args.max_chunksize.unwrap_or(defaults.max.max(args.chunksize));
    if min > max {
        return Err(SyncError::Config(format!(
            "--min-chunksize {min} is above --max-chunksize {max}"
        )));
    }
    if !(min..=max).contains(&args.chunksize) {
        return Err(SyncError::Config(format!(
            "--chunksize {} is outside [{min}, {max}]",
            args.chunksize
        )));
    }
    Ok(AdvisorConfig {
        min,
        max,
        ..defaults
    })
}

fn remote_from_args(args: &TransferArgs) -> Result<Remote> {
    Remote::new(&RemoteConfig {
        url: args.remote.clone(),
        timeout: args.timeout_secs.map(Duration::from_secs),
        connect_timeout: Some(Duration::from_secs(args.connect_timeout_secs)),
        ..Default::default()
    })
}

fn report_stats(verb: &str, stats: &TransferStats) {
    tracing::info!(
        tables = stats.tables,
        rows = stats.rows,
        pages = stats.pages,
        corrupted_retries = stats.corrupted_retries,
        wire_bytes = stats.wire_bytes,
        "{verb} complete"
    );
}

pub async fn handle_send(args: TransferArgs, with_schema: bool) -> Result<()> {
    let opts = options_from_args(&args, with_schema)?;
    let remote = remote_from_args(&args)?;
    if !opts.database.exists() {
        return Err(SyncError::Config(format!(
            "database {} does not exist",
            opts.database.display()
        )));
    }
    let store = open_store(Backend::Libsql, &opts.database).await?;
    let schema = SubprocessSchemaTool::new(&args.schema_tool, &opts.database)?;

    let stats = Transfer {
        remote: &remote,
        store: store.as_ref(),
        schema: &schema,
        progress: &LogProgress,
        opts: &opts,
    }
    .send()
    .await?;
    report_stats("send", &stats);
    Ok(())
}

pub async fn handle_receive(args: TransferArgs) -> Result<()> {
    let opts = options_from_args(&args, false)?;
    let remote = remote_from_args(&args)?;
    let store = open_store(Backend::Libsql, &opts.database).await?;
    let schema = SubprocessSchemaTool::new(&args.schema_tool, &opts.database)?;

    let stats = Transfer {
        remote: &remote,
        store: store.as_ref(),
        schema: &schema,
        progress: &LogProgress,
        opts: &opts,
    }
    .receive()
    .await?;
    report_stats("receive", &stats);
    Ok(())
}
