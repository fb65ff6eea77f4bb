mod application;
mod presentation;

use std::process::ExitCode;

use tabsync_core::SyncError;

#[tokio::main]
async fn main() -> ExitCode {
    match application::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", failure_line(&e));
            ExitCode::FAILURE
        }
    }
}

/// The one line printed on failure.
fn failure_line(e: &SyncError) -> String {
    if e.is_fatal_handshake() {
        // Server-provided message, shown as is.
        e.to_string().trim().to_string()
    } else {
        format!("tabsync: {e}")
    }
}
