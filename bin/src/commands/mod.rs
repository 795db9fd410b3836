//! CLI command implementations.

pub(crate) mod ingest;
pub(crate) mod levels;
pub(crate) mod live;
pub(crate) mod period;
pub(crate) mod replay;
pub(crate) mod sanitize;

use tokio_util::sync::CancellationToken;

/// Returns a token cancelled on the first Ctrl-C.
pub(crate) fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
        }
        cancel.cancel();
    });
    token
}
