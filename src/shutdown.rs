use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Token cancelled on the first SIGTERM or SIGINT.
///
/// `App::serve` hands it to three places: axum's graceful shutdown, the
/// job prune loop, and the job drain that follows, which waits up to
/// `jobs.shutdown_grace` for running summaries before giving up on them.
pub fn install_shutdown_handler() -> std::io::Result<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        let received = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        tracing::info!(signal = received, "Stopping repo-monitor, draining summary jobs");
        cancel.cancel();
    });

    Ok(token)
}
