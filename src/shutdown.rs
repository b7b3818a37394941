use tokio::signal::unix::{signal, SignalKind};

/// Wait until SIGTERM or SIGINT is received.
///
/// The serve path awaits this and then stops the instance so in-flight
/// runs drain through the normal lifecycle instead of being killed.
pub async fn wait_for_shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}
