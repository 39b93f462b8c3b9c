use log::{info, warn};
use std::future::Future;
use std::io;

/// Resolves once `listener` fires. A listener that cannot be installed is
/// reported and never resolves, so the logger keeps running without it.
pub async fn on_signal<F>(name: &str, listener: F)
where
    F: Future<Output = io::Result<()>>,
{
    match listener.await {
        Ok(()) => info!("Received {}", name),
        Err(e) => {
            warn!("Failed to listen for {}: {}", name, e);
            std::future::pending::<()>().await;
        }
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it.
pub async fn shutdown_requested() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let terminate = async {
            let mut stream = signal(SignalKind::terminate())?;
            stream.recv().await;
            Ok::<(), io::Error>(())
        };

        tokio::select! {
            _ = on_signal("Ctrl-C", tokio::signal::ctrl_c()) => {}
            _ = on_signal("SIGTERM", terminate) => {}
        }
    }

    #[cfg(not(unix))]
    on_signal("Ctrl-C", tokio::signal::ctrl_c()).await;
}
