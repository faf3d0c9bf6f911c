use tokio::sync::watch;

/// Returns a receiver that changes once the process is asked to terminate (SIGINT, or SIGTERM
/// on unix).
pub fn listen() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        terminate().await;

        log::info!("Received shutdown signal");
        let _ = tx.send(true);
    });

    rx
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            log::warn!("Failed to install SIGTERM handler: {}", err);
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn terminate() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for SIGINT: {}", err);
        // Never resolve, shutting down on a broken handler is worse.
        futures::future::pending::<()>().await;
    }
}
