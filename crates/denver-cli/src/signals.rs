use std::thread;

use denver_core::CancelToken;
use tokio::signal;
use tracing::{info, warn};

const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Turns the first interrupt or terminate signal into process cancellation.
/// A second signal exits right away.
pub(crate) fn spawn_signal_watcher(cancel: CancelToken) {
    let spawned = thread::Builder::new()
        .name("denver-signals".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    warn!(?err, "failed to build signal runtime");
                    return;
                }
            };
            runtime.block_on(async {
                shutdown_signal().await;
                info!("cancellation requested");
                cancel.cancel();
                shutdown_signal().await;
            });
            std::process::exit(INTERRUPTED_EXIT_CODE);
        });
    if let Err(err) = spawned {
        warn!(?err, "failed to spawn signal watcher");
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        tokio::select! {
            _ = ctrl_c() => {},
            _ = terminate() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(?err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(err) => {
            warn!(?err, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}
