//! Graceful shutdown utilities

use tracing::warn;

/// Which signal ended the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    CtrlC,
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::CtrlC => write!(f, "Ctrl+C"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Wait for Ctrl+C, or SIGTERM on Unix
///
/// ```ignore
/// tokio::select! {
///     signal = common::wait_for_shutdown() => info!("Received {}", signal),
///     _ = poll_loop() => {}
/// }
/// ```
pub async fn wait_for_shutdown() -> ShutdownSignal {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let term_signal = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!(
                    "Failed to install SIGTERM handler: {}. Service will only respond to Ctrl+C",
                    e
                );
                None
            },
        };

        tokio::select! {
            _ = ctrl_c() => ShutdownSignal::CtrlC,
            _ = async {
                match term_signal {
                    Some(mut sig) => {
                        sig.recv().await;
                    },
                    None => std::future::pending::<()>().await,
                }
            } => ShutdownSignal::Terminate,
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c().await;
        ShutdownSignal::CtrlC
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await
    }
}
