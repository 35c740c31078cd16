use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::core::state::AppState;
use crate::tasks::reconcile;

/// Runs both reconciliation loops until a shutdown signal arrives. Each loop
/// is an independent, restartable task; ticks within one loop serialize by
/// construction, so a slow batch is never processed twice in flight.
pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handles = vec![
        tokio::spawn(auto_finish_loop(state.clone(), shutdown_rx.clone())),
        tokio::spawn(auto_expire_loop(state.clone(), shutdown_rx.clone())),
    ];

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to reconciler tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Reconciler task join failed");
        }
    }

    Ok(())
}

async fn auto_finish_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick =
        interval(Duration::from_secs(state.settings().scheduler().auto_finish_interval_seconds));
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = reconcile::auto_finish_sessions(&state).await {
                    tracing::error!(error = %err, "auto_finish_sessions failed");
                }
            }
        }
    }
}

async fn auto_expire_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick =
        interval(Duration::from_secs(state.settings().scheduler().auto_expire_interval_seconds));
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = reconcile::auto_expire_exams(&state).await {
                    tracing::error!(error = %err, "auto_expire_exams failed");
                }
            }
        }
    }
}
