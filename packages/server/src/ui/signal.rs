//! Shutdown signals.

use tokio::sync::watch;

/// Resolve on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Resolve once the server has started shutting down.
///
/// Never resolves if the sender goes away without signalling.
pub async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stopping| *stopping).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_for_shutdown_resolves_after_signal() {
        // テスト項目: true が送られると待機が解除される
        // given (前提条件):
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_shutdown(rx));

        // when (操作):
        tx.send(true).unwrap();

        // then (期待する結果):
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_ignores_dropped_sender() {
        // テスト項目: シグナルなしで送信側が破棄されても解除されない
        // given (前提条件):
        let (tx, rx) = watch::channel(false);
        drop(tx);

        // when (操作):
        let result = tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown(rx)).await;

        // then (期待する結果):
        assert!(result.is_err());
    }
}
