//! Background consumption of provider notifications.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::gateway::service::ChainTransactionGateway;

/// Feed provider notifications into `gateway` until `shutdown` fires.
///
/// Returns `None` when there is no provider to listen to.
pub fn spawn_event_listener(
    gateway: Arc<ChainTransactionGateway>,
    mut shutdown: broadcast::Receiver<()>,
) -> Option<JoinHandle<()>> {
    let mut events = gateway.subscribe_provider_events()?;

    Some(tokio::spawn(async move {
        tracing::info!("Provider event listener started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                received = events.recv() => match received {
                    Ok(event) => {
                        tracing::debug!(?event, "Provider event");
                        gateway.handle_provider_event(event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Missed events can't be replayed; a reload resyncs.
                        tracing::warn!(skipped, "Provider events lagged; reloading");
                        gateway.reload().await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        tracing::info!("Provider event listener stopped");
    }))
}
