//! # Transaction intake loop
//!
//! Forwards application-submitted transactions into the local
//! transaction pool, where the next self-event picks them up.

use node_core::Core;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

pub async fn run(proxy: Arc<proxy::Proxy>, core: Arc<Core>, mut shutdown: watch::Receiver<bool>) {
    loop {
        let transaction = tokio::select! {
            transaction = proxy.recv_transaction() => match transaction {
                Some(transaction) => transaction,
                None => break,
            },
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        if let Err(err) = core.submit_transaction(transaction) {
            warn!(%err, "transaction pool full, submission dropped");
        }
    }
}
