//! A `Sync` request whose diff would exceed the configured limit reports
//! `sync_limit = true` with an empty event list instead of the diff
//! itself, over the real wire protocol.

#[cfg(test)]
mod tests {
    use crate::harness::TestNetwork;
    use node::handler::CoreSyncHandler;
    use std::sync::Arc;
    use std::time::Duration;
    use sync::{RpcRequest, RpcResponse, SyncClient, SyncServer};

    #[tokio::test]
    async fn oversized_diff_reports_sync_limit_and_no_events() {
        let network = TestNetwork::new(2);
        network.genesis_all();

        // Give B five events total (the genesis plus four more), all
        // unknown to a peer that has never synced with it.
        for i in 0..4 {
            network.nodes[1].core.submit_transaction(format!("tx-{i}").into_bytes()).unwrap();
            network.nodes[1].core.add_self_event(None).unwrap();
        }

        let handler: Arc<dyn sync::SyncHandler> =
            Arc::new(CoreSyncHandler::new(network.nodes[1].core.clone(), network.nodes[1].store.clone()));
        let server = SyncServer::bind_with_limit("127.0.0.1:0", handler, 3).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(server.serve(shutdown_rx));

        let client = SyncClient::new(Duration::from_secs(1));
        let response = client
            .call(&addr.to_string(), RpcRequest::Sync { known: Default::default() })
            .await
            .unwrap();

        match response {
            RpcResponse::Sync { events, sync_limit, .. } => {
                assert!(sync_limit);
                assert!(events.is_empty());
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
