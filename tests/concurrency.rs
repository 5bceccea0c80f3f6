//! Independent sessions driven in parallel against their own servers.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{connected_with_metrics, PASSWORD};
use mt5_webapi::config::ClientConfig;
use mt5_webapi::service::{BalanceType, Session};
use mt5_webapi::transport::TransportOptions;
use mt5_webapi::utils::metrics::Metrics;
use std::sync::Arc;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_sessions_share_metrics() {
    let sessions = 32usize;
    let operations = 20usize;
    let metrics = Arc::new(Metrics::new());

    let mut tasks = JoinSet::new();
    for id in 0..sessions {
        let (transport, mut server) =
            connected_with_metrics(TransportOptions::default(), Arc::clone(&metrics));

        tasks.spawn(async move {
            server.accept_login().await;
            for _ in 0..operations {
                let request = server
                    .answer("TRADE_BALANCE|RETCODE=0 Done|\r\n")
                    .await;
                assert_eq!(request.params()["LOGIN"], (id + 1).to_string());
            }
            assert_eq!(server.read_request().await.command(), "QUIT");
        });

        tasks.spawn(async move {
            let mut session =
                Session::from_transport(transport, &ClientConfig::default(), "1000", PASSWORD)
                    .await
                    .unwrap();
            for op in 0..operations {
                session
                    .set_user_balance(id as u64 + 1, BalanceType::Credit, op as f64, "load")
                    .await
                    .unwrap();
            }
            session.disconnect().await.unwrap();
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.connections_total, sessions as u64);
    assert_eq!(snapshot.connections_active, 0);
    assert_eq!(snapshot.handshakes_success, sessions as u64);
    // two handshake frames, the operations and QUIT
    assert_eq!(
        snapshot.frames_sent,
        (sessions * (operations + 3)) as u64
    );
}
