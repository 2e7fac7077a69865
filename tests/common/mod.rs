//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::MockServer;

use flowsync::config::{
    Config, MeterConfig, PollingConfig, RemoteConfig, RetryConfig, ServerConfig,
    DEFAULT_BATCH_TAG,
};
use flowsync::server::{AppState, Server};
use flowsync::sync::{build_coordinator, SyncCoordinator, TimedHttpClient};

pub const SHIP: &str = "MV Integration";
pub const TOKEN: &str = "integration-token";

/// Build a snapshot record as the archive returns it
pub fn snapshot_record(uuid: &str, batch: i64, timestamp: &str) -> Value {
    json!({
        "uuid": uuid,
        "timestamp": timestamp,
        "snapshot": {
            "ts": timestamp,
            "tags": { DEFAULT_BATCH_TAG: { "v": batch } }
        }
    })
}

/// Config pointing one meter at `archive` and every remote endpoint at `remote`
pub fn create_test_config(archive: &MockServer, remote: &MockServer, tickets: bool) -> Config {
    Config {
        ship_name: SHIP.to_string(),
        remote: RemoteConfig {
            api_url: format!("{}/api/snapshots", remote.uri()),
            batch_url: format!("{}/api/snapshots/batch", remote.uri()),
            token: TOKEN.to_string(),
            ticket_url: tickets.then(|| format!("{}/api/tickets", remote.uri())),
        },
        meters: vec![MeterConfig {
            id: "FM-01".to_string(),
            local_api_url: archive.uri(),
            archive_name: "Main".to_string(),
        }],
        polling: PollingConfig {
            page_size: 3,
            ..Default::default()
        },
        retry: RetryConfig {
            max_attempts: 1,
            delay_secs: 0,
        },
        ..Default::default()
    }
}

/// Build a coordinator for `config` with a fresh client
pub fn create_test_coordinator(config: &Config) -> Arc<SyncCoordinator> {
    let client = TimedHttpClient::new().expect("Failed to build HTTP client");
    Arc::new(build_coordinator(config, client))
}

/// Create a test server configuration with a random port
pub fn create_test_server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0, // Let OS assign a free port
    }
}

/// Run a test server in the background and return the address
/// The server will be shut down when the returned shutdown sender is dropped or sent
pub async fn run_test_server(
    coordinator: Arc<SyncCoordinator>,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = Server::new(create_test_server_config(), AppState { coordinator });

    tokio::spawn(async move {
        let _ = server
            .serve(listener, async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    (addr, shutdown_tx)
}
