//! End-to-end tests for the local scan server over a real loopback socket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use backend_application::AppError;
use backend_bootstrap::{ScanServer, ServerError};
use backend_domain::ports::{run_in_transaction, ScanLogFilter, TicketStore};
use backend_domain::{utc_now, Event, RegistryTicket, RuntimeConfig, ServerPhase};
use backend_infrastructure::SqliteTicketStore;

fn seeded_store() -> Arc<dyn TicketStore> {
    let store: Arc<dyn TicketStore> = Arc::new(SqliteTicketStore::in_memory().expect("store"));
    let event = Event {
        event_id: "E1".to_string(),
        name: "Harbour Festival".to_string(),
        venue: None,
        event_date: None,
        total_tickets: 3,
        downloaded_at: Some(utc_now()),
        last_synced_at: None,
    };
    run_in_transaction(store.as_ref(), |tx| {
        tx.put_event(&event)?;
        for ticket_id in ["T-1", "T-2", "T-3"] {
            let ticket = RegistryTicket {
                ticket_id: ticket_id.to_string(),
                event_id: "E1".to_string(),
                attendee_name: format!("Guest {ticket_id}"),
                attendee_email: String::new(),
                ticket_type: "General".to_string(),
                purchase_date: String::new(),
                purchase_time: String::new(),
                ticket_reference: String::new(),
            }
            .into_ticket("E1");
            tx.put_ticket(&ticket)?;
        }
        Ok(())
    })
    .expect("seed");
    store
}

fn loopback_config(idle_timeout: Duration) -> RuntimeConfig {
    RuntimeConfig {
        bind_host: "127.0.0.1".to_string(),
        port: 0,
        public_host: Some("127.0.0.1".to_string()),
        idle_timeout,
        ..RuntimeConfig::default()
    }
}

async fn connect(client: &reqwest::Client, base_url: &str, name: &str) -> String {
    let body: Value = client
        .post(format!("{base_url}/api/scanner/connect"))
        .json(&json!({ "scannerName": name }))
        .send()
        .await
        .expect("connect request")
        .json()
        .await
        .expect("connect body");
    body["scannerId"].as_str().expect("scannerId").to_string()
}

async fn verify(client: &reqwest::Client, base_url: &str, ticket_id: &str, scanner_id: &str) -> (u16, Value) {
    let response = client
        .post(format!("{base_url}/api/scan/verify"))
        .json(&json!({ "ticketId": ticket_id, "scannerId": scanner_id }))
        .send()
        .await
        .expect("verify request");
    let status = response.status().as_u16();
    (status, response.json().await.expect("verify body"))
}

fn feed_json(message: Option<Result<Message, WsError>>) -> Value {
    match message {
        Some(Ok(Message::Text(text))) => serde_json::from_str(&text).expect("json message"),
        other => panic!("unexpected feed message: {other:?}"),
    }
}

async fn is_refused(base_url: &str) -> bool {
    let addr = base_url.trim_start_matches("http://");
    tokio::net::TcpStream::connect(addr).await.is_err()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn serves_scans_and_stop_clears_sessions() {
    let store = seeded_store();
    let server = ScanServer::new(store.clone(), loopback_config(Duration::from_secs(60)));
    assert_eq!(server.phase(), ServerPhase::Stopped);

    let base_url = server.start("E1").await.expect("start");
    assert!(base_url.starts_with("http://127.0.0.1:"));
    assert_eq!(server.phase(), ServerPhase::Running);
    assert_eq!(server.base_url().await.as_deref(), Some(base_url.as_str()));
    assert!(matches!(
        server.start("E1").await,
        Err(ServerError::AlreadyRunning)
    ));

    let client = reqwest::Client::new();
    let gate_a = connect(&client, &base_url, "Gate A").await;
    let gate_b = connect(&client, &base_url, "Gate B").await;

    let (status, first) = verify(&client, &base_url, "T-1", &gate_a).await;
    assert_eq!(status, 200);
    assert_eq!(first["status"], "success");
    let (_, again) = verify(&client, &base_url, "T-1", &gate_b).await;
    assert_eq!(again["status"], "already_verified");
    assert_eq!(again["ticketData"]["verifiedBy"], "Gate A");
    let (_, missing) = verify(&client, &base_url, "T-404", &gate_a).await;
    assert_eq!(missing["status"], "failed");

    let (a, b) = tokio::join!(
        verify(&client, &base_url, "T-2", &gate_a),
        verify(&client, &base_url, "T-2", &gate_b),
    );
    let mut statuses = vec![
        a.1["status"].as_str().unwrap().to_string(),
        b.1["status"].as_str().unwrap().to_string(),
    ];
    statuses.sort();
    assert_eq!(statuses, vec!["already_verified", "success"]);

    let stats: Value = client
        .get(format!("{base_url}/api/admin/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["stats"]["totalScans"], 5);
    assert_eq!(stats["stats"]["successfulScans"], 2);
    assert_eq!(stats["stats"]["failedScans"], 3);
    assert_eq!(stats["stats"]["activeScannersCount"], 2);

    server.stop().await;
    assert_eq!(server.phase(), ServerPhase::Stopped);
    assert!(server.base_url().await.is_none());
    assert!(is_refused(&base_url).await);
    server.stop().await;
    assert_eq!(server.phase(), ServerPhase::Stopped);

    assert_eq!(
        store
            .scan_logs(&ScanLogFilter::for_event("E1").unsynced())
            .unwrap()
            .len(),
        5
    );

    let restarted = server.start("E1").await.expect("restart");
    let (status, body) = verify(&reqwest::Client::new(), &restarted, "T-3", &gate_a).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "unknown_scanner");
    server.stop().await;
}

#[tokio::test]
async fn start_requires_a_downloaded_event() {
    let server = ScanServer::new(seeded_store(), loopback_config(Duration::from_secs(60)));
    let result = server.start("E404").await;
    assert!(matches!(
        result,
        Err(ServerError::App(AppError::NotFound(_)))
    ));
    assert_eq!(server.phase(), ServerPhase::Stopped);
    assert!(server.base_url().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn idle_server_stops_itself() {
    let server = ScanServer::new(seeded_store(), loopback_config(Duration::from_millis(300)));
    let base_url = server.start("E1").await.expect("start");

    tokio::time::timeout(
        Duration::from_secs(10),
        server.wait_for_phase(ServerPhase::Stopped),
    )
    .await
    .expect("idle shutdown");
    assert!(server.base_url().await.is_none());
    assert!(is_refused(&base_url).await);

    server.start("E1").await.expect("start after idle stop");
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn requests_keep_the_server_alive() {
    let server = ScanServer::new(seeded_store(), loopback_config(Duration::from_millis(800)));
    let base_url = server.start("E1").await.expect("start");
    let client = reqwest::Client::new();

    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let status = client
            .get(format!("{base_url}/api/admin/stats"))
            .send()
            .await
            .expect("stats")
            .status();
        assert!(status.is_success());
    }
    assert_eq!(server.phase(), ServerPhase::Running);

    tokio::time::timeout(
        Duration::from_secs(10),
        server.wait_for_phase(ServerPhase::Stopped),
    )
    .await
    .expect("idle shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn admin_feed_pushes_snapshot_and_updates_then_closes() {
    let server = ScanServer::new(seeded_store(), loopback_config(Duration::from_secs(60)));
    let base_url = server.start("E1").await.expect("start");
    let ws_url = format!("{}/api/admin/feed", base_url.replacen("http://", "ws://", 1));
    let (mut feed, _) = tokio_tungstenite::connect_async(ws_url).await.expect("ws connect");

    let snapshot = feed_json(feed.next().await);
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(snapshot["stats"]["event"]["id"], "E1");

    let client = reqwest::Client::new();
    let scanner = connect(&client, &base_url, "Gate A").await;
    let connected = feed_json(feed.next().await);
    assert_eq!(connected["type"], "scanner_connected");
    assert_eq!(connected["scanner"]["name"], "Gate A");

    verify(&client, &base_url, "T-1", &scanner).await;
    let scan = feed_json(feed.next().await);
    assert_eq!(scan["type"], "scan");
    assert_eq!(scan["scan"]["ticketId"], "T-1");
    assert_eq!(scan["stats"]["successfulScans"], 1);

    server.stop().await;
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match feed.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}
