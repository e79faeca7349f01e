//! Integration tests driving the real server over loopback (spec §4.5).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_ingress::{IngressConfig, IngressServer};

fn start_server(secret: &str, updates: Arc<Mutex<Vec<serde_json::Value>>>) -> (IngressServer, u16) {
    let port = pick_free_port();
    let config = IngressConfig {
        port,
        threads: 2,
        pool_size: 4,
        secret: secret.to_owned(),
    };
    let callback_updates = Arc::clone(&updates);
    let server = IngressServer::start(
        config,
        Arc::new(move |value| callback_updates.lock().unwrap().push(value)),
    )
    .unwrap();
    // give the listener a moment to come up
    std::thread::sleep(Duration::from_millis(100));
    (server, port)
}

fn pick_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn accepts_valid_webhook_post() {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let (server, port) = start_server("", Arc::clone(&updates));

    let response = ureq::post(&format!("http://127.0.0.1:{port}/webhook"))
        .set("Content-Type", "application/json")
        .send_string(r#"{"update_id": 1}"#)
        .unwrap();
    assert_eq!(response.status(), 200);

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(updates.lock().unwrap().len(), 1);
    server.shutdown();
}

#[test]
fn wrong_path_returns_404() {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let (server, port) = start_server("", updates);

    let err = ureq::post(&format!("http://127.0.0.1:{port}/not-webhook"))
        .set("Content-Type", "application/json")
        .send_string("{}")
        .unwrap_err();
    assert!(matches!(err, ureq::Error::Status(404, _)));
    server.shutdown();
}

#[test]
fn missing_content_type_returns_415() {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let (server, port) = start_server("", updates);

    let err = ureq::post(&format!("http://127.0.0.1:{port}/webhook"))
        .send_string("{}")
        .unwrap_err();
    assert!(matches!(err, ureq::Error::Status(415, _)));
    server.shutdown();
}

#[test]
fn wrong_secret_returns_403() {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let (server, port) = start_server("correct-secret", updates);

    let err = ureq::post(&format!("http://127.0.0.1:{port}/webhook"))
        .set("Content-Type", "application/json")
        .set("X-Telegram-Bot-Api-Secret-Token", "wrong-secret")
        .send_string("{}")
        .unwrap_err();
    assert!(matches!(err, ureq::Error::Status(403, _)));
    server.shutdown();
}

#[test]
fn malformed_json_still_returns_200() {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let (server, port) = start_server("", Arc::clone(&updates));

    let response = ureq::post(&format!("http://127.0.0.1:{port}/webhook"))
        .set("Content-Type", "application/json")
        .send_string("not json")
        .unwrap();
    assert_eq!(response.status(), 200);

    std::thread::sleep(Duration::from_millis(50));
    assert!(updates.lock().unwrap().is_empty());
    server.shutdown();
}
