//! End-to-end check over a real socket: a client connects the way Wox
//! does, sends request frames, and reads correlated responses back.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use host_core::dispatch;

fn test_port() -> u16 {
    // keep parallel test binaries off each other's ports
    19200 + (std::process::id() % 500) as u16
}

#[tokio::test]
async fn request_over_the_socket_gets_a_correlated_response() {
    let dir = std::env::temp_dir().join(format!("host-wire-test-{}", std::process::id()));
    liblogger::Logger::update_log_directory(&dir.to_string_lossy());

    let port = test_port();
    tokio::spawn(libws::serve(port, dispatch::handle_message));

    // the server needs a moment to bind
    let url = format!("ws://127.0.0.1:{}", port);
    let mut client = None;
    for _ in 0..20 {
        match connect_async(&url).await {
            Ok((socket, _)) => {
                client = Some(socket);
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
    let mut client = client.expect("could not connect to the host");

    let request = json!({
        "Type": "WOX_JSONRPC_TYPE_REQUEST",
        "Id": "wire-1",
        "Method": "nope",
        "TraceId": "trace-wire",
    })
    .to_string();
    client.send(Message::Text(request)).await.unwrap();

    // skip system-log frames until our response shows up
    let response = loop {
        let message = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for the response")
            .expect("connection closed")
            .unwrap();
        let Message::Text(text) = message else { continue };
        let frame: Value = serde_json::from_str(&text).unwrap();
        if frame["Id"] == "wire-1" {
            break frame;
        }
    };

    assert_eq!(response["Type"], "WOX_JSONRPC_TYPE_RESPONSE");
    assert_eq!(response["TraceId"], "trace-wire");
    assert_eq!(response["Error"], "unknown method handler: nope");

    // loading a plugin from a directory that does not exist fails cleanly
    let load = json!({
        "Type": "WOX_JSONRPC_TYPE_REQUEST",
        "Id": "wire-2",
        "Method": "loadPlugin",
        "TraceId": "trace-wire",
        "PluginId": "wire-plugin",
        "PluginName": "wire",
        "Params": {"PluginDirectory": "/tmp/does-not-exist", "Entry": "wire/main.so"},
    })
    .to_string();
    client.send(Message::Text(load)).await.unwrap();

    let response = loop {
        let message = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for the response")
            .expect("connection closed")
            .unwrap();
        let Message::Text(text) = message else { continue };
        let frame: Value = serde_json::from_str(&text).unwrap();
        if frame["Id"] == "wire-2" {
            break frame;
        }
    };
    assert!(response["Error"].as_str().unwrap().contains("entry file not found"));

    client.close(None).await.unwrap();
}
