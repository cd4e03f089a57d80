// Loxwatch Client - Session tests
//
// Runs the client against an in-process mock Miniserver speaking the
// websocket protocol over a loopback socket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use loxwatch_client::{ClientConfig, ClientError, MiniserverClient};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tokio_util::sync::CancellationToken;

const KEY_HEX: &str = "41424344";
// HMAC-SHA1 of "admin:secret" keyed with KEY_HEX
const VALID_HASH: &str = "c79fbadcd8a761485d583aed5e8c9d7a62791c30";

const STRUCTURE: &str = r#"{
    "rooms": { "r1": { "name": "Lounge" } },
    "cats": { "c1": { "name": "Shading" } },
    "controls": { "ctl1": {
        "name": "Blinds", "type": "Jalousie", "room": "r1", "cat": "c1",
        "states": { "position": "0b734138-037d-034e-ffff403fb0c34b9e" }
    } }
}"#;

fn header(kind: u8, len: u32) -> Message {
    let mut bytes = vec![0x03, kind, 0, 0];
    bytes.extend_from_slice(&len.to_le_bytes());
    Message::Binary(bytes)
}

fn ll(control: &str, value: &str, code: u16) -> String {
    format!(
        r#"{{"LL": {{"control": "{}", "value": "{}", "Code": "{}"}}}}"#,
        control, value, code
    )
}

async fn reply(ws: &mut WebSocketStream<TcpStream>, kind: u8, payload: Message) {
    let len = match &payload {
        Message::Text(text) => text.len(),
        Message::Binary(bytes) => bytes.len(),
        _ => 0,
    };
    ws.send(header(kind, len as u32)).await.unwrap();
    ws.send(payload).await.unwrap();
}

/// Mock Miniserver serving one session, then closing after the first
/// event table
async fn mock_miniserver() -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let callback = |_request: &Request, mut response: Response| {
            response
                .headers_mut()
                .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("remotecontrol"));
            Ok::<_, ErrorResponse>(response)
        };
        let mut ws = accept_hdr_async(tcp, callback).await.unwrap();

        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(command) = message else {
                continue;
            };

            if command == "jdev/sys/getkey" {
                reply(&mut ws, 0, Message::Text(ll(&command, KEY_HEX, 200))).await;
            } else if let Some(hash) = command.strip_prefix("authenticate/") {
                let code = if hash == VALID_HASH { 200 } else { 401 };
                reply(&mut ws, 0, Message::Text(ll(&command, "", code))).await;
            } else if command == "data/LoxAPP3.json" {
                reply(&mut ws, 1, Message::Text(STRUCTURE.to_string())).await;
            } else if command == "jdev/sps/enablebinstatusupdate" {
                reply(&mut ws, 0, Message::Text(ll(&command, "1", 200))).await;

                let mut table = vec![
                    0x38, 0x41, 0x73, 0x0b, 0x7d, 0x03, 0x4e, 0x03, 0xff, 0xff, 0x40, 0x3f, 0xb0,
                    0xc3, 0x4b, 0x9e,
                ];
                table.extend_from_slice(&42.0f64.to_le_bytes());
                reply(&mut ws, 2, Message::Binary(table)).await;
                let _ = ws.close(None).await;
                break;
            }
        }
    });

    (address, handle)
}

fn config(host: String, password: &str) -> ClientConfig {
    let mut config = ClientConfig::new(host, "admin", password);
    config.response_timeout = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn test_full_session() {
    let (address, server) = mock_miniserver().await;

    let mut client = MiniserverClient::connect(config(address, "secret"))
        .await
        .unwrap();

    let structure = client.get_config().await.unwrap();
    assert_eq!(structure.controls["ctl1"].name, "Blinds");

    let cancel = CancellationToken::new();
    let mut events = client.register_events(cancel.clone()).await.unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.uuid, "0b734138-037d-034e-ffff403fb0c34b9e");
    assert_eq!(event.value, 42.0);

    // Server closed the socket: the channel ends
    assert!(events.recv().await.is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn test_rejected_credentials() {
    let (address, _server) = mock_miniserver().await;

    let result = MiniserverClient::connect(config(address, "wrong")).await;
    assert!(matches!(result, Err(ClientError::Authentication(_))));
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind and drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = MiniserverClient::connect(config(address, "secret")).await;
    assert!(matches!(result, Err(ClientError::WebSocket(_))));
}
