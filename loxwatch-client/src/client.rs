// Loxwatch Client - Miniserver websocket client
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Miniserver session
//!
//! [`MiniserverClient`] drives one websocket session through its three
//! startup steps (connect and authenticate, fetch the structure file,
//! enable status updates) and then hands the socket to two background
//! tasks: a reader that decodes value-event tables into [`Event`]s and a
//! keepalive ticker.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use loxwatch::{Event, Structure};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::auth::{authenticate_command, GET_KEY_COMMAND};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::protocol::{parse_value_events, LlResponse, MessageHeader, MessageType};

/// Command requesting the structure file
pub const STRUCTURE_COMMAND: &str = "data/LoxAPP3.json";

/// Command enabling binary status updates
pub const ENABLE_UPDATES_COMMAND: &str = "jdev/sps/enablebinstatusupdate";

/// Keepalive message
pub const KEEPALIVE_COMMAND: &str = "keepalive";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One decoded Miniserver message
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Text payload (command responses)
    Text(String),
    /// File payload (structure file)
    File(Vec<u8>),
    /// Value-event table
    ValueEvents(Vec<Event>),
    /// Keepalive response
    Keepalive,
    /// Miniserver is about to go offline
    OutOfService,
    /// Payload of a kind this client does not decode
    Ignored(MessageType),
}

/// Authenticated Miniserver session
pub struct MiniserverClient {
    config: ClientConfig,
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl MiniserverClient {
    /// Open the websocket and authenticate
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let mut request = config.url().into_client_request()?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("remotecontrol"));

        let (socket, _) = timeout(config.response_timeout, connect_async(request))
            .await
            .map_err(|_| ClientError::Timeout {
                command: config.url(),
                timeout: config.response_timeout,
            })??;
        let (sink, stream) = socket.split();

        let mut client = Self {
            config,
            sink,
            stream,
        };
        client.authenticate().await?;
        info!(host = %client.config.host, user = %client.config.user, "Connected to Miniserver");
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn authenticate(&mut self) -> Result<()> {
        let key = self.request(GET_KEY_COMMAND).await?;
        if !key.is_success() {
            return Err(ClientError::Authentication(format!(
                "key request failed with code {}",
                key.code
            )));
        }

        let command = authenticate_command(key.value_str(), &self.config.user, &self.config.password)?;
        let response = self.request(&command).await?;
        if !response.is_success() {
            return Err(ClientError::Authentication(format!(
                "credentials rejected with code {}",
                response.code
            )));
        }
        Ok(())
    }

    /// Download and parse the structure file
    pub async fn get_config(&mut self) -> Result<Structure> {
        self.send(STRUCTURE_COMMAND).await?;
        let limit = self.config.response_timeout;
        let bytes = with_timeout(limit, STRUCTURE_COMMAND, read_file(&mut self.stream)).await?;
        debug!(bytes = bytes.len(), "Structure file received");
        Ok(Structure::from_slice(&bytes)?)
    }

    /// Enable status updates and start streaming events.
    ///
    /// The returned channel closes when the socket closes, the Miniserver
    /// goes out of service, or `cancel` fires.
    pub async fn register_events(mut self, cancel: CancellationToken) -> Result<mpsc::Receiver<Event>> {
        self.send(ENABLE_UPDATES_COMMAND).await?;
        let mut backlog = Vec::new();
        let limit = self.config.response_timeout;
        let response = with_timeout(
            limit,
            ENABLE_UPDATES_COMMAND,
            read_response(&mut self.stream, &mut backlog),
        )
        .await?;
        if !response.is_success() {
            return Err(ClientError::Command {
                command: ENABLE_UPDATES_COMMAND.to_string(),
                code: response.code,
            });
        }

        let (tx, rx) = mpsc::channel(self.config.event_buffer);
        let session = cancel.child_token();
        tokio::spawn(read_events(self.stream, tx, backlog, session.clone()));
        tokio::spawn(keep_alive(self.sink, self.config.keepalive_interval, session));
        Ok(rx)
    }

    async fn send(&mut self, command: &str) -> Result<()> {
        trace!(command, "sending");
        self.sink.send(Message::Text(command.to_string())).await?;
        Ok(())
    }

    async fn request(&mut self, command: &str) -> Result<LlResponse> {
        self.send(command).await?;
        let mut backlog = Vec::new();
        let limit = self.config.response_timeout;
        let response = with_timeout(limit, command, read_response(&mut self.stream, &mut backlog)).await?;
        if !backlog.is_empty() {
            debug!(dropped = backlog.len(), command, "events received before status updates were enabled");
        }
        Ok(response)
    }
}

async fn with_timeout<T>(
    limit: Duration,
    command: &str,
    future: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    timeout(limit, future)
        .await
        .map_err(|_| ClientError::Timeout {
            command: redact(command),
            timeout: limit,
        })?
}

/// Keep the credential hash out of error messages
fn redact(command: &str) -> String {
    match command.split_once('/') {
        Some(("authenticate", _)) => "authenticate/<hash>".to_string(),
        _ => command.to_string(),
    }
}

/// Next data message; control frames are skipped
async fn next_message<S>(stream: &mut S) -> Result<Message>
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Close(_))) | None => return Err(ClientError::Closed),
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {
                continue
            }
            Some(Ok(message)) => return Ok(message),
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Read one header and its payload
pub async fn read_frame<S>(stream: &mut S) -> Result<Frame>
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    loop {
        let bytes = match next_message(stream).await? {
            Message::Binary(bytes) => bytes,
            // Some firmware answers commands without a header
            Message::Text(text) => return Ok(Frame::Text(text)),
            _ => continue,
        };

        let header = MessageHeader::parse(&bytes)?;
        if header.estimated {
            continue;
        }
        if !header.kind.has_payload() {
            return Ok(match header.kind {
                MessageType::Keepalive => Frame::Keepalive,
                _ => Frame::OutOfService,
            });
        }

        let payload = match next_message(stream).await? {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bytes) => bytes,
            _ => continue,
        };

        return Ok(match header.kind {
            MessageType::Text => Frame::Text(String::from_utf8_lossy(&payload).into_owned()),
            MessageType::BinaryFile => Frame::File(payload),
            MessageType::ValueEvents => Frame::ValueEvents(parse_value_events(&payload)?),
            other => Frame::Ignored(other),
        });
    }
}

/// Wait for the next `LL` response, collecting value events seen meanwhile
async fn read_response<S>(stream: &mut S, backlog: &mut Vec<Event>) -> Result<LlResponse>
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    loop {
        match read_frame(stream).await? {
            Frame::Text(text) => return Ok(LlResponse::parse(&text)?),
            Frame::ValueEvents(events) => backlog.extend(events),
            Frame::OutOfService => return Err(ClientError::Closed),
            other => trace!(?other, "skipping frame while waiting for response"),
        }
    }
}

/// Wait for a file payload; an `LL` error response fails the request
async fn read_file<S>(stream: &mut S) -> Result<Vec<u8>>
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    loop {
        match read_frame(stream).await? {
            Frame::File(bytes) => return Ok(bytes),
            Frame::Text(text) => match LlResponse::parse(&text) {
                Ok(response) if !response.is_success() => {
                    return Err(ClientError::Command {
                        command: STRUCTURE_COMMAND.to_string(),
                        code: response.code,
                    });
                }
                Ok(response) => trace!(control = %response.control, "skipping response"),
                // Older firmware sends the structure file as a text message
                Err(_) => return Ok(text.into_bytes()),
            },
            Frame::OutOfService => return Err(ClientError::Closed),
            other => trace!(?other, "skipping frame while waiting for structure file"),
        }
    }
}

/// Forward value events into `tx` until the session ends
pub async fn read_events<S>(
    mut stream: S,
    tx: mpsc::Sender<Event>,
    backlog: Vec<Event>,
    session: CancellationToken,
) where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    for event in backlog {
        if tx.send(event).await.is_err() {
            session.cancel();
            return;
        }
    }

    'session: loop {
        let frame = tokio::select! {
            biased;

            _ = session.cancelled() => break 'session,
            frame = read_frame(&mut stream) => frame,
        };

        match frame {
            Ok(Frame::ValueEvents(events)) => {
                for event in events {
                    if tx.send(event).await.is_err() {
                        debug!("event receiver dropped");
                        break 'session;
                    }
                }
            }
            Ok(Frame::Keepalive) => trace!("keepalive acknowledged"),
            Ok(Frame::OutOfService) => {
                warn!("Miniserver is going out of service");
                break 'session;
            }
            Ok(other) => trace!(?other, "ignoring frame"),
            Err(ClientError::Closed) => {
                warn!("Miniserver closed the connection");
                break 'session;
            }
            Err(e) => {
                error!(error = %e, "Reading events failed");
                break 'session;
            }
        }
    }

    session.cancel();
}

/// Send keepalive messages every `period` until the session ends
pub async fn keep_alive<S>(mut sink: S, period: Duration, session: CancellationToken)
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = session.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = sink.send(Message::Text(KEEPALIVE_COMMAND.to_string())).await {
                    warn!(error = %e, "Keepalive failed");
                    session.cancel();
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
}
