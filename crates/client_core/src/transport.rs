//! Realtime subscriptions over the `graphql-transport-ws` protocol.
//!
//! Each subscription owns its own socket. A background task pumps `next`
//! frames into the subscription's channel until the server completes the
//! operation, the socket drops, or the [`NoteSubscription`] is dropped, in
//! which case the task sends `complete` and closes the socket.

use anyhow::{anyhow, Context, Result};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde_json::{json, Map, Value};
use shared::{
    domain::{Note, NoteEventKind},
    error::ApiException,
    protocol::{
        GraphqlRequest, NoteOperation, WsClientMessage, WsServerMessage, GRAPHQL_WS_SUBPROTOCOL,
    },
};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderValue},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::{error::GraphqlError, graphql_client::decode_root_field, NoteSubscription};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SocketWriter = SplitSink<Socket, Message>;
type SocketReader = SplitStream<Socket>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub auth_token: Option<String>,
}

impl Credentials {
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if let Some(api_key) = &self.api_key {
            headers.push(("x-api-key", api_key.clone()));
        }
        if let Some(token) = &self.auth_token {
            headers.push(("authorization", format!("Bearer {token}")));
        }
        headers
    }

    /// `connection_init` payload carrying the same credentials as the HTTP headers.
    pub fn connection_payload(&self) -> Option<Value> {
        let headers = self.headers();
        if headers.is_empty() {
            return None;
        }
        let map: Map<String, Value> = headers
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::String(value)))
            .collect();
        Some(Value::Object(map))
    }
}

/// Derives the realtime URL from the HTTP endpoint by swapping the scheme.
pub fn realtime_url(endpoint: &str) -> Result<Url> {
    let ws_url = if endpoint.starts_with("https://") {
        endpoint.replacen("https://", "wss://", 1)
    } else if endpoint.starts_with("http://") {
        endpoint.replacen("http://", "ws://", 1)
    } else if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        endpoint.to_string()
    } else {
        return Err(anyhow!("endpoint must start with http:// or https://"));
    };
    Url::parse(&ws_url).with_context(|| format!("invalid realtime endpoint: {ws_url}"))
}

pub async fn open_subscription(
    url: &Url,
    credentials: &Credentials,
    kind: NoteEventKind,
) -> Result<NoteSubscription> {
    let mut request = url
        .as_str()
        .into_client_request()
        .with_context(|| format!("invalid realtime endpoint: {url}"))?;
    request.headers_mut().insert(
        SEC_WEBSOCKET_PROTOCOL,
        HeaderValue::from_static(GRAPHQL_WS_SUBPROTOCOL),
    );
    let (ws_stream, _) = connect_async(request)
        .await
        .with_context(|| format!("failed to connect realtime socket: {url}"))?;
    let (mut writer, mut reader) = ws_stream.split();

    send_frame(
        &mut writer,
        &WsClientMessage::ConnectionInit {
            payload: credentials.connection_payload(),
        },
    )
    .await?;
    await_connection_ack(&mut writer, &mut reader).await?;

    let operation = NoteOperation::subscription(kind);
    let subscription_id = Uuid::new_v4().to_string();
    send_frame(
        &mut writer,
        &WsClientMessage::Subscribe {
            id: subscription_id.clone(),
            payload: GraphqlRequest::new(operation, json!({})),
        },
    )
    .await?;

    let (items_tx, items_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    tokio::spawn(pump_subscription(
        writer,
        reader,
        subscription_id,
        operation,
        items_tx,
        cancel_rx,
    ));
    info!(?kind, "realtime: subscribed");

    Ok(NoteSubscription::new(kind, items_rx, cancel_tx))
}

async fn send_frame(writer: &mut SocketWriter, message: &WsClientMessage) -> Result<()> {
    let text = serde_json::to_string(message)?;
    writer
        .send(Message::Text(text))
        .await
        .context("failed to write realtime frame")
}

async fn await_connection_ack(writer: &mut SocketWriter, reader: &mut SocketReader) -> Result<()> {
    while let Some(frame) = reader.next().await {
        match frame.context("realtime handshake failed")? {
            Message::Text(text) => match serde_json::from_str::<WsServerMessage>(&text) {
                Ok(WsServerMessage::ConnectionAck { .. }) => return Ok(()),
                Ok(WsServerMessage::Ping { payload }) => {
                    send_frame(writer, &WsClientMessage::Pong { payload }).await?;
                }
                Ok(other) => {
                    return Err(GraphqlError::Protocol(format!(
                        "expected connection_ack, got {other:?}"
                    ))
                    .into())
                }
                Err(err) => {
                    return Err(
                        GraphqlError::Protocol(format!("invalid handshake frame: {err}")).into(),
                    )
                }
            },
            Message::Close(_) => return Err(GraphqlError::SocketClosed.into()),
            _ => {}
        }
    }
    Err(GraphqlError::SocketClosed.into())
}

async fn pump_subscription(
    mut writer: SocketWriter,
    mut reader: SocketReader,
    subscription_id: String,
    operation: NoteOperation,
    items: mpsc::UnboundedSender<Result<Note>>,
    mut cancel: oneshot::Receiver<()>,
) {
    let name = operation.operation_name();
    loop {
        tokio::select! {
            _ = &mut cancel => {
                if let Err(err) = send_frame(
                    &mut writer,
                    &WsClientMessage::Complete { id: subscription_id.clone() },
                )
                .await
                {
                    debug!(operation = name, "realtime: complete not delivered: {err:#}");
                }
                debug!(operation = name, "realtime: unsubscribed");
                break;
            }
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let message = match serde_json::from_str::<WsServerMessage>(&text) {
                        Ok(message) => message,
                        Err(err) => {
                            warn!(operation = name, "realtime: ignoring invalid frame: {err}");
                            continue;
                        }
                    };
                    match message {
                        WsServerMessage::Next { id, payload } if id == subscription_id => {
                            let item = decode_root_field::<Note>(payload, operation)
                                .map_err(anyhow::Error::from);
                            if items.send(item).is_err() {
                                break;
                            }
                        }
                        WsServerMessage::Error { id, payload } if id == subscription_id => {
                            let _ = items.send(Err(GraphqlError::Api(ApiException::new(payload)).into()));
                            break;
                        }
                        WsServerMessage::Complete { id } if id == subscription_id => {
                            debug!(operation = name, "realtime: server completed subscription");
                            break;
                        }
                        WsServerMessage::Ping { payload } => {
                            if let Err(err) = send_frame(&mut writer, &WsClientMessage::Pong { payload }).await {
                                let _ = items.send(Err(err));
                                break;
                            }
                        }
                        other => debug!(operation = name, "realtime: ignoring frame {other:?}"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    let _ = items.send(Err(GraphqlError::SocketClosed.into()));
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    let _ = items.send(Err(anyhow!(err).context("realtime receive failed")));
                    break;
                }
            }
        }
    }
    let _ = writer.close().await;
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
