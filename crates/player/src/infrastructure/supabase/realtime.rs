//! Realtime adapter for the hosted store.
//!
//! A Phoenix channel client over tokio-tungstenite: joins one
//! `postgres_changes` channel covering every table of the schema, keeps it
//! alive with heartbeats and reconnects with exponential backoff when the
//! socket drops. Changes made while disconnected are not replayed.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use partysheet_shared::realtime::{
    channel_topic, EVENT_CLOSE, EVENT_ERROR, EVENT_REPLY, HEARTBEAT_INTERVAL_SECS,
};
use partysheet_shared::{ChangeEvent, PhoenixMessage, ProtocolError};

use super::backoff::{Backoff, MAX_RETRY_ATTEMPTS};
use crate::ports::outbound::{ChangeFeedPort, ChangeStream, FeedError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_CHANNEL: &str = "schema-db-changes";
const SCHEMA: &str = "public";
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const JOIN_REF: &str = "1";

#[derive(Debug, Clone)]
pub struct RealtimeFeed {
    socket_url: Url,
    anon_key: String,
    channel: String,
}

/// Why the read loop stopped.
enum PumpEnd {
    ReceiverDropped,
    Disconnected,
}

impl RealtimeFeed {
    /// `project_url` is the project root, e.g. `https://xyz.supabase.co`.
    pub fn new(
        project_url: &Url,
        anon_key: impl Into<String>,
        channel: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        let anon_key = anon_key.into();
        let mut socket_url = project_url.join("realtime/v1/websocket")?;
        let scheme = if socket_url.scheme() == "http" { "ws" } else { "wss" };
        // http(s) -> ws(s) is always an allowed scheme change
        let _ = socket_url.set_scheme(scheme);
        socket_url
            .query_pairs_mut()
            .append_pair("apikey", &anon_key)
            .append_pair("vsn", "1.0.0");

        Ok(Self {
            socket_url,
            anon_key,
            channel: channel.into(),
        })
    }

    /// Socket URL without the key, for logs.
    fn redacted_url(&self) -> String {
        let mut url = self.socket_url.clone();
        url.set_query(None);
        url.to_string()
    }

    async fn connect(&self) -> Result<Socket, FeedError> {
        let (mut socket, _) = connect_async(self.socket_url.as_str())
            .await
            .map_err(|e| FeedError::Connect(e.to_string()))?;

        let join =
            PhoenixMessage::join_postgres_changes(&self.channel, SCHEMA, &self.anon_key, JOIN_REF);
        send_frame(&mut socket, &join).await?;

        let topic = channel_topic(&self.channel);
        tokio::time::timeout(JOIN_TIMEOUT, wait_for_join(&mut socket, &topic))
            .await
            .map_err(|_| FeedError::JoinRejected("no reply to join".to_string()))??;

        tracing::info!(url = %self.redacted_url(), topic = %topic, "Joined realtime channel");
        Ok(socket)
    }

    async fn run(self, mut socket: Socket, tx: mpsc::UnboundedSender<ChangeEvent>) {
        let mut msg_ref = 1u64;
        loop {
            match self.pump(&mut socket, &tx, &mut msg_ref).await {
                PumpEnd::ReceiverDropped => {
                    tracing::debug!("Change stream dropped, closing realtime socket");
                    let _ = socket.close(None).await;
                    return;
                }
                PumpEnd::Disconnected => {
                    tracing::warn!("Realtime socket disconnected, changes until reconnect are lost");
                }
            }

            match self.reconnect(&tx).await {
                Some(fresh) => socket = fresh,
                None => return,
            }
        }
    }

    async fn pump(
        &self,
        socket: &mut Socket,
        tx: &mpsc::UnboundedSender<ChangeEvent>,
        msg_ref: &mut u64,
    ) -> PumpEnd {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        // The first tick completes immediately.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = tx.closed() => return PumpEnd::ReceiverDropped,
                _ = heartbeat.tick() => {
                    *msg_ref += 1;
                    let frame = PhoenixMessage::heartbeat(&msg_ref.to_string());
                    if let Err(e) = send_frame(socket, &frame).await {
                        tracing::warn!(error = %e, "Failed to send heartbeat");
                        return PumpEnd::Disconnected;
                    }
                }
                frame = socket.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = decode_frame(&text) {
                            let _ = tx.send(event);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("Realtime server closed connection");
                        return PumpEnd::Disconnected;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Realtime socket error");
                        return PumpEnd::Disconnected;
                    }
                },
            }
        }
    }

    async fn reconnect(&self, tx: &mpsc::UnboundedSender<ChangeEvent>) -> Option<Socket> {
        let mut backoff = Backoff::default();
        loop {
            let Some(delay) = backoff.next() else {
                tracing::error!("Max reconnection attempts reached, giving up");
                return None;
            };
            tracing::info!(
                attempt = backoff.attempts(),
                max = MAX_RETRY_ATTEMPTS,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to realtime"
            );
            tokio::time::sleep(delay).await;

            if tx.is_closed() {
                return None;
            }
            match self.connect().await {
                Ok(socket) => return Some(socket),
                Err(e) => {
                    tracing::warn!(attempt = backoff.attempts(), error = %e, "Reconnection failed")
                }
            }
        }
    }
}

#[async_trait]
impl ChangeFeedPort for RealtimeFeed {
    async fn subscribe(&self) -> Result<ChangeStream, FeedError> {
        let socket = self.connect().await?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(self.clone().run(socket, tx));
        Ok(rx)
    }
}

async fn send_frame(socket: &mut Socket, frame: &PhoenixMessage) -> Result<(), FeedError> {
    let text = serde_json::to_string(frame).map_err(ProtocolError::from)?;
    socket
        .send(Message::Text(text))
        .await
        .map_err(|e| FeedError::Connect(e.to_string()))
}

async fn wait_for_join<S>(frames: &mut S, topic: &str) -> Result<(), FeedError>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = frames.next().await {
        let frame = frame.map_err(|e| FeedError::Connect(e.to_string()))?;
        let Message::Text(text) = frame else {
            continue;
        };
        let reply: PhoenixMessage = serde_json::from_str(&text).map_err(ProtocolError::from)?;
        if reply.topic != topic || reply.event != EVENT_REPLY {
            continue;
        }
        if reply.is_ok_reply() {
            return Ok(());
        }
        return Err(FeedError::JoinRejected(reply.payload.to_string()));
    }
    Err(FeedError::Closed)
}

/// Change event carried by a text frame, if any.
fn decode_frame(text: &str) -> Option<ChangeEvent> {
    let frame: PhoenixMessage = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable realtime frame");
            return None;
        }
    };

    if frame.event == EVENT_ERROR || frame.event == EVENT_CLOSE {
        tracing::warn!(topic = %frame.topic, event = %frame.event, payload = %frame.payload, "Channel event");
        return None;
    }

    match frame.change_event() {
        Ok(event) => event,
        Err(ProtocolError::UnknownTable(table)) => {
            tracing::debug!(table = %table, "Ignoring change on unsynced table");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed change frame");
            None
        }
    }
}
