//! Realtime feed frames.
//!
//! The hosted store pushes row changes over a Phoenix channel websocket.
//! This module covers the small subset of that protocol the client needs:
//! joining a `postgres_changes` channel, heartbeats, and decoding change
//! notifications into [`ChangeEvent`]s.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{ProtocolError, Table};

pub const PHOENIX_TOPIC: &str = "phoenix";
pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";

/// Interval the server expects heartbeats at.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 25;

/// A Phoenix channel frame (JSON serializer v1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PhoenixMessage {
    /// Join `realtime:<channel>` listening to every change in `schema`.
    pub fn join_postgres_changes(
        channel: &str,
        schema: &str,
        access_token: &str,
        msg_ref: &str,
    ) -> Self {
        Self {
            topic: channel_topic(channel),
            event: EVENT_JOIN.to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "ack": false, "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [{ "event": "*", "schema": schema }],
                    "private": false,
                },
                "access_token": access_token,
            }),
            msg_ref: Some(msg_ref.to_string()),
            join_ref: Some(msg_ref.to_string()),
        }
    }

    pub fn heartbeat(msg_ref: &str) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
            join_ref: None,
        }
    }

    /// True for a `phx_reply` with `status: "ok"`.
    pub fn is_ok_reply(&self) -> bool {
        self.event == EVENT_REPLY && self.payload.get("status").and_then(Value::as_str) == Some("ok")
    }

    /// Decodes a `postgres_changes` frame; `Ok(None)` for any other event.
    pub fn change_event(&self) -> Result<Option<ChangeEvent>, ProtocolError> {
        if self.event != EVENT_POSTGRES_CHANGES {
            return Ok(None);
        }
        let data = self
            .payload
            .get("data")
            .cloned()
            .ok_or_else(|| ProtocolError::malformed("postgres_changes frame without data"))?;
        let data: PostgresChangeData = serde_json::from_value(data)?;
        ChangeEvent::try_from(data).map(Some)
    }
}

pub fn channel_topic(channel: &str) -> String {
    format!("realtime:{}", channel)
}

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// The `data` object of a `postgres_changes` frame, as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresChangeData {
    #[serde(default)]
    pub schema: String,
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub record: Value,
    #[serde(default)]
    pub old_record: Value,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

/// One insert/update/delete notification from the multiplexed feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    /// New row image; `Value::Null` or `{}` for deletes.
    pub record: Value,
    /// Old row image; for deletes only the key is guaranteed.
    pub old_record: Value,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind, record: Value, old_record: Value) -> Self {
        Self {
            table,
            kind,
            record,
            old_record,
        }
    }

    /// The writer's session tag, read from the new image only.
    ///
    /// The old image names whoever wrote the row last, not whoever changed
    /// it now, so deletes never carry a tag.
    pub fn session_tag(&self) -> Option<Uuid> {
        self.record
            .get("session_id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Deserializes the new row image.
    pub fn new_row<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_value(self.record.clone())?)
    }

    /// The `id` column of the old image, present on every delete.
    pub fn old_id(&self) -> Option<Uuid> {
        self.old_record
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

impl TryFrom<PostgresChangeData> for ChangeEvent {
    type Error = ProtocolError;

    fn try_from(data: PostgresChangeData) -> Result<Self, Self::Error> {
        let table: Table = data.table.parse()?;
        Ok(Self {
            table,
            kind: data.kind,
            record: data.record,
            old_record: data.old_record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: Value) -> PhoenixMessage {
        PhoenixMessage {
            topic: channel_topic("schema-db-changes"),
            event: EVENT_POSTGRES_CHANGES.to_string(),
            payload: json!({ "ids": [1], "data": data }),
            msg_ref: None,
            join_ref: None,
        }
    }

    #[test]
    fn decodes_update_with_session_tag() {
        let session = Uuid::new_v4();
        let msg = frame(json!({
            "schema": "public",
            "table": "adversity",
            "type": "UPDATE",
            "record": { "player": "olympia", "adversity": 3, "session_id": session.to_string() },
            "old_record": { "player": "olympia" },
        }));

        let event = msg.change_event().expect("valid frame").expect("change event");
        assert_eq!(event.table, Table::Adversity);
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.session_tag(), Some(session));
    }

    #[test]
    fn delete_exposes_old_id() {
        let id = Uuid::new_v4();
        let msg = frame(json!({
            "table": "inventory",
            "type": "DELETE",
            "record": {},
            "old_record": { "id": id.to_string() },
        }));

        let event = msg.change_event().expect("valid frame").expect("change event");
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.old_id(), Some(id));
        assert_eq!(event.session_tag(), None);
    }

    #[test]
    fn old_image_tag_is_not_the_writer() {
        let last_writer = Uuid::new_v4();
        let msg = frame(json!({
            "table": "inventory",
            "type": "DELETE",
            "record": {},
            "old_record": { "id": Uuid::new_v4().to_string(), "session_id": last_writer.to_string() },
        }));

        let event = msg.change_event().expect("valid frame").expect("change event");
        assert_eq!(event.session_tag(), None);
    }

    #[test]
    fn unknown_table_is_an_error() {
        let msg = frame(json!({ "table": "profiles", "type": "INSERT", "record": {} }));
        assert!(matches!(
            msg.change_event(),
            Err(ProtocolError::UnknownTable(t)) if t == "profiles"
        ));
    }

    #[test]
    fn other_events_are_not_changes() {
        let msg = PhoenixMessage::heartbeat("7");
        assert_eq!(msg.change_event().ok(), Some(None));
        assert_eq!(msg.topic, "phoenix");
    }

    #[test]
    fn join_frame_targets_realtime_topic() {
        let msg = PhoenixMessage::join_postgres_changes("schema-db-changes", "public", "key", "1");
        assert_eq!(msg.topic, "realtime:schema-db-changes");
        assert_eq!(msg.payload["config"]["postgres_changes"][0]["event"], "*");
        let text = serde_json::to_string(&msg).expect("serialize");
        assert!(text.contains("\"ref\":\"1\""));
    }

    #[test]
    fn ok_reply_is_recognized() {
        let reply: PhoenixMessage = serde_json::from_str(
            r#"{"topic":"phoenix","event":"phx_reply","payload":{"status":"ok","response":{}},"ref":"2"}"#,
        )
        .expect("deserialize");
        assert!(reply.is_ok_reply());
    }
}
