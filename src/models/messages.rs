use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Destination clients publish their edits to
pub const UPDATE_DESTINATION: &str = "/app/update";

/// Topic every connection receives rendered updates on
pub const BROADCAST_DESTINATION: &str = "/broadcasts/updates";

/// Full-text update sent by a client on every local edit
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessage {
    pub content: String,
    pub sender_id: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    pub content: String,
}

/// Raw text paired with the HTML rendered from it
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    pub original: TextMessage,
    pub html: String,
}

impl BroadcastMessage {
    pub fn new(content: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            original: TextMessage { content: content.into() },
            html: html.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublishFrame {
    pub destination: String,
    pub payload: serde_json::Value,
}

/// Frames a client may send over the socket
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "send")]
    Send(PublishFrame),
    #[serde(rename = "ping")]
    Ping,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub user_id: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicMessage {
    pub destination: String,
    pub payload: BroadcastMessage,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub error: String,
}

/// Frames the server sends over the socket
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "connected")]
    Connected(ConnectedMessage),
    #[serde(rename = "message")]
    Message(TopicMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
}

impl SendMessage {
    pub fn broadcast(payload: BroadcastMessage) -> Self {
        SendMessage::Message(TopicMessage {
            destination: BROADCAST_DESTINATION.to_string(),
            payload,
        })
    }

    pub fn error(error: impl Into<String>) -> Self {
        SendMessage::Error(ErrorMessage { error: error.into() })
    }
}

impl ReceivedMessage {
    pub fn update(update: &UpdateMessage) -> Result<Self, serde_json::Error> {
        Ok(ReceivedMessage::Send(PublishFrame {
            destination: UPDATE_DESTINATION.to_string(),
            payload: serde_json::to_value(update)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn update_message_uses_camel_case() {
        let msg: UpdateMessage =
            serde_json::from_value(json!({ "content": "hi", "senderId": 7 })).unwrap();
        assert_eq!(msg, UpdateMessage { content: "hi".into(), sender_id: 7 });
    }

    #[test]
    fn broadcast_frame_shape() {
        let frame = SendMessage::broadcast(BroadcastMessage::new("hello", "hello"));
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "type": "message",
                "destination": "/broadcasts/updates",
                "payload": { "original": { "content": "hello" }, "html": "hello" }
            })
        );
    }

    #[test]
    fn parses_send_and_ping_frames() {
        let send: ReceivedMessage = serde_json::from_value(json!({
            "type": "send",
            "destination": "/app/update",
            "payload": { "content": "x", "senderId": 1 }
        }))
        .unwrap();
        match send {
            ReceivedMessage::Send(frame) => {
                assert_eq!(frame.destination, UPDATE_DESTINATION);
                assert_eq!(frame.payload["senderId"], 1);
            }
            other => panic!("unexpected frame {other:?}"),
        }

        let ping: ReceivedMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ReceivedMessage::Ping));
    }

    #[test]
    fn connected_frame_carries_user_id() {
        let frame = SendMessage::Connected(ConnectedMessage { user_id: 3 });
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({ "type": "connected", "userId": 3 })
        );
    }
}
