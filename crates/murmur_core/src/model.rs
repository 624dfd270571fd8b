//! Chat records held by the stores
//!
//! These mirror what the chat backend emits for each received datagram and
//! for the local user profile. They are plain data: no validation happens
//! here or in the stores.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Common body of every non-ack message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    /// Display name of the sender
    pub name: String,
    /// Sender id
    pub uid: u64,
    /// Message id
    pub mid: u64,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub payload: Vec<u8>,
    /// Sender avatar bytes
    pub pic: Vec<u8>,
}

impl MessageData {
    pub fn new(
        name: impl Into<String>,
        uid: u64,
        mid: u64,
        timestamp: u64,
        payload: Vec<u8>,
        pic: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            uid,
            mid,
            timestamp,
            payload,
            pic,
        }
    }
}

/// A chat message as it appears in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Text(MessageData),
    Image(MessageData),
    /// Presence announcement sent when a peer joins
    Hello(MessageData),
    /// Receipt for message `mid`, from peer `uid` when known
    Ack { mid: u64, uid: Option<u64> },
}

impl Message {
    /// Body of the message; `None` for acks
    pub fn data(&self) -> Option<&MessageData> {
        match self {
            Message::Text(data) | Message::Image(data) | Message::Hello(data) => Some(data),
            Message::Ack { .. } => None,
        }
    }

    /// Id of the message, or of the acknowledged message for acks
    pub fn mid(&self) -> u64 {
        match self {
            Message::Text(data) | Message::Image(data) | Message::Hello(data) => data.mid,
            Message::Ack { mid, .. } => *mid,
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Message::Ack { .. })
    }

    /// Payload of a text message, decoded lossily as UTF-8
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            Message::Text(data) => Some(String::from_utf8_lossy(&data.payload)),
            _ => None,
        }
    }
}

/// The local user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub uid: u64,
    /// Seconds since the Unix epoch
    pub join_time: u64,
    #[serde(default)]
    pub pic: Vec<u8>,
}

impl Profile {
    pub fn new(name: impl Into<String>, uid: u64, join_time: u64) -> Self {
        Self {
            name: name.into(),
            uid,
            join_time,
            pic: Vec::new(),
        }
    }

    pub fn with_pic(mut self, pic: Vec<u8>) -> Self {
        self.pic = pic;
        self
    }
}
