use serde::{Deserialize, Serialize};

/// What kind of row an interaction is.
///
/// Only messages carry searchable content; everything else (group updates,
/// safety number changes, ...) is collapsed into `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    IncomingMessage,
    OutgoingMessage,
    Info,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::IncomingMessage => "incoming_message",
            InteractionKind::OutgoingMessage => "outgoing_message",
            InteractionKind::Info => "info",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "incoming_message" => Some(InteractionKind::IncomingMessage),
            "outgoing_message" => Some(InteractionKind::OutgoingMessage),
            "info" => Some(InteractionKind::Info),
            _ => None,
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(
            self,
            InteractionKind::IncomingMessage | InteractionKind::OutgoingMessage
        )
    }
}

/// A mention of an account inside a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub aci: String,
    pub start: u32,
    pub length: u32,
}

/// A stored interaction. Row ids are assigned by the store in strictly
/// increasing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub id: i64,
    pub thread_id: String,
    pub kind: InteractionKind,
    pub body: Option<String>,
    pub mentions: Vec<Mention>,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
}

impl Interaction {
    pub fn is_message(&self) -> bool {
        self.kind.is_message()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInteraction {
    pub thread_id: String,
    pub kind: InteractionKind,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    pub timestamp: i64,
}

impl NewInteraction {
    pub fn message(thread_id: &str, body: &str, timestamp: i64) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            kind: InteractionKind::IncomingMessage,
            body: Some(body.to_string()),
            mentions: vec![],
            timestamp,
        }
    }

    pub fn info(thread_id: &str, timestamp: i64) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            kind: InteractionKind::Info,
            body: None,
            mentions: vec![],
            timestamp,
        }
    }

    pub fn with_mentions(mut self, mentions: Vec<Mention>) -> Self {
        self.mentions = mentions;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub unique_id: String,
    pub name: Option<String>,
}
