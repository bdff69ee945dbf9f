//! Protocol message definitions
//!
//! Defines the envelope and every request/response carried inside it. The
//! declaration order of enum variants is the wire tag order and must only
//! ever be appended to.

use serde::{Deserialize, Serialize};

/// A single message stored in a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Milliseconds since the Unix epoch, stamped by the producer
    pub timestamp: u64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Message {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, timestamp: u64) -> Self {
        Self {
            timestamp,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Operations on topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum TopicOp {
    Describe = 0,
    Create = 1,
    Delete = 2,
    All = 3,
}

impl TopicOp {
    /// Resolve a wire tag into an operation
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(TopicOp::Describe),
            1 => Some(TopicOp::Create),
            2 => Some(TopicOp::Delete),
            3 => Some(TopicOp::All),
            _ => None,
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }
}

/// Topic administration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRequest {
    pub op: TopicOp,
    /// Ignored by the broker for `TopicOp::All`
    pub topic_name: String,
}

/// Produce request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceRequest {
    pub topic_name: String,
    pub messages: Vec<Message>,
}

/// Consume request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeRequest {
    pub topic_name: String,
    pub consumer_group: String,
    /// Milliseconds the broker may wait for a message
    pub timeout: u64,
}

/// A topic and the consumer groups reading it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub topic_name: String,
    pub consumer_groups: Vec<String>,
}

/// Topic administration response, one variant per `TopicOp` in the same order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicResponse {
    Describe {
        success: bool,
        topic_name: String,
        max_segment_bytes: u64,
        max_retention_bytes: u64,
        consumer_groups: Vec<String>,
    },
    Create {
        success: bool,
        topic_name: String,
    },
    Delete {
        success: bool,
        topic_name: String,
    },
    All {
        success: bool,
        topic_name: String,
        topics: Vec<TopicEntry>,
    },
}

/// Produce response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceResponse {
    pub success: bool,
    pub topic_name: String,
    /// Offset the broker assigned to the message
    pub offset: u64,
}

/// Consume response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeResponse {
    pub success: bool,
    pub topic_name: String,
    pub messages: Vec<Message>,
}

/// Sent by the broker when it could not make sense of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidResponse {
    pub error_message: String,
}

/// Envelope variant discriminants as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EnvelopeKind {
    TopicRequest = 0,
    ProduceRequest = 1,
    ConsumeRequest = 2,
    TopicResponse = 3,
    ProduceResponse = 4,
    ConsumeResponse = 5,
    InvalidResponse = 6,
}

impl EnvelopeKind {
    /// Resolve a wire tag into an envelope kind
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(EnvelopeKind::TopicRequest),
            1 => Some(EnvelopeKind::ProduceRequest),
            2 => Some(EnvelopeKind::ConsumeRequest),
            3 => Some(EnvelopeKind::TopicResponse),
            4 => Some(EnvelopeKind::ProduceResponse),
            5 => Some(EnvelopeKind::ConsumeResponse),
            6 => Some(EnvelopeKind::InvalidResponse),
            _ => None,
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }
}

/// Outer wire structure holding exactly one request or response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Envelope {
    TopicRequest(TopicRequest),
    ProduceRequest(ProduceRequest),
    ConsumeRequest(ConsumeRequest),
    TopicResponse(TopicResponse),
    ProduceResponse(ProduceResponse),
    ConsumeResponse(ConsumeResponse),
    InvalidResponse(InvalidResponse),
}

impl Envelope {
    /// Get the envelope kind
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::TopicRequest(_) => EnvelopeKind::TopicRequest,
            Envelope::ProduceRequest(_) => EnvelopeKind::ProduceRequest,
            Envelope::ConsumeRequest(_) => EnvelopeKind::ConsumeRequest,
            Envelope::TopicResponse(_) => EnvelopeKind::TopicResponse,
            Envelope::ProduceResponse(_) => EnvelopeKind::ProduceResponse,
            Envelope::ConsumeResponse(_) => EnvelopeKind::ConsumeResponse,
            Envelope::InvalidResponse(_) => EnvelopeKind::InvalidResponse,
        }
    }
}
