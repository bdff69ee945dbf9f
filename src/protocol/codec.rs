//! Envelope codec
//!
//! Builds framed request envelopes and turns response payloads back into
//! typed `Response` values. Tags are resolved before the body is
//! deserialized so that out-of-protocol input is reported as an invalid
//! message rather than a malformed one.

use bincode::Options;
use bytes::{Buf, Bytes};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use super::{
    frame, ConsumeRequest, Envelope, EnvelopeKind, FramingError, Message, ProduceRequest,
    Response, TopicAllResponse, TopicCreateResponse, TopicDeleteResponse, TopicDescribeResponse,
    TopicOp, TopicRequest, TopicResponse, ALL_TOPICS_PLACEHOLDER,
};

/// Size of a bincode enum variant index
const TAG_SIZE: usize = 4;

/// Offset of the nested topic operation tag inside a topic envelope
const TOPIC_OP_OFFSET: usize = TAG_SIZE;

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Encoding error: {0}")]
    Encoding(#[source] bincode::Error),

    #[error("Decoding error: {0}")]
    Decoding(#[source] bincode::Error),

    #[error("message is invalid")]
    InvalidMessage { tag: Option<u32> },
}

pub type CodecResult<T> = Result<T, CodecError>;

impl TopicRequest {
    pub fn new(op: TopicOp, topic_name: impl Into<String>) -> Self {
        Self {
            op,
            topic_name: topic_name.into(),
        }
    }

    /// Listing request; carries the placeholder name
    pub fn all() -> Self {
        Self::new(TopicOp::All, ALL_TOPICS_PLACEHOLDER)
    }
}

impl ProduceRequest {
    /// A request carrying exactly one message
    pub fn single(topic_name: impl Into<String>, message: Message) -> Self {
        Self {
            topic_name: topic_name.into(),
            messages: vec![message],
        }
    }
}

impl ConsumeRequest {
    pub fn new(
        topic_name: impl Into<String>,
        consumer_group: impl Into<String>,
        timeout: u64,
    ) -> Self {
        Self {
            topic_name: topic_name.into(),
            consumer_group: consumer_group.into(),
            timeout,
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Stamps produced messages, never going backwards
#[derive(Debug, Default, Clone)]
pub struct MessageClock {
    last: u64,
}

impl MessageClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wall-clock milliseconds, clamped to the last value handed out
    pub fn stamp(&mut self) -> u64 {
        self.last = self.last.max(now_millis());
        self.last
    }

    pub fn last(&self) -> u64 {
        self.last
    }
}

/// Little-endian, fixed-width integers, and nothing after the envelope
fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Serialize an envelope without framing it
pub fn encode_payload(envelope: &Envelope) -> CodecResult<Vec<u8>> {
    wire_options()
        .serialize(envelope)
        .map_err(CodecError::Encoding)
}

/// Serialize and frame an envelope
pub fn encode_envelope(envelope: &Envelope) -> CodecResult<Bytes> {
    let payload = encode_payload(envelope)?;
    let framed = frame(&payload)?;
    tracing::trace!("Encoded {:?} envelope ({} bytes)", envelope.kind(), framed.len());
    Ok(framed)
}

pub fn topic_request_describe(topic_name: &str) -> CodecResult<Bytes> {
    let request = TopicRequest::new(TopicOp::Describe, topic_name);
    encode_envelope(&Envelope::TopicRequest(request))
}

pub fn topic_request_create(topic_name: &str) -> CodecResult<Bytes> {
    let request = TopicRequest::new(TopicOp::Create, topic_name);
    encode_envelope(&Envelope::TopicRequest(request))
}

pub fn topic_request_delete(topic_name: &str) -> CodecResult<Bytes> {
    let request = TopicRequest::new(TopicOp::Delete, topic_name);
    encode_envelope(&Envelope::TopicRequest(request))
}

pub fn topic_request_all() -> CodecResult<Bytes> {
    encode_envelope(&Envelope::TopicRequest(TopicRequest::all()))
}

/// Produce request stamped with the current time
pub fn produce_request(topic_name: &str, key: &[u8], value: &[u8]) -> CodecResult<Bytes> {
    produce_request_at(topic_name, key, value, now_millis())
}

/// Produce request stamped with `timestamp`
pub fn produce_request_at(
    topic_name: &str,
    key: &[u8],
    value: &[u8],
    timestamp: u64,
) -> CodecResult<Bytes> {
    let message = Message::new(key, value, timestamp);
    let request = ProduceRequest::single(topic_name, message);
    encode_envelope(&Envelope::ProduceRequest(request))
}

pub fn consume_request(
    topic_name: &str,
    consumer_group: &str,
    timeout: u64,
) -> CodecResult<Bytes> {
    let request = ConsumeRequest::new(topic_name, consumer_group, timeout);
    encode_envelope(&Envelope::ConsumeRequest(request))
}

fn peek_tag(payload: &[u8], at: usize) -> Option<u32> {
    let mut tag = payload.get(at..at + TAG_SIZE)?;
    Some(tag.get_u32_le())
}

/// Decode any envelope, request or response
///
/// Unknown envelope or topic operation tags yield `InvalidMessage`; a known
/// tag followed by a body that does not deserialize, or by bytes past the end
/// of the envelope, yields `Decoding`.
pub fn decode_envelope(payload: &[u8]) -> CodecResult<Envelope> {
    let tag = peek_tag(payload, 0);
    let kind = tag
        .and_then(EnvelopeKind::from_tag)
        .ok_or(CodecError::InvalidMessage { tag })?;

    if matches!(kind, EnvelopeKind::TopicRequest | EnvelopeKind::TopicResponse) {
        let op_tag = peek_tag(payload, TOPIC_OP_OFFSET);
        if op_tag.and_then(TopicOp::from_tag).is_none() {
            return Err(CodecError::InvalidMessage { tag: op_tag });
        }
    }

    wire_options()
        .deserialize(payload)
        .map_err(CodecError::Decoding)
}

/// Decode a broker response payload into a typed value
pub fn decode_response(payload: &[u8]) -> CodecResult<Response> {
    let envelope = decode_envelope(payload)?;
    let kind = envelope.kind();

    let response = match envelope {
        Envelope::TopicResponse(topic) => match topic {
            TopicResponse::Describe {
                success,
                topic_name,
                max_segment_bytes,
                max_retention_bytes,
                consumer_groups,
            } => Response::TopicDescribe(TopicDescribeResponse {
                success,
                topic_name,
                max_segment_bytes,
                max_retention_bytes,
                consumer_groups,
            }),
            TopicResponse::Create {
                success,
                topic_name,
            } => Response::TopicCreate(TopicCreateResponse {
                success,
                topic_name,
            }),
            TopicResponse::Delete {
                success,
                topic_name,
            } => Response::TopicDelete(TopicDeleteResponse {
                success,
                topic_name,
            }),
            TopicResponse::All {
                success, topics, ..
            } => Response::TopicAll(TopicAllResponse { success, topics }),
        },
        Envelope::ProduceResponse(produce) => Response::Produce(produce),
        Envelope::ConsumeResponse(consume) => Response::Consume(consume),
        Envelope::InvalidResponse(invalid) => Response::Invalid(invalid),
        Envelope::TopicRequest(_)
        | Envelope::ProduceRequest(_)
        | Envelope::ConsumeRequest(_) => {
            return Err(CodecError::InvalidMessage {
                tag: Some(kind.tag()),
            });
        }
    };

    tracing::trace!("Decoded {} response", response.kind());
    Ok(response)
}
