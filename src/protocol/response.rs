//! Typed responses handed back to callers once an envelope is decoded.

use std::fmt;

use super::{ConsumeResponse, InvalidResponse, ProduceResponse, TopicEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCreateResponse {
    pub success: bool,
    pub topic_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDeleteResponse {
    pub success: bool,
    pub topic_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescribeResponse {
    pub success: bool,
    pub topic_name: String,
    pub max_segment_bytes: u64,
    pub max_retention_bytes: u64,
    pub consumer_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicAllResponse {
    pub success: bool,
    pub topics: Vec<TopicEntry>,
}

/// A decoded broker response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    TopicDescribe(TopicDescribeResponse),
    TopicCreate(TopicCreateResponse),
    TopicDelete(TopicDeleteResponse),
    TopicAll(TopicAllResponse),
    Produce(ProduceResponse),
    Consume(ConsumeResponse),
    /// The broker rejected the request as unintelligible
    Invalid(InvalidResponse),
}

/// Response discriminant, used for logging and contract checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    TopicDescribe,
    TopicCreate,
    TopicDelete,
    TopicAll,
    Produce,
    Consume,
    Invalid,
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseKind::TopicDescribe => "topic describe",
            ResponseKind::TopicCreate => "topic create",
            ResponseKind::TopicDelete => "topic delete",
            ResponseKind::TopicAll => "topic all",
            ResponseKind::Produce => "produce",
            ResponseKind::Consume => "consume",
            ResponseKind::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

impl Response {
    /// Get the response kind
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::TopicDescribe(_) => ResponseKind::TopicDescribe,
            Response::TopicCreate(_) => ResponseKind::TopicCreate,
            Response::TopicDelete(_) => ResponseKind::TopicDelete,
            Response::TopicAll(_) => ResponseKind::TopicAll,
            Response::Produce(_) => ResponseKind::Produce,
            Response::Consume(_) => ResponseKind::Consume,
            Response::Invalid(_) => ResponseKind::Invalid,
        }
    }
}
