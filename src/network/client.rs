//! LucidMQ role clients
//!
//! Each client owns one transport and issues a single request family:
//! topic administration, producing, or consuming.

use bytes::Bytes;
use thiserror::Error;

use super::connection::{Connection, ConnectionError, Transport};
use crate::config::{BrokerConfig, ClientConfig};
use crate::protocol::{
    consume_request, decode_response, produce_request_at, topic_request_all,
    topic_request_create, topic_request_delete, topic_request_describe, CodecError,
    ConsumeResponse, MessageClock, ProduceResponse, Response, ResponseKind,
    TopicAllResponse, TopicCreateResponse, TopicDeleteResponse, TopicDescribeResponse,
};

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Broker rejected request: {0}")]
    Rejected(String),

    #[error("Expected {expected} response, got {actual}")]
    UnexpectedResponse {
        expected: ResponseKind,
        actual: ResponseKind,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Send one request and decode the single response frame
pub async fn exchange<T>(transport: &mut T, request: Bytes) -> ClientResult<Response>
where
    T: Transport + ?Sized,
{
    let payload = transport.round_trip(request).await?;
    let response = decode_response(&payload)?;

    tracing::debug!("Received {} response", response.kind());

    match response {
        Response::Invalid(invalid) => {
            tracing::warn!("Broker rejected request: {}", invalid.error_message);
            Err(ClientError::Rejected(invalid.error_message))
        }
        other => Ok(other),
    }
}

fn unexpected(expected: ResponseKind, actual: &Response) -> ClientError {
    tracing::error!(
        "Response kind mismatch: sent a {} request, got a {} response",
        expected,
        actual.kind()
    );
    ClientError::UnexpectedResponse {
        expected,
        actual: actual.kind(),
    }
}

/// Topic administration client
pub struct TopicManager<T = Connection> {
    transport: T,
}

impl TopicManager<Connection> {
    /// Connect to a broker by host and port
    pub async fn connect(host: &str, port: u16) -> ClientResult<Self> {
        Self::from_broker(&BrokerConfig::new(host, port)).await
    }

    pub async fn from_broker(broker: &BrokerConfig) -> ClientResult<Self> {
        Ok(Self::new(Connection::open(broker).await?))
    }

    pub async fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::from_broker(&config.broker).await
    }
}

impl<T: Transport> TopicManager<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub async fn create_topic(&mut self, topic_name: &str) -> ClientResult<TopicCreateResponse> {
        let request = topic_request_create(topic_name)?;
        match exchange(&mut self.transport, request).await? {
            Response::TopicCreate(response) => Ok(response),
            other => Err(unexpected(ResponseKind::TopicCreate, &other)),
        }
    }

    pub async fn describe_topic(
        &mut self,
        topic_name: &str,
    ) -> ClientResult<TopicDescribeResponse> {
        let request = topic_request_describe(topic_name)?;
        match exchange(&mut self.transport, request).await? {
            Response::TopicDescribe(response) => Ok(response),
            other => Err(unexpected(ResponseKind::TopicDescribe, &other)),
        }
    }

    pub async fn delete_topic(&mut self, topic_name: &str) -> ClientResult<TopicDeleteResponse> {
        let request = topic_request_delete(topic_name)?;
        match exchange(&mut self.transport, request).await? {
            Response::TopicDelete(response) => Ok(response),
            other => Err(unexpected(ResponseKind::TopicDelete, &other)),
        }
    }

    /// List every topic on the broker
    pub async fn all_topics(&mut self) -> ClientResult<TopicAllResponse> {
        let request = topic_request_all()?;
        match exchange(&mut self.transport, request).await? {
            Response::TopicAll(response) => Ok(response),
            other => Err(unexpected(ResponseKind::TopicAll, &other)),
        }
    }

    pub async fn close(mut self) -> ClientResult<()> {
        self.transport.shutdown().await?;
        Ok(())
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

/// Producer client
pub struct Producer<T = Connection> {
    transport: T,
    clock: MessageClock,
}

impl Producer<Connection> {
    /// Connect to a broker by host and port
    pub async fn connect(host: &str, port: u16) -> ClientResult<Self> {
        Self::from_broker(&BrokerConfig::new(host, port)).await
    }

    pub async fn from_broker(broker: &BrokerConfig) -> ClientResult<Self> {
        Ok(Self::new(Connection::open(broker).await?))
    }

    pub async fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::from_broker(&config.broker).await
    }
}

impl<T: Transport> Producer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            clock: MessageClock::new(),
        }
    }

    /// Produce one message, stamped with the current time
    pub async fn produce(
        &mut self,
        topic_name: &str,
        key: &[u8],
        value: &[u8],
    ) -> ClientResult<ProduceResponse> {
        let timestamp = self.clock.stamp();
        let request = produce_request_at(topic_name, key, value, timestamp)?;

        match exchange(&mut self.transport, request).await? {
            Response::Produce(response) => Ok(response),
            other => Err(unexpected(ResponseKind::Produce, &other)),
        }
    }

    /// Timestamp of the most recently produced message
    pub fn last_timestamp(&self) -> u64 {
        self.clock.last()
    }

    pub async fn close(mut self) -> ClientResult<()> {
        self.transport.shutdown().await?;
        Ok(())
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

/// Consumer client
pub struct Consumer<T = Connection> {
    transport: T,
    /// Sent with every consume request, in ms
    timeout: u64,
}

impl Consumer<Connection> {
    /// Connect to a broker by host and port
    pub async fn connect(host: &str, port: u16, timeout: u64) -> ClientResult<Self> {
        Self::from_broker(&BrokerConfig::new(host, port), timeout).await
    }

    pub async fn from_broker(broker: &BrokerConfig, timeout: u64) -> ClientResult<Self> {
        Ok(Self::new(Connection::open(broker).await?, timeout))
    }

    pub async fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::from_broker(&config.broker, config.consumer.timeout_ms).await
    }
}

impl<T: Transport> Consumer<T> {
    pub fn new(transport: T, timeout: u64) -> Self {
        Self { transport, timeout }
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    /// Fetch the messages `consumer_group` has not yet seen on `topic_name`
    pub async fn consume(
        &mut self,
        topic_name: &str,
        consumer_group: &str,
    ) -> ClientResult<ConsumeResponse> {
        let request = consume_request(topic_name, consumer_group, self.timeout)?;

        match exchange(&mut self.transport, request).await? {
            Response::Consume(response) => Ok(response),
            other => Err(unexpected(ResponseKind::Consume, &other)),
        }
    }

    pub async fn close(mut self) -> ClientResult<()> {
        self.transport.shutdown().await?;
        Ok(())
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}
