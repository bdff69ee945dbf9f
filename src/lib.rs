//! LucidMQ client
//!
//! Builds request envelopes for a LucidMQ broker, frames them onto a TCP
//! stream, and decodes the framed response into a typed value.
//!
//! ```no_run
//! # async fn run() -> Result<(), lucidmq_client::network::ClientError> {
//! use lucidmq_client::network::{Consumer, Producer, TopicManager};
//!
//! let mut topics = TopicManager::connect("localhost", 6969).await?;
//! topics.create_topic("orders").await?;
//!
//! let mut producer = Producer::connect("localhost", 6969).await?;
//! let produced = producer.produce("orders", b"id-1", b"payload").await?;
//! println!("stored at offset {}", produced.offset);
//!
//! let mut consumer = Consumer::connect("localhost", 6969, 100).await?;
//! let consumed = consumer.consume("orders", "billing").await?;
//! for message in consumed.messages {
//!     println!("{:?} => {:?}", message.key, message.value);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod network;
pub mod protocol;

pub use config::ClientConfig;
pub use network::{
    ClientError, ClientResult, Connection, Consumer, Producer, TopicManager, Transport,
};
pub use protocol::{Message, Response, ResponseKind};
