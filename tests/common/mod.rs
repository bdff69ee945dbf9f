//! In-process broker double speaking the LucidMQ wire protocol.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing_subscriber::EnvFilter;

use lucidmq_client::protocol::{
    decode_envelope, encode_envelope, ConsumeRequest, ConsumeResponse, Envelope, FrameDecoder,
    InvalidResponse, Message, ProduceRequest, ProduceResponse, TopicEntry, TopicOp,
    TopicRequest, TopicResponse,
};

pub const MAX_SEGMENT_BYTES: u64 = 1000;
pub const MAX_RETENTION_BYTES: u64 = 10_000;

#[derive(Default)]
struct TopicLog {
    messages: Vec<Message>,
    cursors: HashMap<String, usize>,
}

#[derive(Default)]
struct BrokerState {
    topics: BTreeMap<String, TopicLog>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Start a broker on an ephemeral port and return its address
pub async fn spawn_broker() -> anyhow::Result<SocketAddr> {
    init_tracing();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = Arc::new(Mutex::new(BrokerState::default()));

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let state = state.clone();
            tokio::spawn(async move {
                if let Err(e) = serve(stream, state).await {
                    tracing::warn!("broker connection ended: {}", e);
                }
            });
        }
    });

    Ok(addr)
}

async fn serve(mut stream: TcpStream, state: Arc<Mutex<BrokerState>>) -> anyhow::Result<()> {
    let mut decoder = FrameDecoder::new();
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        while let Some(payload) = decoder.decode(&mut buf) {
            let reply = match decode_envelope(&payload) {
                Ok(envelope) => handle(&state, envelope),
                Err(_) => invalid(),
            };
            stream.write_all(&encode_envelope(&reply)?).await?;
        }

        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn invalid() -> Envelope {
    Envelope::InvalidResponse(InvalidResponse {
        error_message: "invalid message sent".to_string(),
    })
}

fn handle(state: &Mutex<BrokerState>, envelope: Envelope) -> Envelope {
    let mut state = state.lock().unwrap();
    match envelope {
        Envelope::TopicRequest(request) => Envelope::TopicResponse(topic(&mut state, request)),
        Envelope::ProduceRequest(request) => {
            Envelope::ProduceResponse(produce(&mut state, request))
        }
        Envelope::ConsumeRequest(request) => {
            Envelope::ConsumeResponse(consume(&mut state, request))
        }
        _ => invalid(),
    }
}

fn topic(state: &mut BrokerState, request: TopicRequest) -> TopicResponse {
    let topic_name = request.topic_name;
    match request.op {
        TopicOp::Create => {
            let success = !state.topics.contains_key(&topic_name);
            if success {
                state.topics.insert(topic_name.clone(), TopicLog::default());
            }
            TopicResponse::Create {
                success,
                topic_name,
            }
        }
        TopicOp::Delete => TopicResponse::Delete {
            success: state.topics.remove(&topic_name).is_some(),
            topic_name,
        },
        TopicOp::Describe => match state.topics.get(&topic_name) {
            Some(log) => TopicResponse::Describe {
                success: true,
                topic_name,
                max_segment_bytes: MAX_SEGMENT_BYTES,
                max_retention_bytes: MAX_RETENTION_BYTES,
                consumer_groups: sorted_groups(log),
            },
            None => TopicResponse::Describe {
                success: false,
                topic_name,
                max_segment_bytes: 0,
                max_retention_bytes: 0,
                consumer_groups: vec![],
            },
        },
        TopicOp::All => TopicResponse::All {
            success: true,
            topic_name,
            topics: state
                .topics
                .iter()
                .map(|(name, log)| TopicEntry {
                    topic_name: name.clone(),
                    consumer_groups: sorted_groups(log),
                })
                .collect(),
        },
    }
}

fn sorted_groups(log: &TopicLog) -> Vec<String> {
    let mut groups: Vec<String> = log.cursors.keys().cloned().collect();
    groups.sort();
    groups
}

fn produce(state: &mut BrokerState, request: ProduceRequest) -> ProduceResponse {
    match state.topics.get_mut(&request.topic_name) {
        Some(log) => {
            let offset = log.messages.len() as u64;
            log.messages.extend(request.messages);
            ProduceResponse {
                success: true,
                topic_name: request.topic_name,
                offset,
            }
        }
        None => ProduceResponse {
            success: false,
            topic_name: request.topic_name,
            offset: 0,
        },
    }
}

fn consume(state: &mut BrokerState, request: ConsumeRequest) -> ConsumeResponse {
    let Some(log) = state.topics.get_mut(&request.topic_name) else {
        return ConsumeResponse {
            success: false,
            topic_name: request.topic_name,
            messages: vec![],
        };
    };

    let cursor = log.cursors.entry(request.consumer_group).or_insert(0);
    let messages = log.messages[*cursor..].to_vec();
    *cursor = log.messages.len();

    ConsumeResponse {
        success: !messages.is_empty(),
        topic_name: request.topic_name,
        messages,
    }
}
