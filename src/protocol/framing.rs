//! Length-prefixed framing over a byte stream.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::MAX_PAYLOAD_SIZE;

/// Length prefix size: u16 little-endian
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Framing errors
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("Payload too large: {0} bytes (max: {max})", max = MAX_PAYLOAD_SIZE)]
    PayloadTooLarge(usize),

    #[error("Stream closed after {read} of {expected} bytes")]
    Truncated { expected: usize, read: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type FramingResult<T> = Result<T, FramingError>;

/// Prepend the little-endian length prefix to `payload`.
pub fn frame(payload: &[u8]) -> FramingResult<Bytes> {
    let len = u16::try_from(payload.len())
        .map_err(|_| FramingError::PayloadTooLarge(payload.len()))?;

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u16_le(len);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Read exactly one frame from `reader` and return its payload.
pub async fn unframe<R>(reader: &mut R) -> FramingResult<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    read_full(reader, &mut prefix).await?;
    let len = u16::from_le_bytes(prefix) as usize;

    let mut payload = vec![0u8; len];
    read_full(reader, &mut payload).await?;
    Ok(Bytes::from(payload))
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> FramingResult<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut read = 0;
    while read < buf.len() {
        let n = reader.read(&mut buf[read..]).await?;
        if n == 0 {
            return Err(FramingError::Truncated {
                expected: buf.len(),
                read,
            });
        }
        read += n;
    }
    Ok(())
}

/// Incremental frame decoder for callers that read arbitrary chunks
pub struct FrameDecoder {
    state: DecodeState,
}

#[derive(Default)]
enum DecodeState {
    #[default]
    Prefix,
    Payload {
        length: usize,
    },
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::Prefix,
        }
    }

    /// Attempt to decode one payload from the buffer
    /// Returns None if more data is needed
    pub fn decode(&mut self, buf: &mut BytesMut) -> Option<Bytes> {
        loop {
            match self.state {
                DecodeState::Prefix => {
                    if buf.len() < LENGTH_PREFIX_SIZE {
                        return None;
                    }
                    let length = buf.get_u16_le() as usize;
                    self.state = DecodeState::Payload { length };
                }
                DecodeState::Payload { length } => {
                    if buf.len() < length {
                        return None;
                    }
                    self.state = DecodeState::Prefix;
                    return Some(buf.split_to(length).freeze());
                }
            }
        }
    }

    /// True when no partial frame is pending
    pub fn is_idle(&self) -> bool {
        matches!(self.state, DecodeState::Prefix)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
