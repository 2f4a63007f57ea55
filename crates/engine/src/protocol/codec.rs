//! Framing codec.
//!
//! ```text
//! +-------------------+------+---------------------------------+
//! | length (u32 LE)   | flag | postcard body (zlib if flag=1)  |
//! +-------------------+------+---------------------------------+
//! ```
//!
//! The length counts the flag byte and the body. Bodies of at least
//! [`COMPRESSION_THRESHOLD`] bytes are zlib-compressed.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame, compressed or not.
pub const MAX_FRAME: u32 = 8 * 1024 * 1024;
/// Bodies this large or larger are compressed.
pub const COMPRESSION_THRESHOLD: usize = 256;

const FLAG_PLAIN: u8 = 0x00;
const FLAG_ZLIB: u8 = 0x01;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: u32 },
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("decompression failed: {0}")]
    Compression(String),
    #[error("unknown compression flag {0:#04x}")]
    UnknownCompression(u8),
}

/// Serialize `msg` into a frame payload (flag byte + body).
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let body = postcard::to_allocvec(msg).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    if body.len() < COMPRESSION_THRESHOLD {
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(FLAG_PLAIN);
        out.extend_from_slice(&body);
        return Ok(out);
    }

    let mut encoder = ZlibEncoder::new(vec![FLAG_ZLIB], Compression::fast());
    encoder.write_all(&body)?;
    Ok(encoder.finish()?)
}

/// Inverse of [`encode`].
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    let (&flag, rest) = payload
        .split_first()
        .ok_or_else(|| ProtocolError::Decode("empty payload".into()))?;
    let body = match flag {
        FLAG_PLAIN => return postcard::from_bytes(rest).map_err(|e| ProtocolError::Decode(e.to_string())),
        FLAG_ZLIB => {
            let mut body = Vec::new();
            ZlibDecoder::new(rest)
                .take(u64::from(MAX_FRAME) * 4)
                .read_to_end(&mut body)
                .map_err(|e| ProtocolError::Compression(e.to_string()))?;
            body
        }
        other => return Err(ProtocolError::UnknownCompression(other)),
    };
    postcard::from_bytes(&body).map_err(|e| ProtocolError::Decode(e.to_string()))
}

pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = encode(msg)?;
    if payload.len() > MAX_FRAME as usize {
        return Err(ProtocolError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME,
        });
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. A peer that hangs up between frames yields
/// [`ProtocolError::ConnectionClosed`].
pub async fn read_message<R, T>(reader: &mut R) -> Result<T, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len = [0u8; 4];
    reader.read_exact(&mut len).await.map_err(closed_on_eof)?;
    let len = u32::from_le_bytes(len);
    if len > MAX_FRAME {
        return Err(ProtocolError::FrameTooLarge {
            size: len as usize,
            max: MAX_FRAME,
        });
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(closed_on_eof)?;
    decode(&payload)
}

fn closed_on_eof(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::ConnectionClosed
    } else {
        ProtocolError::Io(e)
    }
}
