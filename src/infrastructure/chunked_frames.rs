// Length-prefixed frame streaming utilities
//
// Wire format, both directions: 4-byte big-endian payload length followed by
// the payload. Outbound payloads are JSON, optionally Brotli-compressed per
// frame.
use async_compression::tokio::bufread::BrotliEncoder;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::application::ingestion::DecodeError;

/// Largest payload accepted on inbound streams.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

const LENGTH_PREFIX: usize = 4;

/// Create a chunked frame streaming response
pub async fn chunked_json_stream<S, T>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + Sync + 'static,
{
    let byte_stream = stream.then(move |msg| async move { serialize_chunk(&msg, compress).await });

    let body = Body::from_stream(byte_stream);

    // No Content-Encoding: chunks are compressed individually, not the HTTP body.
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndframe+json")
        .header(header::TRANSFER_ENCODING, "chunked");

    response
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize a single message to a length-prefixed chunk
async fn serialize_chunk<T: Serialize>(msg: &T, compress: bool) -> Result<Bytes, std::io::Error> {
    let buffer = serde_json::to_vec(msg).map_err(std::io::Error::other)?;

    let payload = if compress {
        brotli_compress(buffer).await?
    } else {
        buffer
    };

    Ok(encode_frame(&payload))
}

pub async fn brotli_compress(data: Vec<u8>) -> Result<Vec<u8>, std::io::Error> {
    let cursor = std::io::Cursor::new(data);
    let mut encoder = BrotliEncoder::new(cursor);
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed).await?;
    Ok(compressed)
}

pub fn encode_frame(payload: &[u8]) -> Bytes {
    let mut chunk = BytesMut::with_capacity(LENGTH_PREFIX + payload.len());
    chunk.put_u32(payload.len() as u32);
    chunk.put_slice(payload);
    chunk.freeze()
}

/// Incremental decoder for inbound length-prefixed frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Next complete frame, `Ok(None)` if more bytes are needed.
    ///
    /// An oversized length prefix poisons the rest of the buffer: there is no
    /// way to find the next frame boundary, so everything buffered is dropped.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, DecodeError> {
        if self.buffer.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        let len = u32::from_be_bytes([self.buffer[0], self.buffer[1], self.buffer[2], self.buffer[3]]) as usize;
        if len > MAX_FRAME_LEN {
            self.buffer.clear();
            return Err(DecodeError::FrameTooLarge(len));
        }

        if self.buffer.len() < LENGTH_PREFIX + len {
            return Ok(None);
        }

        self.buffer.advance(LENGTH_PREFIX);
        Ok(Some(self.buffer.split_to(len).freeze()))
    }

    /// Bytes left over once the input has ended.
    pub fn remaining(&self) -> usize {
        self.buffer.len()
    }
}

/// Helper to create a streaming response from a receiver
pub async fn stream_from_receiver<T>(mut rx: tokio::sync::mpsc::Receiver<T>, compress: bool) -> impl IntoResponse
where
    T: Serialize + Send + Sync + 'static,
{
    let stream = async_stream::stream! {
        while let Some(msg) = rx.recv().await {
            yield msg;
        }
    };

    match chunked_json_stream(stream, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
