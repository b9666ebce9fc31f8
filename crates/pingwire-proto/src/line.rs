//! Newline-delimited JSON codec for tokio.
//!
//! Each frame is one JSON value followed by `\n`. A trailing `\r` is
//! tolerated and blank lines are skipped.

use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Default maximum frame length (64 KiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Codec decoding `In` frames and encoding `Out` frames.
pub struct JsonLineCodec<In, Out> {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length, terminator included
    max_len: usize,
    /// Set after an oversized line; bytes are discarded up to the next newline
    discarding: bool,
    _marker: PhantomData<fn(Out) -> In>,
}

impl<In, Out> JsonLineCodec<In, Out> {
    /// Create a codec with the default frame limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Create a codec with a custom frame limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
            _marker: PhantomData,
        }
    }

    /// The configured frame limit.
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl<In, Out> Default for JsonLineCodec<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In: DeserializeOwned, Out> Decoder for JsonLineCodec<In, Out> {
    type Item = In;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<In>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                // No complete line yet - remember where we stopped
                self.next_index = src.len();
                if src.len() > self.max_len {
                    let actual = src.len();
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                    return Err(ProtocolError::FrameTooLong {
                        actual,
                        limit: self.max_len,
                    });
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if line.len() > self.max_len {
                return Err(ProtocolError::FrameTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let text = std::str::from_utf8(&line).map_err(|e| ProtocolError::InvalidUtf8 {
                byte_pos: e.valid_up_to(),
            })?;
            let text = text.trim_end_matches(['\r', '\n']);
            if text.trim().is_empty() {
                continue;
            }

            return serde_json::from_str(text)
                .map(Some)
                .map_err(|source| ProtocolError::Malformed {
                    line: text.to_string(),
                    source,
                });
        }
    }
}

impl<In, Out: Serialize> Encoder<Out> for JsonLineCodec<In, Out> {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Out, dst: &mut BytesMut) -> error::Result<()> {
        let json = serde_json::to_vec(&frame).map_err(ProtocolError::Encode)?;
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}
