// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Byte-level framing: `TAG(8) ‖ LEN(5 decimal) ‖ PAYLOAD(LEN bytes UTF-8)`
//! implemented as a `tokio_util::codec::{Encoder, Decoder}` pair, plus a
//! typed `Connection` wrapper over `Framed` for the per-tag send/receive
//! calls a session makes.

use bytes::{Buf, BufMut, BytesMut};
use skycat_domain::protocol::{Frame, FrameError, LEN_DIGITS, MAX_MSG_LEN, TAG_LEN};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};
use futures::{SinkExt, StreamExt};

use crate::error::InfraError;

#[derive(Debug, Default)]
pub struct FrameCodec;

impl Encoder<Frame> for FrameCodec {
    type Error = InfraError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let tag = frame.tag();
        let payload = frame.encode_payload()?;
        let mut padded_tag = tag.as_bytes().to_vec();
        padded_tag.resize(TAG_LEN, b' ');

        dst.reserve(TAG_LEN + LEN_DIGITS + payload.len());
        dst.put_slice(&padded_tag);
        dst.put_slice(format!("{:0width$}", payload.len(), width = LEN_DIGITS).as_bytes());
        dst.put_slice(payload.as_bytes());
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = InfraError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < TAG_LEN + LEN_DIGITS {
            return Ok(None);
        }
        let len_str = std::str::from_utf8(&src[TAG_LEN..TAG_LEN + LEN_DIGITS])
            .map_err(|_| FrameError::Malformed {
                tag: "HEADER",
                reason: "length prefix is not valid UTF-8".into(),
            })?;
        let len: usize = len_str.trim().parse().map_err(|_| FrameError::Malformed {
            tag: "HEADER",
            reason: "length prefix is not a decimal integer".into(),
        })?;
        if len > MAX_MSG_LEN {
            return Err(FrameError::FrameTooLarge(len).into());
        }

        let total = TAG_LEN + LEN_DIGITS + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let tag_bytes = src[..TAG_LEN].to_vec();
        let tag = std::str::from_utf8(&tag_bytes)
            .map_err(|_| FrameError::Malformed {
                tag: "HEADER",
                reason: "tag is not valid UTF-8".into(),
            })?
            .trim_end()
            .to_string();
        let payload_bytes = src[TAG_LEN + LEN_DIGITS..total].to_vec();
        let payload = String::from_utf8(payload_bytes).map_err(|_| FrameError::Malformed {
            tag: "HEADER",
            reason: "payload is not valid UTF-8".into(),
        })?;

        src.advance(total);
        Ok(Some(Frame::decode(&tag, &payload)?))
    }
}

/// A typed wrapper around a `Framed<S, FrameCodec>` stream, giving session
/// code `send`/`recv` calls on `Frame` values instead of raw bytes.
pub struct Connection<S> {
    inner: Framed<S, FrameCodec>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            inner: Framed::new(stream, FrameCodec),
        }
    }

    pub async fn send(&mut self, frame: Frame) -> Result<(), InfraError> {
        self.inner.send(frame).await
    }

    /// Reads the next frame, or `Err(Transport)` on an unexpected close.
    pub async fn recv(&mut self) -> Result<Frame, InfraError> {
        match self.inner.next().await {
            Some(result) => result,
            None => Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "connection closed").into()),
        }
    }

    /// Expects the next frame to carry tag `expected`; any other tag is a
    /// `ProtocolError`.
    pub async fn recv_expecting(&mut self, expected: &'static str) -> Result<Frame, InfraError> {
        let frame = self.recv().await?;
        if frame.tag() != expected {
            return Err(skycat_domain::error::CoreError::ProtocolError(format!(
                "expected {expected}, got {}",
                frame.tag()
            ))
            .into());
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycat_domain::chunk_id::ChunkId;
    use skycat_domain::protocol::S_CNKLST;
    use skycat_domain::transaction::TransactionId;

    #[test]
    fn encode_then_decode_one_frame() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        let frame = Frame::SCnkLst {
            transaction_id: TransactionId::new(7),
            chunk_ids: vec![ChunkId::new(1), ChunkId::new(2)],
        };
        codec.encode(frame.clone(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_a_complete_frame() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        codec
            .encode(
                Frame::SCnkLst {
                    transaction_id: TransactionId::new(1),
                    chunk_ids: vec![],
                },
                &mut buf,
            )
            .unwrap();
        let mut partial = buf.split_to(buf.len() - 1);
        assert!(codec.decode(&mut partial).unwrap().is_none());
        let _ = S_CNKLST;
    }
}
