// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Wire-message shapes for the framed TCP protocol and their pure
//! payload-level encode/decode. The byte-level `TAG ‖ LEN ‖ PAYLOAD` framing
//! itself — the part that touches a socket — lives in
//! `skycat::infrastructure::protocol_codec` as a `tokio_util::codec`
//! implementation; this module only knows how to turn a `Frame` into the
//! UTF-8 payload string that goes inside a frame, and back.

use std::fmt;

use crate::chunk_id::ChunkId;
use crate::transaction::TransactionId;

/// Every tag is exactly 8 ASCII bytes on the wire.
pub const TAG_LEN: usize = 8;
/// The decimal length prefix is always 5 zero-padded digits.
pub const LEN_DIGITS: usize = 5;
/// Payloads longer than this cannot be represented in `LEN_DIGITS` digits.
pub const MAX_MSG_LEN: usize = 90_000;
/// Chunk-list frames are capped at this many ids; longer lists fragment
/// across multiple `C_CKCOMP`/`S_CNKLST` frames.
pub const MAX_CHUNKS_IN_MSG: usize = 1000;

/// Separator between list elements within a payload (chunk ids).
pub const SEP: char = ':';
/// Reserved multi-character separator between heterogeneous payload fields.
/// Payloads must not contain this sequence in any field they carry verbatim
/// (filenames, config blobs) — infrastructure adapters reject or escape such
/// input before it reaches this layer.
pub const COMPLEX_SEP: &str = "~COMPLEX~";

macro_rules! tags {
    ($($name:ident => $lit:literal),+ $(,)?) => {
        $(pub const $name: &str = $lit;)+
    };
}

tags! {
    C_INIT_R => "C_INIT_R",
    S_INIT_R => "S_INIT_R",
    C_PCFG_R => "C_PCFG_R",
    S_PCFG_A => "S_PCFG_A",
    C_CHUNKR => "C_CHUNKR",
    S_CNKLST => "S_CNKLST",
    C_TIMING => "C_TIMING",
    C_CKCOMP => "C_CKCOMP",
    C_CKCFIN => "C_CKCFIN",
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("payload of {0} bytes exceeds the {MAX_MSG_LEN}-byte frame limit")]
    FrameTooLarge(usize),
    #[error("unexpected tag {0:?}")]
    UnexpectedTag(String),
    #[error("malformed payload for {tag}: {reason}")]
    Malformed { tag: &'static str, reason: String },
}

/// A decoded protocol message, tag and payload together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    CInitR,
    SInitR {
        name: String,
        objects: u64,
        visits: u64,
        seed: u64,
        cfg_blob: String,
        ingest_dict: String,
    },
    CPcfgR {
        index: u32,
    },
    /// `filename` empty marks end-of-list.
    SPcfgA {
        index: u32,
        filename: String,
        contents: String,
    },
    CChunkR {
        max_count: u32,
    },
    /// Empty `chunk_ids` with `transaction_id = INVALID_ID` is the
    /// end-of-work signal.
    SCnkLst {
        transaction_id: TransactionId,
        chunk_ids: Vec<ChunkId>,
    },
    CTiming {
        serialized_timing: String,
    },
    CCkComp {
        chunk_ids: Vec<ChunkId>,
    },
    CCkCFin,
}

impl Frame {
    pub fn tag(&self) -> &'static str {
        match self {
            Frame::CInitR => C_INIT_R,
            Frame::SInitR { .. } => S_INIT_R,
            Frame::CPcfgR { .. } => C_PCFG_R,
            Frame::SPcfgA { .. } => S_PCFG_A,
            Frame::CChunkR { .. } => C_CHUNKR,
            Frame::SCnkLst { .. } => S_CNKLST,
            Frame::CTiming { .. } => C_TIMING,
            Frame::CCkComp { .. } => C_CKCOMP,
            Frame::CCkCFin => C_CKCFIN,
        }
    }

    /// Encodes this frame's payload (not the tag/length prefix) as the UTF-8
    /// string that will become a frame's `PAYLOAD` bytes.
    pub fn encode_payload(&self) -> Result<String, FrameError> {
        let payload = match self {
            Frame::CInitR => String::new(),
            Frame::SInitR {
                name,
                objects,
                visits,
                seed,
                cfg_blob,
                ingest_dict,
            } => [
                name.as_str(),
                &objects.to_string(),
                &visits.to_string(),
                &seed.to_string(),
                cfg_blob.as_str(),
                ingest_dict.as_str(),
            ]
            .join(COMPLEX_SEP),
            Frame::CPcfgR { index } => index.to_string(),
            Frame::SPcfgA {
                index,
                filename,
                contents,
            } => [index.to_string().as_str(), filename.as_str(), contents.as_str()].join(COMPLEX_SEP),
            Frame::CChunkR { max_count } => max_count.to_string(),
            Frame::SCnkLst {
                transaction_id,
                chunk_ids,
            } => {
                if chunk_ids.len() > MAX_CHUNKS_IN_MSG {
                    return Err(FrameError::Malformed {
                        tag: S_CNKLST,
                        reason: format!("{} chunk ids exceeds the {MAX_CHUNKS_IN_MSG} per-frame cap", chunk_ids.len()),
                    });
                }
                let ids = chunk_ids.iter().map(ChunkId::to_string).collect::<Vec<_>>().join(&SEP.to_string());
                format!("{transaction_id}{COMPLEX_SEP}{ids}")
            }
            Frame::CTiming { serialized_timing } => serialized_timing.clone(),
            Frame::CCkComp { chunk_ids } => {
                if chunk_ids.len() > MAX_CHUNKS_IN_MSG {
                    return Err(FrameError::Malformed {
                        tag: C_CKCOMP,
                        reason: format!("{} chunk ids exceeds the {MAX_CHUNKS_IN_MSG} per-frame cap", chunk_ids.len()),
                    });
                }
                chunk_ids.iter().map(ChunkId::to_string).collect::<Vec<_>>().join(&SEP.to_string())
            }
            Frame::CCkCFin => String::new(),
        };
        if payload.len() > MAX_MSG_LEN {
            return Err(FrameError::FrameTooLarge(payload.len()));
        }
        Ok(payload)
    }

    /// Parses `payload` according to `tag`. Returns `UnexpectedTag` for any
    /// tag not part of the protocol.
    pub fn decode(tag: &str, payload: &str) -> Result<Frame, FrameError> {
        match tag {
            C_INIT_R => Ok(Frame::CInitR),
            S_INIT_R => {
                let parts: Vec<&str> = payload.split(COMPLEX_SEP).collect();
                let [name, objects, visits, seed, cfg_blob, ingest_dict] = parts.as_slice() else {
                    return Err(malformed(S_INIT_R, "expected 6 fields"));
                };
                Ok(Frame::SInitR {
                    name: name.to_string(),
                    objects: objects.parse().map_err(|_| malformed(S_INIT_R, "objects not an integer"))?,
                    visits: visits.parse().map_err(|_| malformed(S_INIT_R, "visits not an integer"))?,
                    seed: seed.parse().map_err(|_| malformed(S_INIT_R, "seed not an integer"))?,
                    cfg_blob: cfg_blob.to_string(),
                    ingest_dict: ingest_dict.to_string(),
                })
            }
            C_PCFG_R => Ok(Frame::CPcfgR {
                index: payload.parse().map_err(|_| malformed(C_PCFG_R, "index not an integer"))?,
            }),
            S_PCFG_A => {
                let parts: Vec<&str> = payload.splitn(3, COMPLEX_SEP).collect();
                let [index, filename, contents] = parts.as_slice() else {
                    return Err(malformed(S_PCFG_A, "expected 3 fields"));
                };
                Ok(Frame::SPcfgA {
                    index: index.parse().map_err(|_| malformed(S_PCFG_A, "index not an integer"))?,
                    filename: filename.to_string(),
                    contents: contents.to_string(),
                })
            }
            C_CHUNKR => Ok(Frame::CChunkR {
                max_count: payload.parse().map_err(|_| malformed(C_CHUNKR, "max_count not an integer"))?,
            }),
            S_CNKLST => {
                let (id_str, ids_str) = payload
                    .split_once(COMPLEX_SEP)
                    .ok_or_else(|| malformed(S_CNKLST, "missing transaction id separator"))?;
                let transaction_id = TransactionId::new(
                    id_str.parse().map_err(|_| malformed(S_CNKLST, "transaction id not an integer"))?,
                );
                let chunk_ids = parse_chunk_id_list(ids_str, S_CNKLST)?;
                Ok(Frame::SCnkLst { transaction_id, chunk_ids })
            }
            C_TIMING => Ok(Frame::CTiming {
                serialized_timing: payload.to_string(),
            }),
            C_CKCOMP => Ok(Frame::CCkComp {
                chunk_ids: parse_chunk_id_list(payload, C_CKCOMP)?,
            }),
            C_CKCFIN => Ok(Frame::CCkCFin),
            other => Err(FrameError::UnexpectedTag(other.to_string())),
        }
    }
}

fn malformed(tag: &'static str, reason: &str) -> FrameError {
    FrameError::Malformed {
        tag,
        reason: reason.to_string(),
    }
}

fn parse_chunk_id_list(raw: &str, tag: &'static str) -> Result<Vec<ChunkId>, FrameError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(SEP)
        .map(|tok| tok.parse::<u32>().map(ChunkId::new).map_err(|_| malformed(tag, "chunk id not an integer")))
        .collect()
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_round_trips() {
        let frame = Frame::SInitR {
            name: "client1".into(),
            objects: 100,
            visits: 10,
            seed: 42,
            cfg_blob: "blob".into(),
            ingest_dict: "{}".into(),
        };
        let payload = frame.encode_payload().unwrap();
        assert_eq!(Frame::decode(S_INIT_R, &payload).unwrap(), frame);
    }

    #[test]
    fn empty_chunk_list_round_trips_as_end_of_work() {
        let frame = Frame::SCnkLst {
            transaction_id: crate::transaction::INVALID_ID,
            chunk_ids: Vec::new(),
        };
        let payload = frame.encode_payload().unwrap();
        assert_eq!(Frame::decode(S_CNKLST, &payload).unwrap(), frame);
    }

    #[test]
    fn chunk_list_round_trips() {
        let frame = Frame::CCkComp {
            chunk_ids: vec![ChunkId::new(1), ChunkId::new(2), ChunkId::new(3)],
        };
        let payload = frame.encode_payload().unwrap();
        assert_eq!(Frame::decode(C_CKCOMP, &payload).unwrap(), frame);
    }

    #[test]
    fn unexpected_tag_is_rejected() {
        let err = Frame::decode("BOGUSTAG", "").unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedTag(_)));
    }

    #[test]
    fn oversized_chunk_list_is_rejected_before_framing() {
        let frame = Frame::CCkComp {
            chunk_ids: (0..=MAX_CHUNKS_IN_MSG as u32).map(ChunkId::new).collect(),
        };
        assert!(matches!(frame.encode_payload(), Err(FrameError::Malformed { .. })));
    }
}
