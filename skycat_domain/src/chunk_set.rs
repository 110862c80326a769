// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Pure parsing and serialization of chunk-id sets: the text format shared by
//! `.clg` log files (newline-separated) and the `--raw` CLI flag
//! (comma-separated). No file I/O here — see `skycat::infrastructure::chunk_list_file`
//! for the durable, append-tolerant file wrapper built on top of this module.

use std::collections::HashSet;

use crate::chunk_id::ChunkId;
use crate::error::CoreError;

/// Splits `raw` on `sep`, parsing each non-empty token as either a decimal
/// chunk id or an inclusive range `a:b` (order-insensitive: `7:3` and `3:7`
/// both yield `{3,4,5,6,7}`). Blank and whitespace-only tokens are ignored.
pub fn parse(raw: &str, sep: char) -> Result<HashSet<ChunkId>, CoreError> {
    let mut ids = HashSet::new();
    for token in raw.split(sep) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some((a, b)) = token.split_once(':') {
            let a: u32 = a
                .trim()
                .parse()
                .map_err(|_| CoreError::parse(token, "range endpoint is not a decimal integer"))?;
            let b: u32 = b
                .trim()
                .parse()
                .map_err(|_| CoreError::parse(token, "range endpoint is not a decimal integer"))?;
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            ids.extend((lo..=hi).map(ChunkId::new));
        } else {
            let id: u32 = token
                .parse()
                .map_err(|_| CoreError::parse(token, "not a decimal integer or a:b range"))?;
            ids.insert(ChunkId::new(id));
        }
    }
    Ok(ids)
}

/// Parses `raw` with a newline separator, tolerating a trailing newline and
/// a stray carriage return on each line (files written on Windows or copied
/// through a CRLF transport are still readable).
pub fn parse_lines(raw: &str) -> Result<HashSet<ChunkId>, CoreError> {
    let normalized = raw.replace("\r\n", "\n");
    parse(&normalized, '\n')
}

/// Comma-separated parse, used for the `--raw` CLI flag.
pub fn parse_csv(raw: &str) -> Result<HashSet<ChunkId>, CoreError> {
    parse(raw, ',')
}

/// Serializes a chunk-id set as newline-separated decimals in ascending
/// order, so repeated writes of the same set are byte-identical (useful for
/// diffing `.clg` files across runs).
pub fn serialize(ids: &HashSet<ChunkId>) -> String {
    let mut sorted: Vec<ChunkId> = ids.iter().copied().collect();
    sorted.sort_unstable();
    sorted.into_iter().map(|id| id.to_string()).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_decimals() {
        let got = parse_csv("1,2,3").unwrap();
        assert_eq!(got, [1, 2, 3].into_iter().map(ChunkId::new).collect());
    }

    #[test]
    fn range_is_inclusive_both_orders() {
        let forward = parse_csv("3:7").unwrap();
        let backward = parse_csv("7:3").unwrap();
        let expected: HashSet<ChunkId> = (3..=7).map(ChunkId::new).collect();
        assert_eq!(forward, expected);
        assert_eq!(backward, expected);
    }

    #[test]
    fn range_and_singletons_and_duplicates() {
        let got = parse_csv("3:7,10,10,12").unwrap();
        let expected: HashSet<ChunkId> = [3, 4, 5, 6, 7, 10, 12].into_iter().map(ChunkId::new).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn blank_tokens_are_ignored() {
        let got = parse_lines("1\n\n2\n   \n3\n").unwrap();
        assert_eq!(got, [1, 2, 3].into_iter().map(ChunkId::new).collect());
    }

    #[test]
    fn malformed_token_is_a_parse_error() {
        let err = parse_lines("3:15\n3w0\n77").unwrap_err();
        assert!(matches!(err, CoreError::ParseError { .. }));
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let ids: HashSet<ChunkId> = [5, 1, 3, 9].into_iter().map(ChunkId::new).collect();
        let text = serialize(&ids);
        assert_eq!(parse_lines(&text).unwrap(), ids);
    }

    #[test]
    fn parse_is_idempotent_on_its_own_serialized_output() {
        let ids: HashSet<ChunkId> = [5, 1, 3, 9].into_iter().map(ChunkId::new).collect();
        let once = serialize(&ids);
        let twice = serialize(&parse_lines(&once).unwrap());
        assert_eq!(once, twice);
    }
}
