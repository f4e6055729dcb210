// Copyright (c) 2026 Hearthnet
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Binary type-length-value codec.
//!
//! Wire layout per record: 16-bit type, 16-bit payload length (excluding
//! header and pad), payload, zero pad to 4-byte alignment. A container TLV
//! nests further records in its payload; nesting is decoded with the same
//! iterator over the payload bytes.

use thiserror::Error;

/// Codec error.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TlvError {
    /// A declared length would run past the end of the buffer.
    #[error("truncated tlv stream")]
    Truncated,
    /// Alignment pad bytes were non-zero.
    #[error("non-zero pad bytes")]
    BadPad,
}

/// Byte length of the type/length header.
pub const TLV_HEADER_LEN: usize = 4;

/// A single decoded attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tlv {
    /// Attribute type.
    pub typ: u16,
    /// Attribute payload, without header or pad.
    pub payload: Vec<u8>,
}

impl Tlv {
    /// Construct an attribute.
    pub fn new(typ: u16, payload: Vec<u8>) -> Self {
        Self { typ, payload }
    }

    /// Encoded size including header and alignment pad.
    pub fn encoded_len(&self) -> usize {
        TLV_HEADER_LEN + pad4(self.payload.len())
    }

    /// Canonical ordering: ascending type, then payload bytes.
    pub fn canonical_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.typ
            .cmp(&other.typ)
            .then_with(|| self.payload.cmp(&other.payload))
    }
}

impl PartialOrd for Tlv {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tlv {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical_cmp(other)
    }
}

fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

/// Append one attribute to `out`, padding with zeros to 4-byte alignment.
pub fn encode_into(out: &mut Vec<u8>, typ: u16, payload: &[u8]) {
    debug_assert!(payload.len() <= u16::MAX as usize);
    out.extend_from_slice(&typ.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    for _ in payload.len()..pad4(payload.len()) {
        out.push(0);
    }
}

/// Encode a sequence of attributes in caller order.
pub fn encode_stream(tlvs: &[Tlv]) -> Vec<u8> {
    let total = tlvs.iter().map(Tlv::encoded_len).sum();
    let mut out = Vec::with_capacity(total);
    for t in tlvs {
        encode_into(&mut out, t.typ, &t.payload);
    }
    out
}

/// Lazy iterator over a TLV stream. Yields `(type, payload)` views; stops
/// permanently after the first error.
pub struct TlvIter<'a> {
    buf: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Result<(u16, &'a [u8]), TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.buf.len() {
            return None;
        }
        let rest = &self.buf[self.pos..];
        if rest.len() < TLV_HEADER_LEN {
            self.failed = true;
            return Some(Err(TlvError::Truncated));
        }
        let typ = u16::from_be_bytes([rest[0], rest[1]]);
        let len = u16::from_be_bytes([rest[2], rest[3]]) as usize;
        if rest.len() < TLV_HEADER_LEN + len {
            self.failed = true;
            return Some(Err(TlvError::Truncated));
        }
        let payload = &rest[TLV_HEADER_LEN..TLV_HEADER_LEN + len];
        // The final record may end flush with the buffer; any pad bytes that
        // are present must be zero.
        let aligned = TLV_HEADER_LEN + pad4(len);
        let pad_end = aligned.min(rest.len());
        if rest[TLV_HEADER_LEN + len..pad_end].iter().any(|&b| b != 0) {
            self.failed = true;
            return Some(Err(TlvError::BadPad));
        }
        self.pos += pad_end;
        Some(Ok((typ, payload)))
    }
}

/// Iterate a TLV stream without copying payloads.
pub fn iter(buf: &[u8]) -> TlvIter<'_> {
    TlvIter {
        buf,
        pos: 0,
        failed: false,
    }
}

/// Iterate the records nested inside a container payload.
pub fn iter_nested(payload: &[u8]) -> TlvIter<'_> {
    iter(payload)
}

/// Decode a whole stream into owned attributes, order preserved.
pub fn decode_stream(buf: &[u8]) -> Result<Vec<Tlv>, TlvError> {
    let mut out = Vec::new();
    for item in iter(buf) {
        let (typ, payload) = item?;
        out.push(Tlv::new(typ, payload.to_vec()));
    }
    Ok(out)
}
