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

//! Derived hashes: per-node data digest and the network-wide digest.
//!
//! Both are the first 8 bytes of SHA-256 over a canonical serialization.
//! The network digest folds `(node id, update number, 0, data hash)` for
//! every reachable node in ascending identifier order; the age field is
//! renormalized to zero so peers hash identical bytes.

use ring::digest;

use crate::core::tlv::{self, Tlv};
use crate::core::types::{Hash64, NodeId, HASH_LEN};

fn truncated_sha256(data: &[u8]) -> Hash64 {
    let d = digest::digest(&digest::SHA256, data);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&d.as_ref()[..HASH_LEN]);
    Hash64::from_bytes(out)
}

/// Digest of a node's canonical TLV serialization.
///
/// Callers must pass the list already in canonical order; the node store
/// maintains that invariant.
pub fn node_data_hash(tlvs: &[Tlv]) -> Hash64 {
    truncated_sha256(&tlv::encode_stream(tlvs))
}

/// Network digest over reachable node summaries in ascending identifier order.
pub fn network_hash<'a, I>(summaries: I) -> Hash64
where
    I: IntoIterator<Item = (&'a NodeId, u32, &'a Hash64)>,
{
    let mut buf = Vec::new();
    for (id, update_number, data_hash) in summaries {
        buf.extend_from_slice(id.as_bytes());
        buf.extend_from_slice(&update_number.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(data_hash.as_bytes());
    }
    truncated_sha256(&buf)
}
