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

//! Notification facade through which application layers observe state changes.
//!
//! Callbacks run synchronously on the engine task and must not block. A
//! callback that wants to publish or unpublish queues the mutation on the
//! provided [`PublishQueue`]; the engine applies queued mutations after the
//! dispatch completes, so re-entrant publishes never recurse into the store.

use crate::core::tlv::Tlv;
use crate::core::types::NodeId;

/// A deferred local-node mutation requested from inside a callback.
#[derive(Clone, Debug)]
pub enum PendingOp {
    /// Publish an attribute on the local node.
    Publish(Tlv),
    /// Remove an attribute from the local node.
    Unpublish(Tlv),
}

/// Mutation queue handed to subscriber callbacks.
#[derive(Debug, Default)]
pub struct PublishQueue {
    ops: Vec<PendingOp>,
}

impl PublishQueue {
    /// Queue a publish.
    pub fn publish(&mut self, tlv: Tlv) {
        self.ops.push(PendingOp::Publish(tlv));
    }

    /// Queue an unpublish.
    pub fn unpublish(&mut self, tlv: Tlv) {
        self.ops.push(PendingOp::Unpublish(tlv));
    }

    /// Drain queued operations in request order.
    pub fn drain(&mut self) -> Vec<PendingOp> {
        std::mem::take(&mut self.ops)
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Capability object registered with the engine. All methods default to no-ops
/// so implementors pick only the notifications they care about.
pub trait Subscriber: Send {
    /// An attribute was added to or removed from the local node.
    fn local_tlv_change(&mut self, _tlv: &Tlv, _added: bool, _queue: &mut PublishQueue) {}

    /// An attribute was added to or removed from a remote node's data.
    fn remote_tlv_change(
        &mut self,
        _node: &NodeId,
        _tlv: &Tlv,
        _added: bool,
        _queue: &mut PublishQueue,
    ) {
    }

    /// The engine regenerated the local node record (collision recovery or
    /// identifier change); derived attributes should be re-emitted.
    fn republish(&mut self, _queue: &mut PublishQueue) {}

    /// An endpoint went up or down.
    fn link_address_changed(&mut self, _endpoint: &str, _up: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_drains_in_order() {
        let mut q = PublishQueue::default();
        q.publish(Tlv::new(51, b"a".to_vec()));
        q.unpublish(Tlv::new(51, b"a".to_vec()));
        let ops = q.drain();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], PendingOp::Publish(_)));
        assert!(matches!(ops[1], PendingOp::Unpublish(_)));
        assert!(q.is_empty());
    }
}
