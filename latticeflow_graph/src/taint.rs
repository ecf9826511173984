// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Taint/evaluation protocol engine, built on `understory_dirty`.
//!
//! This module owns the dependency graph between output keys and answers
//! "what is dirty" queries; it does not itself run compute functions — that
//! is [`crate::graph::Graph::touch`]'s job. Keeping the two separate keeps
//! dirty-tracking and the execution loop independently testable.

use hashbrown::HashMap;
use understory_dirty::intern::Interner;
use understory_dirty::{Channel, CycleHandling, DirtyTracker, InternId, LazyPolicy};

use crate::node::NodeId;

const TAINT_CHANNEL: Channel = Channel::new(0);

/// Identifies one output endpoint in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    /// Owning node.
    pub node: NodeId,
    /// Output name within that node.
    pub output: Box<str>,
}

impl EndpointKey {
    /// Builds a new key.
    #[must_use]
    pub fn new(node: NodeId, output: impl Into<Box<str>>) -> Self {
        Self {
            node,
            output: output.into(),
        }
    }
}

/// Interned id for a [`EndpointKey`]. `understory_dirty` requires `Copy` keys.
pub type TaintKey = InternId;

/// Taint engine: interns [`EndpointKey`]s, tracks their dependency edges, and
/// answers which are dirty.
///
/// The interner grows monotonically for the lifetime of the graph; keys are
/// never removed.
#[derive(Debug, Default)]
pub struct TaintEngine {
    tracker: DirtyTracker<TaintKey>,
    keys: Interner<EndpointKey>,
    /// Reverse index so node construction/connect code can look a key back
    /// up by its (node, output) pair without re-interning (interning is
    /// idempotent, but this avoids an allocation on the hot `taint` path).
    lookup: HashMap<EndpointKey, TaintKey>,
}

impl TaintEngine {
    /// Creates a fresh, empty taint engine using a single channel and
    /// rejecting dependency cycles (construction-time cycle prevention is a
    /// builder responsibility per §5; the engine only refuses to silently
    /// accept one).
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracker: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            keys: Interner::new(),
            lookup: HashMap::new(),
        }
    }

    /// Interns `key`, returning its compact id (idempotent).
    pub fn intern(&mut self, key: EndpointKey) -> TaintKey {
        if let Some(id) = self.lookup.get(&key) {
            return *id;
        }
        let id = self.keys.intern(key.clone());
        self.lookup.insert(key, id);
        id
    }

    /// Marks `key` dirty. Propagation to dependents happens lazily, during
    /// [`Self::drain`] / [`Self::drain_within_dependencies_of`].
    pub fn mark_dirty(&mut self, key: TaintKey) {
        self.tracker.mark_with(key, TAINT_CHANNEL, &LazyPolicy);
    }

    /// Drains all dirty/affected keys in a deterministic order.
    pub fn drain(&mut self) -> impl Iterator<Item = (TaintKey, &EndpointKey)> + '_ {
        let keys = &self.keys;
        self.tracker
            .drain(TAINT_CHANNEL)
            .affected()
            .deterministic()
            .run()
            .filter_map(move |id| keys.get(id).map(|k| (id, k)))
    }

    /// Drains dirty/affected keys restricted to the dependency closure of
    /// `key` (used by a targeted `touch` of a single output, so unrelated
    /// dirty work elsewhere in the graph is left untouched for later).
    pub fn drain_within_dependencies_of(
        &mut self,
        key: TaintKey,
    ) -> impl Iterator<Item = (TaintKey, &EndpointKey)> + '_ {
        let keys = &self.keys;
        self.tracker
            .drain(TAINT_CHANNEL)
            .affected()
            .within_dependencies_of(key)
            .deterministic()
            .run()
            .filter_map(move |id| keys.get(id).map(|k| (id, k)))
    }

    /// Replaces `from`'s dependency set wholesale. Rejects cycles, leaving
    /// the previous set unchanged if one would be introduced.
    pub fn set_dependencies(&mut self, from: TaintKey, to: impl IntoIterator<Item = TaintKey>) {
        let _ = self
            .tracker
            .graph_mut()
            .replace_dependencies(from, TAINT_CHANNEL, to, CycleHandling::Error);
    }

    /// Adds a single dependency edge `from -> to` without disturbing the
    /// rest of `from`'s dependency set.
    pub fn add_dependency(&mut self, from: TaintKey, to: TaintKey) {
        let _ = self.tracker.add_dependency(from, to, TAINT_CHANNEL);
    }
}
