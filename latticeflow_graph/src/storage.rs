// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! NodeStorage: a flat, dotted-key lookup table over nodes, outputs, and
//! unconnected inputs.
//!
//! Dotted paths (`"detector.channel1.voltage"`) stand in for a nested tree;
//! a single `HashMap<Box<str>, _>` keyed by the fully-joined path gives the
//! same lookup behavior without a recursive trie type.
//!
//! Export to ROOT/LaTeX/DOT/matplotlib is out of scope; only a data-only
//! [`NodeStorage::to_table_rows`] survives.

use hashbrown::HashMap;

use crate::endpoint::OutputRef;
use crate::error::{ErrorContext, GraphError, GraphResult};
use crate::graph::Graph;
use crate::node::NodeId;

/// A hierarchical, dotted-key container of nodes/outputs/inputs.
#[derive(Debug, Default, Clone)]
pub struct NodeStorage {
    nodes: HashMap<Box<str>, NodeId>,
    outputs: HashMap<Box<str>, OutputRef>,
    inputs: HashMap<Box<str>, (NodeId, Box<str>)>,
}

impl NodeStorage {
    /// Builds an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node under `path`.
    pub fn insert_node(&mut self, path: impl Into<Box<str>>, node: NodeId) {
        self.nodes.insert(path.into(), node);
    }

    /// Registers a producer output under `path`.
    pub fn insert_output(&mut self, path: impl Into<Box<str>>, output: OutputRef) {
        self.outputs.insert(path.into(), output);
    }

    /// Registers an as-yet-unconnected input under `path`.
    pub fn insert_input(&mut self, path: impl Into<Box<str>>, input: (NodeId, Box<str>)) {
        self.inputs.insert(path.into(), input);
    }

    /// Looks up a node by path.
    #[must_use]
    pub fn node(&self, path: &str) -> Option<NodeId> {
        self.nodes.get(path).copied()
    }

    /// Looks up an output by path.
    #[must_use]
    pub fn output(&self, path: &str) -> Option<&OutputRef> {
        self.outputs.get(path)
    }

    /// Looks up an input by path.
    #[must_use]
    pub fn input(&self, path: &str) -> Option<&(NodeId, Box<str>)> {
        self.inputs.get(path)
    }

    /// `outputs >> inputs`: for every path present in `outputs`' output map,
    /// connects it to the same path in `inputs`' input map. Every output
    /// path must have a matching input path or this is a hard error — the
    /// strict variant (`storage.py`'s `__rshift__`).
    pub fn connect_strict(graph: &mut Graph, outputs: &NodeStorage, inputs: &NodeStorage) -> GraphResult<()> {
        let mut paths: Vec<&Box<str>> = outputs.outputs.keys().collect();
        paths.sort();
        for path in paths {
            let (from, output_name) = outputs.outputs[path].clone();
            let Some((to, input_name)) = inputs.inputs.get(path).cloned() else {
                return Err(GraphError::connection(format!(
                    "no input registered at path `{path}` to connect output to"
                ))
                .with_context(ErrorContext::new().with_output(output_name)));
            };
            graph.connect(from, &output_name, to, &input_name, false)?;
        }
        Ok(())
    }

    /// `outputs << inputs`: as [`Self::connect_strict`], but paths present in
    /// one side only are skipped rather than erroring — the permissive
    /// variant (`storage.py`'s `__lshift__`). Returns the skipped paths.
    pub fn connect_permissive(
        graph: &mut Graph,
        outputs: &NodeStorage,
        inputs: &NodeStorage,
    ) -> GraphResult<Vec<Box<str>>> {
        let mut paths: Vec<&Box<str>> = outputs.outputs.keys().collect();
        paths.sort();
        let mut skipped = Vec::new();
        for path in paths {
            let (from, output_name) = outputs.outputs[path].clone();
            match inputs.inputs.get(path).cloned() {
                Some((to, input_name)) => {
                    graph.connect(from, &output_name, to, &input_name, false)?;
                }
                None => skipped.push(path.clone()),
            }
        }
        Ok(skipped)
    }

    /// Drops every registered input entry whose endpoint is already
    /// connected, so a later connect pass only ever targets what is still
    /// open.
    pub fn remove_connected_inputs(&mut self, graph: &Graph) {
        self.inputs.retain(|_, (node, input_name)| {
            let idx = graph.node(*node).input_index(input_name);
            match idx {
                Some(i) => !graph.node(*node).inputs()[i].connected(),
                None => false,
            }
        });
    }

    /// Applies a label text to every stored node, looked up by exact path
    /// first and then by successively shorter dotted prefixes (group
    /// fallback), so a label set on a group key is inherited by its members.
    pub fn read_labels(
        &self,
        graph: &mut Graph,
        labels: &HashMap<Box<str>, Box<str>>,
        strict: bool,
    ) -> GraphResult<()> {
        let mut paths: Vec<&Box<str>> = self.nodes.keys().collect();
        paths.sort();
        for path in paths {
            let node = self.nodes[path];
            if let Some(text) = find_label_with_group_fallback(labels, path) {
                graph.node_mut(node).set_labels(crate::node::Labels { text });
            } else if strict {
                return Err(GraphError::initialization(format!(
                    "no label found for path `{path}` or any of its parent groups"
                ))
                .with_context(ErrorContext::new().with_node(graph.node(node).name())));
            }
        }
        Ok(())
    }

    /// A flat, data-only export: one `(path, description)` row per stored
    /// node. No rendering — plotting/LaTeX/ROOT export is out of scope.
    #[must_use]
    pub fn to_table_rows(&self, graph: &Graph) -> Vec<(Box<str>, Box<str>)> {
        let mut paths: Vec<&Box<str>> = self.nodes.keys().collect();
        paths.sort();
        paths
            .into_iter()
            .map(|path| {
                let node = graph.node(self.nodes[path]);
                let desc: Box<str> = format!(
                    "{} (inputs={}, outputs={}, calls={})",
                    node.name(),
                    node.inputs().len(),
                    node.outputs().len(),
                    node.n_calls()
                )
                .into();
                (path.clone(), desc)
            })
            .collect()
    }
}

fn find_label_with_group_fallback(labels: &HashMap<Box<str>, Box<str>>, path: &str) -> Option<Box<str>> {
    if let Some(text) = labels.get(path) {
        return Some(text.clone());
    }
    let mut prefix = path;
    while let Some(idx) = prefix.rfind('.') {
        prefix = &prefix[..idx];
        if let Some(text) = labels.get(prefix) {
            return Some(text.clone());
        }
    }
    None
}
