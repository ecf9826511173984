// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graph: the node arena, plus the close/open lifecycle and
//! taint/evaluation protocol that need the full arena to implement.
//!
//! Construction, connection, and lifecycle operations all take `&mut Graph`
//! as an explicit receiver rather than relying on an ambient "current
//! graph" context, so there is no interior-mutability state to reconcile
//! with the `unsafe_code = "deny"` lint.

use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::endpoint::{Input, Output};
use crate::error::{Diagnostic, ErrorContext, GraphError, GraphResult};
use crate::node::{Node, NodeId, Operator};
use crate::taint::{EndpointKey, TaintEngine, TaintKey};
use crate::value::Buffer;

/// Tunable knobs for a [`Graph`], passed explicitly rather than loaded from
/// an external schema.
#[derive(Debug, Clone, Copy)]
pub struct GraphConfig {
    /// Initial capacity hint for the node arena.
    pub node_capacity: usize,
    /// Whether nodes default to debug mode unless overridden.
    pub debug: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            node_capacity: 16,
            debug: false,
        }
    }
}

/// Options controlling [`Graph::close`].
#[derive(Debug, Clone, Copy)]
pub struct CloseOptions {
    /// Recurse into (and fully close) each input's parent node first.
    pub close_parents: bool,
    /// Propagate type/allocation failures as hard errors rather than
    /// recording them as node diagnostics.
    pub strict: bool,
    /// Recurse into (and fully close) every child node reachable through
    /// this node's outputs.
    pub close_children: bool,
}

impl Default for CloseOptions {
    fn default() -> Self {
        Self {
            close_parents: true,
            strict: true,
            close_children: false,
        }
    }
}

/// Options controlling [`Graph::open`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    /// Recurse into every child node reachable through this node's outputs.
    pub open_children: bool,
    /// Open (and re-taint) even if the node was not closed.
    pub force_taint: bool,
}

/// The graph: a node arena plus the taint-dependency engine spanning it.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    taint: TaintEngine,
    debug: bool,
    /// Monotonic wave counter for the taint/invalidate worklist's
    /// "visited this wave" dedup (§9 design note).
    wave: u32,
    last_seen: Vec<u32>,
}

impl Graph {
    /// Builds a new, empty graph with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Builds a new, empty graph with explicit configuration.
    #[must_use]
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            nodes: Vec::with_capacity(config.node_capacity),
            taint: TaintEngine::new(),
            debug: config.debug,
            wave: 0,
            last_seen: Vec::with_capacity(config.node_capacity),
        }
    }

    fn node_name(&self, node: NodeId) -> &str {
        self.nodes[node.index()].name()
    }

    fn output_key(&mut self, node: NodeId, output: &str) -> TaintKey {
        self.taint.intern(EndpointKey::new(node, output))
    }

    fn parent_node_ids(&self, node: NodeId) -> Vec<NodeId> {
        let mut parents: Vec<NodeId> = self.nodes[node.index()]
            .inputs()
            .iter()
            .filter_map(|i| i.parent_output().map(|(p, _)| *p))
            .collect();
        parents.sort_unstable();
        parents.dedup();
        parents
    }

    fn child_node_ids(&self, node: NodeId) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self.nodes[node.index()]
            .outputs()
            .iter()
            .flat_map(|o| o.child_inputs().iter().map(|(n, _)| *n))
            .collect();
        children.sort_unstable();
        children.dedup();
        children
    }

    // ---------------------------------------------------------------
    // Construction: node registration and endpoint declaration
    // ---------------------------------------------------------------

    /// Registers a new node wrapping `operator`. Returns its id.
    pub fn add_node(&mut self, name: impl Into<Box<str>>, operator: Box<dyn Operator>) -> NodeId {
        let id = NodeId::new(u32::try_from(self.nodes.len()).expect("node arena overflow"));
        self.nodes.push(Node::new(name, operator, self.debug));
        self.last_seen.push(0);
        id
    }

    /// Mutable access to a node, for operator-specific setup that doesn't
    /// fit the generic `add_input`/`add_output`/`connect` surface.
    pub fn node_mut(&mut self, node: NodeId) -> &mut Node {
        &mut self.nodes[node.index()]
    }

    /// Read-only access to a node.
    #[must_use]
    pub fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node.index()]
    }

    /// Declares a new named input on `node`.
    pub fn add_input(
        &mut self,
        node: NodeId,
        name: impl Into<Box<str>>,
        allocatable: bool,
    ) -> GraphResult<()> {
        let name = name.into();
        if self.nodes[node.index()].flags().closed {
            return Err(GraphError::closed_graph("cannot add an input to a closed node")
                .with_context(ErrorContext::new().with_node(self.node_name(node))));
        }
        if self.nodes[node.index()].input_index(&name).is_some() {
            return Err(GraphError::initialization("input name already exists").with_context(
                ErrorContext::new()
                    .with_node(self.node_name(node))
                    .with_input(name),
            ));
        }
        self.nodes[node.index()].push_input(Input::new(name, allocatable));
        Ok(())
    }

    /// Declares a new named output on `node`.
    pub fn add_output(
        &mut self,
        node: NodeId,
        name: impl Into<Box<str>>,
        allocatable: bool,
        forbid_reallocation: bool,
    ) -> GraphResult<()> {
        let name = name.into();
        if self.nodes[node.index()].flags().closed {
            return Err(GraphError::closed_graph("cannot add an output to a closed node")
                .with_context(ErrorContext::new().with_node(self.node_name(node))));
        }
        if self.nodes[node.index()].output_index(&name).is_some() {
            return Err(GraphError::initialization("output name already exists").with_context(
                ErrorContext::new()
                    .with_node(self.node_name(node))
                    .with_output(name),
            ));
        }
        let mut out = Output::new(name.clone(), allocatable);
        out.set_forbid_reallocation(forbid_reallocation);
        self.nodes[node.index()].push_output(out);
        self.mark_fresh_output_dirty(node, &name);
        Ok(())
    }

    /// Declares a new named output on `node` pre-seeded with a literal
    /// buffer — the source-node pattern (`Array`) uses this instead of
    /// `add_output` + `allocate`, since either a descriptor or an initial
    /// buffer may be supplied, never both.
    pub fn add_constant_output(
        &mut self,
        node: NodeId,
        name: impl Into<Box<str>>,
        data: Buffer,
    ) -> GraphResult<()> {
        let name = name.into();
        if self.nodes[node.index()].flags().closed {
            return Err(GraphError::closed_graph("cannot add an output to a closed node")
                .with_context(ErrorContext::new().with_node(self.node_name(node))));
        }
        if self.nodes[node.index()].output_index(&name).is_some() {
            return Err(GraphError::initialization("output name already exists").with_context(
                ErrorContext::new()
                    .with_node(self.node_name(node))
                    .with_output(name),
            ));
        }
        let mut out = Output::new(name.clone(), false);
        out.set_forbid_reallocation(true);
        out.set_data(data, true);
        self.nodes[node.index()].push_output(out);
        self.mark_fresh_output_dirty(node, &name);
        Ok(())
    }

    /// A newly declared output on an already-tainted node needs its key
    /// marked dirty immediately, since the only other place a key becomes
    /// dirty is the cascade in [`Graph::taint_node`] — which can't reach a
    /// node that has no inputs yet to be connected through.
    fn mark_fresh_output_dirty(&mut self, node: NodeId, output_name: &str) {
        if self.nodes[node.index()].flags().tainted {
            let key = self.output_key(node, output_name);
            self.taint.mark_dirty(key);
        }
    }

    // ---------------------------------------------------------------
    // Connection operators
    // ---------------------------------------------------------------

    /// `output >> input` — attach a single edge, realizing the five-step
    /// connect algorithm: reject closed graphs and bare reconnections,
    /// enforce the allocating-input/forbid-reallocation boundary, wire the
    /// endpoints, then taint the consumer.
    pub fn connect(
        &mut self,
        from: NodeId,
        output_name: &str,
        to: NodeId,
        input_name: &str,
        force_taint: bool,
    ) -> GraphResult<()> {
        let out_idx = self.nodes[from.index()].output_index(output_name).ok_or_else(|| {
            GraphError::connection("no such output").with_context(
                ErrorContext::new()
                    .with_node(self.node_name(from))
                    .with_output(output_name),
            )
        })?;
        let in_idx = self.nodes[to.index()].input_index(input_name).ok_or_else(|| {
            GraphError::connection("no such input").with_context(
                ErrorContext::new()
                    .with_node(self.node_name(to))
                    .with_input(input_name),
            )
        })?;

        let already_connected = self.nodes[to.index()].inputs()[in_idx].connected();
        if already_connected && !force_taint {
            return Err(GraphError::reconnection("input is already connected").with_context(
                ErrorContext::new()
                    .with_node(self.node_name(to))
                    .with_input(input_name),
            ));
        }

        let output_closed = self.nodes[from.index()].flags().closed;
        let input_closed = self.nodes[to.index()].flags().closed;
        let input_allocatable = self.nodes[to.index()].inputs()[in_idx].allocatable();

        if output_closed && input_allocatable {
            return Err(GraphError::connection(
                "cannot connect a closed output to an allocatable input",
            )
            .with_context(
                ErrorContext::new()
                    .with_node(self.node_name(from))
                    .with_output(output_name),
            ));
        }
        if !output_closed && input_closed {
            return Err(
                GraphError::connection("cannot connect an output to a closed input").with_context(
                    ErrorContext::new()
                        .with_node(self.node_name(to))
                        .with_input(input_name),
                ),
            );
        }

        if input_allocatable {
            let output = &self.nodes[from.index()].outputs()[out_idx];
            if output.allocating_input().is_some() {
                return Err(GraphError::connection(
                    "output has multiple allocatable/allocated child inputs",
                )
                .with_context(ErrorContext::new().with_node(self.node_name(from)).with_output(output_name)));
            }
            if output.forbid_reallocation() {
                return Err(GraphError::connection(
                    "output forbids reallocation and may not connect to allocating inputs",
                )
                .with_context(ErrorContext::new().with_node(self.node_name(from)).with_output(output_name)));
            }
            self.nodes[from.index()].outputs_mut()[out_idx]
                .set_allocating_input((to, input_name.into()));
        }

        // Reconnection: drop the stale child-input entry from the old
        // parent so `output.child_inputs` and `input.parent_output` never
        // go out of sync.
        if let Some((old_parent, old_output)) =
            self.nodes[to.index()].inputs()[in_idx].parent_output().cloned()
        {
            if let Some(old_out_idx) = self.nodes[old_parent.index()].output_index(&old_output) {
                self.nodes[old_parent.index()].outputs_mut()[old_out_idx]
                    .remove_child_input(to, input_name);
            }
        }

        self.nodes[from.index()].outputs_mut()[out_idx]
            .push_child_input((to, input_name.into()));
        self.nodes[to.index()].inputs_mut()[in_idx].set_parent_output((from, output_name.into()));

        // Conservative dependency wiring: every output of the consumer
        // depends on the producer's output, refined later as needed.
        let parent_key = self.output_key(from, output_name);
        let consumer_outputs: Vec<Box<str>> = self.nodes[to.index()]
            .outputs()
            .iter()
            .map(|o| o.name().into())
            .collect();
        for oname in &consumer_outputs {
            let child_key = self.output_key(to, oname);
            self.taint.add_dependency(child_key, parent_key);
        }

        self.taint_node(to, true, false)
    }

    /// `output >> node` — find the first unconnected input, or create one
    /// (and, per the node's strategy, a paired output) and attach.
    pub fn connect_output_to_node(
        &mut self,
        from: NodeId,
        output_name: &str,
        to: NodeId,
    ) -> GraphResult<()> {
        let input_name: Box<str> = match self.nodes[to.index()].first_unconnected_input() {
            Some(idx) => self.nodes[to.index()].inputs()[idx].name().into(),
            None => {
                let idx_scope = self.nodes[to.index()].strategy_mut().idx_scope();
                let name: Box<str> = format!("in{idx_scope}").into();
                self.add_input(to, name.clone(), false)?;
                let existing_outputs = self.nodes[to.index()].outputs().len();
                let add_output_too = self.nodes[to.index()]
                    .strategy_mut()
                    .next_should_add_output(existing_outputs);
                if add_output_too {
                    let oname: Box<str> = format!("out{idx_scope}").into();
                    self.add_output(to, oname, true, false)?;
                }
                name
            }
        };
        self.connect(from, output_name, to, &input_name, false)
    }

    /// `sequence >> node` — attaches each output to a freshly grouped input
    /// family, advancing the node's `idx_scope` first so the batch forms
    /// one group.
    pub fn connect_sequence_to_node(
        &mut self,
        outputs: &[(NodeId, Box<str>)],
        to: NodeId,
    ) -> GraphResult<()> {
        self.nodes[to.index()].strategy_mut().advance_scope();
        for (from, output_name) in outputs {
            self.connect_output_to_node(*from, output_name, to)?;
        }
        Ok(())
    }

    /// `node << mapping` — for each unconnected input, look up a producer
    /// by input name in `mapping` and connect it. Inputs absent from the
    /// mapping are left unconnected (not an error).
    pub fn wire_from_mapping(
        &mut self,
        node: NodeId,
        mapping: &HashMap<Box<str>, (NodeId, Box<str>)>,
    ) -> GraphResult<()> {
        let unconnected: Vec<Box<str>> = self.nodes[node.index()]
            .inputs()
            .iter()
            .filter(|i| !i.connected())
            .map(|i| i.name().into())
            .collect();
        for name in unconnected {
            if let Some((from, output_name)) = mapping.get(&name) {
                self.connect(*from, output_name, node, &name, false)?;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Close/open lifecycle
    // ---------------------------------------------------------------

    /// Phase 1: type resolution. Short-circuits if types are already
    /// resolved; otherwise recurses into parents first (bottom-up), then
    /// runs the node's type function.
    pub fn update_types(&mut self, node: NodeId, update_parents: bool) -> GraphResult<()> {
        if !self.nodes[node.index()].flags().types_tainted {
            return Ok(());
        }
        if update_parents {
            for parent in self.parent_node_ids(node) {
                self.update_types(parent, true)?;
            }
        }

        let input_dds = {
            let mut dds = Vec::with_capacity(self.nodes[node.index()].inputs().len());
            for i in 0..self.nodes[node.index()].inputs().len() {
                let (parent, oname) = self.nodes[node.index()].inputs()[i]
                    .parent_output()
                    .cloned()
                    .ok_or_else(|| {
                        GraphError::closing("input is not connected").with_context(
                            ErrorContext::new().with_node(self.node_name(node)).with_input(
                                self.nodes[node.index()].inputs()[i].name(),
                            ),
                        )
                    })?;
                let out_idx = self.nodes[parent.index()]
                    .output_index(&oname)
                    .expect("connected output must exist on parent node");
                dds.push(self.nodes[parent.index()].outputs()[out_idx].dd().clone());
            }
            dds
        };

        let name: Box<str> = self.node_name(node).into();
        let node_ref = &mut self.nodes[node.index()];
        let result = node_ref
            .operator_mut()
            .type_function(&input_dds, node_ref.outputs_mut(), &name);
        match result {
            Ok(()) => {
                node_ref.flags_mut().types_tainted = false;
                node_ref.flags_mut().needs_reallocation = true;
                Ok(())
            }
            Err(e) => {
                node_ref.set_exception(e.to_string());
                Err(e)
            }
        }
    }

    /// Phase 2: allocation. Returns whether any buffer was (re)assigned.
    pub fn allocate(&mut self, node: NodeId, allocate_parents: bool) -> GraphResult<bool> {
        if self.nodes[node.index()].flags().allocated
            && !self.nodes[node.index()].flags().needs_reallocation
        {
            return Ok(false);
        }

        let mut reassigned = false;
        if allocate_parents {
            for parent in self.parent_node_ids(node) {
                reassigned |= self.allocate(parent, true)?;
            }
        }

        for i in 0..self.nodes[node.index()].inputs().len() {
            let input = &self.nodes[node.index()].inputs()[i];
            if !input.allocatable() || input.connected() {
                // A connected allocatable input delegates allocation to the
                // producer's output (the allocating-input pattern); only a
                // standalone allocatable input allocates its own buffer.
                continue;
            }
            let dd = input.own_dd().clone();
            let consistent = input.own_data().is_some_and(|b| dd.consistent_with(b));
            if consistent {
                continue;
            }
            let dtype = dd.dtype.ok_or_else(|| {
                GraphError::allocation("no dtype information provided for the input")
                    .with_context(ErrorContext::new().with_node(self.node_name(node)))
            })?;
            let shape = dd.shape.clone().ok_or_else(|| {
                GraphError::allocation("no shape information provided for the input")
                    .with_context(ErrorContext::new().with_node(self.node_name(node)))
            })?;
            let buf = Buffer::zeros(dtype, shape.iter().product());
            self.nodes[node.index()].inputs_mut()[i].set_own_data(buf, true);
            reassigned = true;
        }

        for o in 0..self.nodes[node.index()].outputs().len() {
            let output = &self.nodes[node.index()].outputs()[o];
            if !output.allocatable() {
                continue;
            }
            let dd = output.dd().clone();
            let consistent = output.data().is_some_and(|b| dd.consistent_with(b));
            if consistent {
                continue;
            }
            if output.forbid_reallocation() && output.data().is_some() {
                return Err(GraphError::allocation(
                    "output forbids reallocation but its buffer is inconsistent",
                )
                .with_context(ErrorContext::new().with_node(self.node_name(node))));
            }
            let dtype = dd.dtype.ok_or_else(|| {
                GraphError::allocation("no dtype information provided for the output")
                    .with_context(ErrorContext::new().with_node(self.node_name(node)))
            })?;
            let shape = dd.shape.clone().ok_or_else(|| {
                GraphError::allocation("no shape information provided for the output")
                    .with_context(ErrorContext::new().with_node(self.node_name(node)))
            })?;
            let buf = Buffer::zeros(dtype, shape.iter().product());
            self.nodes[node.index()].outputs_mut()[o].set_data(buf, true);
            reassigned = true;
        }

        if reassigned || self.nodes[node.index()].flags().needs_post_allocate {
            self.nodes[node.index()].run_post_allocate();
        }
        self.nodes[node.index()].flags_mut().allocated = true;
        self.nodes[node.index()].flags_mut().needs_reallocation = false;
        self.nodes[node.index()].flags_mut().needs_post_allocate = false;
        Ok(reassigned)
    }

    /// The full close algorithm (Phases 1-4).
    pub fn close(&mut self, node: NodeId, opts: CloseOptions) -> GraphResult<()> {
        match self.update_types(node, opts.close_parents) {
            Ok(()) => {}
            Err(e) if !opts.strict => {
                let diag = Diagnostic::new(e.message.clone(), e.context.clone());
                self.nodes[node.index()].push_diagnostic(diag);
            }
            Err(e) => return Err(e),
        }
        match self.allocate(node, opts.close_parents) {
            Ok(_) => {}
            Err(e) if !opts.strict => {
                let diag = Diagnostic::new(e.message.clone(), e.context.clone());
                self.nodes[node.index()].push_diagnostic(diag);
            }
            Err(e) => return Err(e),
        }

        if opts.close_parents {
            for parent in self.parent_node_ids(node) {
                self.close(
                    parent,
                    CloseOptions {
                        close_parents: true,
                        strict: opts.strict,
                        close_children: false,
                    },
                )?;
            }
        }

        let allocated = self.nodes[node.index()].flags().allocated;
        self.nodes[node.index()].flags_mut().closed = allocated;
        if opts.strict && !allocated {
            return Err(GraphError::closing("node did not reach an allocated state")
                .with_context(ErrorContext::new().with_node(self.node_name(node))));
        }

        if opts.close_children {
            for child in self.child_node_ids(node) {
                self.close(
                    child,
                    CloseOptions {
                        close_parents: false,
                        strict: opts.strict,
                        close_children: true,
                    },
                )?;
            }
        }
        Ok(())
    }

    /// The permissive inverse of [`Self::close`].
    pub fn open(&mut self, node: NodeId, opts: OpenOptions) -> GraphResult<()> {
        let closed = self.nodes[node.index()].flags().closed;
        if !closed && !opts.force_taint {
            return Ok(());
        }
        if opts.open_children {
            for child in self.child_node_ids(node) {
                self.open(
                    child,
                    OpenOptions {
                        open_children: true,
                        force_taint: opts.force_taint,
                    },
                )?;
            }
        }
        self.nodes[node.index()].flags_mut().closed = false;
        self.unfreeze(node)?;
        self.taint_node(node, true, false)
    }

    // ---------------------------------------------------------------
    // Taint/evaluation protocol
    // ---------------------------------------------------------------

    /// `freeze()`. Fails if the node is currently tainted.
    pub fn freeze(&mut self, node: NodeId) -> GraphResult<()> {
        if self.nodes[node.index()].flags().tainted {
            return Err(GraphError::closing("cannot freeze a tainted node")
                .with_context(ErrorContext::new().with_node(self.node_name(node))));
        }
        self.nodes[node.index()].flags_mut().frozen = true;
        Ok(())
    }

    /// `unfreeze()`. Re-taints (with cascade) if a taint was latched while
    /// frozen.
    pub fn unfreeze(&mut self, node: NodeId) -> GraphResult<()> {
        self.nodes[node.index()].flags_mut().frozen = false;
        if self.nodes[node.index()].flags().frozen_tainted {
            self.nodes[node.index()].flags_mut().frozen_tainted = false;
            self.taint_node(node, false, false)?;
        }
        Ok(())
    }

    /// `recache()`: `unfreeze(); touch(force_computation: true)`.
    pub fn recache(&mut self, node: NodeId) -> GraphResult<()> {
        self.unfreeze(node)?;
        self.touch(node, true)
    }

    /// Marks `node` dirty and cascades to its children (worklist BFS, each
    /// node visited once per wave). `force_taint` re-taints an
    /// already-tainted node (needed for reconnection); `force_computation`
    /// runs `compute` immediately instead of waiting for the next `touch`.
    pub fn taint_node(
        &mut self,
        node: NodeId,
        force_taint: bool,
        force_computation: bool,
    ) -> GraphResult<()> {
        self.wave = self.wave.wrapping_add(1);
        let wave = self.wave;
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        queue.push_back(node);

        while let Some(current) = queue.pop_front() {
            if self.last_seen[current.index()] == wave {
                continue;
            }
            self.last_seen[current.index()] = wave;

            let flags = *self.nodes[current.index()].flags();
            if flags.tainted && !force_taint {
                continue;
            }
            if flags.frozen {
                self.nodes[current.index()].flags_mut().frozen_tainted = true;
                continue;
            }

            self.nodes[current.index()].flags_mut().tainted = true;
            let output_names: Vec<Box<str>> = self.nodes[current.index()]
                .outputs()
                .iter()
                .map(|o| o.name().into())
                .collect();
            for oname in &output_names {
                let key = self.output_key(current, oname);
                self.taint.mark_dirty(key);
            }

            if self.nodes[current.index()].is_immediate() || force_computation {
                self.run_node_compute(current)?;
            }

            for child in self.child_node_ids(current) {
                queue.push_back(child);
            }
        }
        Ok(())
    }

    /// `touch(force_computation)`. Walks upstream only through ancestors
    /// whose `tainted` bit is set, in dependency order.
    pub fn touch(&mut self, node: NodeId, force_computation: bool) -> GraphResult<()> {
        if !self.nodes[node.index()].flags().tainted && !force_computation {
            return Ok(());
        }
        if !self.nodes[node.index()].flags().closed {
            return Err(GraphError::unclosed_graph("cannot touch a node before it is closed")
                .with_context(ErrorContext::new().with_node(self.node_name(node))));
        }
        if self.nodes[node.index()].outputs().is_empty() {
            return self.run_node_compute(node);
        }

        let seed_name: Box<str> = self.nodes[node.index()].outputs()[0].name().into();
        let seed_key = self.output_key(node, &seed_name);
        let ordered: Vec<NodeId> = self
            .taint
            .drain_within_dependencies_of(seed_key)
            .map(|(_, key)| key.node)
            .collect();

        for ancestor in ordered {
            if !self.nodes[ancestor.index()].flags().tainted {
                continue;
            }
            if !self.nodes[ancestor.index()].flags().closed {
                return Err(GraphError::unclosed_graph("cannot touch a node before it is closed")
                    .with_context(ErrorContext::new().with_node(self.node_name(ancestor))));
            }
            self.run_node_compute(ancestor)?;
        }
        Ok(())
    }

    fn run_node_compute(&mut self, node: NodeId) -> GraphResult<()> {
        if !self.nodes[node.index()].flags().tainted {
            return Ok(());
        }
        if !self.nodes[node.index()].flags().closed {
            return Err(GraphError::unclosed_graph("cannot compute a node before it is closed")
                .with_context(ErrorContext::new().with_node(self.node_name(node))));
        }

        let mut input_buffers: Vec<Buffer> = Vec::with_capacity(self.nodes[node.index()].inputs().len());
        for i in 0..self.nodes[node.index()].inputs().len() {
            if let Some(buf) = self.nodes[node.index()].inputs()[i].own_data().cloned() {
                input_buffers.push(buf);
                continue;
            }
            let (parent, oname) = self.nodes[node.index()].inputs()[i]
                .parent_output()
                .cloned()
                .ok_or_else(|| {
                    GraphError::calculation("input has no data and no upstream producer")
                        .with_context(ErrorContext::new().with_node(self.node_name(node)))
                })?;
            let out_idx = self.nodes[parent.index()]
                .output_index(&oname)
                .expect("connected output must exist on parent node");
            let buf = self.nodes[parent.index()].outputs()[out_idx]
                .data()
                .cloned()
                .ok_or_else(|| {
                    GraphError::allocation("upstream output has no buffer").with_context(
                        ErrorContext::new()
                            .with_node(self.node_name(parent))
                            .with_output(oname.clone()),
                    )
                })?;
            input_buffers.push(buf);
        }

        let name: Box<str> = self.node_name(node).into();
        let node_ref = &mut self.nodes[node.index()];
        let result = node_ref
            .operator_mut()
            .compute(&input_buffers, node_ref.outputs_mut(), &name);
        match result {
            Ok(()) => {
                node_ref.increment_n_calls();
                node_ref.flags_mut().tainted = false;
                Ok(())
            }
            Err(e) => {
                node_ref.set_exception(e.to_string());
                Err(e)
            }
        }
    }

    /// `output.data`: touches the node, then returns a read-only borrow of
    /// the buffer — a read is never stale by construction.
    pub fn output_data(&mut self, node: NodeId, output: &str) -> GraphResult<&Buffer> {
        self.touch(node, false)?;
        let idx = self.nodes[node.index()].output_index(output).ok_or_else(|| {
            GraphError::connection("no such output").with_context(
                ErrorContext::new().with_node(self.node_name(node)).with_output(output),
            )
        })?;
        self.nodes[node.index()].outputs()[idx].data().ok_or_else(|| {
            GraphError::allocation("output has no buffer yet")
                .with_context(ErrorContext::new().with_node(self.node_name(node)))
        })
    }

    /// `output.set(data, check_taint, force_taint)` — writes a literal
    /// value into a source output and taints its children. Returns whether
    /// the write actually changed anything (and so triggered a taint).
    pub fn set_output_literal(
        &mut self,
        node: NodeId,
        output: &str,
        data: Buffer,
        check_taint: bool,
        force_taint: bool,
    ) -> GraphResult<bool> {
        if self.nodes[node.index()].flags().frozen && !force_taint {
            return Ok(false);
        }
        let idx = self.nodes[node.index()].output_index(output).ok_or_else(|| {
            GraphError::connection("no such output").with_context(
                ErrorContext::new().with_node(self.node_name(node)).with_output(output),
            )
        })?;
        let changed = if check_taint {
            self.nodes[node.index()].outputs()[idx].data() != Some(&data)
        } else {
            true
        };
        if changed {
            self.nodes[node.index()].outputs_mut()[idx].set_data(data, true);
            self.taint_node(node, force_taint, false)?;
        }
        Ok(changed)
    }

    /// `invalidate(true)` / `invalidate(false)`: sets validity and cascades
    /// to children, per the FlagsDescriptor transition table.
    pub fn set_invalid(&mut self, node: NodeId, invalid: bool) {
        self.wave = self.wave.wrapping_add(1);
        let wave = self.wave;
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        queue.push_back(node);
        while let Some(current) = queue.pop_front() {
            if self.last_seen[current.index()] == wave {
                continue;
            }
            self.last_seen[current.index()] = wave;
            self.nodes[current.index()].flags_mut().invalid = invalid;
            for child in self.child_node_ids(current) {
                queue.push_back(child);
            }
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
