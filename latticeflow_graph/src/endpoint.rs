// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input/Output endpoints.
//!
//! Endpoints hold only local state (their own descriptor, buffer, and weak
//! references to the node on the other side of an edge). Cross-node
//! operations — connecting, allocating, touching — live on [`crate::graph::Graph`],
//! which is the only thing that can resolve a [`NodeId`] to the node it
//! names.

use crate::descriptor::DataDescriptor;
use crate::node::NodeId;
use crate::value::Buffer;

/// A reference to one named output on one node, held by node and index
/// rather than a direct reference so nodes don't need to borrow each other.
pub type OutputRef = (NodeId, Box<str>);

/// An input endpoint: belongs to exactly one node, holds at most one
/// upstream [`OutputRef`].
#[derive(Debug, Clone)]
pub struct Input {
    name: Box<str>,
    own_dd: DataDescriptor,
    own_data: Option<Buffer>,
    parent_output: Option<OutputRef>,
    /// Names an output of the *same* node whose buffer this input shares,
    /// used to build chains of contiguous memory (e.g. concatenation).
    child_output: Option<Box<str>>,
    allocatable: bool,
    owns_buffer: bool,
}

impl Input {
    /// Builds a new, unconnected input.
    #[must_use]
    pub fn new(name: impl Into<Box<str>>, allocatable: bool) -> Self {
        Self {
            name: name.into(),
            own_dd: DataDescriptor::default(),
            own_data: None,
            parent_output: None,
            child_output: None,
            allocatable,
            owns_buffer: false,
        }
    }

    /// The input's name within its owning node.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this input wants buffer allocation (possibly delegated
    /// upstream via the allocating-input pattern).
    #[must_use]
    pub fn allocatable(&self) -> bool {
        self.allocatable
    }

    /// The descriptor this input wants for its own buffer.
    #[must_use]
    pub fn own_dd(&self) -> &DataDescriptor {
        &self.own_dd
    }

    /// Mutable access to the input's own descriptor (used by type functions
    /// and the allocator).
    pub fn own_dd_mut(&mut self) -> &mut DataDescriptor {
        &mut self.own_dd
    }

    /// The input's own buffer, if allocated.
    #[must_use]
    pub fn own_data(&self) -> Option<&Buffer> {
        self.own_data.as_ref()
    }

    /// Whether the input owns its buffer outright (as opposed to holding a
    /// donated view from an upstream output).
    #[must_use]
    pub fn owns_buffer(&self) -> bool {
        self.owns_buffer
    }

    /// Assigns this input's own buffer (called by the allocator).
    pub fn set_own_data(&mut self, data: Buffer, owns_buffer: bool) {
        self.own_dd.dtype = Some(data.dtype());
        self.own_dd.shape = Some(vec![data.len()]);
        self.own_data = Some(data);
        self.owns_buffer = owns_buffer;
    }

    /// The upstream producer, if connected.
    #[must_use]
    pub fn parent_output(&self) -> Option<&OutputRef> {
        self.parent_output.as_ref()
    }

    /// Whether this input has an upstream producer.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.parent_output.is_some()
    }

    /// Sets the upstream producer without any reconnection checks; callers
    /// (`crate::graph::Graph::connect`) are responsible for enforcing
    /// `ReconnectionError` semantics first.
    pub(crate) fn set_parent_output(&mut self, output: OutputRef) {
        self.parent_output = Some(output);
    }

    /// Names a sibling output on the same node that donates this input's
    /// buffer.
    #[must_use]
    pub fn child_output(&self) -> Option<&str> {
        self.child_output.as_deref()
    }

    /// Declares a sibling output as this input's buffer donor.
    pub fn set_child_output(&mut self, output_name: impl Into<Box<str>>) {
        self.child_output = Some(output_name.into());
    }
}

/// An output endpoint: belongs to exactly one node, may have many child
/// inputs and at most one allocating child input.
#[derive(Debug, Clone)]
pub struct Output {
    name: Box<str>,
    dd: DataDescriptor,
    data: Option<Buffer>,
    child_inputs: Vec<(NodeId, Box<str>)>,
    allocating_input: Option<(NodeId, Box<str>)>,
    allocatable: bool,
    owns_buffer: bool,
    forbid_reallocation: bool,
}

impl Output {
    /// Builds a new, unconnected output.
    #[must_use]
    pub fn new(name: impl Into<Box<str>>, allocatable: bool) -> Self {
        Self {
            name: name.into(),
            dd: DataDescriptor::default(),
            data: None,
            child_inputs: Vec::new(),
            allocating_input: None,
            allocatable,
            owns_buffer: false,
            forbid_reallocation: false,
        }
    }

    /// The output's name within its owning node.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The output's descriptor.
    #[must_use]
    pub fn dd(&self) -> &DataDescriptor {
        &self.dd
    }

    /// Mutable access to the output's descriptor (type functions assign
    /// into this).
    pub fn dd_mut(&mut self) -> &mut DataDescriptor {
        &mut self.dd
    }

    /// The output's buffer, if allocated. There is no separate read-only
    /// handle type in this crate: `&Buffer` borrowed through this method
    /// *is* the read-only view (Invariant 2's `data_ro` contract is
    /// satisfied by Rust's borrow checker rather than a runtime flag).
    #[must_use]
    pub fn data(&self) -> Option<&Buffer> {
        self.data.as_ref()
    }

    /// Mutable access to the output's buffer, for the compute function and
    /// the allocator only.
    pub fn data_mut(&mut self) -> Option<&mut Buffer> {
        self.data.as_mut()
    }

    /// Whether this output wants buffer allocation.
    #[must_use]
    pub fn allocatable(&self) -> bool {
        self.allocatable
    }

    /// Whether the output owns its buffer outright.
    #[must_use]
    pub fn owns_buffer(&self) -> bool {
        self.owns_buffer
    }

    /// Whether reallocation (shape/dtype change) is forbidden for this
    /// output, e.g. because an external caller supplied the buffer.
    #[must_use]
    pub fn forbid_reallocation(&self) -> bool {
        self.forbid_reallocation
    }

    /// Marks this output as forbidding reallocation.
    pub fn set_forbid_reallocation(&mut self, forbid: bool) {
        self.forbid_reallocation = forbid;
    }

    /// Assigns this output's buffer (called by the allocator or by an
    /// external caller seeding constant data).
    pub fn set_data(&mut self, data: Buffer, owns_buffer: bool) {
        self.dd.dtype = Some(data.dtype());
        self.dd.shape = Some(vec![data.len()]);
        self.data = Some(data);
        self.owns_buffer = owns_buffer;
    }

    /// The downstream input this output's buffer is shared with, if any.
    #[must_use]
    pub fn allocating_input(&self) -> Option<&(NodeId, Box<str>)> {
        self.allocating_input.as_ref()
    }

    /// Whether any input is connected to this output.
    #[must_use]
    pub fn connected(&self) -> bool {
        !self.child_inputs.is_empty()
    }

    /// All connected child inputs.
    #[must_use]
    pub fn child_inputs(&self) -> &[(NodeId, Box<str>)] {
        &self.child_inputs
    }

    pub(crate) fn push_child_input(&mut self, input: (NodeId, Box<str>)) {
        self.child_inputs.push(input);
    }

    /// Drops a stale child-input entry, e.g. when a reconnect moves that
    /// input to a different producer.
    pub(crate) fn remove_child_input(&mut self, node: NodeId, input_name: &str) {
        self.child_inputs
            .retain(|(n, name)| !(*n == node && name.as_ref() == input_name));
        if self
            .allocating_input
            .as_ref()
            .is_some_and(|(n, name)| *n == node && name.as_ref() == input_name)
        {
            self.allocating_input = None;
        }
    }

    pub(crate) fn set_allocating_input(&mut self, input: (NodeId, Box<str>)) {
        self.allocating_input = Some(input);
    }
}
