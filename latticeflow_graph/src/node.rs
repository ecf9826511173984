// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node: one unit of computation in the graph.
//!
//! A node owns its endpoints, flags, and operator; cross-node operations
//! (connect, touch, taint, close) live on [`crate::graph::Graph`] since
//! only the graph's arena can resolve a [`NodeId`] on the other side of an
//! edge.

use hashbrown::HashMap;

use crate::descriptor::DataDescriptor;
use crate::endpoint::{Input, Output};
use crate::error::{Diagnostic, GraphResult};
use crate::flags::FlagsDescriptor;
use crate::strategy::{InputStrategy, InputStrategyKind};

/// Arena index identifying a node within a [`crate::graph::Graph`].
///
/// Newtype around the index rather than a pointer/reference, so nodes
/// never borrow each other; the graph's `Vec<Node>` is the sole owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Builds a node id from a raw arena index.
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Human-readable labels for reporting. Only the field diagnostics and
/// storage exports actually read is kept; LaTeX/plot-specific label
/// variants are out of scope here.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    /// Short human-readable description.
    pub text: Box<str>,
}

/// Given fully-typed input descriptors, assigns output descriptors.
///
/// And, given allocated buffers, fills outputs from inputs. Implemented by
/// every built-in and user-authored operator.
pub trait Operator: std::fmt::Debug {
    /// Computes output descriptors from resolved input descriptors. Must
    /// use the checks in [`crate::typefn`] to validate inputs and raise
    /// `TypeFunctionError` (via `?`) on mismatch.
    fn type_function(
        &mut self,
        inputs: &[DataDescriptor],
        outputs: &mut [Output],
        node_name: &str,
    ) -> GraphResult<()>;

    /// Fills output buffers from input buffers. Called by `touch` only
    /// when the node is closed and tainted (or `force_computation`).
    fn compute(
        &mut self,
        inputs: &[crate::value::Buffer],
        outputs: &mut [Output],
        node_name: &str,
    ) -> GraphResult<()>;

    /// Optional hook run after any buffer was (re)assigned during
    /// allocation, so the operator can cache raw handles and avoid
    /// attribute lookups in its hot compute loop. Most operators don't
    /// need this; the default is a no-op.
    fn post_allocate(&mut self, _inputs: &[Input], _outputs: &mut [Output]) {}
}

/// A node: owns inputs/outputs, flags, its operator, and bookkeeping.
#[derive(Debug)]
pub struct Node {
    name: Box<str>,
    inputs: Vec<Input>,
    input_index: HashMap<Box<str>, usize>,
    outputs: Vec<Output>,
    output_index: HashMap<Box<str>, usize>,
    flags: FlagsDescriptor,
    strategy: InputStrategy,
    operator: Box<dyn Operator>,
    /// Eager nodes compute synchronously as soon as they are tainted,
    /// rather than waiting for the next `touch`.
    immediate: bool,
    debug: bool,
    n_calls: u64,
    labels: Labels,
    exception: Option<Box<str>>,
    diagnostics: Vec<Diagnostic>,
}

impl Node {
    /// Builds a new node wrapping the given operator.
    #[must_use]
    pub fn new(name: impl Into<Box<str>>, operator: Box<dyn Operator>, debug: bool) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            input_index: HashMap::new(),
            outputs: Vec::new(),
            output_index: HashMap::new(),
            flags: FlagsDescriptor::default(),
            strategy: InputStrategy::new(InputStrategyKind::AddNewInputAddNewOutput),
            operator,
            immediate: false,
            debug,
            n_calls: 0,
            labels: Labels::default(),
            exception: None,
            diagnostics: Vec::new(),
        }
    }

    /// Marks this node as computing synchronously on taint.
    #[must_use]
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Overrides the node's input-growth strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: InputStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The node's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this node computes synchronously on taint.
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// Debug flag (propagated from the owning graph at construction).
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Number of times this node's compute function has run.
    #[must_use]
    pub fn n_calls(&self) -> u64 {
        self.n_calls
    }

    pub(crate) fn increment_n_calls(&mut self) {
        self.n_calls += 1;
    }

    /// Current flags.
    #[must_use]
    pub fn flags(&self) -> &FlagsDescriptor {
        &self.flags
    }

    /// Mutable access to flags, for the lifecycle/taint algorithms.
    pub fn flags_mut(&mut self) -> &mut FlagsDescriptor {
        &mut self.flags
    }

    /// The node's operator.
    pub fn operator_mut(&mut self) -> &mut dyn Operator {
        self.operator.as_mut()
    }

    /// Labels (for reporting).
    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Sets the node's labels.
    pub fn set_labels(&mut self, labels: Labels) {
        self.labels = labels;
    }

    /// The last exception message stashed for post-mortem inspection.
    #[must_use]
    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }

    pub(crate) fn set_exception(&mut self, message: impl Into<Box<str>>) {
        self.exception = Some(message.into());
    }

    /// Noncritical diagnostics collected on this node (e.g. from a
    /// `close(strict: false)` pass).
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// The node's input-growth strategy.
    pub fn strategy_mut(&mut self) -> &mut InputStrategy {
        &mut self.strategy
    }

    /// All inputs, in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Mutable access to all inputs.
    pub fn inputs_mut(&mut self) -> &mut [Input] {
        &mut self.inputs
    }

    /// All outputs, in declaration order.
    #[must_use]
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Mutable access to all outputs.
    pub fn outputs_mut(&mut self) -> &mut [Output] {
        &mut self.outputs
    }

    /// Looks up an input's index by name.
    #[must_use]
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.input_index.get(name).copied()
    }

    /// Looks up an output's index by name.
    #[must_use]
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.output_index.get(name).copied()
    }

    /// Declares a new named input. Returns its index. Callers
    /// (`crate::graph::Graph::add_input`) are responsible for the
    /// `ReconnectionError`/`ClosedGraphError` checks from the component
    /// contract, since those need the node's name for the error context.
    pub(crate) fn push_input(&mut self, input: Input) -> usize {
        let idx = self.inputs.len();
        self.input_index.insert(input.name().into(), idx);
        self.inputs.push(input);
        idx
    }

    /// Declares a new named output. Returns its index.
    pub(crate) fn push_output(&mut self, output: Output) -> usize {
        let idx = self.outputs.len();
        self.output_index.insert(output.name().into(), idx);
        self.outputs.push(output);
        idx
    }

    /// First input with no upstream producer, if any (used by the
    /// "find first unconnected input or create one" connect-to-node path).
    #[must_use]
    pub fn first_unconnected_input(&self) -> Option<usize> {
        self.inputs.iter().position(|i| !i.connected())
    }

    /// Runs the operator's `post_allocate` hook. A free function on `Node`
    /// rather than a method that reborrows `self` through `operator_mut`,
    /// since it needs `inputs`/`outputs` borrowed alongside `operator` —
    /// three disjoint fields, not three reborrows of `self`.
    pub(crate) fn run_post_allocate(&mut self) {
        self.operator.post_allocate(&self.inputs, &mut self.outputs);
    }
}
