// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input strategies.
//!
//! Policies controlling how a node auto-creates inputs/outputs when it is
//! the target of a reference connection (`output >> node`, as opposed to
//! `output >> input` naming a specific endpoint).

/// How a node grows its input/output lists when connected to by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStrategyKind {
    /// Each incoming connection creates a fresh input *and* a paired output.
    AddNewInputAddNewOutput,
    /// Each connection creates a new input; exactly one output exists for
    /// the node as a whole.
    AddNewInputAddAndKeepSingleOutput,
    /// Inputs are created in fixed-size blocks of `block_size`; the last
    /// input in each block also creates a new output.
    AddNewInputAddNewOutputForBlock {
        /// Number of inputs per block.
        block_size: u32,
    },
}

/// An input strategy plus its running `idx_scope` counter.
///
/// `idx_scope` is exposed to the `sequence >> node` connection helper so a
/// batch of connections from one collection groups into the same input
/// family in a single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputStrategy {
    kind: InputStrategyKind,
    idx_scope: u32,
    block_position: u32,
}

impl InputStrategy {
    /// Builds a strategy of the given kind with its scope counter at zero.
    #[must_use]
    pub fn new(kind: InputStrategyKind) -> Self {
        Self {
            kind,
            idx_scope: 0,
            block_position: 0,
        }
    }

    /// The strategy's kind.
    #[must_use]
    pub fn kind(&self) -> InputStrategyKind {
        self.kind
    }

    /// Current scope counter.
    #[must_use]
    pub fn idx_scope(&self) -> u32 {
        self.idx_scope
    }

    /// Advances the scope counter (used when a `sequence >> node` batch
    /// starts a new group).
    pub fn advance_scope(&mut self) {
        self.idx_scope += 1;
    }

    /// Decides whether the *next* auto-created input should also create a
    /// paired output, and advances internal bookkeeping (the block position
    /// counter) as a side effect.
    pub fn next_should_add_output(&mut self, existing_outputs: usize) -> bool {
        match self.kind {
            InputStrategyKind::AddNewInputAddNewOutput => true,
            InputStrategyKind::AddNewInputAddAndKeepSingleOutput => existing_outputs == 0,
            InputStrategyKind::AddNewInputAddNewOutputForBlock { block_size } => {
                self.block_position += 1;
                let at_block_end = self.block_position == block_size;
                if at_block_end {
                    self.block_position = 0;
                }
                at_block_end
            }
        }
    }
}

impl Default for InputStrategy {
    fn default() -> Self {
        Self::new(InputStrategyKind::AddNewInputAddNewOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_new_input_add_new_output_always_pairs() {
        let mut s = InputStrategy::new(InputStrategyKind::AddNewInputAddNewOutput);
        assert!(s.next_should_add_output(0));
        assert!(s.next_should_add_output(5));
    }

    #[test]
    fn keep_single_output_only_on_first_connection() {
        let mut s = InputStrategy::new(InputStrategyKind::AddNewInputAddAndKeepSingleOutput);
        assert!(s.next_should_add_output(0));
        assert!(!s.next_should_add_output(1));
    }

    #[test]
    fn block_strategy_fires_on_block_boundary() {
        let mut s = InputStrategy::new(InputStrategyKind::AddNewInputAddNewOutputForBlock {
            block_size: 2,
        });
        assert!(!s.next_should_add_output(0));
        assert!(s.next_should_add_output(0));
        assert!(!s.next_should_add_output(1));
        assert!(s.next_should_add_output(1));
    }
}
