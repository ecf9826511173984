// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A zero-input source operator holding a literal buffer.

use latticeflow_graph::{Buffer, DataDescriptor, GraphError, GraphResult, Operator, Output};

/// Produces a fixed value every time it is touched; has no inputs.
///
/// Unlike `Graph::add_constant_output` (used internally for one-shot
/// literals such as a parameter's value node), `Array` participates in the
/// ordinary type-function/compute cycle, so its output can still be
/// reallocated if ever reconnected with a different shape.
#[derive(Debug, Clone)]
pub struct Array {
    data: Buffer,
}

impl Array {
    /// Builds a source operator yielding `data`.
    #[must_use]
    pub fn new(data: Buffer) -> Self {
        Self { data }
    }
}

impl Operator for Array {
    fn type_function(
        &mut self,
        inputs: &[DataDescriptor],
        outputs: &mut [Output],
        node_name: &str,
    ) -> GraphResult<()> {
        if !inputs.is_empty() {
            return Err(GraphError::type_function("Array takes no inputs")
                .with_context(latticeflow_graph::ErrorContext::new().with_node(node_name)));
        }
        outputs[0].dd_mut().dtype = Some(self.data.dtype());
        outputs[0].dd_mut().shape = Some(vec![self.data.len()]);
        Ok(())
    }

    fn compute(&mut self, _inputs: &[Buffer], outputs: &mut [Output], _node_name: &str) -> GraphResult<()> {
        outputs[0].data_mut().expect("allocated before compute").copy_from(&self.data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latticeflow_graph::{CloseOptions, Graph};

    #[test]
    fn array_produces_its_literal_value() {
        let mut g = Graph::new();
        let node = g.add_node("a", Box::new(Array::new(Buffer::F64(vec![1.0, 2.0, 3.0]))));
        g.add_output(node, "out", true, false).unwrap();
        g.close(node, CloseOptions::default()).unwrap();
        assert_eq!(
            g.output_data(node, "out").unwrap().as_f64(),
            Some(&[1.0, 2.0, 3.0][..])
        );
    }
}
