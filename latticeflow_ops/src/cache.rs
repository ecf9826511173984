// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pass-through identity node meant to be frozen.
//!
//! `Cache` carries no behavior of its own beyond copying its single input to
//! its output; the caching semantics — "pin the current value, resume
//! propagating only on `recache`" — live in `Graph::freeze`/`Graph::unfreeze`/
//! `Graph::recache`. Separating it this way lets any operator's output be
//! cached by simply inserting one of these downstream of it.

use latticeflow_graph::typefn::copy_from_inputs_to_outputs;
use latticeflow_graph::{Buffer, DataDescriptor, ErrorContext, GraphError, GraphResult, Operator, Output};

#[derive(Debug, Default)]
pub struct Cache;

impl Operator for Cache {
    fn type_function(
        &mut self,
        inputs: &[DataDescriptor],
        outputs: &mut [Output],
        node_name: &str,
    ) -> GraphResult<()> {
        copy_from_inputs_to_outputs(inputs, outputs, node_name)
    }

    fn compute(&mut self, inputs: &[Buffer], outputs: &mut [Output], node_name: &str) -> GraphResult<()> {
        let input = inputs.first().ok_or_else(|| {
            GraphError::calculation("Cache requires exactly one input")
                .with_context(ErrorContext::new().with_node(node_name))
        })?;
        outputs[0].data_mut().expect("allocated before compute").copy_from(input);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latticeflow_graph::parameter::Literal;
    use latticeflow_graph::{CloseOptions, Graph};

    #[test]
    fn freeze_then_recache_reads_the_updated_value() {
        let mut g = Graph::new();
        // A mutable literal source: unlike `Array`, `Literal`'s `compute` is
        // a no-op, so an external `set_output_literal` write isn't clobbered
        // on the next recompute.
        let src = g.add_node("src", Box::new(Literal));
        g.add_constant_output(src, "out", Buffer::F64(vec![1.0])).unwrap();
        let cache = g.add_node("cache", Box::new(Cache));
        g.add_input(cache, "in", false).unwrap();
        g.add_output(cache, "out", true, false).unwrap();
        g.connect(src, "out", cache, "in", false).unwrap();
        g.close(cache, CloseOptions::default()).unwrap();

        assert_eq!(g.output_data(cache, "out").unwrap().as_f64(), Some(&[1.0][..]));
        g.freeze(cache).unwrap();

        g.set_output_literal(src, "out", Buffer::F64(vec![99.0]), true, false)
            .unwrap();
        // Frozen: still reads the cached value, not the new upstream one.
        assert_eq!(g.output_data(cache, "out").unwrap().as_f64(), Some(&[1.0][..]));

        g.recache(cache).unwrap();
        assert_eq!(g.output_data(cache, "out").unwrap().as_f64(), Some(&[99.0][..]));
    }
}
