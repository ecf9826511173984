// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Elementwise sum of two or more equal-shaped inputs.

use latticeflow_graph::typefn::{check_shape_of_inputs, evaluate_dtype_of_outputs};
use latticeflow_graph::{Buffer, DataDescriptor, ErrorContext, GraphError, GraphResult, Operator, Output};

/// `out = sum(inputs)`, elementwise. All inputs must share a shape; the
/// output dtype is the promotion of every input's dtype.
#[derive(Debug, Default)]
pub struct Sum;

impl Operator for Sum {
    fn type_function(
        &mut self,
        inputs: &[DataDescriptor],
        outputs: &mut [Output],
        node_name: &str,
    ) -> GraphResult<()> {
        let dtype = evaluate_dtype_of_outputs(inputs, node_name)?;
        let shape = check_shape_of_inputs(inputs, node_name)?;
        outputs[0].dd_mut().dtype = Some(dtype);
        outputs[0].dd_mut().shape = Some(shape);
        Ok(())
    }

    fn compute(&mut self, inputs: &[Buffer], outputs: &mut [Output], node_name: &str) -> GraphResult<()> {
        let out = outputs[0].data_mut().expect("allocated before compute");
        match out {
            Buffer::F64(dst) => {
                dst.fill(0.0);
                for input in inputs {
                    let src = input.as_f64().ok_or_else(|| {
                        GraphError::calculation("Sum input is not f64")
                            .with_context(ErrorContext::new().with_node(node_name))
                    })?;
                    for (d, s) in dst.iter_mut().zip(src) {
                        *d += s;
                    }
                }
            }
            Buffer::I64(dst) => {
                dst.fill(0);
                for input in inputs {
                    let src = input.as_i64().ok_or_else(|| {
                        GraphError::calculation("Sum input is not i64")
                            .with_context(ErrorContext::new().with_node(node_name))
                    })?;
                    for (d, s) in dst.iter_mut().zip(src) {
                        *d += s;
                    }
                }
            }
            Buffer::Bool(_) => {
                return Err(GraphError::calculation("Sum does not support bool buffers")
                    .with_context(ErrorContext::new().with_node(node_name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latticeflow_graph::node::Labels;
    use latticeflow_graph::{CloseOptions, Graph};

    fn source(graph: &mut Graph, name: &str, values: Vec<f64>) -> latticeflow_graph::NodeId {
        let node = graph.add_node(name, Box::new(crate::array::Array::new(Buffer::F64(values))));
        graph.add_output(node, "out", true, false).unwrap();
        node
    }

    #[test]
    fn sums_two_equal_shaped_arrays() {
        let mut g = Graph::new();
        let a = source(&mut g, "a", vec![1.0, 2.0, 3.0]);
        let b = source(&mut g, "b", vec![10.0, 20.0, 30.0]);
        let sum = g.add_node("sum", Box::new(Sum));
        g.add_input(sum, "a", false).unwrap();
        g.add_input(sum, "b", false).unwrap();
        g.add_output(sum, "out", true, false).unwrap();
        g.connect(a, "out", sum, "a", false).unwrap();
        g.connect(b, "out", sum, "b", false).unwrap();
        g.close(sum, CloseOptions::default()).unwrap();
        g.node_mut(sum).set_labels(Labels { text: "sum".into() });

        assert_eq!(
            g.output_data(sum, "out").unwrap().as_f64(),
            Some(&[11.0, 22.0, 33.0][..])
        );
    }
}
