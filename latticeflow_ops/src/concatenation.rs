// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Concatenates two or more same-dtype inputs into one flat output.
//!
//! Inputs need not share a shape — only a dtype — and are laid end to end
//! in input order. A buffer-donating allocation scheme would make one
//! input's buffer the tail of the output's memory directly; here the
//! output is a fresh buffer that each input is copied into, since aliasing
//! a `Vec<T>` across two owners without `unsafe` isn't possible.

use latticeflow_graph::typefn::{check_node_has_inputs, evaluate_dtype_of_outputs};
use latticeflow_graph::{Buffer, DataDescriptor, ErrorContext, GraphError, GraphResult, Operator, Output};

/// `out = concat(inputs)`, flattened end to end.
#[derive(Debug, Default)]
pub struct Concatenation;

impl Operator for Concatenation {
    fn type_function(
        &mut self,
        inputs: &[DataDescriptor],
        outputs: &mut [Output],
        node_name: &str,
    ) -> GraphResult<()> {
        check_node_has_inputs(inputs, node_name)?;
        let dtype = evaluate_dtype_of_outputs(inputs, node_name)?;
        let mut total = 0usize;
        for (i, dd) in inputs.iter().enumerate() {
            total += dd
                .size()
                .ok_or_else(|| GraphError::type_function(format!("input {i} has unresolved shape"))
                    .with_context(ErrorContext::new().with_node(node_name)))?;
        }
        outputs[0].dd_mut().dtype = Some(dtype);
        outputs[0].dd_mut().shape = Some(vec![total]);
        Ok(())
    }

    fn compute(&mut self, inputs: &[Buffer], outputs: &mut [Output], node_name: &str) -> GraphResult<()> {
        let out = outputs[0].data_mut().expect("allocated before compute");
        match out {
            Buffer::F64(dst) => copy_ranges(dst, inputs, node_name, Buffer::as_f64)?,
            Buffer::I64(dst) => copy_ranges(dst, inputs, node_name, Buffer::as_i64)?,
            Buffer::Bool(dst) => copy_ranges(dst, inputs, node_name, Buffer::as_bool)?,
        }
        Ok(())
    }
}

fn copy_ranges<T: Copy>(
    dst: &mut [T],
    inputs: &[Buffer],
    node_name: &str,
    as_slice: impl Fn(&Buffer) -> Option<&[T]>,
) -> GraphResult<()> {
    let mut pos = 0usize;
    for (i, input) in inputs.iter().enumerate() {
        let src = as_slice(input).ok_or_else(|| {
            GraphError::calculation(format!("Concatenation input {i} has the wrong dtype"))
                .with_context(ErrorContext::new().with_node(node_name))
        })?;
        dst[pos..pos + src.len()].copy_from_slice(src);
        pos += src.len();
    }
    Ok(())
}
