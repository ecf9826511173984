// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-function library.
//!
//! Reusable checks and propagators invoked by each operator's type
//! function. All of them take already-resolved input descriptors (the
//! caller — [`crate::graph::Graph::update_types`] — has already recursed
//! into parent nodes) and a node name used only for error reporting.
//!
//! Every helper returns [`GraphError::type_function`] on failure.

use crate::descriptor::DataDescriptor;
use crate::endpoint::Output;
use crate::error::{ErrorContext, GraphError, GraphResult};
use crate::value::DType;

fn fail(node_name: &str, message: impl Into<Box<str>>) -> GraphError {
    GraphError::type_function(message).with_context(ErrorContext::new().with_node(node_name))
}

/// Asserts the node has at least one input.
pub fn check_node_has_inputs(inputs: &[DataDescriptor], node_name: &str) -> GraphResult<()> {
    if inputs.is_empty() {
        return Err(fail(node_name, "node has no inputs"));
    }
    Ok(())
}

/// Asserts the node has exactly `n` inputs.
pub fn check_number_of_inputs(
    inputs: &[DataDescriptor],
    n: usize,
    node_name: &str,
) -> GraphResult<()> {
    if inputs.len() != n {
        return Err(fail(
            node_name,
            format!("expected {n} inputs, got {}", inputs.len()),
        ));
    }
    Ok(())
}

/// Asserts the input count is an exact multiple of `n`.
pub fn check_inputs_number_is_divisible_by_n(
    inputs: &[DataDescriptor],
    n: usize,
    node_name: &str,
) -> GraphResult<()> {
    if n == 0 || inputs.len() % n != 0 {
        return Err(fail(
            node_name,
            format!("expected a multiple of {n} inputs, got {}", inputs.len()),
        ));
    }
    Ok(())
}

/// Asserts every input has the given rank.
pub fn check_dimension_of_inputs(
    inputs: &[DataDescriptor],
    dim: usize,
    node_name: &str,
) -> GraphResult<()> {
    for (i, dd) in inputs.iter().enumerate() {
        if dd.rank() != Some(dim) {
            return Err(fail(
                node_name,
                format!("input {i} has rank {:?}, expected {dim}", dd.rank()),
            ));
        }
    }
    Ok(())
}

/// Asserts all inputs share an identical shape, returning that shape.
pub fn check_shape_of_inputs(
    inputs: &[DataDescriptor],
    node_name: &str,
) -> GraphResult<Vec<usize>> {
    check_node_has_inputs(inputs, node_name)?;
    let first = inputs[0]
        .shape
        .clone()
        .ok_or_else(|| fail(node_name, "input 0 has unresolved shape"))?;
    for (i, dd) in inputs.iter().enumerate().skip(1) {
        if dd.shape.as_ref() != Some(&first) {
            return Err(fail(
                node_name,
                format!("input {i} shape {:?} does not match input 0 shape {first:?}", dd.shape),
            ));
        }
    }
    Ok(first)
}

/// Size-comparison mode for [`check_size_of_inputs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCheck {
    /// Every input must have exactly `n` elements.
    Exact(usize),
    /// Every input must have at least `n` elements.
    Min(usize),
    /// Every input must have at most `n` elements.
    Max(usize),
}

/// Asserts every input's size satisfies `check`.
pub fn check_size_of_inputs(
    inputs: &[DataDescriptor],
    check: SizeCheck,
    node_name: &str,
) -> GraphResult<()> {
    for (i, dd) in inputs.iter().enumerate() {
        let size = dd
            .size()
            .ok_or_else(|| fail(node_name, format!("input {i} has unresolved shape")))?;
        let ok = match check {
            SizeCheck::Exact(n) => size == n,
            SizeCheck::Min(n) => size >= n,
            SizeCheck::Max(n) => size <= n,
        };
        if !ok {
            return Err(fail(
                node_name,
                format!("input {i} size {size} fails constraint {check:?}"),
            ));
        }
    }
    Ok(())
}

/// Asserts all inputs share an identical dtype, returning it.
pub fn check_dtype_of_inputs(inputs: &[DataDescriptor], node_name: &str) -> GraphResult<DType> {
    check_node_has_inputs(inputs, node_name)?;
    let first = inputs[0]
        .dtype
        .ok_or_else(|| fail(node_name, "input 0 has unresolved dtype"))?;
    for (i, dd) in inputs.iter().enumerate().skip(1) {
        if dd.dtype != Some(first) {
            return Err(fail(
                node_name,
                format!("input {i} dtype {:?} does not match input 0 dtype {first:?}", dd.dtype),
            ));
        }
    }
    Ok(first)
}

/// Asserts every input's dtype is `expected` or narrower under promotion
/// (e.g. `bool`/`i64` inputs are an acceptable subtype of an `f64` node).
pub fn check_subtype_of_inputs(
    inputs: &[DataDescriptor],
    expected: DType,
    node_name: &str,
) -> GraphResult<()> {
    for (i, dd) in inputs.iter().enumerate() {
        let dtype = dd
            .dtype
            .ok_or_else(|| fail(node_name, format!("input {i} has unresolved dtype")))?;
        if dtype.promote(expected) != expected {
            return Err(fail(
                node_name,
                format!("input {i} dtype {dtype:?} is not a subtype of {expected:?}"),
            ));
        }
    }
    Ok(())
}

/// Options controlling [`check_inputs_equivalence`].
///
/// Covers dtype, shape, and `axes_edges` identity only; tolerance-based
/// approximate equality, broadcastable-shape relaxation, and deep
/// mesh/edge content comparison are not implemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct EquivalenceOptions {
    /// Require identical dtypes.
    pub check_dtype: bool,
    /// Require identical shapes.
    pub check_shape: bool,
    /// Require identical `axes_edges` identity (reference equality).
    pub check_edges: bool,
}

/// Pairwise consistency check across all inputs, per the requested facets.
pub fn check_inputs_equivalence(
    inputs: &[DataDescriptor],
    opts: EquivalenceOptions,
    node_name: &str,
) -> GraphResult<()> {
    check_node_has_inputs(inputs, node_name)?;
    let first = &inputs[0];
    for (i, dd) in inputs.iter().enumerate().skip(1) {
        if opts.check_dtype && dd.dtype != first.dtype {
            return Err(fail(node_name, format!("input {i} dtype mismatch")));
        }
        if opts.check_shape && dd.shape != first.shape {
            return Err(fail(node_name, format!("input {i} shape mismatch")));
        }
        if opts.check_edges && dd.axes_edges != first.axes_edges {
            return Err(fail(node_name, format!("input {i} axes_edges mismatch")));
        }
    }
    Ok(())
}

/// Asserts every input is a square matrix (rank 2, equal dims); returns the
/// shared dimension.
pub fn check_inputs_are_square_matrices(
    inputs: &[DataDescriptor],
    node_name: &str,
) -> GraphResult<usize> {
    check_node_has_inputs(inputs, node_name)?;
    let mut n = None;
    for (i, dd) in inputs.iter().enumerate() {
        let shape = dd
            .shape
            .as_ref()
            .ok_or_else(|| fail(node_name, format!("input {i} has unresolved shape")))?;
        match shape.as_slice() {
            [a, b] if a == b => {
                if let Some(expected) = n {
                    if *a != expected {
                        return Err(fail(node_name, format!("input {i} is {a}x{a}, expected {expected}x{expected}")));
                    }
                } else {
                    n = Some(*a);
                }
            }
            other => {
                return Err(fail(
                    node_name,
                    format!("input {i} has shape {other:?}, expected a square matrix"),
                ));
            }
        }
    }
    Ok(n.unwrap_or(0))
}

/// Asserts every input is either rank 1 (a diagonal) or rank 2 (a matrix).
/// Returns `1` if all inputs are diagonals, `2` if all are matrices.
pub fn check_inputs_are_matrices_or_diagonals(
    inputs: &[DataDescriptor],
    node_name: &str,
) -> GraphResult<u8> {
    check_node_has_inputs(inputs, node_name)?;
    let mut kind = None;
    for (i, dd) in inputs.iter().enumerate() {
        let rank = dd
            .rank()
            .ok_or_else(|| fail(node_name, format!("input {i} has unresolved shape")))?;
        let this_kind = match rank {
            1 => 1u8,
            2 => 2u8,
            r => {
                return Err(fail(
                    node_name,
                    format!("input {i} has rank {r}, expected 1 (diagonal) or 2 (matrix)"),
                ));
            }
        };
        match kind {
            None => kind = Some(this_kind),
            Some(k) if k == this_kind => {}
            Some(_) => {
                return Err(fail(node_name, "inputs mix diagonals and matrices"));
            }
        }
    }
    Ok(kind.unwrap_or(2))
}

/// Asserts `lhs` (rank 2, `m x k`) and `rhs` (rank 2, `k x n`) are
/// multipliable, returning the resulting `[m, n]` shape.
pub fn check_inputs_are_matrix_multipliable(
    lhs: &DataDescriptor,
    rhs: &DataDescriptor,
    node_name: &str,
) -> GraphResult<Vec<usize>> {
    let lhs_shape = lhs
        .shape
        .as_ref()
        .ok_or_else(|| fail(node_name, "lhs has unresolved shape"))?;
    let rhs_shape = rhs
        .shape
        .as_ref()
        .ok_or_else(|| fail(node_name, "rhs has unresolved shape"))?;
    match (lhs_shape.as_slice(), rhs_shape.as_slice()) {
        ([m, k1], [k2, n]) if k1 == k2 => Ok(vec![*m, *n]),
        _ => Err(fail(
            node_name,
            format!("shapes {lhs_shape:?} and {rhs_shape:?} are not multipliable"),
        )),
    }
}

/// Standard numeric type-promotion across all inputs.
pub fn evaluate_dtype_of_outputs(inputs: &[DataDescriptor], node_name: &str) -> GraphResult<DType> {
    check_node_has_inputs(inputs, node_name)?;
    let mut acc = inputs[0]
        .dtype
        .ok_or_else(|| fail(node_name, "input 0 has unresolved dtype"))?;
    for (i, dd) in inputs.iter().enumerate().skip(1) {
        let dtype = dd
            .dtype
            .ok_or_else(|| fail(node_name, format!("input {i} has unresolved dtype")))?;
        acc = acc.promote(dtype);
    }
    Ok(acc)
}

/// Fan-out copy of dtype/shape/edges/meshes from a chosen input to every
/// output. When several inputs are candidates (`prefer_largest_input`),
/// ties are broken by: largest `size()`, then presence of `axes_edges`,
/// then lowest index — deterministic so tests reproduce.
pub fn copy_from_inputs_to_outputs(
    inputs: &[DataDescriptor],
    outputs: &mut [Output],
    node_name: &str,
) -> GraphResult<()> {
    check_node_has_inputs(inputs, node_name)?;
    let chosen = inputs
        .iter()
        .enumerate()
        .max_by_key(|(i, dd)| (dd.size().unwrap_or(0), !dd.axes_edges.is_empty(), usize::MAX - i))
        .map(|(_, dd)| dd)
        .expect("non-empty inputs checked above");
    for output in outputs.iter_mut() {
        let dd = output.dd_mut();
        dd.dtype = chosen.dtype;
        dd.shape = chosen.shape.clone();
        dd.axes_edges = chosen.axes_edges.clone();
        dd.axes_meshes = chosen.axes_meshes.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dd(dtype: DType, shape: &[usize]) -> DataDescriptor {
        DataDescriptor::with_dtype_shape(dtype, shape.to_vec())
    }

    #[test]
    fn check_shape_of_inputs_rejects_mismatch() {
        let inputs = vec![dd(DType::F64, &[3]), dd(DType::F64, &[2])];
        assert!(check_shape_of_inputs(&inputs, "n").is_err());
    }

    #[test]
    fn evaluate_dtype_promotes_to_widest() {
        let inputs = vec![dd(DType::Bool, &[1]), dd(DType::F64, &[1])];
        assert_eq!(evaluate_dtype_of_outputs(&inputs, "n").unwrap(), DType::F64);
    }

    #[test]
    fn matrix_multipliable_checks_inner_dims() {
        let a = dd(DType::F64, &[2, 3]);
        let b = dd(DType::F64, &[3, 4]);
        assert_eq!(
            check_inputs_are_matrix_multipliable(&a, &b, "n").unwrap(),
            vec![2, 4]
        );
        let c = dd(DType::F64, &[5, 4]);
        assert!(check_inputs_are_matrix_multipliable(&a, &c, "n").is_err());
    }

    #[test]
    fn copy_from_inputs_to_outputs_prefers_larger_input() {
        let inputs = vec![dd(DType::F64, &[2]), dd(DType::F64, &[5])];
        let mut outputs = vec![Output::new("out", true)];
        copy_from_inputs_to_outputs(&inputs, &mut outputs, "n").unwrap();
        assert_eq!(outputs[0].dd().shape, Some(vec![5]));
    }
}
