// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DataDescriptor: resolved dtype, shape, and axis metadata for one endpoint.

use crate::node::NodeId;
use crate::value::{Buffer, DType};

/// A weak reference to the output providing axis metadata (bin edges or
/// bin centers) for one axis of a [`DataDescriptor`].
///
/// Axis metadata is a *reference*, never an inline copy: two
/// distinct-but-equal edge arrays produced by different nodes must stay
/// distinguishable by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxisRef {
    /// The node owning the referenced output.
    pub node: NodeId,
    /// The output name within that node.
    pub output: Box<str>,
}

impl AxisRef {
    /// Builds a new axis reference.
    #[must_use]
    pub fn new(node: NodeId, output: impl Into<Box<str>>) -> Self {
        Self {
            node,
            output: output.into(),
        }
    }
}

/// The (dtype, shape, edges, meshes) tuple of an array endpoint.
///
/// Fields are `Option` because a descriptor may be only partially resolved
/// before the type-check phase runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataDescriptor {
    /// Element type tag, once resolved.
    pub dtype: Option<DType>,
    /// Shape, once resolved. Length is rank; empty shape is rank 0 (a scalar).
    pub shape: Option<Vec<usize>>,
    /// References to the outputs supplying bin-edge arrays, one per axis.
    pub axes_edges: Vec<AxisRef>,
    /// References to the outputs supplying bin-center ("mesh") arrays.
    pub axes_meshes: Vec<AxisRef>,
}

impl DataDescriptor {
    /// Builds a fully-specified descriptor with no axis metadata.
    #[must_use]
    pub fn with_dtype_shape(dtype: DType, shape: Vec<usize>) -> Self {
        Self {
            dtype: Some(dtype),
            shape: Some(shape),
            axes_edges: Vec::new(),
            axes_meshes: Vec::new(),
        }
    }

    /// Rank (number of axes). `None` if shape is not yet resolved.
    #[must_use]
    pub fn rank(&self) -> Option<usize> {
        self.shape.as_ref().map(Vec::len)
    }

    /// Number of elements a buffer of this shape would hold. Rank 0 has
    /// size 1 (a scalar), matching "product of an empty sequence is 1".
    /// `None` if shape is not yet resolved.
    #[must_use]
    pub fn size(&self) -> Option<usize> {
        self.shape.as_ref().map(|s| s.iter().product())
    }

    /// True iff both dtype and shape match the given buffer exactly.
    #[must_use]
    pub fn consistent_with(&self, buf: &Buffer) -> bool {
        let Some(dtype) = self.dtype else { return false };
        let Some(shape) = &self.shape else { return false };
        dtype == buf.dtype() && shape.iter().product::<usize>() == buf.len()
    }

    /// Whether both dtype and shape are resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.dtype.is_some() && self.shape.is_some()
    }
}
