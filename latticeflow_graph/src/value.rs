// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tagged numeric buffer representation.
//!
//! No array-library dependency is pulled in for this; the element type tag
//! is a small closed enum and [`Buffer`] is its owned-storage counterpart.

/// Element type tag for an array endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 64-bit floating point.
    F64,
    /// 64-bit signed integer.
    I64,
    /// Boolean.
    Bool,
}

impl DType {
    /// Standard numeric type-promotion order used by
    /// [`crate::typefn::evaluate_dtype_of_outputs`].
    ///
    /// `Bool < I64 < F64`, matching the usual "promote to the widest common
    /// representation" rule.
    #[must_use]
    pub fn promote(self, other: Self) -> Self {
        use DType::{Bool, F64, I64};
        match (self, other) {
            (F64, _) | (_, F64) => F64,
            (I64, _) | (_, I64) => I64,
            (Bool, Bool) => Bool,
        }
    }
}

/// An owned, contiguous numeric buffer.
///
/// This is the "physical" counterpart to [`DType`]: an [`Output`](crate::endpoint::Output)
/// or allocatable [`Input`](crate::endpoint::Input) owns one of these once allocated.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    /// `f64` elements.
    F64(Vec<f64>),
    /// `i64` elements.
    I64(Vec<i64>),
    /// `bool` elements.
    Bool(Vec<bool>),
}

impl Buffer {
    /// Allocates a zero-filled buffer of the given dtype and element count.
    #[must_use]
    pub fn zeros(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::F64 => Self::F64(vec![0.0; len]),
            DType::I64 => Self::I64(vec![0; len]),
            DType::Bool => Self::Bool(vec![false; len]),
        }
    }

    /// The dtype tag of this buffer.
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::F64(_) => DType::F64,
            Self::I64(_) => DType::I64,
            Self::Bool(_) => DType::Bool,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    /// Whether the buffer holds zero elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the buffer as `f64`, if it is that dtype.
    #[must_use]
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Mutably borrows the buffer as `f64`, if it is that dtype.
    pub fn as_f64_mut(&mut self) -> Option<&mut [f64]> {
        match self {
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Borrows the buffer as `i64`, if it is that dtype.
    #[must_use]
    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            Self::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Mutably borrows the buffer as `i64`, if it is that dtype.
    pub fn as_i64_mut(&mut self) -> Option<&mut [i64]> {
        match self {
            Self::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Borrows the buffer as `bool`, if it is that dtype.
    #[must_use]
    pub fn as_bool(&self) -> Option<&[bool]> {
        match self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Mutably borrows the buffer as `bool`, if it is that dtype.
    pub fn as_bool_mut(&mut self) -> Option<&mut [bool]> {
        match self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Copies `src` into `self` in place. Panics if dtypes differ; callers
    /// are expected to have checked [`crate::descriptor::DataDescriptor::consistent_with`]
    /// first (the allocator's job, not the compute function's).
    pub fn copy_from(&mut self, src: &Self) {
        match (self, src) {
            (Self::F64(dst), Self::F64(src)) => dst.copy_from_slice(src),
            (Self::I64(dst), Self::I64(src)) => dst.copy_from_slice(src),
            (Self::Bool(dst), Self::Bool(src)) => dst.copy_from_slice(src),
            _ => panic!("Buffer::copy_from: dtype mismatch"),
        }
    }
}
