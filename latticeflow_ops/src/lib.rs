// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in operator library for `latticeflow_graph`.
//!
//! Each operator here is a small [`latticeflow_graph::Operator`] impl built
//! from the free functions in `latticeflow_graph::typefn` — the same way a
//! user-authored operator would be built, since the crate boundary is a
//! convenience split, not a privileged one.

pub mod array;
pub mod cache;
pub mod concatenation;
pub mod sum;

pub use array::Array;
pub use cache::Cache;
pub use concatenation::Concatenation;
pub use sum::Sum;
