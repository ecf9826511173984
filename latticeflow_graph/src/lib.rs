// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental, taint-tracked computational graph for typed numeric array
//! pipelines.
//!
//! A [`graph::Graph`] is an arena of [`node::Node`]s wired together by
//! [`endpoint::Input`]/[`endpoint::Output`] pairs. Construction goes through
//! two phases — declare (`add_node`/`add_input`/`add_output`/`connect`) then
//! seal (`close`) — after which reads go through the taint/evaluation
//! protocol (`touch`) so a node only recomputes when something upstream
//! actually changed.

pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod flags;
pub mod graph;
pub mod node;
pub mod parameter;
pub mod replicate;
pub mod storage;
pub mod strategy;
pub mod taint;
pub mod typefn;
pub mod value;

pub use descriptor::{AxisRef, DataDescriptor};
pub use endpoint::{Input, Output, OutputRef};
pub use error::{Diagnostic, ErrorContext, ErrorKind, GraphError, GraphResult};
pub use flags::FlagsDescriptor;
pub use graph::{CloseOptions, Graph, GraphConfig, OpenOptions};
pub use node::{Labels, Node, NodeId, Operator};
pub use strategy::{InputStrategy, InputStrategyKind};
pub use value::{Buffer, DType};
