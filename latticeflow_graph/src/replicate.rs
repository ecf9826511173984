// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replicate: build one node per key from a shared operator factory.
//!
//! Builds one node per key in a replication set (e.g. one node per detector
//! channel) from a single operator factory, then wires each replica's inputs
//! by looking the same key up across a chain of producer containers.

use hashbrown::HashMap;

use crate::error::{Diagnostic, ErrorContext, GraphError, GraphResult};
use crate::graph::Graph;
use crate::node::{NodeId, Operator};
use crate::endpoint::OutputRef;

/// Builds `graph.add_node("{base_name}.{key}", make_operator(key))` for each
/// `key` in `replicate_outputs`, without wiring any inputs. Returns the
/// dotted name and id of each replica, in `replicate_outputs` order.
pub fn replicate<F>(
    graph: &mut Graph,
    base_name: &str,
    replicate_outputs: &[&str],
    mut make_operator: F,
) -> Vec<(Box<str>, NodeId)>
where
    F: FnMut(&str) -> Box<dyn Operator>,
{
    replicate_outputs
        .iter()
        .map(|key| {
            let name: Box<str> = format!("{base_name}.{key}").into();
            let node = graph.add_node(name.clone(), make_operator(key));
            (name, node)
        })
        .collect()
}

/// As [`replicate`], but also wires each replica's named inputs by looking
/// `key` up across `containers` in order — the first container holding an
/// entry for `key` supplies it.
///
/// If more than one container holds an entry for the same `key`, that is an
/// ambiguous merge and always a hard error, independent of `allow_skip_inputs`
/// (which only governs *missing* keys, not *ambiguous* ones).
///
/// If no container holds `key` for some input: a hard [`GraphError::connection`]
/// unless `allow_skip_inputs` is set, in which case the input is left
/// unconnected and a Noncritical diagnostic is recorded on the replica node.
pub fn replicate_from_args<F>(
    graph: &mut Graph,
    base_name: &str,
    containers: &[&HashMap<Box<str>, OutputRef>],
    replicate_outputs: &[&str],
    input_names: &[&str],
    allow_skip_inputs: bool,
    mut make_operator: F,
) -> GraphResult<Vec<(Box<str>, NodeId)>>
where
    F: FnMut(&str) -> Box<dyn Operator>,
{
    let mut replicas = Vec::with_capacity(replicate_outputs.len());

    for key in replicate_outputs {
        let name: Box<str> = format!("{base_name}.{key}").into();
        let node = graph.add_node(name.clone(), make_operator(key));

        for input_name in input_names {
            graph.add_input(node, *input_name, false)?;

            let matches: Vec<&OutputRef> = containers
                .iter()
                .filter_map(|c| c.get(*key))
                .collect();

            match matches.as_slice() {
                [] if allow_skip_inputs => {
                    let diag = Diagnostic::new(
                        format!("no producer found for key `{key}`, input `{input_name}` left unconnected"),
                        ErrorContext::new().with_node(name.clone()).with_input(*input_name),
                    );
                    graph.node_mut(node).push_diagnostic(diag);
                }
                [] => {
                    return Err(GraphError::connection(format!(
                        "no producer found for key `{key}`"
                    ))
                    .with_context(ErrorContext::new().with_node(name).with_input(*input_name)));
                }
                [single] => {
                    let (from, output_name) = (*single).clone();
                    graph.connect(from, &output_name, node, input_name, false)?;
                }
                _ => {
                    return Err(GraphError::connection(format!(
                        "key `{key}` is ambiguous: present in more than one producer container"
                    ))
                    .with_context(ErrorContext::new().with_node(name).with_input(*input_name)));
                }
            }
        }

        replicas.push((name, node));
    }

    Ok(replicas)
}
