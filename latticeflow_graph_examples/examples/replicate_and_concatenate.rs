// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replicates an `Array` operator over two keys, registers the results in
//! a `NodeStorage`, then concatenates their outputs.

use latticeflow_graph::replicate::replicate;
use latticeflow_graph::storage::NodeStorage;
use latticeflow_graph::{Buffer, CloseOptions, Graph, Operator};
use latticeflow_ops::{Array, Concatenation};

fn main() {
    let mut g = Graph::new();

    let made = replicate(&mut g, "x", &["k1", "k2"], |_key| {
        Box::new(Array::new(Buffer::F64(vec![0.0]))) as Box<dyn Operator>
    });

    let mut storage = NodeStorage::new();
    for (key, node) in &made {
        g.add_output(*node, "out", true, false).unwrap();
        storage.insert_node(key.clone(), *node);
        storage.insert_output(key.clone(), (*node, "out".into()));
    }

    let cat = g.add_node("cat", Box::new(Concatenation));
    g.add_input(cat, "k1", false).unwrap();
    g.add_input(cat, "k2", false).unwrap();
    g.add_output(cat, "out", true, false).unwrap();
    let (n1, o1) = storage.output("x.k1").unwrap().clone();
    let (n2, o2) = storage.output("x.k2").unwrap().clone();
    g.connect(n1, &o1, cat, "k1", false).unwrap();
    g.connect(n2, &o2, cat, "k2", false).unwrap();
    g.close(cat, CloseOptions::default()).unwrap();

    println!("concatenated = {:?}", g.output_data(cat, "out").unwrap().as_f64());
}
