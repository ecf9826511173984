// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wires two literal arrays into a `Sum`, then caches its output and shows
//! the cache holding a stale value until `recache`.

use latticeflow_graph::{Buffer, CloseOptions, Graph};
use latticeflow_ops::{Array, Cache, Sum};

fn main() {
    let mut g = Graph::new();

    let a = g.add_node("a", Box::new(Array::new(Buffer::F64(vec![1.0, 2.0, 3.0]))));
    g.add_output(a, "out", true, false).unwrap();
    let b = g.add_node("b", Box::new(Array::new(Buffer::F64(vec![10.0, 20.0, 30.0]))));
    g.add_output(b, "out", true, false).unwrap();

    let sum = g.add_node("sum", Box::new(Sum));
    g.add_input(sum, "a", false).unwrap();
    g.add_input(sum, "b", false).unwrap();
    g.add_output(sum, "out", true, false).unwrap();
    g.connect(a, "out", sum, "a", false).unwrap();
    g.connect(b, "out", sum, "b", false).unwrap();

    let cache = g.add_node("cache", Box::new(Cache));
    g.add_input(cache, "in", false).unwrap();
    g.add_output(cache, "out", true, false).unwrap();
    g.connect(sum, "out", cache, "in", false).unwrap();
    g.close(cache, CloseOptions::default()).unwrap();

    println!("sum = {:?}", g.output_data(sum, "out").unwrap().as_f64().unwrap());

    g.freeze(cache).unwrap();
    g.set_output_literal(a, "out", Buffer::F64(vec![100.0, 100.0, 100.0]), true, false)
        .unwrap();
    println!(
        "cache (frozen, stale) = {:?}",
        g.output_data(cache, "out").unwrap().as_f64().unwrap()
    );

    g.recache(cache).unwrap();
    println!(
        "cache (recached) = {:?}",
        g.output_data(cache, "out").unwrap().as_f64().unwrap()
    );
}
