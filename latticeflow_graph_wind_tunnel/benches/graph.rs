// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use latticeflow_graph::{Buffer, CloseOptions, Graph, NodeId};
use latticeflow_ops::{Array, Sum};

/// Entry point for `latticeflow_graph` wind-tunnel benchmarks.
///
/// Registers scenarios that highlight how invalidations propagate through
/// different graph shapes (chains, fanout, disjoint chains, shared
/// upstreams, layered DAG "cones") for the taint/touch protocol.
fn bench_graph(c: &mut Criterion) {
    bench_chain_rerun(c);
    bench_chain_noop(c);
    bench_fanout_rerun(c);
    bench_disjoint_chains(c);
    bench_shared_upstream_one_tenant(c);
    bench_shared_upstream_shared_key(c);
    bench_layered_dag_cone(c);
}

fn array_source(graph: &mut Graph, name: &str, value: f64) -> NodeId {
    let node = graph.add_node(name, Box::new(Array::new(Buffer::F64(vec![value]))));
    graph.add_output(node, "out", true, false).unwrap();
    node
}

fn passthrough(graph: &mut Graph, name: &str, upstream: NodeId) -> NodeId {
    let node = graph.add_node(name, Box::new(Sum));
    graph.add_input(node, "x", false).unwrap();
    graph.add_output(node, "out", true, false).unwrap();
    graph.connect(upstream, "out", node, "x", false).unwrap();
    node
}

fn build_chain_graph(len: usize) -> (Graph, NodeId, NodeId) {
    let mut g = Graph::new();
    let root = array_source(&mut g, "n0", 1.0);
    let mut prev = root;
    for i in 1..len {
        prev = passthrough(&mut g, &format!("n{i}"), prev);
    }
    g.close(prev, CloseOptions::default()).unwrap();
    g.output_data(prev, "out").unwrap();
    (g, root, prev)
}

/// Linear chain of `len` nodes, each depending on the previous node's output.
///
/// Measures the cost of a single root value change that forces the whole
/// chain to recompute on the next touch of the leaf.
fn bench_chain_rerun(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_rerun");
    for &len in &[10_usize, 100, 1_000] {
        let (mut g, root, leaf) = build_chain_graph(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            let mut v = 0.0_f64;
            b.iter(|| {
                v += 1.0;
                g.set_output_literal(root, "out", Buffer::F64(vec![black_box(v)]), true, false)
                    .unwrap();
                g.touch(leaf, false).unwrap();
            });
        });
    }
    group.finish();
}

/// Steady-state overhead of touching the leaf when nothing is dirty.
///
/// Should be near-constant, not scaling with chain length — the baseline
/// tax of walking an empty dependency closure.
fn bench_chain_noop(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_noop_touch");
    for &len in &[10_usize, 100, 1_000] {
        let (mut g, _root, leaf) = build_chain_graph(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                g.touch(leaf, false).unwrap();
            });
        });
    }
    group.finish();
}

fn build_fanout_graph(fanout: usize) -> (Graph, NodeId, Vec<NodeId>) {
    let mut g = Graph::new();
    let root = array_source(&mut g, "root", 1.0);
    let mut leaves = Vec::with_capacity(fanout);
    for i in 0..fanout {
        let leaf = passthrough(&mut g, &format!("leaf{i}"), root);
        g.close(leaf, CloseOptions::default()).unwrap();
        g.output_data(leaf, "out").unwrap();
        leaves.push(leaf);
    }
    (g, root, leaves)
}

/// Star/fanout graph where a single root feeds `fanout` independent leaves.
///
/// Measures the cost of a root value change that reruns every leaf.
fn bench_fanout_rerun(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout_rerun");
    for &fanout in &[10_usize, 100, 1_000] {
        let (mut g, root, leaves) = build_fanout_graph(fanout);
        group.bench_with_input(BenchmarkId::from_parameter(fanout), &fanout, |b, _| {
            let mut v = 0.0_f64;
            b.iter(|| {
                v += 1.0;
                g.set_output_literal(root, "out", Buffer::F64(vec![black_box(v)]), true, false)
                    .unwrap();
                for &leaf in &leaves {
                    g.touch(leaf, false).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn build_disjoint_chains(chains: usize, chain_len: usize) -> (Graph, Vec<NodeId>, Vec<NodeId>) {
    let mut g = Graph::new();
    let mut roots = Vec::with_capacity(chains);
    let mut leaves = Vec::with_capacity(chains);
    for c in 0..chains {
        let root = array_source(&mut g, &format!("c{c}_root"), 0.0);
        let mut prev = root;
        for i in 1..chain_len {
            prev = passthrough(&mut g, &format!("c{c}_n{i}"), prev);
        }
        g.close(prev, CloseOptions::default()).unwrap();
        g.output_data(prev, "out").unwrap();
        roots.push(root);
        leaves.push(prev);
    }
    (g, roots, leaves)
}

/// Many disjoint chains with no shared upstream.
///
/// Measures the cost of invalidating exactly one chain's root and
/// recomputing only that chain, even as the total node count grows.
fn bench_disjoint_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("disjoint_chains_invalidate_one");
    let chain_len = 32;
    for &chains in &[10_usize, 100, 1_000] {
        let (mut g, roots, leaves) = build_disjoint_chains(chains, chain_len);
        group.bench_with_input(BenchmarkId::from_parameter(chains), &chains, |b, &chains| {
            let mut tick = 0.0_f64;
            let mut idx = 0_usize;
            b.iter(|| {
                tick += 1.0;
                idx = (idx + 1) % chains;
                g.set_output_literal(roots[idx], "out", Buffer::F64(vec![black_box(tick)]), true, false)
                    .unwrap();
                g.touch(leaves[idx], false).unwrap();
            });
        });
    }
    group.finish();
}

fn two_input_sum(graph: &mut Graph, name: &str, a: NodeId, b: NodeId) -> NodeId {
    let node = graph.add_node(name, Box::new(Sum));
    graph.add_input(node, "a", false).unwrap();
    graph.add_input(node, "b", false).unwrap();
    graph.add_output(node, "out", true, false).unwrap();
    graph.connect(a, "out", node, "a", false).unwrap();
    graph.connect(b, "out", node, "b", false).unwrap();
    node
}

fn build_shared_upstream(tenants: usize, chain_len: usize) -> (Graph, NodeId, Vec<NodeId>, Vec<NodeId>) {
    // One shared global value feeds `base = global + per_tenant` for every
    // tenant, each followed by its own pass-through chain.
    let mut g = Graph::new();
    let global = array_source(&mut g, "global", 0.0);
    let mut per_tenant_roots = Vec::with_capacity(tenants);
    let mut leaves = Vec::with_capacity(tenants);
    for t in 0..tenants {
        let per = array_source(&mut g, &format!("t{t}_key"), 0.0);
        let base = two_input_sum(&mut g, &format!("t{t}_base"), global, per);
        let mut prev = base;
        for i in 1..chain_len {
            prev = passthrough(&mut g, &format!("t{t}_n{i}"), prev);
        }
        g.close(prev, CloseOptions::default()).unwrap();
        g.output_data(prev, "out").unwrap();
        per_tenant_roots.push(per);
        leaves.push(prev);
    }
    (g, global, per_tenant_roots, leaves)
}

/// Many tenants share one global upstream value, but each also has its own
/// key. Measures invalidating a single tenant's key: should stay close to
/// constant as tenant count grows, since only one tenant's chain reruns.
fn bench_shared_upstream_one_tenant(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_upstream_invalidate_one_tenant");
    let chain_len = 16;
    for &tenants in &[10_usize, 100, 1_000] {
        let (mut g, _global, per_tenant, leaves) = build_shared_upstream(tenants, chain_len);
        group.bench_with_input(BenchmarkId::from_parameter(tenants), &tenants, |b, &tenants| {
            let mut tick = 0.0_f64;
            let mut idx = 0_usize;
            b.iter(|| {
                tick += 1.0;
                idx = (idx + 1) % tenants;
                g.set_output_literal(per_tenant[idx], "out", Buffer::F64(vec![black_box(tick)]), true, false)
                    .unwrap();
                g.touch(leaves[idx], false).unwrap();
            });
        });
    }
    group.finish();
}

/// Same graph shape as `shared_upstream_invalidate_one_tenant`, but
/// invalidates the shared global value instead.
///
/// Measures the "blast radius" of a global configuration change: every
/// tenant must recompute, so this should scale roughly linearly.
fn bench_shared_upstream_shared_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_upstream_invalidate_shared");
    let chain_len = 16;
    for &tenants in &[10_usize, 100, 1_000] {
        let (mut g, global, _per_tenant, leaves) = build_shared_upstream(tenants, chain_len);
        group.bench_with_input(BenchmarkId::from_parameter(tenants), &tenants, |b, _| {
            let mut tick = 0.0_f64;
            b.iter(|| {
                tick += 1.0;
                g.set_output_literal(global, "out", Buffer::F64(vec![black_box(tick)]), true, false)
                    .unwrap();
                for &leaf in &leaves {
                    g.touch(leaf, false).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn build_layered_dag(width: usize, layers: usize) -> (Graph, Vec<NodeId>, Vec<NodeId>) {
    // Root layer: `width` independent Array sources. Each subsequent layer
    // node `i` sums layer-1 nodes `i` and `(i+1) % width` — a 2-input
    // stencil, same shape as a simple finite-difference pass.
    let mut g = Graph::new();
    let mut prev: Vec<NodeId> = (0..width).map(|i| array_source(&mut g, &format!("root{i}"), 0.0)).collect();
    let roots = prev.clone();

    for layer in 1..layers {
        let mut next = Vec::with_capacity(width);
        for i in 0..width {
            let a = prev[i];
            let b = prev[(i + 1) % width];
            let node = two_input_sum(&mut g, &format!("l{layer}_n{i}"), a, b);
            next.push(node);
        }
        prev = next;
    }
    for &leaf in &prev {
        g.close(leaf, CloseOptions::default()).unwrap();
        g.output_data(leaf, "out").unwrap();
    }
    (g, roots, prev)
}

/// Layered DAG where each node depends on two upstream neighbors.
///
/// Measures the widening recomputation cone from invalidating a single
/// root in the first layer, across different widths/layer counts.
fn bench_layered_dag_cone(c: &mut Criterion) {
    let mut group = c.benchmark_group("layered_dag_cone_invalidate_one_root");
    for &(width, layers) in &[(64_usize, 8_usize), (256, 8), (256, 16)] {
        let (mut g, roots, leaves) = build_layered_dag(width, layers);
        group.bench_with_input(BenchmarkId::new("w_l", format!("{width}x{layers}")), &(width, layers), |b, &(width, _layers)| {
            let mut tick = 0.0_f64;
            let mut idx = 0_usize;
            b.iter(|| {
                tick += 1.0;
                idx = (idx + 1) % width;
                g.set_output_literal(roots[idx], "out", Buffer::F64(vec![black_box(tick)]), true, false)
                    .unwrap();
                for &leaf in &leaves {
                    g.touch(leaf, false).unwrap();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_graph);
criterion_main!(benches);
