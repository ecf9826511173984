//! End-to-end literal scenarios and round-trip laws, run as ordinary
//! integration tests against the public API of `latticeflow_graph` and
//! `latticeflow_ops`. These exercise the same ground covered by each
//! crate's own unit tests, but from outside, wiring operators together the
//! way a caller building a real pipeline would.

use latticeflow_graph::parameter::Parameters;
use latticeflow_graph::{CloseOptions, Graph, OpenOptions};
use latticeflow_ops::{Array, Cache, Concatenation, Sum};

fn source(graph: &mut Graph, name: &str, values: Vec<f64>) -> latticeflow_graph::NodeId {
    let node = graph.add_node(name, Box::new(Array::new(latticeflow_graph::Buffer::F64(values))));
    graph.add_output(node, "out", true, false).unwrap();
    node
}

#[test]
fn sum_of_two_vectors() {
    let mut g = Graph::new();
    let a = source(&mut g, "a", vec![1.0, 2.0, 3.0]);
    let b = source(&mut g, "b", vec![10.0, 20.0, 30.0]);
    let sum = g.add_node("sum", Box::new(Sum));
    g.add_input(sum, "a", false).unwrap();
    g.add_input(sum, "b", false).unwrap();
    g.add_output(sum, "out", true, false).unwrap();
    g.connect(a, "out", sum, "a", false).unwrap();
    g.connect(b, "out", sum, "b", false).unwrap();
    g.close(sum, CloseOptions::default()).unwrap();

    assert_eq!(
        g.output_data(sum, "out").unwrap().as_f64(),
        Some(&[11.0, 22.0, 33.0][..])
    );
}

#[test]
fn cache_freezes_then_recaches() {
    use latticeflow_graph::parameter::Literal;

    let mut g = Graph::new();
    // `Literal`'s compute is a true no-op, so a later `set_output_literal`
    // write survives a recompute; `Array` would overwrite it back to its
    // own stored buffer the next time it runs.
    let a = g.add_node("a", Box::new(Literal));
    g.add_constant_output(a, "out", latticeflow_graph::Buffer::F64(vec![1.0]))
        .unwrap();
    let cache = g.add_node("cache", Box::new(Cache));
    g.add_input(cache, "in", false).unwrap();
    g.add_output(cache, "out", true, false).unwrap();
    g.connect(a, "out", cache, "in", false).unwrap();
    g.close(cache, CloseOptions::default()).unwrap();

    assert_eq!(g.output_data(cache, "out").unwrap().as_f64(), Some(&[1.0][..]));
    g.freeze(cache).unwrap();

    g.set_output_literal(a, "out", latticeflow_graph::Buffer::F64(vec![5.0]), true, false)
        .unwrap();
    assert_eq!(g.output_data(cache, "out").unwrap().as_f64(), Some(&[1.0][..]));

    g.recache(cache).unwrap();
    assert_eq!(g.output_data(cache, "out").unwrap().as_f64(), Some(&[5.0][..]));
}

#[test]
fn parameter_push_pop_via_make_fcn() {
    let mut g = Graph::new();
    let (mut parameters, _) = Parameters::from_numbers(
        &mut g,
        "p",
        vec![1.0, 2.0],
        vec!["a".into(), "b".into()],
        true,
        None,
        None,
    )
    .unwrap();

    // `Sum` with a single input is an elementwise identity pass-through;
    // it stands in for "the fit function reads the parameter group" here,
    // since the two parameters already share one buffer to sum over.
    let sum = g.add_node("sum", Box::new(Sum));
    g.add_input(sum, "vals", false).unwrap();
    g.add_output(sum, "out", true, false).unwrap();
    g.connect(parameters.owner(), parameters.output_name(), sum, "vals", false)
        .unwrap();
    g.close(sum, CloseOptions::default()).unwrap();

    let owner = parameters.owner();
    let mut f = latticeflow_graph::parameter::make_fcn(&mut g, &mut parameters, sum, "out", true);
    let first_slot = f(&[10.0, 20.0]).unwrap();
    assert_eq!(first_slot, 10.0);
    drop(f);

    // `safe = true` restores both the parameter values and the graph's
    // computed state before returning.
    assert_eq!(
        g.output_data(sum, "out").unwrap().as_f64(),
        Some(&[1.0, 2.0][..])
    );
    assert_eq!(
        g.output_data(owner, "value").unwrap().as_f64(),
        Some(&[1.0, 2.0][..])
    );
}

#[test]
fn concatenation_with_unequal_input_sizes() {
    let mut g = Graph::new();
    let a = source(&mut g, "a", vec![1.0, 2.0, 3.0]);
    let b = source(&mut g, "b", vec![4.0, 5.0]);
    let cat = g.add_node("cat", Box::new(Concatenation));
    g.add_input(cat, "a", false).unwrap();
    g.add_input(cat, "b", false).unwrap();
    g.add_output(cat, "out", true, false).unwrap();
    g.connect(a, "out", cat, "a", false).unwrap();
    g.connect(b, "out", cat, "b", false).unwrap();
    g.close(cat, CloseOptions::default()).unwrap();

    assert_eq!(
        g.output_data(cat, "out").unwrap().as_f64(),
        Some(&[1.0, 2.0, 3.0, 4.0, 5.0][..])
    );

    g.set_output_literal(a, "out", latticeflow_graph::Buffer::F64(vec![9.0, 9.0, 9.0]), true, false)
        .unwrap();
    assert_eq!(
        g.output_data(cat, "out").unwrap().as_f64(),
        Some(&[9.0, 9.0, 9.0, 4.0, 5.0][..])
    );
}

#[test]
fn replicate_over_two_keys() {
    use latticeflow_graph::replicate::replicate;
    use latticeflow_graph::storage::NodeStorage;

    let mut g = Graph::new();
    let made = replicate(&mut g, "x", &["k1", "k2"], |_key| {
        Box::new(Array::new(latticeflow_graph::Buffer::F64(vec![0.0]))) as Box<dyn latticeflow_graph::node::Operator>
    });
    assert_eq!(made.len(), 2);

    let mut storage = NodeStorage::new();
    for (key, node) in &made {
        g.add_output(*node, "out", true, false).unwrap();
        storage.insert_node(format!("x.{key}"), *node);
        storage.insert_output(format!("x.{key}"), (*node, "out".into()));
    }
    assert!(storage.node("x.k1").is_some());
    assert!(storage.node("x.k2").is_some());
}

#[test]
fn gaussian_constraint_normalizes_then_denormalizes_and_restores_on_pop() {
    use latticeflow_graph::parameter::{GaussianConstraint, Literal, Parameters};

    let mut g = Graph::new();
    // `from_numbers` ties a constraint's central to the node's initial
    // value, so central (5.0) distinct from the current value (7.0) needs
    // the node and the constraint built separately.
    let node = g.add_node("x", Box::new(Literal));
    g.add_constant_output(node, "value", latticeflow_graph::Buffer::F64(vec![7.0]))
        .unwrap();
    let mut parameters = Parameters::new(&mut g, node, "value", vec!["x".into()], true).unwrap();
    let constraint = GaussianConstraint::new(node, "value", vec![5.0], vec![2.0], None).unwrap();

    let z = constraint.normalized_residuals(&mut g).unwrap();
    assert_eq!(z, vec![1.0]);

    parameters.pars_mut()[0].push(&mut g).unwrap();
    constraint.apply_backward(&mut g, &[-2.0]).unwrap();
    let x = parameters.pars()[0].get(&mut g).unwrap();
    assert_eq!(x, 1.0);

    parameters.pars_mut()[0].pop(&mut g).unwrap();
    let restored = parameters.pars()[0].get(&mut g).unwrap();
    assert_eq!(restored, 7.0);
}

#[test]
fn round_trip_connect_close_open_close_is_stable() {
    let mut g = Graph::new();
    let a = source(&mut g, "a", vec![1.0, 2.0]);
    let cache = g.add_node("cache", Box::new(Cache));
    g.add_input(cache, "in", false).unwrap();
    g.add_output(cache, "out", true, false).unwrap();
    g.connect(a, "out", cache, "in", false).unwrap();
    g.close(cache, CloseOptions::default()).unwrap();
    let first = g.output_data(cache, "out").unwrap().clone();

    g.open(cache, OpenOptions::default()).unwrap();
    g.close(cache, CloseOptions::default()).unwrap();
    let second = g.output_data(cache, "out").unwrap().clone();

    assert_eq!(first, second);
}

#[test]
fn reconnection_without_force_taint_is_rejected() {
    let mut g = Graph::new();
    let a = source(&mut g, "a", vec![1.0]);
    let b = source(&mut g, "b", vec![2.0]);
    let cache = g.add_node("cache", Box::new(Cache));
    g.add_input(cache, "in", false).unwrap();
    g.add_output(cache, "out", true, false).unwrap();
    g.connect(a, "out", cache, "in", false).unwrap();

    let err = g.connect(b, "out", cache, "in", false).unwrap_err();
    assert_eq!(err.kind, latticeflow_graph::ErrorKind::Reconnection);
}

#[test]
fn two_allocating_inputs_on_the_same_output_is_rejected() {
    let mut g = Graph::new();
    let a = source(&mut g, "a", vec![1.0, 2.0]);
    let sum = g.add_node("sum", Box::new(Sum));
    g.add_input(sum, "x", true).unwrap();
    g.add_input(sum, "y", true).unwrap();
    g.add_output(sum, "out", true, false).unwrap();
    g.connect(a, "out", sum, "x", false).unwrap();

    let err = g.connect(a, "out", sum, "y", false).unwrap_err();
    assert_eq!(err.kind, latticeflow_graph::ErrorKind::Connection);
}
