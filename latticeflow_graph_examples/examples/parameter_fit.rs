// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A minimal fit-style loop: a Gaussian constraint's chi-square is probed
//! at a few candidate parameter values via `make_fcn`'s push/pop protocol,
//! then the parameter is restored to its original value.

use latticeflow_graph::parameter::{Parameters, make_fcn};
use latticeflow_graph::{CloseOptions, Graph};
use latticeflow_ops::Sum;

fn main() {
    let mut g = Graph::new();
    let (mut parameters, constraint) =
        Parameters::from_numbers(&mut g, "x", vec![5.0], vec!["x".into()], true, Some(vec![2.0]), None).unwrap();
    let constraint = constraint.unwrap();

    let echo = g.add_node("echo", Box::new(Sum));
    g.add_input(echo, "x", false).unwrap();
    g.add_output(echo, "out", true, false).unwrap();
    g.connect(parameters.owner(), parameters.output_name(), echo, "x", false)
        .unwrap();
    g.close(echo, CloseOptions::default()).unwrap();

    let mut f = make_fcn(&mut g, &mut parameters, echo, "out", true);
    for candidate in [5.0, 6.0, 9.0, 3.0] {
        let probed = f(&[candidate]).unwrap();
        println!("f({candidate}) = {probed}");
    }
    drop(f);

    println!(
        "parameter restored to {:?}",
        g.output_data(parameters.owner(), parameters.output_name()).unwrap().as_f64()
    );

    let chi2 = constraint.chi_square(&mut g).unwrap();
    println!("chi_square at restored value = {chi2}");
}
