// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parameter/constraint model for fit-style workflows.
//!
//! A [`Parameters`] group wraps one scalar-valued element of a value node's
//! output buffer per fit parameter, supporting the push/pop stack a
//! minimizer uses to probe and then restore a parameter's value. A
//! [`GaussianConstraint`] attaches a penalty term — `chi_square` — to a
//! group, whitening against either a diagonal `sigma` or a full correlation
//! matrix.

use crate::descriptor::DataDescriptor;
use crate::endpoint::Output;
use crate::error::{ErrorContext, GraphError, GraphResult};
use crate::graph::{CloseOptions, Graph};
use crate::node::{NodeId, Operator};
use crate::value::Buffer;

/// A no-op operator for a node whose sole purpose is to hold a literal
/// value buffer (constructed via `Graph::add_constant_output`). Used by
/// [`Parameters::from_numbers`] rather than reaching into `latticeflow_ops`,
/// since that crate depends on this one, not the other way around.
#[derive(Debug, Default)]
pub struct Literal;

impl Operator for Literal {
    fn type_function(&mut self, _inputs: &[DataDescriptor], _outputs: &mut [Output], _node_name: &str) -> GraphResult<()> {
        Ok(())
    }

    fn compute(&mut self, _inputs: &[Buffer], _outputs: &mut [Output], _node_name: &str) -> GraphResult<()> {
        Ok(())
    }
}

/// One scalar fit parameter: an index into a shared value node's output
/// buffer, plus its own push/pop stack.
#[derive(Debug, Clone)]
pub struct Parameter {
    owner: NodeId,
    output_name: Box<str>,
    index: usize,
    name: Box<str>,
    stack: Vec<f64>,
}

impl Parameter {
    fn new(owner: NodeId, output_name: Box<str>, index: usize, name: Box<str>) -> Self {
        Self {
            owner,
            output_name,
            index,
            name,
            stack: Vec::new(),
        }
    }

    /// The parameter's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads the parameter's current value.
    pub fn get(&self, graph: &mut Graph) -> GraphResult<f64> {
        let buf = graph.output_data(self.owner, &self.output_name)?;
        buf.as_f64()
            .and_then(|s| s.get(self.index).copied())
            .ok_or_else(|| {
                GraphError::calculation("parameter index out of range or not f64").with_context(
                    ErrorContext::new().with_node(self.name.clone()).with_output(self.output_name.clone()),
                )
            })
    }

    /// Writes a new value, tainting the owning node.
    pub fn set(&self, graph: &mut Graph, value: f64) -> GraphResult<()> {
        let mut buf = graph.output_data(self.owner, &self.output_name)?.clone();
        let slot = buf.as_f64_mut().and_then(|s| s.get_mut(self.index)).ok_or_else(|| {
            GraphError::calculation("parameter index out of range or not f64").with_context(
                ErrorContext::new().with_node(self.name.clone()).with_output(self.output_name.clone()),
            )
        })?;
        *slot = value;
        graph.set_output_literal(self.owner, &self.output_name, buf, true, false)?;
        Ok(())
    }

    /// Pushes the current value onto the restore stack.
    pub fn push(&mut self, graph: &mut Graph) -> GraphResult<()> {
        let value = self.get(graph)?;
        self.stack.push(value);
        Ok(())
    }

    /// Pops the most recently pushed value back into the buffer.
    pub fn pop(&mut self, graph: &mut Graph) -> GraphResult<()> {
        let value = self.stack.pop().ok_or_else(|| {
            GraphError::calculation("parameter stack underflow")
                .with_context(ErrorContext::new().with_node(self.name.clone()))
        })?;
        self.set(graph, value)
    }
}

/// A group of scalar parameters sharing one value node's output buffer.
#[derive(Debug)]
pub struct Parameters {
    owner: NodeId,
    output_name: Box<str>,
    pars: Vec<Parameter>,
    variable: bool,
}

impl Parameters {
    /// Wraps an existing value node's output as a parameter group, closing
    /// the node (with parents) as part of construction.
    ///
    /// Separate `variable`/`fixed` flags would be mutually exclusive
    /// (`fixed = not variable` whenever only one was given); since they
    /// never independently vary, this takes the one meaningful bit
    /// directly.
    pub fn new(
        graph: &mut Graph,
        owner: NodeId,
        output_name: impl Into<Box<str>>,
        names: Vec<Box<str>>,
        variable: bool,
    ) -> GraphResult<Self> {
        let output_name = output_name.into();
        graph.close(owner, CloseOptions::default())?;
        let npars = names.len();
        let pars = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Parameter::new(owner, output_name.clone(), index, name))
            .collect::<Vec<_>>();
        debug_assert_eq!(pars.len(), npars);
        Ok(Self {
            owner,
            output_name,
            pars,
            variable,
        })
    }

    /// Builds a value node from a literal slice of numbers and wraps it,
    /// optionally attaching a Gaussian constraint when `sigma` is given.
    pub fn from_numbers(
        graph: &mut Graph,
        name: impl Into<Box<str>>,
        values: Vec<f64>,
        names: Vec<Box<str>>,
        variable: bool,
        sigma: Option<Vec<f64>>,
        correlation: Option<Vec<Vec<f64>>>,
    ) -> GraphResult<(Self, Option<GaussianConstraint>)> {
        let node = graph.add_node(name, Box::new(Literal));
        graph.add_constant_output(node, "value", Buffer::F64(values.clone()))?;
        let parameters = Self::new(graph, node, "value", names, variable)?;
        let constraint = match sigma {
            Some(sigma) => Some(GaussianConstraint::new(node, "value", values, sigma, correlation)?),
            None => None,
        };
        Ok((parameters, constraint))
    }

    /// The owning value node.
    #[must_use]
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// The shared output name.
    #[must_use]
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Whether this group is variable (as opposed to fixed).
    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.variable
    }

    /// Read-only access to the parameters.
    #[must_use]
    pub fn pars(&self) -> &[Parameter] {
        &self.pars
    }

    /// Mutable access, for push/pop/set during minimization.
    pub fn pars_mut(&mut self) -> &mut [Parameter] {
        &mut self.pars
    }
}

/// A Gaussian (quadratic) penalty on a parameter group's value.
#[derive(Debug, Clone)]
pub struct GaussianConstraint {
    owner: NodeId,
    output_name: Box<str>,
    central: Vec<f64>,
    sigma: Vec<f64>,
    cholesky: Option<Vec<Vec<f64>>>,
}

impl GaussianConstraint {
    /// Builds a constraint. When `correlation` is `Some`, its Cholesky
    /// factor is precomputed so `chi_square` can whiten correlated
    /// residuals via forward substitution.
    pub fn new(
        owner: NodeId,
        output_name: impl Into<Box<str>>,
        central: Vec<f64>,
        sigma: Vec<f64>,
        correlation: Option<Vec<Vec<f64>>>,
    ) -> GraphResult<Self> {
        let n = central.len();
        if sigma.len() != n {
            return Err(GraphError::initialization(
                "sigma length does not match the number of parameters",
            ));
        }
        let cholesky = match correlation {
            Some(corr) => {
                if corr.len() != n || corr.iter().any(|row| row.len() != n) {
                    return Err(GraphError::initialization(
                        "correlation matrix shape does not match the number of parameters",
                    ));
                }
                let mut cov = vec![vec![0.0; n]; n];
                for i in 0..n {
                    for j in 0..n {
                        cov[i][j] = sigma[i] * sigma[j] * corr[i][j];
                    }
                }
                Some(cholesky_lower(&cov)?)
            }
            None => None,
        };
        Ok(Self {
            owner,
            output_name: output_name.into(),
            central,
            sigma,
            cholesky,
        })
    }

    /// The owning value node.
    #[must_use]
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Whether this constraint correlates its parameters.
    #[must_use]
    pub fn is_correlated(&self) -> bool {
        self.cholesky.is_some()
    }

    /// Residuals whitened to unit variance: `z = (x - central) / sigma` in
    /// the diagonal case, or `z = L^{-1}(x - central)` when correlated,
    /// where `L` is the Cholesky factor of the covariance matrix.
    pub fn normalized_residuals(&self, graph: &mut Graph) -> GraphResult<Vec<f64>> {
        let current = graph.output_data(self.owner, &self.output_name)?;
        let values = current.as_f64().ok_or_else(|| {
            GraphError::calculation("constrained output is not f64")
                .with_context(ErrorContext::new().with_output(self.output_name.clone()))
        })?;
        let deltas: Vec<f64> = values
            .iter()
            .zip(&self.central)
            .map(|(x, c)| x - c)
            .collect();

        match &self.cholesky {
            None => Ok(deltas.iter().zip(&self.sigma).map(|(d, s)| d / s).collect()),
            Some(l) => Ok(forward_substitute(l, &deltas)),
        }
    }

    /// Sum of squared whitened residuals — the quadratic penalty term, same
    /// for the diagonal and correlated cases.
    pub fn chi_square(&self, graph: &mut Graph) -> GraphResult<f64> {
        Ok(self
            .normalized_residuals(graph)?
            .into_iter()
            .map(|z| z * z)
            .sum())
    }

    /// Maps whitened residuals back to the original values: `x = sigma*z +
    /// central` in the diagonal case, or `x = Lz + central` when correlated
    /// — the backward half of the round trip `normalized_residuals` whitens.
    pub fn denormalized(&self, z: &[f64]) -> GraphResult<Vec<f64>> {
        if z.len() != self.central.len() {
            return Err(GraphError::calculation(
                "z has the wrong length for this constraint",
            ));
        }
        match &self.cholesky {
            None => Ok(z
                .iter()
                .zip(&self.sigma)
                .zip(&self.central)
                .map(|((zi, s), c)| s * zi + c)
                .collect()),
            Some(l) => Ok(matvec(l, z)
                .into_iter()
                .zip(&self.central)
                .map(|(xi, c)| xi + c)
                .collect()),
        }
    }

    /// Writes `denormalized(z)` into the owning node's output buffer,
    /// tainting it the same way `Parameter::set` does.
    pub fn apply_backward(&self, graph: &mut Graph, z: &[f64]) -> GraphResult<()> {
        let x = self.denormalized(z)?;
        graph.set_output_literal(self.owner, &self.output_name, Buffer::F64(x), true, false)?;
        Ok(())
    }
}

fn cholesky_lower(cov: &[Vec<f64>]) -> GraphResult<Vec<Vec<f64>>> {
    let n = cov.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = cov[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 {
                    return Err(GraphError::initialization(
                        "covariance matrix is not positive-definite",
                    ));
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Ok(l)
}

fn forward_substitute(l: &[Vec<f64>], rhs: &[f64]) -> Vec<f64> {
    let n = rhs.len();
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = rhs[i];
        for k in 0..i {
            sum -= l[i][k] * z[k];
        }
        z[i] = sum / l[i][i];
    }
    z
}

fn matvec(l: &[Vec<f64>], z: &[f64]) -> Vec<f64> {
    l.iter().map(|row| row.iter().zip(z).map(|(a, b)| a * b).sum()).collect()
}

/// Builds a push/pop-safe (or direct, unsafe) callable that sets
/// `parameters`' values, touches `node`, and returns the scalar at
/// `output_name`'s first element — the fit-function adapter a minimizer
/// drives.
///
/// `safe = true` pushes every parameter's current value first, sets the new
/// ones, touches, reads the result, then pops (restoring the prior values)
/// and touches again so the graph reflects the restored state.
pub fn make_fcn<'g>(
    graph: &'g mut Graph,
    parameters: &'g mut Parameters,
    node: NodeId,
    output_name: &'g str,
    safe: bool,
) -> impl FnMut(&[f64]) -> GraphResult<f64> + 'g {
    move |values: &[f64]| -> GraphResult<f64> {
        if safe {
            for p in parameters.pars_mut() {
                p.push(graph)?;
            }
        }
        for (p, v) in parameters.pars_mut().iter_mut().zip(values) {
            p.set(graph, *v)?;
        }
        graph.touch(node, false)?;
        let result = graph
            .output_data(node, output_name)?
            .as_f64()
            .and_then(|s| s.first().copied())
            .ok_or_else(|| {
                GraphError::calculation("fcn output is empty or not f64")
                    .with_context(ErrorContext::new().with_output(output_name))
            })?;
        if safe {
            for p in parameters.pars_mut() {
                p.pop(graph)?;
            }
            graph.touch(node, true)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips_through_the_shared_buffer() {
        let mut g = Graph::new();
        let (mut parameters, _) =
            Parameters::from_numbers(&mut g, "p", vec![1.0, 2.0], vec!["a".into(), "b".into()], true, None, None)
                .unwrap();
        parameters.pars_mut()[0].set(&mut g, 5.0).unwrap();
        assert_eq!(parameters.pars()[0].get(&mut g).unwrap(), 5.0);
        assert_eq!(parameters.pars()[1].get(&mut g).unwrap(), 2.0);
    }

    #[test]
    fn push_pop_restores_prior_value() {
        let mut g = Graph::new();
        let (mut parameters, _) =
            Parameters::from_numbers(&mut g, "p", vec![1.0], vec!["a".into()], true, None, None).unwrap();
        parameters.pars_mut()[0].push(&mut g).unwrap();
        parameters.pars_mut()[0].set(&mut g, 9.0).unwrap();
        parameters.pars_mut()[0].pop(&mut g).unwrap();
        assert_eq!(parameters.pars()[0].get(&mut g).unwrap(), 1.0);
    }

    #[test]
    fn diagonal_gaussian_constraint_matches_manual_z_score() {
        let mut g = Graph::new();
        let (_parameters, constraint) = Parameters::from_numbers(
            &mut g,
            "x",
            vec![3.0],
            vec!["x".into()],
            true,
            Some(vec![2.0]),
            None,
        )
        .unwrap();
        let constraint = constraint.unwrap();
        let z = constraint.normalized_residuals(&mut g).unwrap();
        assert_eq!(z, vec![(3.0 - 3.0) / 2.0]);
        assert_eq!(constraint.chi_square(&mut g).unwrap(), 0.0);
    }

    #[test]
    fn denormalized_inverts_normalized_residuals() {
        let mut g = Graph::new();
        let (_parameters, constraint) = Parameters::from_numbers(
            &mut g,
            "x",
            vec![7.0],
            vec!["x".into()],
            true,
            Some(vec![2.0]),
            None,
        )
        .unwrap();
        let constraint = constraint.unwrap();
        let z = constraint.normalized_residuals(&mut g).unwrap();
        let x = constraint.denormalized(&z).unwrap();
        assert_eq!(x, vec![7.0]);
    }

    #[test]
    fn correlated_denormalized_applies_cholesky_factor() {
        let mut g = Graph::new();
        let (_parameters, constraint) = Parameters::from_numbers(
            &mut g,
            "xy",
            vec![0.0, 0.0],
            vec!["x".into(), "y".into()],
            true,
            Some(vec![1.0, 1.0]),
            Some(vec![vec![1.0, 0.5], vec![0.5, 1.0]]),
        )
        .unwrap();
        let constraint = constraint.unwrap();
        let z = constraint.normalized_residuals(&mut g).unwrap();
        let x = constraint.denormalized(&z).unwrap();
        assert!((x[0]).abs() < 1e-9);
        assert!((x[1]).abs() < 1e-9);
    }
}
