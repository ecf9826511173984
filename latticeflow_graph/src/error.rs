// Copyright 2026 the Latticeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy: Critical graph errors and Noncritical diagnostics.
//!
//! A message plus optional node/input/output references folded into the
//! display text, collapsed into a single [`GraphError`] carrying an
//! [`ErrorKind`] discriminant rather than one exception class per kind —
//! the idiomatic shape for a `match`-dispatched error type in Rust.

use std::fmt;

/// The node/input/output names an error or diagnostic is attached to.
///
/// Carried alongside every [`GraphError`] so callers can report "what failed
/// and where" without walking back through the call stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Name of the node the error occurred on, if any.
    pub node: Option<Box<str>>,
    /// Name of the input involved, if any.
    pub input: Option<Box<str>>,
    /// Name of the output involved, if any.
    pub output: Option<Box<str>>,
}

impl ErrorContext {
    /// An empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a node name.
    #[must_use]
    pub fn with_node(mut self, name: impl Into<Box<str>>) -> Self {
        self.node = Some(name.into());
        self
    }

    /// Attaches an input name.
    #[must_use]
    pub fn with_input(mut self, name: impl Into<Box<str>>) -> Self {
        self.input = Some(name.into());
        self
    }

    /// Attaches an output name.
    #[must_use]
    pub fn with_output(mut self, name: impl Into<Box<str>>) -> Self {
        self.output = Some(name.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = &self.node {
            write!(f, " [node={n}]")?;
        }
        if let Some(i) = &self.input {
            write!(f, " [input={i}]")?;
        }
        if let Some(o) = &self.output {
            write!(f, " [output={o}]")?;
        }
        Ok(())
    }
}

/// The Critical error kinds from the error taxonomy.
///
/// Any of these leaves the affected node (and, transitively, the graph)
/// unusable until the caller remedies the condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad constructor arguments, duplicate names.
    Initialization,
    /// Buffer allocation refused by invariant or by the system.
    Allocation,
    /// Lifecycle failure while closing.
    Closing,
    /// Lifecycle failure while opening.
    Opening,
    /// Operation attempted on a closed graph/node.
    ClosedGraph,
    /// Operation required a closed graph/node but it was not closed.
    UnclosedGraph,
    /// Type/shape/dtype inconsistency detected by a type function.
    TypeFunction,
    /// Attempt to overwrite an already-connected edge.
    Reconnection,
    /// Incompatible endpoint pair at connect time.
    Connection,
    /// A compute function raised while running.
    Calculation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialization => "initialization error",
            Self::Allocation => "allocation error",
            Self::Closing => "closing error",
            Self::Opening => "opening error",
            Self::ClosedGraph => "closed graph error",
            Self::UnclosedGraph => "unclosed graph error",
            Self::TypeFunction => "type function error",
            Self::Reconnection => "reconnection error",
            Self::Connection => "connection error",
            Self::Calculation => "calculation error",
        };
        f.write_str(s)
    }
}

/// A Critical error: the graph (or the affected node) becomes unusable
/// until the condition is remedied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphError {
    /// Which of the taxonomy's kinds this is.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: Box<str>,
    /// Node/input/output references, for post-mortem inspection.
    pub context: ErrorContext,
}

impl GraphError {
    /// Builds a new error of the given kind with no context attached yet.
    pub fn new(kind: ErrorKind, message: impl Into<Box<str>>) -> Self {
        let err = Self {
            kind,
            message: message.into(),
            context: ErrorContext::new(),
        };
        tracing::error!(kind = %err.kind, message = %err.message, "critical graph error");
        err
    }

    /// Attaches a context to this error, replacing any existing one.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }
}

macro_rules! error_ctor {
    ($name:ident, $kind:ident) => {
        impl GraphError {
            #[doc = concat!("Builds a `", stringify!($kind), "` error.")]
            pub fn $name(message: impl Into<Box<str>>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        }
    };
}

error_ctor!(initialization, Initialization);
error_ctor!(allocation, Allocation);
error_ctor!(closing, Closing);
error_ctor!(opening, Opening);
error_ctor!(closed_graph, ClosedGraph);
error_ctor!(unclosed_graph, UnclosedGraph);
error_ctor!(type_function, TypeFunction);
error_ctor!(reconnection, Reconnection);
error_ctor!(connection, Connection);
error_ctor!(calculation, Calculation);

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}{}", self.kind, self.message, self.context)
    }
}

impl std::error::Error for GraphError {}

/// Result type used throughout the crate.
pub type GraphResult<T> = Result<T, GraphError>;

/// A Noncritical diagnostic: informational, does not invalidate the node.
///
/// Collected rather than raised — e.g. `close(strict: false)` stashes one of
/// these per node instead of aborting the whole close pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable detail.
    pub message: Box<str>,
    /// Node/input/output references.
    pub context: ErrorContext,
}

impl Diagnostic {
    /// Builds a diagnostic and emits it as a `tracing` warning.
    pub fn new(message: impl Into<Box<str>>, context: ErrorContext) -> Self {
        let diag = Self {
            message: message.into(),
            context,
        };
        tracing::warn!(message = %diag.message, "noncritical diagnostic");
        diag
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.message, self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context_suffix() {
        let err = GraphError::connection("cannot connect")
            .with_context(ErrorContext::new().with_node("sum").with_input("a"));
        let text = err.to_string();
        assert!(text.starts_with("connection error: cannot connect"));
        assert!(text.contains("[node=sum]"));
        assert!(text.contains("[input=a]"));
    }

    #[test]
    fn context_without_fields_is_empty_suffix() {
        let ctx = ErrorContext::new();
        assert_eq!(ctx.to_string(), "");
    }
}
