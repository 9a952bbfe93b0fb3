//! Port resolution over a single flow element.
//!
//! An [`ElementResolver`] wraps one element of a [`FlowGraph`] and exposes its
//! ports by name, so the model builder can wire a flow without tracking port
//! indexes: `resolve_output` on the producer yields a connectable source,
//! `resolve_input` on the consumer binds it.

use crate::element_id::{ConnectionId, ElementId, PortRef};
use crate::flow_graph::FlowGraph;
use anyhow::{Context, Result, anyhow};

/// A by-name view over one element's ports.
pub struct ElementResolver<'g> {
    graph: &'g mut FlowGraph,
    id: ElementId,
}

impl<'g> ElementResolver<'g> {
    pub(crate) fn new(graph: &'g mut FlowGraph, id: ElementId) -> Self {
        Self { graph, id }
    }

    fn label(&self) -> String {
        self.graph
            .element(self.id)
            .map_or_else(|| self.id.to_string(), |e| e.description().label())
    }

    /// Connect the named input port to `source`, an output port obtained from
    /// another element's [`resolve_output`](Self::resolve_output).
    ///
    /// # Errors
    ///
    /// "No such port" if the name is unknown, or any connection failure
    /// (wrong direction, single-valued input already bound).
    pub fn resolve_input(&mut self, name: &str, source: PortRef) -> Result<ConnectionId> {
        let target = self
            .graph
            .find_input(self.id, name)
            .ok_or_else(|| anyhow!("no such input port '{}' on '{}'", name, self.label()))?;
        self.graph
            .connect(source, target)
            .with_context(|| format!("resolving input '{}' of '{}'", name, self.label()))
    }

    /// The named output port, as a source for downstream connections.
    ///
    /// # Errors
    ///
    /// "No such port" if the name is unknown.
    pub fn resolve_output(&self, name: &str) -> Result<PortRef> {
        self.graph
            .find_output(self.id, name)
            .ok_or_else(|| anyhow!("no such output port '{}' on '{}'", name, self.label()))
    }

    /// Rename the wrapped element's description.
    ///
    /// Allowed exactly once; pseudo/marker descriptions forbid it.
    ///
    /// # Errors
    ///
    /// If the element is gone, renaming is forbidden, or it already happened.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        self.graph
            .element_checked_mut(self.id)?
            .description_mut()
            .rename(name)
    }
}
