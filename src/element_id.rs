//! Lightweight handles into a [`FlowGraph`](crate::flow_graph::FlowGraph) arena.
//!
//! Elements, ports and connections refer to each other through these opaque
//! ids rather than direct references: ports know their owner and owners know
//! their ports in O(1) both directions, with no reference cycles to manage.
//!
//! They're small, `Copy`, and hashable, so traversals can use them as keys in
//! seen-sets and the dependency projection can use them as graph vertices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a flow element within one [`FlowGraph`] arena.
///
/// Ids are arena slot indexes; they stay stable for the life of the graph
/// (removed elements leave a tombstone, slots are never reused).
///
/// [`FlowGraph`]: crate::flow_graph::FlowGraph
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("element arena overflow"))
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// The underlying numeric value, mainly for debugging output.
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Unique identifier of a port-to-port connection within one graph.
///
/// Connection slots are tombstoned on disconnect, so a stale id can be
/// detected rather than silently aliasing a newer connection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ConnectionId(pub(crate) u32);

impl ConnectionId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("connection slab overflow"))
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Direction of a port.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// Address of one port on one element: owner id, direction, and position in
/// the owner's port list for that direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct PortRef {
    pub element: ElementId,
    pub direction: PortDirection,
    pub index: usize,
}

impl PortRef {
    #[must_use]
    pub fn input(element: ElementId, index: usize) -> Self {
        Self {
            element,
            direction: PortDirection::Input,
            index,
        }
    }

    #[must_use]
    pub fn output(element: ElementId, index: usize) -> Self {
        Self {
            element,
            direction: PortDirection::Output,
            index,
        }
    }
}
