//! # Flowforge
//!
//! The core of a **batch dataflow compiler**: user-authored flow descriptions
//! (graphs of typed operators connected by data ports) are realized into an
//! intermediate representation, analyzed, optimized, and handed to a code
//! emitter that produces the executable distributed plan.
//!
//! This crate owns the parts with real algorithmic content:
//!
//! - **[`graph`]** — a generic mutable directed graph over hashable vertices,
//!   with pure algorithms in [`graph::algo`]: reachability, nearest-match
//!   search, Kosaraju SCC decomposition, cycle detection, postorder
//!   (topological) sorting, transpose and subgraph extraction.
//! - **Flow-graph IR** — [`FlowGraph`]: an arena of [`FlowElement`]s with
//!   named, typed, directional ports, resolved connections, flow attributes
//!   and invocation parameters, plus plan-level validation (mandatory
//!   connectivity, cycle rejection, execution ordering).
//! - **Side-data join rewrite** — [`rewrite_side_data_joins`]: detects
//!   shuffle-join operators whose master side is a bounded ("tiny") input and
//!   rewrites them into side-data joins backed by a pre-materialized lookup
//!   resource, removing the shuffle boundary.
//!
//! The textual front-end, the code emitter, and the execution runtime are
//! external collaborators: the model builder hands this crate a constructed
//! [`FlowGraph`], and the emitter implements [`ResourceResolver`].
//!
//! ## Quick start
//!
//! ```ignore
//! use flowforge::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! // The model builder realizes a parsed flow description into the IR.
//! let mut graph = FlowGraph::new("com.example.SalesFlow");
//! let master = graph.add_flow_input("item_master", item_type.clone(), Some(tiny_importer));
//! let join = graph.add_operator(join_spec)?;
//! graph.resolver(join).resolve_input("master", PortRef::output(master, 0))?;
//! // ... wire the rest, then validate and optimize:
//! graph.validate()?;
//! graph.validate_acyclic()?;
//! let report = rewrite_side_data_joins(&mut graph, &CompilerOptions::default(), &emitter)?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! A [`FlowGraph`] is a single-writer, compile-time, in-process structure.
//! Independent flow graphs may be compiled concurrently — [`rewrite_all`]
//! does exactly that with rayon — but one graph is never mutated from two
//! threads.

pub mod element;
pub mod element_id;
pub mod external;
pub mod flow_graph;
pub mod graph;
pub mod port;
pub mod resolver;
pub mod rewrite;
pub mod testing;

pub use element::{
    Attribute, AttributeMap, ElementDescription, ElementKind, FlowBoundary, ObservationCount,
    OperatorKind, Origin, Parameter, PseudoKind,
};
pub use element_id::{ConnectionId, ElementId, PortDirection, PortRef};
pub use external::{
    ExporterDescription, ImporterDescription, JoinResourceDescription, ResourceResolver,
    SideDataResource, SizeCategory, WireFormat,
};
pub use flow_graph::{ComponentSpec, Connection, FlowElement, FlowGraph, OperatorSpec};
pub use graph::Graph;
pub use port::{
    Connectivity, DataType, Field, FieldType, InputBuffer, JoinRole, Port, PortDescription,
    ShuffleKey, SortOrder,
};
pub use resolver::ElementResolver;
pub use rewrite::{
    CompilerOptions, RewriteDecision, RewriteReport, rewrite_all, rewrite_side_data_joins,
};
