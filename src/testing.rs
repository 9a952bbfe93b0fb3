//! Test utilities: canned join-flow scenarios, mock resource resolvers, and
//! small assertion helpers.
//!
//! Everything here is ordinary public API so downstream crates can reuse the
//! builders in their own tests; the crate's integration tests under `tests/`
//! are built entirely on this module.

use crate::element::{
    Attribute, AttributeMap, ElementDescription, ElementKind, FlowBoundary, OperatorKind,
    Parameter, PseudoKind,
};
use crate::element_id::{ElementId, PortRef};
use crate::external::{
    ImporterDescription, JoinResourceDescription, ResourceResolver, SizeCategory, WireFormat,
};
use crate::flow_graph::{ComponentSpec, FlowGraph, OperatorSpec};
use crate::port::{DataType, Field, FieldType, JoinRole, PortDescription, ShuffleKey};
use anyhow::{Result, anyhow};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// `ItemMaster(id: long, name: text, price: long)`.
#[must_use]
pub fn master_type() -> DataType {
    DataType::new(
        "ItemMaster",
        vec![
            Field::new("id", FieldType::Long),
            Field::new("name", FieldType::Text),
            Field::new("price", FieldType::Long),
        ],
    )
}

/// `SalesTransaction(item_id: long, item_name: text, quantity: int)`.
#[must_use]
pub fn transaction_type() -> DataType {
    DataType::new(
        "SalesTransaction",
        vec![
            Field::new("item_id", FieldType::Long),
            Field::new("item_name", FieldType::Text),
            Field::new("quantity", FieldType::Int),
        ],
    )
}

/// A canned flow for exercising the side-data join rewrite: a master input
/// feeding a `MasterJoin`-family operator's master port, a transaction input
/// feeding its transaction port, and every operator output wired to flow
/// outputs.
pub struct JoinScenario {
    pub graph: FlowGraph,
    pub master_input: ElementId,
    pub transaction_input: ElementId,
    pub join: ElementId,
    /// Flow outputs per operator output, in connection order.
    pub consumers: Vec<Vec<ElementId>>,
}

/// Builder for [`JoinScenario`].
pub struct JoinScenarioBuilder {
    kind: OperatorKind,
    size: SizeCategory,
    format: WireFormat,
    transaction_keys: Vec<String>,
    outputs: usize,
    consumers_per_output: usize,
    via_identity: bool,
    via_component: bool,
}

impl Default for JoinScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JoinScenarioBuilder {
    /// A tiny, temporary-format master input joined on `(long, text)` keys,
    /// one output with one consumer, wired directly.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kind: OperatorKind::MasterJoin,
            size: SizeCategory::Tiny,
            format: WireFormat::Temporary,
            transaction_keys: vec!["item_id".into(), "item_name".into()],
            outputs: 1,
            consumers_per_output: 1,
            via_identity: false,
            via_component: false,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: OperatorKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn size(mut self, size: SizeCategory) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// Group the transaction side on `(item_id, quantity)` — `(long, int)`,
    /// mismatched against the master's `(long, text)`.
    #[must_use]
    pub fn mismatched_keys(mut self) -> Self {
        self.transaction_keys = vec!["item_id".into(), "quantity".into()];
        self
    }

    #[must_use]
    pub fn outputs(mut self, outputs: usize) -> Self {
        self.outputs = outputs;
        self
    }

    #[must_use]
    pub fn consumers_per_output(mut self, consumers: usize) -> Self {
        self.consumers_per_output = consumers;
        self
    }

    /// Route the master side through an identity pseudo element.
    #[must_use]
    pub fn via_identity(mut self) -> Self {
        self.via_identity = true;
        self
    }

    /// Route the master side through a nested flow component.
    #[must_use]
    pub fn via_component(mut self) -> Self {
        self.via_component = true;
        self
    }

    /// Build the flow graph.
    ///
    /// # Errors
    ///
    /// If any construction step fails; scenarios are expected to build.
    pub fn build(self) -> Result<JoinScenario> {
        let mut graph = FlowGraph::new("com.example.SalesJoinFlow");

        let master_input = graph.add_flow_input(
            "item_master",
            master_type(),
            Some(ImporterDescription::new(
                "item_master",
                self.size,
                self.format,
            )),
        );
        let transaction_input = graph.add_flow_input(
            "sales",
            transaction_type(),
            Some(ImporterDescription::new(
                "sales",
                SizeCategory::Large,
                WireFormat::Temporary,
            )),
        );

        let mut spec = OperatorSpec::new(self.kind, "SalesOperator", "joinItem")
            .with_input(
                PortDescription::new("master", master_type())
                    .with_role(JoinRole::Master)
                    .with_shuffle_key(ShuffleKey::grouped_by(["id", "name"])),
            )
            .with_input(
                PortDescription::new("transaction", transaction_type())
                    .with_role(JoinRole::Transaction)
                    .with_shuffle_key(ShuffleKey::grouped_by(self.transaction_keys.clone())),
            )
            .with_parameter(Parameter::new("missed_rate", "double", Some("0.05".into())))
            .with_attributes(AttributeMap::from_attributes([Attribute::Boundary(
                FlowBoundary::Shuffle,
            )])?);
        for index in 0..self.outputs {
            spec = spec.with_output(PortDescription::new(
                format!("out{index}"),
                transaction_type(),
            ));
        }
        let join = graph.add_operator(spec)?;

        // Master route: direct, through an identity pseudo, through a nested
        // component, or both.
        let mut master_source = PortRef::output(master_input, 0);
        if self.via_component {
            let boundary_in = graph.add_pseudo(PseudoKind::Identity, master_type());
            let boundary_out = graph.add_pseudo(PseudoKind::Identity, master_type());
            graph.connect(
                PortRef::output(boundary_in, 0),
                PortRef::input(boundary_out, 0),
            )?;
            let component = graph.add_component(ComponentSpec {
                description: ElementDescription::component("MasterCleanser"),
                inputs: vec![PortDescription::new("in", master_type())],
                outputs: vec![PortDescription::new("out", master_type())],
                interior_inputs: vec![boundary_in],
                interior_outputs: vec![boundary_out],
            })?;
            graph.connect(master_source, PortRef::input(component, 0))?;
            master_source = PortRef::output(component, 0);
        }
        if self.via_identity {
            let identity = graph.add_pseudo(PseudoKind::Identity, master_type());
            graph.connect(master_source, PortRef::input(identity, 0))?;
            master_source = PortRef::output(identity, 0);
        }
        graph.resolver(join).resolve_input("master", master_source)?;
        graph
            .resolver(join)
            .resolve_input("transaction", PortRef::output(transaction_input, 0))?;

        let mut consumers = Vec::new();
        for index in 0..self.outputs {
            let source = graph.resolver(join).resolve_output(&format!("out{index}"))?;
            let mut sinks = Vec::new();
            for consumer in 0..self.consumers_per_output {
                let sink = graph.add_flow_output(
                    format!("result_{index}_{consumer}"),
                    transaction_type(),
                    None,
                );
                graph.connect(source, PortRef::input(sink, 0))?;
                sinks.push(sink);
            }
            consumers.push(sinks);
        }

        Ok(JoinScenario {
            graph,
            master_input,
            transaction_input,
            join,
            consumers,
        })
    }
}

/// Ids of live operator elements of the given kind.
#[must_use]
pub fn operators_of_kind(graph: &FlowGraph, kind: OperatorKind) -> Vec<ElementId> {
    graph
        .elements()
        .filter(|(_, e)| e.kind() == ElementKind::Operator(kind))
        .map(|(id, _)| id)
        .collect()
}

/// Ids of live `Stop` pseudo elements.
#[must_use]
pub fn stop_markers(graph: &FlowGraph) -> Vec<ElementId> {
    graph
        .elements()
        .filter(|(_, e)| e.kind() == ElementKind::Pseudo(PseudoKind::Stop))
        .map(|(id, _)| id)
        .collect()
}

/// A resolver that records every description it sees and hands out
/// deterministic artifact names.
#[derive(Default)]
pub struct RecordingResolver {
    resolved: Mutex<Vec<JoinResourceDescription>>,
}

impl RecordingResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything resolved so far, in call order.
    #[must_use]
    pub fn resolved(&self) -> Vec<JoinResourceDescription> {
        self.resolved.lock().unwrap().clone()
    }
}

impl ResourceResolver for RecordingResolver {
    fn resolve(&self, resource: &JoinResourceDescription) -> Result<String> {
        let mut resolved = self.resolved.lock().unwrap();
        resolved.push(resource.clone());
        Ok(format!(
            "side-data/{}/{}",
            resource.cache_name,
            resolved.len()
        ))
    }
}

/// A resolver that always fails with an emitter-style I/O error, counting the
/// attempts.
#[derive(Default)]
pub struct FailingResolver {
    attempts: AtomicUsize,
}

impl FailingResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ResourceResolver for FailingResolver {
    fn resolve(&self, resource: &JoinResourceDescription) -> Result<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!(
            "failed to write lookup artifact for '{}'",
            resource.cache_name
        ))
    }
}
