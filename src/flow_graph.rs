//! The flow-graph intermediate representation.
//!
//! A [`FlowGraph`] owns an arena of [`FlowElement`]s and a slab of
//! [`Connection`]s; every cross-reference is an id (see
//! [`element_id`](crate::element_id)), so ports can know their owner and
//! owners their ports without reference cycles. Removed elements and
//! connections leave tombstones — ids are never reused within one graph.
//!
//! A graph is built once per compiled flow, mutated in place by rewrite
//! passes, and discarded after code emission. Mutation is single-writer;
//! independent flow graphs may be compiled on separate threads.

use crate::element::{
    AttributeMap, ElementDescription, ElementKind, OperatorKind, Parameter, PseudoKind,
};
use crate::element_id::{ConnectionId, ElementId, PortDirection, PortRef};
use crate::external::{ExporterDescription, ImporterDescription, SideDataResource};
use crate::graph::{Graph, algo};
use crate::port::{Connectivity, DataType, JoinRole, Port, PortDescription};
use crate::resolver::ElementResolver;
use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// A directed edge from exactly one output port to exactly one input port.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Connection {
    pub from: PortRef,
    pub to: PortRef,
}

/// Interior wiring of a nested flow component: the boundary elements (in the
/// same arena) that its external ports map onto, index for index.
#[derive(Clone, Debug)]
pub struct ComponentInfo {
    pub interior_inputs: Vec<ElementId>,
    pub interior_outputs: Vec<ElementId>,
}

/// A node of the flow graph: description, ports, attributes, invocation
/// parameters, and side-data resources.
#[derive(Debug)]
pub struct FlowElement {
    description: ElementDescription,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    parameters: Vec<Parameter>,
    attributes: AttributeMap,
    resources: Vec<SideDataResource>,
    importer: Option<ImporterDescription>,
    exporter: Option<ExporterDescription>,
    component: Option<ComponentInfo>,
}

impl FlowElement {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.description.kind()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.description.name()
    }

    #[must_use]
    pub fn description(&self) -> &ElementDescription {
        &self.description
    }

    pub(crate) fn description_mut(&mut self) -> &mut ElementDescription {
        &mut self.description
    }

    #[must_use]
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    #[must_use]
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    #[must_use]
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    #[must_use]
    pub fn resources(&self) -> &[SideDataResource] {
        &self.resources
    }

    #[must_use]
    pub fn importer(&self) -> Option<&ImporterDescription> {
        self.importer.as_ref()
    }

    #[must_use]
    pub fn exporter(&self) -> Option<&ExporterDescription> {
        self.exporter.as_ref()
    }

    #[must_use]
    pub fn component(&self) -> Option<&ComponentInfo> {
        self.component.as_ref()
    }

    /// The input port carrying `role`, with its index.
    #[must_use]
    pub fn input_with_role(&self, role: JoinRole) -> Option<(usize, &Port)> {
        self.inputs
            .iter()
            .enumerate()
            .find(|(_, p)| p.join_role() == Some(role))
    }

    fn port(&self, port: PortRef) -> Option<&Port> {
        match port.direction {
            PortDirection::Input => self.inputs.get(port.index),
            PortDirection::Output => self.outputs.get(port.index),
        }
    }

    fn port_mut(&mut self, port: PortRef) -> Option<&mut Port> {
        match port.direction {
            PortDirection::Input => self.inputs.get_mut(port.index),
            PortDirection::Output => self.outputs.get_mut(port.index),
        }
    }
}

/// Declared shape of an operator element, handed to
/// [`FlowGraph::add_operator`].
#[derive(Debug)]
pub struct OperatorSpec {
    pub description: ElementDescription,
    pub inputs: Vec<PortDescription>,
    pub outputs: Vec<PortDescription>,
    pub parameters: Vec<Parameter>,
    pub attributes: AttributeMap,
}

impl OperatorSpec {
    /// An operator named `DeclaringType.methodName` with no ports yet.
    #[must_use]
    pub fn new(
        kind: OperatorKind,
        declaring: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            description: ElementDescription::operator(kind, declaring, method),
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: Vec::new(),
            attributes: AttributeMap::new(),
        }
    }

    #[must_use]
    pub fn with_input(mut self, port: PortDescription) -> Self {
        self.inputs.push(port);
        self
    }

    #[must_use]
    pub fn with_output(mut self, port: PortDescription) -> Self {
        self.outputs.push(port);
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Declared shape of a nested flow component. The interior boundary elements
/// must already exist in the same graph; `interior_inputs[i]` is the internal
/// counterpart of external input port `i`, and likewise for outputs.
#[derive(Debug)]
pub struct ComponentSpec {
    pub description: ElementDescription,
    pub inputs: Vec<PortDescription>,
    pub outputs: Vec<PortDescription>,
    pub interior_inputs: Vec<ElementId>,
    pub interior_outputs: Vec<ElementId>,
}

/// The flow-graph IR: a describing identity plus the element arena,
/// connection slab, and the ordered external input/output lists.
#[derive(Debug)]
pub struct FlowGraph {
    description: String,
    elements: Vec<Option<FlowElement>>,
    connections: Vec<Option<Connection>>,
    flow_inputs: Vec<ElementId>,
    flow_outputs: Vec<ElementId>,
}

impl FlowGraph {
    /// An empty graph identified by the describing flow class name.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            elements: Vec::new(),
            connections: Vec::new(),
            flow_inputs: Vec::new(),
            flow_outputs: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Ordered external inputs of the flow. Rewrite passes never change this
    /// list or the declared types behind it.
    #[must_use]
    pub fn flow_inputs(&self) -> &[ElementId] {
        &self.flow_inputs
    }

    /// Ordered external outputs of the flow.
    #[must_use]
    pub fn flow_outputs(&self) -> &[ElementId] {
        &self.flow_outputs
    }

    /* ---------- element construction ---------- */

    fn insert(&mut self, element: FlowElement) -> ElementId {
        let id = ElementId::new(self.elements.len());
        self.elements.push(Some(element));
        id
    }

    /// Add an external flow input: one output port carrying `data_type`.
    pub fn add_flow_input(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        importer: Option<ImporterDescription>,
    ) -> ElementId {
        let name = name.into();
        let id = self.insert(FlowElement {
            description: ElementDescription::input(&name),
            inputs: Vec::new(),
            outputs: vec![Port::new(PortDescription::new(name, data_type))],
            parameters: Vec::new(),
            attributes: AttributeMap::new(),
            resources: Vec::new(),
            importer,
            exporter: None,
            component: None,
        });
        self.flow_inputs.push(id);
        id
    }

    /// Add an external flow output: one input port carrying `data_type`.
    pub fn add_flow_output(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        exporter: Option<ExporterDescription>,
    ) -> ElementId {
        let name = name.into();
        let id = self.insert(FlowElement {
            description: ElementDescription::output(&name),
            inputs: vec![Port::new(PortDescription::new(name, data_type))],
            outputs: Vec::new(),
            parameters: Vec::new(),
            attributes: AttributeMap::new(),
            resources: Vec::new(),
            importer: None,
            exporter,
            component: None,
        });
        self.flow_outputs.push(id);
        id
    }

    /// Add an operator element.
    ///
    /// # Errors
    ///
    /// If a port name repeats within a direction, or a master-family operator
    /// does not declare exactly one Master and one Transaction input, each
    /// with a shuffle key.
    pub fn add_operator(&mut self, spec: OperatorSpec) -> Result<ElementId> {
        let label = spec.description.label();
        check_port_names(&spec.inputs, "input", &label)?;
        check_port_names(&spec.outputs, "output", &label)?;
        if let Some(kind) = spec.description.kind().operator_kind()
            && kind.is_master_family()
        {
            check_join_inputs(&spec.inputs, &label)?;
        }
        Ok(self.insert(FlowElement {
            description: spec.description,
            inputs: spec.inputs.into_iter().map(Port::new).collect(),
            outputs: spec.outputs.into_iter().map(Port::new).collect(),
            parameters: spec.parameters,
            attributes: spec.attributes,
            resources: Vec::new(),
            importer: None,
            exporter: None,
            component: None,
        }))
    }

    /// Add a pass-through or terminator marker.
    ///
    /// `Identity` is 1-in/1-out; `Stop` is a 0-output sink whose input
    /// accepts fan-in and may stay optional.
    pub fn add_pseudo(&mut self, kind: PseudoKind, data_type: DataType) -> ElementId {
        let input = PortDescription::new("port", data_type.clone())
            .optional()
            .with_fan_in();
        let outputs = match kind {
            PseudoKind::Identity => vec![Port::new(PortDescription::new("port", data_type))],
            PseudoKind::Stop => Vec::new(),
        };
        self.insert(FlowElement {
            description: ElementDescription::pseudo(kind),
            inputs: vec![Port::new(input)],
            outputs,
            parameters: Vec::new(),
            attributes: AttributeMap::new(),
            resources: Vec::new(),
            importer: None,
            exporter: None,
            component: None,
        })
    }

    /// Add a nested flow component.
    ///
    /// # Errors
    ///
    /// If port names repeat, an interior id is unknown, or the interior lists
    /// do not match the external port counts index for index.
    pub fn add_component(&mut self, spec: ComponentSpec) -> Result<ElementId> {
        let label = spec.description.label();
        check_port_names(&spec.inputs, "input", &label)?;
        check_port_names(&spec.outputs, "output", &label)?;
        if spec.interior_inputs.len() != spec.inputs.len()
            || spec.interior_outputs.len() != spec.outputs.len()
        {
            bail!(
                "component '{label}' interior mapping does not match its port counts \
                 ({}/{} inputs, {}/{} outputs)",
                spec.interior_inputs.len(),
                spec.inputs.len(),
                spec.interior_outputs.len(),
                spec.outputs.len(),
            );
        }
        for interior in spec.interior_inputs.iter().chain(&spec.interior_outputs) {
            self.element_checked(*interior)
                .with_context(|| format!("component '{label}' interior mapping"))?;
        }
        Ok(self.insert(FlowElement {
            description: spec.description,
            inputs: spec.inputs.into_iter().map(Port::new).collect(),
            outputs: spec.outputs.into_iter().map(Port::new).collect(),
            parameters: Vec::new(),
            attributes: AttributeMap::new(),
            resources: Vec::new(),
            importer: None,
            exporter: None,
            component: Some(ComponentInfo {
                interior_inputs: spec.interior_inputs,
                interior_outputs: spec.interior_outputs,
            }),
        }))
    }

    /// Attach a resolved side-data resource to an element.
    ///
    /// # Errors
    ///
    /// If `id` is absent or removed.
    pub fn attach_resource(&mut self, id: ElementId, resource: SideDataResource) -> Result<()> {
        self.element_checked_mut(id)?.resources.push(resource);
        Ok(())
    }

    /* ---------- element access ---------- */

    /// The element behind `id`, if it exists and has not been removed.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&FlowElement> {
        self.elements.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn element_checked(&self, id: ElementId) -> Result<&FlowElement> {
        self.element(id)
            .with_context(|| format!("element {id} is not part of flow '{}'", self.description))
    }

    pub(crate) fn element_checked_mut(&mut self, id: ElementId) -> Result<&mut FlowElement> {
        let description = &self.description;
        self.elements
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .with_context(|| format!("element {id} is not part of flow '{description}'"))
    }

    /// Iterate over live elements.
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &FlowElement)> {
        self.elements
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|e| (ElementId::new(i), e)))
    }

    /// A resolver over one element's ports.
    pub fn resolver(&mut self, id: ElementId) -> ElementResolver<'_> {
        ElementResolver::new(self, id)
    }

    /// Look up an input port by name.
    #[must_use]
    pub fn find_input(&self, id: ElementId, name: &str) -> Option<PortRef> {
        let element = self.element(id)?;
        element
            .inputs
            .iter()
            .position(|p| p.name() == name)
            .map(|index| PortRef::input(id, index))
    }

    /// Look up an output port by name.
    #[must_use]
    pub fn find_output(&self, id: ElementId, name: &str) -> Option<PortRef> {
        let element = self.element(id)?;
        element
            .outputs
            .iter()
            .position(|p| p.name() == name)
            .map(|index| PortRef::output(id, index))
    }

    /// The port behind `port`, if its element and index exist.
    #[must_use]
    pub fn port(&self, port: PortRef) -> Option<&Port> {
        self.element(port.element)?.port(port)
    }

    pub(crate) fn port_checked(&self, port: PortRef) -> Result<&Port> {
        let element = self.element_checked(port.element)?;
        let label = element.description.label();
        element.port(port).with_context(|| {
            format!(
                "element '{label}' has no {} port at index {}",
                direction_name(port.direction),
                port.index,
            )
        })
    }

    /// The component that owns `id` as an interior output, with the external
    /// output port index it maps to.
    #[must_use]
    pub fn interior_output_owner(&self, id: ElementId) -> Option<(ElementId, usize)> {
        self.elements().find_map(|(component_id, element)| {
            let info = element.component()?;
            info.interior_outputs
                .iter()
                .position(|interior| *interior == id)
                .map(|index| (component_id, index))
        })
    }

    /* ---------- connections ---------- */

    /// Connect an output port to an input port.
    ///
    /// # Errors
    ///
    /// If either port is absent, the directions are wrong, the exact edge
    /// already exists, or the input is single-valued and already connected.
    pub fn connect(&mut self, from: PortRef, to: PortRef) -> Result<ConnectionId> {
        if from.direction != PortDirection::Output {
            bail!("connection source must be an output port");
        }
        if to.direction != PortDirection::Input {
            bail!("connection target must be an input port");
        }
        self.port_checked(from)?;
        let target = self.port_checked(to)?;
        if target.is_connected() && !target.description().fan_in {
            let element = self.element_checked(to.element)?;
            bail!(
                "input port '{}' of '{}' is single-valued and already connected",
                target.name(),
                element.description.label(),
            );
        }
        let duplicate = target
            .connections()
            .iter()
            .any(|id| self.connection(*id).is_some_and(|c| c.from == from));
        if duplicate {
            let element = self.element_checked(to.element)?;
            bail!(
                "ports are already connected: '{}' port '{}'",
                element.description.label(),
                self.port_checked(to)?.name(),
            );
        }

        let id = ConnectionId::new(self.connections.len());
        self.connections.push(Some(Connection { from, to }));
        self.port_slot(from)?.connections.push(id);
        self.port_slot(to)?.connections.push(id);
        Ok(id)
    }

    /// Remove a connection from both endpoints.
    ///
    /// # Errors
    ///
    /// If the connection is absent or already removed.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<()> {
        let Some(slot) = self.connections.get_mut(id.index()) else {
            bail!("unknown connection id");
        };
        let Some(connection) = slot.take() else {
            bail!("connection was already removed");
        };
        self.port_slot(connection.from)?
            .connections
            .retain(|c| *c != id);
        self.port_slot(connection.to)?
            .connections
            .retain(|c| *c != id);
        Ok(())
    }

    /// The connection behind `id`, if still live.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn connection_checked(&self, id: ConnectionId) -> Result<Connection> {
        self.connection(id)
            .copied()
            .context("connection was removed")
    }

    fn port_slot(&mut self, port: PortRef) -> Result<&mut Port> {
        let element = self.element_checked_mut(port.element)?;
        let label = element.description.label();
        element.port_mut(port).with_context(|| {
            format!(
                "element '{label}' has no {} port at index {}",
                direction_name(port.direction),
                port.index,
            )
        })
    }

    /// Remove an element, disconnecting every connection touching its ports.
    ///
    /// # Errors
    ///
    /// If `id` is absent or already removed.
    pub fn remove_element(&mut self, id: ElementId) -> Result<()> {
        let element = self.element_checked(id)?;
        let doomed: Vec<ConnectionId> = element
            .inputs
            .iter()
            .chain(&element.outputs)
            .flat_map(|p| p.connections.iter().copied())
            .collect();
        for connection in doomed {
            self.disconnect(connection)?;
        }
        self.elements[id.index()] = None;
        self.flow_inputs.retain(|e| *e != id);
        self.flow_outputs.retain(|e| *e != id);
        Ok(())
    }

    /* ---------- plan-level analysis ---------- */

    /// Project the flow onto an element-level dependency graph: one vertex
    /// per live element, one edge per live connection.
    #[must_use]
    pub fn connection_graph(&self) -> Graph<ElementId> {
        let mut graph = Graph::new();
        for (id, _) in self.elements() {
            graph.add_node(id);
        }
        for connection in self.connections.iter().flatten() {
            graph.add_edge(connection.from.element, connection.to.element);
        }
        graph
    }

    /// Check that every mandatory port ended up connected.
    ///
    /// # Errors
    ///
    /// Naming the first offending element and port (with origin if present).
    pub fn validate(&self) -> Result<()> {
        for (_, element) in self.elements() {
            for (direction, port) in element
                .inputs
                .iter()
                .map(|p| ("input", p))
                .chain(element.outputs.iter().map(|p| ("output", p)))
            {
                if port.connectivity() == Connectivity::Mandatory && !port.is_connected() {
                    bail!(
                        "mandatory {direction} port '{}' of '{}' is not connected",
                        port.name(),
                        element.description.label(),
                    );
                }
            }
        }
        Ok(())
    }

    /// Reject graphs that contain an illegal cycle.
    ///
    /// # Errors
    ///
    /// A user-facing diagnostic listing the elements on one detected cycle.
    pub fn validate_acyclic(&self) -> Result<()> {
        let circuits = algo::find_circuit(&self.connection_graph());
        let Some(circuit) = circuits.first() else {
            return Ok(());
        };
        let mut names: Vec<String> = circuit
            .iter()
            .filter_map(|id| self.element(*id))
            .map(|e| e.description.label())
            .collect();
        names.sort();
        bail!(
            "flow graph '{}' contains an illegal cycle through: {}",
            self.description,
            names.join(", "),
        );
    }

    /// A safe execution order: producers strictly before consumers.
    ///
    /// # Errors
    ///
    /// If the graph is cyclic.
    pub fn execution_order(&self) -> Result<Vec<ElementId>> {
        self.validate_acyclic()?;
        let mut order = algo::sort_post_order(&self.connection_graph());
        order.reverse();
        Ok(order)
    }
}

fn direction_name(direction: PortDirection) -> &'static str {
    match direction {
        PortDirection::Input => "input",
        PortDirection::Output => "output",
    }
}

fn check_port_names(ports: &[PortDescription], direction: &str, label: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for port in ports {
        if !seen.insert(port.name.as_str()) {
            bail!(
                "element '{label}' declares {direction} port '{}' more than once",
                port.name,
            );
        }
    }
    Ok(())
}

fn check_join_inputs(inputs: &[PortDescription], label: &str) -> Result<()> {
    for role in [JoinRole::Master, JoinRole::Transaction] {
        let matching: Vec<&PortDescription> = inputs
            .iter()
            .filter(|p| p.join_role == Some(role))
            .collect();
        if matching.len() != 1 {
            bail!("join operator '{label}' must declare exactly one {role:?} input");
        }
        let port = matching[0];
        if port.shuffle_key.is_none() {
            bail!(
                "join operator '{label}' input '{}' is missing its shuffle key",
                port.name,
            );
        }
    }
    Ok(())
}
