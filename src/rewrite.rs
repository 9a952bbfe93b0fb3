//! Side-data join rewrite pass.
//!
//! The pass walks each flow input whose importer declares a bounded ("tiny")
//! dataset in the supported wire format, follows its output downstream —
//! looking through pass-through pseudo elements and nested flow-component
//! boundaries — and, where that data feeds the *master* port of a
//! shuffle-join-family operator, replaces the operator with its side-data
//! variant: the master side becomes a pre-materialized lookup resource
//! resolved by the external code emitter, and no shuffle boundary remains.
//!
//! Ineligibility (wrong size category, wrong format, ambiguous master wiring,
//! mismatched join keys) is never an error: the candidate is skipped, the
//! decision recorded, and ordinary shuffle-join handling applies downstream.
//! Only an emitter failure while resolving the lookup resource aborts the
//! pass.
//!
//! The pass is idempotent: side-data operators are not candidates, so
//! re-running it on a rewritten graph changes nothing. External flow inputs
//! and outputs, and their declared types, are never touched.

use crate::element::{ElementDescription, ElementKind, PseudoKind};
use crate::element_id::{ConnectionId, ElementId, PortRef};
use crate::external::{
    JoinResourceDescription, ResourceResolver, SideDataResource, SizeCategory, WireFormat,
};
use crate::flow_graph::{FlowGraph, OperatorSpec};
use crate::port::JoinRole;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use tracing::{debug, trace};

/// Compiler options read by optimization passes.
#[derive(Clone, Debug)]
pub struct CompilerOptions {
    /// Policy gate for the side-data join rewrite on `Tiny` inputs.
    ///
    /// `Small` is a documented future extension of this gate and is rejected
    /// regardless of options; enabling it changes memory assumptions that are
    /// not validated here.
    pub side_data_join_for_tiny: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            side_data_join_for_tiny: true,
        }
    }
}

impl CompilerOptions {
    fn authorizes(&self, size: SizeCategory) -> bool {
        match size {
            SizeCategory::Tiny => self.side_data_join_for_tiny,
            // Reserved: not yet enabled.
            SizeCategory::Small => false,
            SizeCategory::Large => false,
        }
    }
}

/// One decision made while scanning a flow graph.
#[derive(Clone, Debug, Serialize)]
pub enum RewriteDecision {
    /// An operator was replaced by its side-data variant.
    Rewritten {
        operator: String,
        input: String,
        resource: String,
    },
    /// A flow input carries no importer description.
    SkippedNoImporter { input: String },
    /// The importer's size category does not authorize the rewrite.
    SkippedSize { input: String, size: SizeCategory },
    /// The importer's wire format is not the supported one.
    SkippedFormat { input: String, format: WireFormat },
    /// The candidate's master port has more than one connection.
    SkippedAmbiguousMaster { operator: String },
    /// The join-key lists failed arity/type validation.
    SkippedKeyMismatch { operator: String, reason: String },
}

/// Outcome of one pass over one flow graph.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RewriteReport {
    pub decisions: Vec<RewriteDecision>,
    pub rewritten: usize,
}

impl RewriteReport {
    /// Export the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// On serialization failure.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RewriteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "side-data join rewrite: {} operator(s) rewritten",
            self.rewritten
        )?;
        for decision in &self.decisions {
            match decision {
                RewriteDecision::Rewritten {
                    operator,
                    input,
                    resource,
                } => writeln!(
                    f,
                    "  rewrote '{operator}' against input '{input}' (resource '{resource}')"
                )?,
                RewriteDecision::SkippedNoImporter { input } => {
                    writeln!(f, "  skipped input '{input}': no importer description")?;
                }
                RewriteDecision::SkippedSize { input, size } => {
                    writeln!(f, "  skipped input '{input}': size category '{size}'")?;
                }
                RewriteDecision::SkippedFormat { input, format } => {
                    writeln!(f, "  skipped input '{input}': wire format '{format}'")?;
                }
                RewriteDecision::SkippedAmbiguousMaster { operator } => {
                    writeln!(f, "  skipped '{operator}': ambiguous master wiring")?;
                }
                RewriteDecision::SkippedKeyMismatch { operator, reason } => {
                    writeln!(f, "  skipped '{operator}': {reason}")?;
                }
            }
        }
        Ok(())
    }
}

/// Run the side-data join rewrite once over `graph`.
///
/// # Errors
///
/// Only on invariant breakage inside the graph or an emitter failure from
/// `resolver` — ineligible candidates are recorded skips, not errors.
pub fn rewrite_side_data_joins(
    graph: &mut FlowGraph,
    options: &CompilerOptions,
    resolver: &dyn ResourceResolver,
) -> Result<RewriteReport> {
    let mut report = RewriteReport::default();

    for input_id in graph.flow_inputs().to_vec() {
        let element = graph.element_checked(input_id)?;
        let input_name = element.name().to_string();
        let Some(importer) = element.importer() else {
            trace!(input = %input_name, "input has no importer");
            report
                .decisions
                .push(RewriteDecision::SkippedNoImporter { input: input_name });
            continue;
        };
        if !options.authorizes(importer.size) {
            debug!(input = %input_name, size = %importer.size, "size category not authorized");
            report.decisions.push(RewriteDecision::SkippedSize {
                input: input_name,
                size: importer.size,
            });
            continue;
        }
        if importer.format != WireFormat::Temporary {
            debug!(input = %input_name, format = %importer.format, "unsupported wire format");
            report.decisions.push(RewriteDecision::SkippedFormat {
                input: input_name,
                format: importer.format,
            });
            continue;
        }

        for candidate in find_master_candidates(graph, input_id)? {
            // A previous rewrite may have consumed this operator already.
            if graph.element(candidate).is_none() {
                continue;
            }
            if let Some(decision) = try_rewrite(graph, resolver, candidate, &input_name)? {
                if matches!(decision, RewriteDecision::Rewritten { .. }) {
                    report.rewritten += 1;
                }
                report.decisions.push(decision);
            }
        }
    }
    Ok(report)
}

/// Apply the rewrite to a batch of independent flow graphs in parallel.
///
/// Each graph is compiled on its own; the resolver is shared, so the emitter
/// must tolerate concurrent `resolve` calls (it is `Send + Sync` by contract).
///
/// # Errors
///
/// The first failing graph's error, after all graphs finished.
pub fn rewrite_all(
    graphs: &mut [FlowGraph],
    options: &CompilerOptions,
    resolver: &dyn ResourceResolver,
) -> Result<Vec<RewriteReport>> {
    graphs
        .par_iter_mut()
        .map(|graph| rewrite_side_data_joins(graph, options, resolver))
        .collect()
}

/// Master-family operators whose master port is fed (directly or through
/// pass-through pseudos and component boundaries) by `input_id`.
///
/// Iterative breadth-first walk over output ports; the seen-set is keyed by
/// element identity so shared fan-out targets are processed once.
fn find_master_candidates(graph: &FlowGraph, input_id: ElementId) -> Result<Vec<ElementId>> {
    let mut candidates = Vec::new();
    let mut seen: HashSet<ElementId> = HashSet::new();
    let mut work: VecDeque<PortRef> = VecDeque::new();

    let input = graph.element_checked(input_id)?;
    for index in 0..input.outputs().len() {
        work.push_back(PortRef::output(input_id, index));
    }

    while let Some(source) = work.pop_front() {
        let port = graph.port_checked(source)?;
        for connection_id in port.connections().to_vec() {
            let connection = graph.connection_checked(connection_id)?;
            let target_id = connection.to.element;
            if !seen.insert(target_id) {
                continue;
            }
            let target = graph.element_checked(target_id)?;
            trace!(element = %target.description().label(), "following successor");

            // Leaving a component: whatever the boundary element's kind, if
            // it is an interior output, continue from the external port it
            // maps onto. Bounded by the seen-check on the boundary element
            // itself, so no extra guard on the component.
            if let Some((component, index)) = graph.interior_output_owner(target_id) {
                work.push_back(PortRef::output(component, index));
            }

            match target.kind() {
                ElementKind::Pseudo(PseudoKind::Identity) => {
                    for index in 0..target.outputs().len() {
                        work.push_back(PortRef::output(target_id, index));
                    }
                }
                ElementKind::Component => {
                    // Entering a component: the external input port maps to
                    // an interior boundary element in the same arena.
                    let info = target
                        .component()
                        .context("component element lost its interior mapping")?;
                    let interior = *info.interior_inputs.get(connection.to.index).context(
                        "component interior mapping is narrower than its input ports",
                    )?;
                    let boundary = graph.element_checked(interior)?;
                    if seen.insert(interior) {
                        for index in 0..boundary.outputs().len() {
                            work.push_back(PortRef::output(interior, index));
                        }
                    }
                }
                ElementKind::Operator(kind) if kind.is_master_family() => {
                    let master = target.input_with_role(JoinRole::Master);
                    if master.is_some_and(|(index, _)| index == connection.to.index) {
                        candidates.push(target_id);
                    }
                }
                ElementKind::Operator(_)
                | ElementKind::Input
                | ElementKind::Output
                | ElementKind::Pseudo(PseudoKind::Stop) => {}
            }
        }
    }
    Ok(candidates)
}

/// Attempt to rewrite one candidate operator. Returns the decision, or `None`
/// when the operator disappeared between discovery and rewrite.
fn try_rewrite(
    graph: &mut FlowGraph,
    resolver: &dyn ResourceResolver,
    operator_id: ElementId,
    input_name: &str,
) -> Result<Option<RewriteDecision>> {
    let Some(element) = graph.element(operator_id) else {
        return Ok(None);
    };
    let Some(kind) = element.kind().operator_kind() else {
        return Ok(None);
    };
    let Some(side_kind) = kind.side_data_variant() else {
        return Ok(None);
    };
    let operator_label = element.description().label();

    let (_, master_port) = element
        .input_with_role(JoinRole::Master)
        .with_context(|| format!("join operator '{operator_label}' lost its master port"))?;
    let (_, transaction_port) = element
        .input_with_role(JoinRole::Transaction)
        .with_context(|| format!("join operator '{operator_label}' lost its transaction port"))?;

    // Ambiguous multi-master wiring is left untouched.
    if master_port.connections().len() != 1 {
        debug!(operator = %operator_label, "master port has multiple connections");
        return Ok(Some(RewriteDecision::SkippedAmbiguousMaster {
            operator: operator_label,
        }));
    }

    let master_key = master_port
        .shuffle_key()
        .with_context(|| format!("master port of '{operator_label}' has no shuffle key"))?;
    let transaction_key = transaction_port
        .shuffle_key()
        .with_context(|| format!("transaction port of '{operator_label}' has no shuffle key"))?;

    let resource = JoinResourceDescription {
        cache_name: input_name.to_string(),
        master_type: master_port.data_type().clone(),
        master_keys: master_key.group.clone(),
        transaction_type: transaction_port.data_type().clone(),
        transaction_keys: transaction_key.group.clone(),
    };
    if let Err(error) = resource.validate() {
        // Best-effort optimization: leave the operator for ordinary
        // shuffle-join handling downstream.
        debug!(operator = %operator_label, %error, "join keys do not line up");
        return Ok(Some(RewriteDecision::SkippedKeyMismatch {
            operator: operator_label,
            reason: format!("{error:#}"),
        }));
    }

    // Snapshot the wiring before any surgery.
    let master_upstream = graph
        .connection_checked(master_port.connections()[0])?
        .from;
    let transaction_upstream = sources_of(graph, transaction_port.connections())?;
    let mut transaction_input = transaction_port.description().clone();
    transaction_input.join_role = None;
    let output_ports: Vec<_> = element
        .outputs()
        .iter()
        .map(|p| p.description().clone())
        .collect();
    let output_consumers: Vec<Vec<PortRef>> = element
        .outputs()
        .iter()
        .map(|p| targets_of(graph, p.connections()))
        .collect::<Result<_>>()?;
    let parameters = element.parameters().to_vec();
    let attributes = element.attributes().without_shuffle();
    let description = ElementDescription::operator_named(
        side_kind,
        element.name(),
        element.description().origin().cloned(),
    );

    // The emitter materializes the lookup artifact; failure here is fatal for
    // the whole pass, not a skip.
    let resolved_name = resolver
        .resolve(&resource)
        .with_context(|| format!("emitting side-data resource for '{operator_label}'"))?;

    let replacement = graph.add_operator(OperatorSpec {
        description,
        inputs: vec![transaction_input],
        outputs: output_ports,
        parameters,
        attributes,
    })?;
    graph.attach_resource(
        replacement,
        SideDataResource {
            description: resource,
            resolved_name: resolved_name.clone(),
        },
    )?;

    // Drop the original first so single-valued consumer ports free up, then
    // rewire: transaction producers feed the replacement's sole input, and
    // each output's consumers reconnect index for index, order preserved.
    graph.remove_element(operator_id)?;
    for producer in &transaction_upstream {
        graph.connect(*producer, PortRef::input(replacement, 0))?;
    }
    for (index, consumers) in output_consumers.iter().enumerate() {
        for consumer in consumers {
            graph.connect(PortRef::output(replacement, index), *consumer)?;
        }
    }
    stop_dangling(graph, master_upstream)?;

    debug!(operator = %operator_label, input = %input_name, "rewrote to side-data join");
    Ok(Some(RewriteDecision::Rewritten {
        operator: operator_label,
        input: input_name.to_string(),
        resource: resolved_name,
    }))
}

fn sources_of(graph: &FlowGraph, connections: &[ConnectionId]) -> Result<Vec<PortRef>> {
    connections
        .iter()
        .map(|id| Ok(graph.connection_checked(*id)?.from))
        .collect()
}

fn targets_of(graph: &FlowGraph, connections: &[ConnectionId]) -> Result<Vec<PortRef>> {
    connections
        .iter()
        .map(|id| Ok(graph.connection_checked(*id)?.to))
        .collect()
}

/// Terminate a master-side branch that lost its only consumer.
///
/// Pass-through pseudos with no remaining consumers are unwound, following
/// every producer merged into a fan-in pseudo input. Each real producer whose
/// output still dangles gets a `Stop` marker so the dead branch is visibly
/// closed rather than lingering half-wired.
fn stop_dangling(graph: &mut FlowGraph, port: PortRef) -> Result<()> {
    let mut work = vec![port];
    while let Some(port) = work.pop() {
        let Some(dangling) = graph.port(port) else {
            continue;
        };
        if dangling.is_connected() {
            continue;
        }
        let data_type = dangling.data_type().clone();
        let element = graph.element_checked(port.element)?;
        if element.kind() == ElementKind::Pseudo(PseudoKind::Identity) {
            let upstream: Vec<ConnectionId> = element
                .inputs()
                .iter()
                .flat_map(|p| p.connections().iter().copied())
                .collect();
            let mut sources = Vec::with_capacity(upstream.len());
            for connection_id in upstream {
                sources.push(graph.connection_checked(connection_id)?.from);
            }
            graph.remove_element(port.element)?;
            work.extend(sources);
        } else {
            let stop = graph.add_pseudo(PseudoKind::Stop, data_type);
            graph.connect(port, PortRef::input(stop, 0))?;
        }
    }
    Ok(())
}
