use anyhow::Result;
use flowforge::testing::{master_type, transaction_type};
use flowforge::*;

fn passthrough_op(name: &str) -> OperatorSpec {
    OperatorSpec::new(OperatorKind::Other, "SalesOperator", name)
        .with_input(PortDescription::new("in", transaction_type()))
        .with_output(PortDescription::new("out", transaction_type()))
}

#[test]
fn flow_inputs_and_outputs_stay_ordered() {
    let mut graph = FlowGraph::new("com.example.Flow");
    let a = graph.add_flow_input("a", master_type(), None);
    let b = graph.add_flow_input("b", transaction_type(), None);
    let out = graph.add_flow_output("out", transaction_type(), None);

    assert_eq!(graph.flow_inputs(), &[a, b]);
    assert_eq!(graph.flow_outputs(), &[out]);
    assert_eq!(graph.element(a).unwrap().name(), "a");
    assert_eq!(graph.element(a).unwrap().kind(), ElementKind::Input);
}

#[test]
fn operator_name_defaults_to_declaring_type_and_method() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let op = graph.add_operator(passthrough_op("convert"))?;
    assert_eq!(graph.element(op).unwrap().name(), "SalesOperator.convert");
    Ok(())
}

#[test]
fn duplicate_port_names_fail_construction() {
    let mut graph = FlowGraph::new("com.example.Flow");
    let spec = OperatorSpec::new(OperatorKind::Other, "SalesOperator", "bad")
        .with_input(PortDescription::new("in", transaction_type()))
        .with_input(PortDescription::new("in", master_type()));
    let err = graph.add_operator(spec).unwrap_err();
    assert!(err.to_string().contains("more than once"), "{err:#}");
}

#[test]
fn master_family_operators_must_declare_both_roles() {
    let mut graph = FlowGraph::new("com.example.Flow");
    let spec = OperatorSpec::new(OperatorKind::MasterJoin, "SalesOperator", "join")
        .with_input(
            PortDescription::new("master", master_type())
                .with_role(JoinRole::Master)
                .with_shuffle_key(ShuffleKey::grouped_by(["id"])),
        )
        .with_output(PortDescription::new("out", transaction_type()));
    let err = graph.add_operator(spec).unwrap_err();
    assert!(err.to_string().contains("Transaction"), "{err:#}");
}

#[test]
fn master_inputs_need_shuffle_keys() {
    let mut graph = FlowGraph::new("com.example.Flow");
    let spec = OperatorSpec::new(OperatorKind::MasterCheck, "SalesOperator", "check")
        .with_input(PortDescription::new("master", master_type()).with_role(JoinRole::Master))
        .with_input(
            PortDescription::new("transaction", transaction_type())
                .with_role(JoinRole::Transaction)
                .with_shuffle_key(ShuffleKey::grouped_by(["item_id"])),
        );
    let err = graph.add_operator(spec).unwrap_err();
    assert!(err.to_string().contains("shuffle key"), "{err:#}");
}

#[test]
fn connect_validates_directions_and_arity() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let input = graph.add_flow_input("in", transaction_type(), None);
    let op = graph.add_operator(passthrough_op("convert"))?;
    let other = graph.add_flow_input("other", transaction_type(), None);

    // Output-to-input is the only legal shape.
    let err = graph
        .connect(PortRef::input(op, 0), PortRef::output(input, 0))
        .unwrap_err();
    assert!(err.to_string().contains("output"), "{err:#}");

    graph.connect(PortRef::output(input, 0), PortRef::input(op, 0))?;

    // Duplicate edge.
    let err = graph
        .connect(PortRef::output(input, 0), PortRef::input(op, 0))
        .unwrap_err();
    assert!(err.to_string().contains("already connected"), "{err:#}");

    // Single-valued input rejects a second producer.
    let err = graph
        .connect(PortRef::output(other, 0), PortRef::input(op, 0))
        .unwrap_err();
    assert!(err.to_string().contains("single-valued"), "{err:#}");
    Ok(())
}

#[test]
fn fan_in_is_a_per_port_capability() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let a = graph.add_flow_input("a", transaction_type(), None);
    let b = graph.add_flow_input("b", transaction_type(), None);
    // Pseudo inputs accept fan-in.
    let merge = graph.add_pseudo(PseudoKind::Identity, transaction_type());
    graph.connect(PortRef::output(a, 0), PortRef::input(merge, 0))?;
    graph.connect(PortRef::output(b, 0), PortRef::input(merge, 0))?;
    assert_eq!(graph.port(PortRef::input(merge, 0)).unwrap().connections().len(), 2);
    Ok(())
}

#[test]
fn resolver_binds_ports_by_name() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let input = graph.add_flow_input("in", transaction_type(), None);
    let op = graph.add_operator(passthrough_op("convert"))?;
    let output = graph.add_flow_output("out", transaction_type(), None);

    graph
        .resolver(op)
        .resolve_input("in", PortRef::output(input, 0))?;
    let source = graph.resolver(op).resolve_output("out")?;
    graph.connect(source, PortRef::input(output, 0))?;

    graph.validate()?;
    Ok(())
}

#[test]
fn resolver_reports_unknown_ports() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let input = graph.add_flow_input("in", transaction_type(), None);
    let op = graph.add_operator(passthrough_op("convert"))?;

    let err = graph
        .resolver(op)
        .resolve_input("missing", PortRef::output(input, 0))
        .unwrap_err();
    assert!(err.to_string().contains("no such input port"), "{err:#}");
    assert!(err.to_string().contains("SalesOperator.convert"), "{err:#}");

    let err = graph.resolver(op).resolve_output("missing").unwrap_err();
    assert!(err.to_string().contains("no such output port"), "{err:#}");
    Ok(())
}

#[test]
fn rename_is_allowed_exactly_once() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let op = graph.add_operator(passthrough_op("convert"))?;

    graph.resolver(op).rename("normalize")?;
    assert_eq!(graph.element(op).unwrap().name(), "normalize");

    let err = graph.resolver(op).rename("again").unwrap_err();
    assert!(err.to_string().contains("already been renamed"), "{err:#}");
    Ok(())
}

#[test]
fn pseudo_elements_forbid_renaming() {
    let mut graph = FlowGraph::new("com.example.Flow");
    let pseudo = graph.add_pseudo(PseudoKind::Identity, transaction_type());
    let err = graph.resolver(pseudo).rename("named").unwrap_err();
    assert!(err.to_string().contains("does not support renaming"), "{err:#}");
}

#[test]
fn attribute_map_rejects_duplicate_kinds_but_set_overwrites() -> Result<()> {
    let err = AttributeMap::from_attributes([
        Attribute::Boundary(FlowBoundary::Shuffle),
        Attribute::Boundary(FlowBoundary::Default),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("declared twice"), "{err:#}");

    let mut map = AttributeMap::from_attributes([Attribute::Boundary(FlowBoundary::Shuffle)])?;
    map.set(Attribute::Boundary(FlowBoundary::Default));
    assert_eq!(map.boundary(), FlowBoundary::Default);

    // Unset kinds read as defaults.
    assert_eq!(map.observation(), ObservationCount::DontCare);
    Ok(())
}

#[test]
fn shuffle_boundary_downgrade() -> Result<()> {
    let map = AttributeMap::from_attributes([Attribute::Boundary(FlowBoundary::Shuffle)])?;
    assert_eq!(map.without_shuffle().boundary(), FlowBoundary::Default);

    let untouched = AttributeMap::new();
    assert_eq!(untouched.without_shuffle().boundary(), FlowBoundary::Default);
    Ok(())
}

#[test]
fn input_buffer_mode_is_carried_on_the_port() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let spec = OperatorSpec::new(OperatorKind::Other, "SalesOperator", "summarize")
        .with_input(
            PortDescription::new("in", transaction_type())
                .with_shuffle_key(ShuffleKey::grouped_by(["item_id"]).ordered_by("quantity", false))
                .with_buffer(InputBuffer::Swap),
        )
        .with_output(PortDescription::new("out", transaction_type()));
    let op = graph.add_operator(spec)?;

    let element = graph.element(op).unwrap();
    assert_eq!(element.inputs()[0].buffer(), Some(InputBuffer::Swap));
    // Undeclared buffering reads as "unspecified", and the default mode is
    // whole-group heap materialization.
    assert_eq!(element.outputs()[0].buffer(), None);
    assert_eq!(InputBuffer::default(), InputBuffer::Heap);

    let key = element.inputs()[0].shuffle_key().unwrap();
    assert_eq!(key.group, vec!["item_id".to_string()]);
    assert_eq!(key.ordering.len(), 1);
    assert!(!key.ordering[0].ascending);
    Ok(())
}

#[test]
fn validate_flags_unconnected_mandatory_ports() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let input = graph.add_flow_input("in", transaction_type(), None);
    let op = graph.add_operator(passthrough_op("convert"))?;
    graph
        .resolver(op)
        .resolve_input("in", PortRef::output(input, 0))?;

    // Operator output dangles.
    let err = graph.validate().unwrap_err();
    assert!(err.to_string().contains("mandatory"), "{err:#}");
    assert!(err.to_string().contains("out"), "{err:#}");

    let sink = graph.add_flow_output("out", transaction_type(), None);
    let source = graph.resolver(op).resolve_output("out")?;
    graph.connect(source, PortRef::input(sink, 0))?;
    graph.validate()?;
    Ok(())
}

#[test]
fn optional_ports_may_stay_unconnected() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let input = graph.add_flow_input("in", transaction_type(), None);
    let spec = OperatorSpec::new(OperatorKind::Other, "SalesOperator", "branch")
        .with_input(PortDescription::new("in", transaction_type()))
        .with_output(PortDescription::new("found", transaction_type()).optional())
        .with_output(PortDescription::new("missed", transaction_type()).optional());
    let op = graph.add_operator(spec)?;
    graph
        .resolver(op)
        .resolve_input("in", PortRef::output(input, 0))?;
    graph.validate()?;
    Ok(())
}

#[test]
fn cycle_detection_is_a_user_facing_diagnostic() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.CyclicFlow");
    let a = graph.add_pseudo(PseudoKind::Identity, transaction_type());
    let b = graph.add_pseudo(PseudoKind::Identity, transaction_type());
    graph.connect(PortRef::output(a, 0), PortRef::input(b, 0))?;
    graph.connect(PortRef::output(b, 0), PortRef::input(a, 0))?;

    let err = graph.validate_acyclic().unwrap_err();
    assert!(err.to_string().contains("illegal cycle"), "{err:#}");
    assert!(err.to_string().contains("com.example.CyclicFlow"), "{err:#}");

    assert!(graph.execution_order().is_err());
    Ok(())
}

#[test]
fn execution_order_lists_producers_first() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let input = graph.add_flow_input("in", transaction_type(), None);
    let first = graph.add_operator(passthrough_op("first"))?;
    let second = graph.add_operator(passthrough_op("second"))?;
    let output = graph.add_flow_output("out", transaction_type(), None);

    graph
        .resolver(first)
        .resolve_input("in", PortRef::output(input, 0))?;
    let mid = graph.resolver(first).resolve_output("out")?;
    graph.resolver(second).resolve_input("in", mid)?;
    let end = graph.resolver(second).resolve_output("out")?;
    graph.connect(end, PortRef::input(output, 0))?;

    let order = graph.execution_order()?;
    let position = |id| order.iter().position(|e| *e == id).expect("listed");
    assert!(position(input) < position(first));
    assert!(position(first) < position(second));
    assert!(position(second) < position(output));
    Ok(())
}

#[test]
fn remove_element_disconnects_every_touching_edge() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let input = graph.add_flow_input("in", transaction_type(), None);
    let op = graph.add_operator(passthrough_op("convert"))?;
    let output = graph.add_flow_output("out", transaction_type(), None);
    graph
        .resolver(op)
        .resolve_input("in", PortRef::output(input, 0))?;
    let source = graph.resolver(op).resolve_output("out")?;
    graph.connect(source, PortRef::input(output, 0))?;

    graph.remove_element(op)?;
    assert!(graph.element(op).is_none());
    assert!(!graph.port(PortRef::output(input, 0)).unwrap().is_connected());
    assert!(!graph.port(PortRef::input(output, 0)).unwrap().is_connected());
    Ok(())
}

#[test]
fn connection_graph_mirrors_the_wiring() -> Result<()> {
    let mut graph = FlowGraph::new("com.example.Flow");
    let input = graph.add_flow_input("in", transaction_type(), None);
    let op = graph.add_operator(passthrough_op("convert"))?;
    graph
        .resolver(op)
        .resolve_input("in", PortRef::output(input, 0))?;

    let projected = graph.connection_graph();
    assert!(projected.is_connected(&input, &op));
    assert!(!projected.is_connected(&op, &input));
    assert_eq!(projected.len(), 2);
    Ok(())
}

#[test]
fn component_interior_mapping_must_match_ports() {
    let mut graph = FlowGraph::new("com.example.Flow");
    let spec = ComponentSpec {
        description: ElementDescription::component("Nested"),
        inputs: vec![PortDescription::new("in", transaction_type())],
        outputs: vec![PortDescription::new("out", transaction_type())],
        interior_inputs: vec![],
        interior_outputs: vec![],
    };
    let err = graph.add_component(spec).unwrap_err();
    assert!(err.to_string().contains("interior mapping"), "{err:#}");
}
