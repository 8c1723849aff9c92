//! End-to-end tests for runtime type registration.
//!
//! Custom vertex and edge kinds are registered, created by name, inserted
//! into graphs of both backends and round-tripped through their attribute
//! callbacks.

use std::any::Any;

use graph_analysis::model::EdgeEnds;
use graph_analysis::{
    AttributeCallbacks, AttributeId, BackendConfig, BackendKind, BaseGraph, Edge,
    EdgeTypeRegistry, ElementCore, Error, GraphElement, OnDuplicate, OnMissing, Vertex,
    VertexTypeRegistry, edge_types, vertex_types,
};
use parking_lot::RwLock;
use pretty_assertions::assert_eq;

// ============================================================================
// Custom kinds
// ============================================================================

#[derive(Debug)]
struct Tank {
    core: ElementCore,
    volume: RwLock<f64>,
}

impl Tank {
    const CLASS_NAME: &'static str = "plant::Tank";

    fn prototype(volume: f64) -> Box<dyn Vertex> {
        Box::new(Self { core: ElementCore::new("", Self::CLASS_NAME), volume: RwLock::new(volume) })
    }
}

impl GraphElement for Tank {
    fn core(&self) -> &ElementCore { &self.core }
    fn core_mut(&mut self) -> &mut ElementCore { &mut self.core }
    fn class_name(&self) -> &'static str { Self::CLASS_NAME }
    fn as_any(&self) -> &dyn Any { self }
}

impl Vertex for Tank {
    fn duplicate(&self) -> Box<dyn Vertex> {
        Box::new(Self { core: self.core.clone(), volume: RwLock::new(*self.volume.read()) })
    }
}

#[derive(Debug)]
struct Pipe {
    core: ElementCore,
    ends: EdgeEnds,
    diameter_mm: u32,
}

impl Pipe {
    const CLASS_NAME: &'static str = "plant::Pipe";
}

impl GraphElement for Pipe {
    fn core(&self) -> &ElementCore { &self.core }
    fn core_mut(&mut self) -> &mut ElementCore { &mut self.core }
    fn class_name(&self) -> &'static str { Self::CLASS_NAME }
    fn as_any(&self) -> &dyn Any { self }
}

impl Edge for Pipe {
    fn ends(&self) -> &EdgeEnds { &self.ends }

    fn duplicate(&self) -> Box<dyn Edge> {
        Box::new(Self { core: self.core.clone(), ends: self.ends.clone(), diameter_mm: self.diameter_mm })
    }
}

fn plant_vertices() -> VertexTypeRegistry {
    let mut reg = VertexTypeRegistry::new();
    reg.register_type(Tank::prototype(100.0), OnDuplicate::Fail).unwrap();
    reg.register_attribute(
        Tank::CLASS_NAME,
        "volume",
        "f64",
        AttributeCallbacks::typed(|t: &Tank| t.volume.read().to_string()).with_typed_deserialize(
            |t: &Tank, value: &str| {
                *t.volume.write() = value.parse::<f64>().map_err(|_| Error::InvalidAttributeValue {
                    attribute: "volume".into(),
                    message: format!("not a number: {value}"),
                })?;
                Ok(())
            },
        ),
    )
    .unwrap();
    reg
}

fn plant_edges() -> EdgeTypeRegistry {
    let mut reg = EdgeTypeRegistry::new();
    let pipe = Pipe { core: ElementCore::new("", Pipe::CLASS_NAME), ends: EdgeEnds::default(), diameter_mm: 50 };
    reg.register_type(Box::new(pipe), OnDuplicate::Fail).unwrap();
    reg.register_attribute(
        Pipe::CLASS_NAME,
        "diameter_mm",
        "u32",
        AttributeCallbacks::typed(|p: &Pipe| p.diameter_mm.to_string()),
    )
    .unwrap();
    reg
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_registered_kinds_build_a_graph() {
    let vertex_reg = plant_vertices();
    let edge_reg = plant_edges();

    for kind in [BackendKind::Stable, BackendKind::Indexed] {
        let mut g = graph_analysis::open(&BackendConfig::new(kind));
        let a = vertex_reg.create_vertex(Tank::CLASS_NAME, "a", OnMissing::Fail).unwrap();
        let b = vertex_reg.create_vertex(Tank::CLASS_NAME, "b", OnMissing::Fail).unwrap();
        let pipe = edge_reg
            .create_edge_between(Pipe::CLASS_NAME, a.clone(), b.clone(), "a->b", OnMissing::Fail)
            .unwrap();
        g.add_edge(pipe.clone()).unwrap();

        assert_eq!(g.vertex_count(), 2);
        let stored = g.edge(g.edge_id(&pipe).unwrap()).unwrap();
        assert_eq!(stored.class_type(), Pipe::CLASS_NAME);
        assert_eq!(stored.as_any().downcast_ref::<Pipe>().unwrap().diameter_mm, 50);
        g.check_consistency().unwrap();
    }
}

#[test]
fn test_attribute_round_trip() {
    let reg = plant_vertices();
    let tank = reg.create_vertex(Tank::CLASS_NAME, "t", OnMissing::Fail).unwrap();
    let volume = AttributeId::from("volume");

    assert_eq!(reg.attribute_values(tank.as_ref()), vec![(volume.clone(), "100".to_string())]);
    reg.set_attribute_value(tank.as_ref(), &volume, "2.5").unwrap();
    assert_eq!(reg.attribute_values(tank.as_ref()), vec![(volume.clone(), "2.5".to_string())]);

    assert!(matches!(
        reg.set_attribute_value(tank.as_ref(), &volume, "lots"),
        Err(Error::InvalidAttributeValue { .. })
    ));
    assert!(matches!(
        reg.set_attribute_value(tank.as_ref(), &AttributeId::from("height"), "1"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_read_only_attribute() {
    let reg = plant_edges();
    let pipe = reg.create_edge(Pipe::CLASS_NAME, "", OnMissing::Fail).unwrap();
    assert!(matches!(
        reg.set_attribute_value(pipe.as_ref(), &AttributeId::from("diameter_mm"), "80"),
        Err(Error::InvalidAttributeValue { .. })
    ));
}

#[test]
fn test_known_attributes_span_types() {
    let reg = plant_vertices();
    let all = reg.known_attributes(&[]);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id.as_str(), "volume");
    assert_eq!(all[0].member_type, "f64");
    assert_eq!(all[0].class_type, Tank::CLASS_NAME);
    assert!(reg.known_attributes(&["graph_analysis::Vertex"]).is_empty());
    assert!(reg.known_attributes(&["nope"]).is_empty());
}

#[test]
fn test_unknown_type_policies() {
    let reg = plant_vertices();
    assert!(matches!(
        reg.create_vertex("plant::Valve", "v", OnMissing::Fail),
        Err(Error::UnknownType(_))
    ));

    let fallback = reg.create_vertex("plant::Valve", "v", OnMissing::UseDefault).unwrap();
    assert_eq!(fallback.class_type(), reg.default_type());
    assert_eq!(fallback.label(), "v");
}

#[test]
fn test_clone_edge_drops_endpoints_and_membership() {
    let reg = plant_edges();
    let vertex_reg = plant_vertices();
    let a = vertex_reg.create_vertex(Tank::CLASS_NAME, "a", OnMissing::Fail).unwrap();
    let pipe = reg
        .create_edge_between(Pipe::CLASS_NAME, a.clone(), a.clone(), "loop", OnMissing::Fail)
        .unwrap();
    let mut g = graph_analysis::open(&BackendConfig::default());
    g.add_edge(pipe.clone()).unwrap();

    let copy = pipe.clone_edge();
    assert!(copy.source().is_none());
    assert!(copy.target().is_none());
    assert_eq!(copy.id_in(g.id()), None);
    assert_eq!(copy.label(), "loop");
    assert_eq!(copy.class_type(), Pipe::CLASS_NAME);

    let vertex_copy = a.clone_vertex();
    assert_eq!(vertex_copy.id_in(g.id()), None);
    assert_eq!(*vertex_copy.as_any().downcast_ref::<Tank>().unwrap().volume.read(), 100.0);
}

#[test]
fn test_process_wide_registries() {
    vertex_types()
        .write()
        .register_type_as("e2e::Tank", Tank::prototype(7.0), OnDuplicate::Ignore)
        .unwrap();
    assert!(vertex_types().read().supported_types().contains("e2e::Tank"));

    let v = vertex_types().read().create_vertex("e2e::Tank", "shared", OnMissing::Fail).unwrap();
    assert_eq!(v.class_type(), "e2e::Tank");
    assert!(edge_types().read().is_registered(graph_analysis::BasicEdge::CLASS_NAME));
}
