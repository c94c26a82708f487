use std::cell::RefCell;

use reach_core::demangle::{DemangleError, Demangler};
use reach_core::facts::{
    write_fact_dir, EdgeId, EdgeKind, EdgeRecord, FactError, FactFiles, FactSet, NodeId, NodeKind,
    NodeRecord, PropRecord,
};
use reach_core::graph::{FactGraph, DEMANGLED_NAME};
use tempfile::tempdir;

fn node(facts: &mut FactSet, id: &str, kind: NodeKind, props: &[(&str, &str)]) -> NodeId {
    let id = NodeId::new(id);
    facts.nodes.push(NodeRecord { id: id.clone(), kind });
    for (key, value) in props {
        facts.node_props.push(PropRecord::new(id.clone(), *key, *value));
    }
    id
}

fn edge(facts: &mut FactSet, id: &str, kind: &str, src: &NodeId, dst: &NodeId) -> EdgeId {
    let id = EdgeId::new(id);
    facts.edges.push(EdgeRecord {
        id: id.clone(),
        kind: EdgeKind::from(kind),
        src: src.clone(),
        dst: dst.clone(),
    });
    id
}

fn call_graph() -> FactSet {
    let mut facts = FactSet::new();
    let main = node(&mut facts, "f:main", NodeKind::Function, &[("name", "main")]);
    let helper =
        node(&mut facts, "f:helper", NodeKind::Function, &[("name", "_ZN4util6helperEv")]);
    let block = node(&mut facts, "b:1", NodeKind::from("BasicBlock"), &[("idx", "1")]);
    edge(&mut facts, "e:1", "Contains", &main, &block);
    edge(&mut facts, "e:2", "Calls", &block, &helper);
    edge(&mut facts, "e:3", "Calls", &main, &helper);
    facts
}

struct FixedDemangler {
    output: Result<Vec<String>, ()>,
    seen: RefCell<Vec<String>>,
}

impl Demangler for FixedDemangler {
    fn demangle(&self, names: &[String]) -> Result<Vec<String>, DemangleError> {
        self.seen.borrow_mut().extend(names.iter().cloned());
        self.output
            .clone()
            .map_err(|_| DemangleError::LineCount { expected: names.len(), found: 0 })
    }
}

#[test]
fn graph_indexes_nodes_and_edges() {
    let graph = FactGraph::from_facts(call_graph()).expect("graph");
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 3);

    let main = NodeId::new("f:main");
    let helper = NodeId::new("f:helper");
    let out: Vec<&str> = graph.edges_from(&main).map(|e| e.id.as_str()).collect();
    assert_eq!(out, vec!["e:1", "e:3"]);
    let into: Vec<&str> = graph.edges_to(&helper).map(|e| e.id.as_str()).collect();
    assert_eq!(into, vec!["e:2", "e:3"]);
    assert_eq!(graph.edges_between(&main, &helper).count(), 1);
    assert_eq!(graph.edges_of_kind(&EdgeKind::from("Calls")).count(), 2);

    let kinds = graph.node_kind_counts();
    assert_eq!(kinds.get("Function"), Some(&2));
    assert_eq!(kinds.get("BasicBlock"), Some(&1));
    assert_eq!(graph.edge_kind_counts().get("Contains"), Some(&1));
}

#[test]
fn property_without_node_is_rejected() {
    let mut facts = call_graph();
    facts.node_props.push(PropRecord::new(NodeId::new("f:ghost"), "name", "ghost"));
    let err = FactGraph::from_facts(facts).unwrap_err();
    assert!(matches!(err, FactError::DanglingProperty { ref id, .. } if id == "f:ghost"));
}

#[test]
fn edge_with_unknown_endpoint_is_rejected() {
    let mut facts = call_graph();
    let main = NodeId::new("f:main");
    edge(&mut facts, "e:9", "Calls", &main, &NodeId::new("f:ghost"));
    let err = FactGraph::from_facts(facts).unwrap_err();
    assert!(err.to_string().contains("f:ghost"), "{err}");
}

#[test]
fn repeated_property_overwrites_and_duplicate_node_keeps_first() {
    let mut facts = call_graph();
    facts.node_props.push(PropRecord::new(NodeId::new("f:main"), "name", "main2"));
    facts.nodes.push(NodeRecord { id: NodeId::new("f:main"), kind: NodeKind::Symbol });

    let graph = FactGraph::from_facts(facts).expect("graph");
    let main = graph.node(&NodeId::new("f:main")).expect("main");
    assert_eq!(main.kind, NodeKind::Function);
    assert_eq!(main.props.get("name"), Some("main2"));
    assert_eq!(main.props.len(), 1);
}

#[test]
fn display_name_prefers_demangled_then_name_then_idx() {
    let mut facts = call_graph();
    facts.node_props.push(PropRecord::new(
        NodeId::new("f:helper"),
        DEMANGLED_NAME,
        "util::helper()",
    ));
    let graph = FactGraph::from_facts(facts).expect("graph");

    assert_eq!(graph.display_name(&NodeId::new("f:helper")), "util::helper()");
    assert_eq!(graph.display_name(&NodeId::new("f:main")), "main");
    assert_eq!(graph.display_name(&NodeId::new("b:1")), "1");
    assert_eq!(graph.display_name(&NodeId::new("nope")), "");
}

#[test]
fn find_function_checks_raw_names_before_demangled() {
    let mut facts = FactSet::new();
    node(&mut facts, "f:a", NodeKind::Function, &[("name", "x"), (DEMANGLED_NAME, "target")]);
    node(&mut facts, "f:b", NodeKind::Function, &[("name", "my_target_impl")]);
    node(&mut facts, "s:c", NodeKind::Symbol, &[("name", "target")]);
    let graph = FactGraph::from_facts(facts).expect("graph");

    // A later raw-name hit beats an earlier demangled-name hit.
    assert_eq!(graph.find_function("target"), Some(&NodeId::new("f:b")));
    assert_eq!(graph.find_function("x"), Some(&NodeId::new("f:a")));
    assert_eq!(graph.find_function("absent"), None);
}

#[test]
fn demangled_names_are_recorded_only_when_different() {
    let mut graph = FactGraph::from_facts(call_graph()).expect("graph");
    let demangler = FixedDemangler {
        output: Ok(vec!["main".to_string(), "util::helper()".to_string()]),
        seen: RefCell::new(Vec::new()),
    };
    graph.demangle_names(&demangler);

    assert_eq!(*demangler.seen.borrow(), vec!["main", "_ZN4util6helperEv"]);
    let main = graph.node(&NodeId::new("f:main")).expect("main");
    assert_eq!(main.props.get(DEMANGLED_NAME), None);
    let helper = graph.node(&NodeId::new("f:helper")).expect("helper");
    assert_eq!(helper.props.get(DEMANGLED_NAME), Some("util::helper()"));
    assert_eq!(graph.find_function("util::helper"), Some(&NodeId::new("f:helper")));
}

#[test]
fn demangler_failure_keeps_raw_names() {
    let mut graph = FactGraph::from_facts(call_graph()).expect("graph");
    let demangler = FixedDemangler { output: Err(()), seen: RefCell::new(Vec::new()) };
    graph.demangle_names(&demangler);
    assert!(graph.nodes().all(|n| n.props.get(DEMANGLED_NAME).is_none()));

    // A short answer is ignored rather than misaligned.
    graph.apply_demangled(&["only_one".to_string()]);
    assert!(graph.nodes().all(|n| n.props.get(DEMANGLED_NAME).is_none()));
}

#[test]
fn load_dir_unions_inferred_edges() {
    let dir = tempdir().expect("tempdir");
    write_fact_dir(dir.path(), &FactFiles::BASE, &call_graph()).expect("base");

    let mut inferred = FactSet::new();
    let main = NodeId::new("f:main");
    let block = NodeId::new("b:1");
    let id = edge(&mut inferred, "x->f:main->b:1", "Succ", &main, &block);
    inferred.edge_props.push(PropRecord::new(id.clone(), "inferredBy", "rule_x"));
    write_fact_dir(dir.path(), &FactFiles::INFERRED, &inferred).expect("inferred");

    let graph = FactGraph::load_dir(dir.path()).expect("load");
    assert_eq!(graph.edge_count(), 4);
    let succ = graph.edge(&id).expect("inferred edge");
    assert_eq!(succ.props.get("inferredBy"), Some("rule_x"));
}
