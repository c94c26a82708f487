//! Inference rules that derive extra edges from persisted facts.
//!
//! Each rule joins two node kinds on a shared property value and emits one
//! edge per matching pair. Edge ids are a function of the rule and the two
//! endpoints, so re-running the rules over the same facts reproduces the same
//! edge set.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::facts::{EdgeId, EdgeKind, EdgeRecord, FactSet, NodeId, NodeKind, PropRecord};

/// Property attached to every inferred edge, naming the rule that produced it.
pub const INFERRED_BY: &str = "inferredBy";

/// A same-property join between two node kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRule {
    pub name: &'static str,
    pub edge_kind: EdgeKind,
    pub src_kind: NodeKind,
    pub dst_kind: NodeKind,
    pub join_key: &'static str,
    /// Prefix of generated edge ids, e.g. `load->objectFile`.
    pub id_prefix: &'static str,
}

impl InferenceRule {
    pub fn edge_id(&self, src: &NodeId, dst: &NodeId) -> EdgeId {
        EdgeId(format!("{}->{}->{}", self.id_prefix, src, dst))
    }
}

/// The fixed rule set for linker-map facts.
pub fn linkmap_rules() -> Vec<InferenceRule> {
    vec![
        InferenceRule {
            name: "rule_loadObjectFileSamePath",
            edge_kind: EdgeKind::Load2ObjectFile,
            src_kind: NodeKind::Load,
            dst_kind: NodeKind::ObjectFile,
            join_key: "path",
            id_prefix: "load->objectFile",
        },
        InferenceRule {
            name: "rule_memRegionDiscardedSectionSameName",
            edge_kind: EdgeKind::MemRegion2DiscardedSection,
            src_kind: NodeKind::MemoryRegion,
            dst_kind: NodeKind::DiscardedSection,
            join_key: "name",
            id_prefix: "memRegion->discardedSection",
        },
        InferenceRule {
            name: "rule_memRegionSectionSameName",
            edge_kind: EdgeKind::MemRegion2Section,
            src_kind: NodeKind::MemoryRegion,
            dst_kind: NodeKind::Section,
            join_key: "name",
            id_prefix: "memRegion->section",
        },
    ]
}

/// Index of `(kind, key, value) -> nodes` over a fact set.
struct PropertyIndex<'a> {
    kinds: HashMap<&'a NodeId, &'a NodeKind>,
    values: HashMap<(&'a NodeKind, &'a str, &'a str), BTreeSet<&'a NodeId>>,
}

impl<'a> PropertyIndex<'a> {
    fn build(facts: &'a FactSet, keys: &BTreeSet<&str>) -> Self {
        let kinds: HashMap<&NodeId, &NodeKind> =
            facts.nodes.iter().map(|n| (&n.id, &n.kind)).collect();
        let mut values: HashMap<(&NodeKind, &str, &str), BTreeSet<&NodeId>> = HashMap::new();
        for prop in &facts.node_props {
            if !keys.contains(prop.key.as_str()) {
                continue;
            }
            if let Some(kind) = kinds.get(&prop.id) {
                values
                    .entry((*kind, prop.key.as_str(), prop.value.as_str()))
                    .or_default()
                    .insert(&prop.id);
            }
        }
        Self { kinds, values }
    }

    /// Distinct join values carried by nodes of `kind` under `key`, sorted.
    fn values_for(&self, kind: &NodeKind, key: &str) -> BTreeSet<&'a str> {
        self.values.keys().filter(|(k, p, _)| *k == kind && *p == key).map(|(_, _, v)| *v).collect()
    }

    fn nodes(
        &self,
        kind: &'a NodeKind,
        key: &'a str,
        value: &'a str,
    ) -> Option<&BTreeSet<&'a NodeId>> {
        self.values.get(&(kind, key, value))
    }
}

/// Apply `rules` to `facts`, returning only the inferred edges and their
/// `inferredBy` properties. Output is sorted by edge id and duplicate-free.
pub fn infer(facts: &FactSet, rules: &[InferenceRule]) -> FactSet {
    let keys: BTreeSet<&str> = rules.iter().map(|r| r.join_key).collect();
    let index = PropertyIndex::build(facts, &keys);
    debug!(nodes = index.kinds.len(), "built inference index");

    let mut inferred: BTreeMap<EdgeId, (EdgeRecord, &'static str)> = BTreeMap::new();
    for rule in rules {
        let mut fired = 0usize;
        for value in index.values_for(&rule.src_kind, rule.join_key) {
            let (Some(srcs), Some(dsts)) = (
                index.nodes(&rule.src_kind, rule.join_key, value),
                index.nodes(&rule.dst_kind, rule.join_key, value),
            ) else {
                continue;
            };
            for src in srcs {
                for dst in dsts {
                    let id = rule.edge_id(src, dst);
                    let record = EdgeRecord {
                        id: id.clone(),
                        kind: rule.edge_kind.clone(),
                        src: (*src).clone(),
                        dst: (*dst).clone(),
                    };
                    if inferred.insert(id, (record, rule.name)).is_none() {
                        fired += 1;
                    }
                }
            }
        }
        debug!(rule = rule.name, edges = fired, "inference rule applied");
    }

    let mut out = FactSet::new();
    for (id, (record, rule_name)) in inferred {
        out.edges.push(record);
        out.edge_props.push(PropRecord::new(id, INFERRED_BY, rule_name));
    }
    out
}

/// Render `rules` as a Souffle-style relational program over the four fact
/// relations, for evaluation by an external Datalog engine.
pub fn rules_program(rules: &[InferenceRule]) -> String {
    let mut program = String::from(
        ".decl nodes(fqn:symbol, type:symbol)\n\
         .decl nodeprops(fqn:symbol, key:symbol, val:symbol)\n\
         .decl edges(fqn:symbol, type:symbol, src:symbol, tgt:symbol)\n\
         .decl edgeprops(fqn:symbol, key:symbol, val:symbol)\n\
         \n\
         .input nodes(filename=\"nodes.facts\", delimiter=\",\")\n\
         .input nodeprops(filename=\"nodeprops.facts\", delimiter=\",\")\n\
         .input edges(filename=\"edges.facts\", delimiter=\",\")\n\
         .input edgeprops(filename=\"edgeprops.facts\", delimiter=\",\")\n\
         \n\
         .decl inferredEdges(fqn:symbol, type:symbol, src:symbol, tgt:symbol)\n\
         .decl inferredEdgeProps(fqn:symbol, key:symbol, val:symbol)\n\
         \n\
         .output inferredEdges(filename=\"inferred_edges.facts\", delimiter=\",\")\n\
         .output inferredEdgeProps(filename=\"inferred_edgeprops.facts\", delimiter=\",\")\n",
    );

    for rule in rules {
        let fqn = format!("cat(\"{}->\", srcFqn, \"->\", dstFqn)", rule.id_prefix);
        let body = format!(
            "    nodes(srcFqn, \"{src}\"),\n    nodeprops(srcFqn, \"{key}\", V),\n    \
             nodes(dstFqn, \"{dst}\"),\n    nodeprops(dstFqn, \"{key}\", V).\n",
            src = rule.src_kind,
            dst = rule.dst_kind,
            key = rule.join_key,
        );
        program.push_str(&format!("\n// {}\n", rule.name));
        program.push_str(&format!(
            "inferredEdges({fqn}, \"{}\", srcFqn, dstFqn) :-\n{body}",
            rule.edge_kind
        ));
        program.push_str(&format!(
            "inferredEdgeProps({fqn}, \"{INFERRED_BY}\", \"{}\") :-\n{body}",
            rule.name
        ));
    }
    program
}
