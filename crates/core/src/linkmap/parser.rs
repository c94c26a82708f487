use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::facts::{EdgeKind, FactSet, FactStore, NodeId, NodeKind};
use crate::linkmap::lines::{
    is_banner, match_archive_member, match_discarded_detail, match_load, match_memory_region,
    match_merge, parse_placement_line,
};

/// Per-kind counts from one parse session, for logs and manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSummary {
    pub placement_lines: usize,
    pub loads: usize,
    pub memory_regions: usize,
    pub merge_events: usize,
    pub archive_events: usize,
    pub discarded_sections: usize,
    pub merged_links: usize,
    pub archive_links: usize,
}

/// Merge event waiting to be linked to the object files it names.
#[derive(Debug, Clone)]
struct PendingMerge {
    event: NodeId,
    file1: String,
    file2: String,
}

/// Archive event waiting to be linked to the object files it names.
#[derive(Debug, Clone)]
struct PendingArchive {
    event: NodeId,
    archive: String,
    reference: String,
}

#[derive(Debug, Default)]
struct PendingLinks {
    merges: Vec<PendingMerge>,
    archives: Vec<PendingArchive>,
}

/// Turns linker-map text into facts.
///
/// The map is read in two full passes: placement (section, object file and
/// symbol nesting) and events (loads, memory regions, property merges, archive
/// members, discarded sections). Merge and archive events are then linked to
/// the object files the placement pass created. Unrecognised lines are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkMapParser;

impl LinkMapParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse `text` in a fresh session whose ids are prefixed with `context`.
    pub fn parse(&self, text: &str, context: &str) -> (FactSet, ParseSummary) {
        let mut store = FactStore::new(context);
        let summary = self.parse_into(text, &mut store);
        (store.into_facts(), summary)
    }

    /// Parse `text` into an existing store (and its natural-key tables).
    pub fn parse_into(&self, text: &str, store: &mut FactStore) -> ParseSummary {
        let mut summary = ParseSummary::default();

        placement_pass(text, store, &mut summary);
        let pending = event_pass(text, store, &mut summary);
        link_events(store, pending, &mut summary);

        info!(
            nodes = store.node_count(),
            edges = store.edge_count(),
            "parsed linker map into context '{}'",
            store.context()
        );
        summary
    }
}

fn placement_pass(text: &str, store: &mut FactStore, summary: &mut ParseSummary) {
    let mut current_section: Option<NodeId> = None;
    let mut current_object: Option<NodeId> = None;

    for line in text.lines() {
        if is_banner(line) {
            continue;
        }
        let Some(parsed) = parse_placement_line(line) else {
            continue;
        };
        summary.placement_lines += 1;
        let numeric = parsed.numeric_props();

        if let Some(section) = parsed.section {
            let mut props = vec![("name", section)];
            props.extend(numeric);
            current_section = Some(store.get_or_create_node(NodeKind::Section, section, &props));
            current_object = None;
        }

        if let (Some(in_object), Some(section_id)) = (parsed.in_object, current_section.as_ref()) {
            let path = in_object.split(':').next().unwrap_or(in_object).trim();
            let object_id = store.get_or_create_node(NodeKind::ObjectFile, path, &[("path", path)]);
            store.create_edge(EdgeKind::Contains, section_id, &object_id, &numeric);
            current_object = Some(object_id);
        }

        if let (Some(symbol), Some(object_id)) = (parsed.symbol, current_object.as_ref()) {
            let symbol = symbol.trim();
            let symbol_id = store.get_or_create_node(NodeKind::Symbol, symbol, &[("name", symbol)]);
            store.create_edge(EdgeKind::Defines, object_id, &symbol_id, &numeric);
        }
    }
    debug!(lines = summary.placement_lines, "placement pass finished");
}

fn event_pass(text: &str, store: &mut FactStore, summary: &mut ParseSummary) -> PendingLinks {
    let mut pending = PendingLinks::default();
    let mut pending_discarded: Option<&str> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(path) = match_load(line) {
            let before = store.node_count();
            store.get_or_create_node(NodeKind::Load, path, &[("path", path)]);
            summary.loads += store.node_count() - before;
        }

        if let Some(region) = match_memory_region(line) {
            let before = store.node_count();
            store.get_or_create_node(
                NodeKind::MemoryRegion,
                region.name,
                &[
                    ("name", region.name),
                    ("origin", region.origin),
                    ("length", region.length),
                    ("attributes", region.attributes.unwrap_or("")),
                ],
            );
            summary.memory_regions += store.node_count() - before;
        }

        if let Some(merge) = match_merge(line) {
            let event = store.create_node(
                NodeKind::MergeEvent,
                &[
                    ("propertyCode", merge.property_code),
                    ("file1", merge.file1),
                    ("value1", merge.value1),
                    ("file2", merge.file2),
                    ("value2", merge.value2),
                ],
            );
            pending.merges.push(PendingMerge {
                event,
                file1: merge.file1.to_string(),
                file2: merge.file2.to_string(),
            });
            summary.merge_events += 1;
        }

        if let Some(member) = match_archive_member(line) {
            let event = store.create_node(
                NodeKind::ArchiveEvent,
                &[
                    ("archive", member.archive),
                    ("reference", member.reference),
                    ("symbol", member.symbol),
                ],
            );
            pending.archives.push(PendingArchive {
                event,
                archive: member.archive.to_string(),
                reference: member.reference.to_string(),
            });
            summary.archive_events += 1;
        }

        // A `.name` line arms the discarded-section state; the next matching
        // detail line consumes it.
        if trimmed.starts_with('.') {
            pending_discarded = trimmed.split_whitespace().next();
        } else if let (Some(name), Some(detail)) = (pending_discarded, match_discarded_detail(line))
        {
            store.create_node(
                NodeKind::DiscardedSection,
                &[
                    ("name", name),
                    ("VMA", detail.vma),
                    ("Size", detail.size),
                    ("file", detail.file),
                ],
            );
            summary.discarded_sections += 1;
            pending_discarded = None;
        }
    }
    debug!(
        loads = summary.loads,
        memory_regions = summary.memory_regions,
        merge_events = summary.merge_events,
        archive_events = summary.archive_events,
        discarded_sections = summary.discarded_sections,
        "event pass finished"
    );
    pending
}

const EMPTY_NUMERIC: [(&str, &str); 4] = [("VMA", ""), ("LMA", ""), ("Size", ""), ("Align", "")];

/// Link events to object files seen during placement; unknown files are dropped.
fn link_events(store: &mut FactStore, pending: PendingLinks, summary: &mut ParseSummary) {
    for merge in pending.merges {
        for file in [&merge.file1, &merge.file2] {
            if let Some(object_id) = store.lookup(&NodeKind::ObjectFile, file).cloned() {
                store.create_edge(EdgeKind::Merged, &object_id, &merge.event, &EMPTY_NUMERIC);
                summary.merged_links += 1;
            }
        }
    }
    for archive in pending.archives {
        for file in [&archive.archive, &archive.reference] {
            if let Some(object_id) = store.lookup(&NodeKind::ObjectFile, file).cloned() {
                store.create_edge(EdgeKind::ArchiveRef, &object_id, &archive.event, &EMPTY_NUMERIC);
                summary.archive_links += 1;
            }
        }
    }
}
