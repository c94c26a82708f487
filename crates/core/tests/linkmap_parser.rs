use reach_core::facts::{EdgeKind, FactSet, NodeId, NodeKind};
use reach_core::linkmap::lines::{parse_placement_line, PlacementLine};
use reach_core::linkmap::{LinkMapParser, ParseSummary};

const MAP: &str = r#"Archive member included to satisfy reference by file (symbol)

libfoo.a(bar.o) main.o (bar_func)

Merging program properties

Removed property 0xc0000002 to merge main.o (0x3) and libfoo.a(bar.o) (0x1)

Memory Configuration

Name             Origin             Length             Attributes
FLASH            0x08000000         0x00100000         xr
.text            0x00000000         0x00001000
.bss             0x20000000         0x100

Discarded input sections

.bss
                0x100               0x10 foo.o

Linker script and memory map

LOAD main.o
LOAD libfoo.a(bar.o)
          0x1a00           0x1a00      0x40    16 .text
          0x1a00           0x1a00      0x20    16         main.o:(.text)
          0x1a00           0x1a00         0     1                 main
          0x1a20           0x1a20      0x20    16         libfoo.a(bar.o):(.text)
          0x1a20           0x1a20         0     1                 bar_func
 .data          0x20000000        0x8 main.o
                0x20000000                counter
"#;

fn parse(text: &str) -> (FactSet, ParseSummary) {
    LinkMapParser::new().parse(text, "linkmap")
}

fn prop<'a>(facts: &'a FactSet, id: &str, key: &str) -> Vec<&'a str> {
    facts
        .node_props
        .iter()
        .filter(|p| p.id.as_str() == id && p.key == key)
        .map(|p| p.value.as_str())
        .collect()
}

fn edge_prop<'a>(facts: &'a FactSet, id: &str, key: &str) -> Option<&'a str> {
    facts.edge_props.iter().find(|p| p.id.as_str() == id && p.key == key).map(|p| p.value.as_str())
}

fn kind_of(facts: &FactSet, id: &str) -> NodeKind {
    facts.nodes.iter().find(|n| n.id.as_str() == id).map(|n| n.kind.clone()).expect("node exists")
}

#[test]
fn four_column_line_assigns_each_token_one_role() {
    let parsed = parse_placement_line("  0x1a  0x1a  0x4  8 .text main.o:(.text) helper").unwrap();
    assert_eq!(
        parsed,
        PlacementLine {
            vma: "0x1a",
            lma: Some("0x1a"),
            size: Some("0x4"),
            align: Some("8"),
            section: Some(".text"),
            in_object: Some("main.o:(.text)"),
            symbol: Some("helper"),
        }
    );

    let only_object = parse_placement_line("1000 1000 20 4   crt1.o:(.init)").unwrap();
    assert_eq!(only_object.section, None);
    assert_eq!(only_object.in_object, Some("crt1.o:(.init)"));
    assert_eq!(only_object.symbol, None);
}

#[test]
fn placement_shapes_fall_through_in_order() {
    let symbol = parse_placement_line("        0x08000100                reset_handler").unwrap();
    assert_eq!(symbol.vma, "0x08000100");
    assert_eq!(symbol.symbol, Some("reset_handler"));
    assert_eq!(symbol.size, None);

    let section = parse_placement_line(" .rodata        0x08000200       0x30 util.o").unwrap();
    assert_eq!(section.section, Some(".rodata"));
    assert_eq!(section.size, Some("0x30"));
    assert_eq!(section.in_object, Some("util.o"));
    assert_eq!(section.lma, None);

    assert!(parse_placement_line("").is_none());
    assert!(parse_placement_line("   ").is_none());
    assert!(parse_placement_line("OUTPUT(app.elf elf32-littlearm)").is_none());
}

#[test]
fn full_map_produces_expected_summary() {
    let (facts, summary) = parse(MAP);
    assert_eq!(
        summary,
        ParseSummary {
            placement_lines: 7,
            loads: 2,
            memory_regions: 4,
            merge_events: 1,
            archive_events: 1,
            discarded_sections: 1,
            merged_links: 2,
            archive_links: 2,
        }
    );
    assert_eq!(facts.nodes.len(), 16);
    assert_eq!(facts.edges.len(), 10);
}

#[test]
fn placement_pass_builds_section_object_symbol_nesting() {
    let (facts, _) = parse(MAP);

    assert_eq!(kind_of(&facts, "linkmap:node_1"), NodeKind::Section);
    assert_eq!(prop(&facts, "linkmap:node_1", "name"), vec![".text"]);
    assert_eq!(prop(&facts, "linkmap:node_1", "Size"), vec!["0x40"]);
    assert_eq!(kind_of(&facts, "linkmap:node_2"), NodeKind::ObjectFile);
    assert_eq!(prop(&facts, "linkmap:node_2", "path"), vec!["main.o"]);
    assert_eq!(prop(&facts, "linkmap:node_4", "path"), vec!["libfoo.a(bar.o)"]);
    assert_eq!(prop(&facts, "linkmap:node_7", "name"), vec!["counter"]);

    let contains: Vec<_> = facts.edges_of_kind(&EdgeKind::Contains).collect();
    assert_eq!(contains.len(), 3);
    // main.o is deduplicated; the .data contribution points back at node_2.
    assert_eq!(contains[2].src, NodeId::new("linkmap:node_6"));
    assert_eq!(contains[2].dst, NodeId::new("linkmap:node_2"));

    let defines: Vec<_> = facts.edges_of_kind(&EdgeKind::Defines).collect();
    assert_eq!(defines.len(), 3);
    assert_eq!(defines[0].src, NodeId::new("linkmap:node_2"));
    assert_eq!(defines[0].dst, NodeId::new("linkmap:node_3"));
}

#[test]
fn edge_numeric_properties_keep_source_text() {
    let (facts, _) = parse(MAP);

    assert_eq!(edge_prop(&facts, "linkmap:edge_1", "VMA"), Some("0x1a00"));
    assert_eq!(edge_prop(&facts, "linkmap:edge_1", "LMA"), Some("0x1a00"));
    assert_eq!(edge_prop(&facts, "linkmap:edge_1", "Size"), Some("0x20"));
    assert_eq!(edge_prop(&facts, "linkmap:edge_1", "Align"), Some("16"));

    // Shape 3 carries no load address or alignment.
    assert_eq!(edge_prop(&facts, "linkmap:edge_5", "Size"), Some("0x8"));
    assert_eq!(edge_prop(&facts, "linkmap:edge_5", "LMA"), Some(""));
    assert_eq!(edge_prop(&facts, "linkmap:edge_5", "Align"), Some(""));
}

#[test]
fn hex_values_are_not_reformatted() {
    let (facts, _) = parse("0x1a 0x1a 0x1a 4 .text foo.o:(.text)\n");
    for key in ["VMA", "LMA", "Size"] {
        assert_eq!(prop(&facts, "linkmap:node_1", key), vec!["0x1a"]);
        assert_eq!(edge_prop(&facts, "linkmap:edge_1", key), Some("0x1a"));
    }
}

#[test]
fn event_pass_creates_events_and_regions() {
    let (facts, _) = parse(MAP);

    assert_eq!(kind_of(&facts, "linkmap:node_8"), NodeKind::ArchiveEvent);
    assert_eq!(prop(&facts, "linkmap:node_8", "symbol"), vec!["bar_func"]);
    assert_eq!(kind_of(&facts, "linkmap:node_9"), NodeKind::MergeEvent);
    assert_eq!(prop(&facts, "linkmap:node_9", "propertyCode"), vec!["0xc0000002"]);
    assert_eq!(prop(&facts, "linkmap:node_9", "value2"), vec!["0x1"]);

    assert_eq!(kind_of(&facts, "linkmap:node_10"), NodeKind::MemoryRegion);
    assert_eq!(prop(&facts, "linkmap:node_10", "attributes"), vec!["xr"]);
    assert_eq!(prop(&facts, "linkmap:node_11", "attributes"), vec![""]);

    let loads: Vec<_> = facts.nodes_of_kind(&NodeKind::Load).collect();
    assert_eq!(loads.len(), 2);
}

#[test]
fn merge_and_archive_events_link_to_known_object_files() {
    let (facts, _) = parse(MAP);

    let merged: Vec<_> = facts.edges_of_kind(&EdgeKind::Merged).collect();
    assert_eq!(merged.len(), 2);
    assert!(merged.iter().all(|e| e.dst == NodeId::new("linkmap:node_9")));
    assert_eq!(merged[0].src, NodeId::new("linkmap:node_2"));
    assert_eq!(merged[1].src, NodeId::new("linkmap:node_4"));
    assert_eq!(edge_prop(&facts, merged[0].id.as_str(), "VMA"), Some(""));

    let archive: Vec<_> = facts.edges_of_kind(&EdgeKind::ArchiveRef).collect();
    assert_eq!(archive.len(), 2);
    assert_eq!(archive[0].src, NodeId::new("linkmap:node_4"));
    assert_eq!(archive[1].src, NodeId::new("linkmap:node_2"));
}

#[test]
fn unknown_object_files_are_not_linked() {
    let text = "Removed property 0x1 to merge a.o (0x1) and b.o (0x2)\n";
    let (facts, summary) = parse(text);
    assert_eq!(summary.merge_events, 1);
    assert_eq!(summary.merged_links, 0);
    assert!(facts.edges.is_empty());
}

#[test]
fn discarded_section_needs_name_then_detail() {
    let (facts, _) = parse(".bss\n  0x100  0x10  foo.o\n");
    let discarded: Vec<_> = facts.nodes_of_kind(&NodeKind::DiscardedSection).collect();
    assert_eq!(discarded.len(), 1);
    let id = discarded[0].id.as_str();
    assert_eq!(prop(&facts, id, "name"), vec![".bss"]);
    assert_eq!(prop(&facts, id, "VMA"), vec!["0x100"]);
    assert_eq!(prop(&facts, id, "Size"), vec!["0x10"]);
    assert_eq!(prop(&facts, id, "file"), vec!["foo.o"]);

    let (orphan, _) = parse(".bss\n.data\n");
    assert_eq!(orphan.nodes_of_kind(&NodeKind::DiscardedSection).count(), 0);
}

#[test]
fn discarded_sections_are_not_deduplicated() {
    let text = ".bss\n  0x0  0x4  a.o\n.bss\n  0x0  0x4  b.o\n";
    let (facts, summary) = parse(text);
    assert_eq!(summary.discarded_sections, 2);
    assert_eq!(facts.nodes_of_kind(&NodeKind::DiscardedSection).count(), 2);
}

#[test]
fn banners_and_garbage_are_skipped() {
    let text = "Memory Configuration\nLinker script and memory map\n%%% not a map line %%%\n";
    let (facts, summary) = parse(text);
    assert!(facts.is_empty());
    assert_eq!(summary, ParseSummary::default());
}

#[test]
fn repeated_loads_and_regions_are_counted_once() {
    let text = "LOAD main.o\nLOAD main.o\nFLASH 0x08000000 0x1000 xr\nFLASH 0x08000000 0x1000 xr\n";
    let (facts, summary) = parse(text);
    assert_eq!(summary.loads, 1);
    assert_eq!(summary.memory_regions, 1);
    assert_eq!(facts.nodes_of_kind(&NodeKind::Load).count(), 1);
    assert_eq!(facts.nodes_of_kind(&NodeKind::MemoryRegion).count(), 1);
}
