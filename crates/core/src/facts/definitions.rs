//! Human-readable description of the linker-map fact schema.
//!
//! Written as `definitions.json` beside extracted facts so downstream
//! consumers can discover what each node kind, edge kind and property means.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::facts::{EdgeKind, NodeKind};

/// Serializable schema description for one fact context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definitions {
    pub context: String,
    pub description: String,
    pub node_types: BTreeMap<String, String>,
    pub edge_types: BTreeMap<String, String>,
    pub node_properties: BTreeMap<String, String>,
    pub edge_properties: BTreeMap<String, String>,
}

fn node_types() -> [(NodeKind, &'static str); 8] {
    [
        (NodeKind::Section, "A section from the linker map (e.g., .text, .rodata)."),
        (NodeKind::ObjectFile, "An object or archive file included during linking."),
        (NodeKind::Symbol, "A symbol defined in an object file."),
        (NodeKind::Load, "A file explicitly loaded via the linker script."),
        (NodeKind::MemoryRegion, "A memory region defined in the memory configuration."),
        (NodeKind::MergeEvent, "An event representing a property merge between files."),
        (NodeKind::ArchiveEvent, "An archive member pulled in to satisfy a reference."),
        (NodeKind::DiscardedSection, "A section that was discarded during linking."),
    ]
}

fn edge_types() -> [(EdgeKind, &'static str); 4] {
    [
        (EdgeKind::Contains, "Section to objectFile: the object contributes to the section."),
        (EdgeKind::Defines, "ObjectFile to symbol: the object defines the symbol."),
        (EdgeKind::Merged, "ObjectFile to mergeEvent: the object took part in the merge."),
        (
            EdgeKind::ArchiveRef,
            "ObjectFile to archiveEvent: the object is the archive or referrer.",
        ),
    ]
}

const NODE_PROPERTIES: &[(&str, &str)] = &[
    ("name", "Name of the node (section, symbol, region)."),
    ("VMA", "Virtual memory address."),
    ("LMA", "Load memory address."),
    ("Size", "Size of the section or contribution."),
    ("Align", "Alignment (decimal)."),
    ("path", "File path for objectFile and load nodes."),
    ("origin", "Origin address of a memory region."),
    ("length", "Length of a memory region."),
    ("attributes", "Attributes of a memory region."),
    ("propertyCode", "Property code in a merge event."),
    ("file1", "First file involved in a merge event."),
    ("value1", "Value from the first file in a merge event."),
    ("file2", "Second file involved in a merge event."),
    ("value2", "Value from the second file in a merge event."),
    ("archive", "Archive file in an archive event."),
    ("reference", "Referencing file in an archive event."),
    ("symbol", "Symbol that caused an archive member to be included."),
    ("file", "Input file of a discarded section."),
];

const EDGE_PROPERTIES: &[(&str, &str)] = &[
    ("VMA", "Virtual memory address of the line that produced the edge."),
    ("LMA", "Load memory address of the line that produced the edge."),
    ("Size", "Size of the line that produced the edge."),
    ("Align", "Alignment of the line that produced the edge."),
];

/// Definitions for facts produced by [`crate::linkmap::LinkMapParser`].
pub fn linkmap_definitions(context: &str) -> Definitions {
    fn table<K: AsRef<str>>(rows: &[(K, &str)]) -> BTreeMap<String, String> {
        rows.iter().map(|(k, v)| (k.as_ref().to_string(), v.to_string())).collect()
    }

    Definitions {
        context: context.to_string(),
        description: "Node and edge types, and their properties, produced by the link map \
                      analysis engine."
            .to_string(),
        node_types: node_types().iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        edge_types: edge_types().iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        node_properties: table(NODE_PROPERTIES),
        edge_properties: table(EDGE_PROPERTIES),
    }
}
