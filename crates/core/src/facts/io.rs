use std::borrow::Cow;
use std::fs;
use std::path::Path;

use crate::facts::{
    EdgeId, EdgeKind, EdgeRecord, FactError, FactResult, FactSet, NodeId, NodeKind, NodeRecord,
    PropRecord,
};

/// File names of the four fact tables inside a facts directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactFiles {
    pub nodes: &'static str,
    pub node_props: &'static str,
    pub edges: &'static str,
    pub edge_props: &'static str,
}

impl FactFiles {
    /// Facts parsed directly from source material.
    pub const BASE: FactFiles = FactFiles {
        nodes: "nodes.facts",
        node_props: "nodeprops.facts",
        edges: "edges.facts",
        edge_props: "edgeprops.facts",
    };

    /// Facts derived by the inference rules.
    pub const INFERRED: FactFiles = FactFiles {
        nodes: "inferred_nodes.facts",
        node_props: "inferred_nodeprops.facts",
        edges: "inferred_edges.facts",
        edge_props: "inferred_edgeprops.facts",
    };
}

/// Write all four tables of `facts` into `dir`, creating it if needed.
pub fn write_fact_dir(dir: &Path, files: &FactFiles, facts: &FactSet) -> FactResult<()> {
    fs::create_dir_all(dir).map_err(|source| FactError::Io { path: dir.to_path_buf(), source })?;

    write_table(
        &dir.join(files.nodes),
        facts.nodes.iter().map(|n| vec![n.id.as_str(), n.kind.as_str()]),
    )?;
    write_table(
        &dir.join(files.node_props),
        facts.node_props.iter().map(|p| vec![p.id.as_str(), p.key.as_str(), p.value.as_str()]),
    )?;
    write_table(
        &dir.join(files.edges),
        facts
            .edges
            .iter()
            .map(|e| vec![e.id.as_str(), e.kind.as_str(), e.src.as_str(), e.dst.as_str()]),
    )?;
    write_table(
        &dir.join(files.edge_props),
        facts.edge_props.iter().map(|p| vec![p.id.as_str(), p.key.as_str(), p.value.as_str()]),
    )?;
    Ok(())
}

/// Read the four tables named by `files` from `dir`. Every file must exist.
///
/// No cross-table integrity checks happen here; see
/// [`crate::graph::FactGraph::from_facts`].
pub fn read_fact_dir(dir: &Path, files: &FactFiles) -> FactResult<FactSet> {
    let mut facts = FactSet::new();
    for (name, table) in Table::layout(files) {
        table.read_into(&dir.join(name), &mut facts)?;
    }
    Ok(facts)
}

/// Read the base tables from `dir` and union any inferred tables present.
///
/// Inferred files are optional individually; a missing one contributes nothing.
pub fn read_fact_dir_with_inferred(dir: &Path) -> FactResult<FactSet> {
    let mut facts = read_fact_dir(dir, &FactFiles::BASE)?;

    let mut extra = FactSet::new();
    for (name, table) in Table::layout(&FactFiles::INFERRED) {
        let path = dir.join(name);
        if path.is_file() {
            table.read_into(&path, &mut extra)?;
        }
    }
    if !extra.is_empty() {
        tracing::debug!(
            nodes = extra.nodes.len(),
            edges = extra.edges.len(),
            "unioned inferred facts from {}",
            dir.display()
        );
        facts.union(extra);
    }

    Ok(facts)
}

#[derive(Debug, Clone, Copy)]
enum Table {
    Nodes,
    NodeProps,
    Edges,
    EdgeProps,
}

impl Table {
    fn layout(files: &FactFiles) -> [(&'static str, Table); 4] {
        [
            (files.nodes, Table::Nodes),
            (files.node_props, Table::NodeProps),
            (files.edges, Table::Edges),
            (files.edge_props, Table::EdgeProps),
        ]
    }

    fn width(self) -> usize {
        match self {
            Table::Nodes => 2,
            Table::NodeProps | Table::EdgeProps => 3,
            Table::Edges => 4,
        }
    }

    fn read_into(self, path: &Path, facts: &mut FactSet) -> FactResult<()> {
        for row in read_table(path, self.width())? {
            match self {
                Table::Nodes => {
                    let [id, kind] = take::<2>(row);
                    let kind = NodeKind::from(kind.as_str());
                    facts.nodes.push(NodeRecord { id: NodeId(id), kind });
                }
                Table::NodeProps => {
                    let [id, key, value] = take::<3>(row);
                    facts.node_props.push(PropRecord { id: NodeId(id), key, value });
                }
                Table::Edges => {
                    let [id, kind, src, dst] = take::<4>(row);
                    facts.edges.push(EdgeRecord {
                        id: EdgeId(id),
                        kind: EdgeKind::from(kind.as_str()),
                        src: NodeId(src),
                        dst: NodeId(dst),
                    });
                }
                Table::EdgeProps => {
                    let [id, key, value] = take::<3>(row);
                    facts.edge_props.push(PropRecord { id: EdgeId(id), key, value });
                }
            }
        }
        Ok(())
    }
}

fn write_table<'a, I>(path: &Path, rows: I) -> FactResult<()>
where
    I: Iterator<Item = Vec<&'a str>>,
{
    let mut body = String::new();
    for row in rows {
        let encoded: Vec<Cow<'_, str>> = row.into_iter().map(encode_field).collect();
        body.push_str(&encoded.join(","));
        body.push('\n');
    }
    fs::write(path, body).map_err(|source| FactError::Io { path: path.to_path_buf(), source })
}

fn read_table(path: &Path, width: usize) -> FactResult<Vec<Vec<String>>> {
    let body = fs::read_to_string(path)
        .map_err(|source| FactError::Io { path: path.to_path_buf(), source })?;
    let mut rows = Vec::new();
    for (idx, fields) in parse_records(&body).into_iter().enumerate() {
        if fields.len() == 1 && fields[0].trim().is_empty() {
            continue;
        }
        if fields.len() != width {
            return Err(FactError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                expected: width,
                found: fields.len(),
            });
        }
        rows.push(fields);
    }
    Ok(rows)
}

fn take<const N: usize>(row: Vec<String>) -> [String; N] {
    // read_table already checked the width.
    let mut out: [String; N] = std::array::from_fn(|_| String::new());
    for (slot, field) in out.iter_mut().zip(row) {
        *slot = field;
    }
    out
}

/// Quote a field when it contains a delimiter, a quote, or a line break.
pub(crate) fn encode_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Parse comma-separated records. A field that starts with `"` runs to the
/// matching closing quote (`""` inside it is a literal quote) and may span
/// lines; anywhere else a quote is an ordinary character. A `\r` before a
/// newline or at end of input is dropped.
pub(crate) fn parse_records(body: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }
        match ch {
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            ',' => {
                fields.push(std::mem::take(&mut current));
                at_field_start = true;
            }
            '\r' if matches!(chars.peek(), Some('\n') | None) => {}
            '\n' => {
                fields.push(std::mem::take(&mut current));
                records.push(std::mem::take(&mut fields));
                at_field_start = true;
            }
            other => {
                current.push(other);
                at_field_start = false;
            }
        }
    }
    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
        records.push(fields);
    }
    records
}
