//! Line shapes recognised in a linker map.
//!
//! Each matcher looks at one line in isolation and returns borrowed slices of
//! it; numeric fields keep their source text (`0x1a` stays `0x1a`).

use once_cell::sync::Lazy;
use regex::Regex;

const HEX: &str = r"(?:0x)?[0-9A-Fa-f]+";

/// Four numeric columns (VMA, LMA, size, decimal alignment) and a remainder.
static FOUR_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\s*({HEX})\s+({HEX})\s+({HEX})\s+(\d+)\s+(.*)$"))
        .expect("Invalid four-column regex")
});

/// One address followed by a bare symbol name.
static ADDRESS_SYMBOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\s*({HEX})\s+(\S+)\s*$")).expect("Invalid address/symbol regex")
});

/// Dot-prefixed section name, address, size and a remainder.
static SECTION_ADDRESS_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\s*(\.\S+)\s+({HEX})\s+({HEX})\s+(.*)$"))
        .expect("Invalid section/address/size regex")
});

static LOAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*LOAD\s+(\S+)\s*$").expect("Invalid LOAD regex"));

static MEMORY_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\S+)\s+(0x[0-9A-Fa-f]+)\s+((?:0x)?[0-9A-Fa-f]+|\d+)(?:\s+(\S+))?\s*$")
        .expect("Invalid memory region regex")
});

static MERGE_PROPERTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Removed property (\S+) to merge (\S+)\s+\(([^)]+)\)\s+and\s+(\S+)\s+\(([^)]+)\)")
        .expect("Invalid merge property regex")
});

static ARCHIVE_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<archive>\S+)\s+(?P<reference>\S+)\s+\((?P<symbol>[^)]+)\)$")
        .expect("Invalid archive member regex")
});

static DISCARDED_DETAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\s*({HEX})\s+({HEX})\s+(.*)$")).expect("Invalid discarded detail regex")
});

/// Banner lines that delimit map sections and never carry placement data.
pub const BANNERS: &[&str] = &[
    "Memory Configuration",
    "Linker script and memory map",
    "Discarded input sections",
    "Merging program properties",
    "Archive member included to satisfy reference",
];

pub fn is_banner(line: &str) -> bool {
    BANNERS.iter().any(|banner| line.contains(banner))
}

/// A line from the placement part of the map.
///
/// At most one token fills each of `section`, `in_object` and `symbol`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementLine<'a> {
    pub vma: &'a str,
    pub lma: Option<&'a str>,
    pub size: Option<&'a str>,
    pub align: Option<&'a str>,
    pub section: Option<&'a str>,
    pub in_object: Option<&'a str>,
    pub symbol: Option<&'a str>,
}

impl PlacementLine<'_> {
    /// The four numeric properties, absent ones as empty text.
    pub fn numeric_props(&self) -> [(&'static str, &str); 4] {
        [
            ("VMA", self.vma),
            ("LMA", self.lma.unwrap_or("")),
            ("Size", self.size.unwrap_or("")),
            ("Align", self.align.unwrap_or("")),
        ]
    }
}

type PlacementMatcher = for<'a> fn(&'a str) -> Option<PlacementLine<'a>>;

/// Placement shapes in priority order.
const PLACEMENT_MATCHERS: [PlacementMatcher; 3] =
    [match_four_column, match_address_symbol, match_section_address_size];

/// Classify one placement line, trying each shape in priority order.
///
/// Returns `None` for blank lines and lines matching no shape.
pub fn parse_placement_line(line: &str) -> Option<PlacementLine<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    PLACEMENT_MATCHERS.iter().find_map(|matcher| matcher(line))
}

/// Split on runs of whitespace into at most `max` pieces; the last piece keeps
/// any remaining text, inner whitespace included.
fn split_whitespace_max(text: &str, max: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if parts.len() + 1 == max {
            parts.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(rest);
                break;
            }
        }
    }
    parts
}

fn looks_like_in_object(token: &str) -> bool {
    token.contains(':') && token.contains('(') && token.contains(')')
}

fn match_four_column(line: &str) -> Option<PlacementLine<'_>> {
    let caps = FOUR_COLUMN.captures(line)?;
    let field = |idx: usize| caps.get(idx).map(|m| m.as_str());

    let mut parsed = PlacementLine {
        vma: field(1)?,
        lma: field(2),
        size: field(3),
        align: field(4),
        ..PlacementLine::default()
    };
    let remainder = field(5).unwrap_or("");
    for token in split_whitespace_max(remainder, 3) {
        if token.starts_with('.') {
            parsed.section = Some(token);
        } else if looks_like_in_object(token) {
            parsed.in_object = Some(token);
        } else {
            parsed.symbol = Some(token);
        }
    }
    Some(parsed)
}

fn match_address_symbol(line: &str) -> Option<PlacementLine<'_>> {
    let caps = ADDRESS_SYMBOL.captures(line)?;
    Some(PlacementLine {
        vma: caps.get(1)?.as_str(),
        symbol: Some(caps.get(2)?.as_str()),
        ..PlacementLine::default()
    })
}

fn match_section_address_size(line: &str) -> Option<PlacementLine<'_>> {
    let caps = SECTION_ADDRESS_SIZE.captures(line)?;
    let remainder = caps.get(4).map(|m| m.as_str()).unwrap_or("");
    Some(PlacementLine {
        vma: caps.get(2)?.as_str(),
        size: Some(caps.get(3)?.as_str()),
        section: Some(caps.get(1)?.as_str()),
        in_object: remainder.split_whitespace().next(),
        ..PlacementLine::default()
    })
}

/// `LOAD <path>`.
pub fn match_load(line: &str) -> Option<&str> {
    LOAD.captures(line).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegionLine<'a> {
    pub name: &'a str,
    pub origin: &'a str,
    pub length: &'a str,
    pub attributes: Option<&'a str>,
}

pub fn match_memory_region(line: &str) -> Option<MemoryRegionLine<'_>> {
    let caps = MEMORY_REGION.captures(line)?;
    Some(MemoryRegionLine {
        name: caps.get(1)?.as_str(),
        origin: caps.get(2)?.as_str(),
        length: caps.get(3)?.as_str(),
        attributes: caps.get(4).map(|m| m.as_str()),
    })
}

/// `Removed property <code> to merge <file1> (<value1>) and <file2> (<value2>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeLine<'a> {
    pub property_code: &'a str,
    pub file1: &'a str,
    pub value1: &'a str,
    pub file2: &'a str,
    pub value2: &'a str,
}

pub fn match_merge(line: &str) -> Option<MergeLine<'_>> {
    let caps = MERGE_PROPERTY.captures(line)?;
    Some(MergeLine {
        property_code: caps.get(1)?.as_str(),
        file1: caps.get(2)?.as_str(),
        value1: caps.get(3)?.as_str(),
        file2: caps.get(4)?.as_str(),
        value2: caps.get(5)?.as_str(),
    })
}

/// `<archive> <reference> (<symbol>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLine<'a> {
    pub archive: &'a str,
    pub reference: &'a str,
    pub symbol: &'a str,
}

pub fn match_archive_member(line: &str) -> Option<ArchiveLine<'_>> {
    let caps = ARCHIVE_MEMBER.captures(line)?;
    Some(ArchiveLine {
        archive: caps.name("archive")?.as_str(),
        reference: caps.name("reference")?.as_str(),
        symbol: caps.name("symbol")?.as_str(),
    })
}

/// Detail line following a discarded section name: address, size, file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardedDetail<'a> {
    pub vma: &'a str,
    pub size: &'a str,
    pub file: &'a str,
}

pub fn match_discarded_detail(line: &str) -> Option<DiscardedDetail<'_>> {
    let caps = DISCARDED_DETAIL.captures(line)?;
    Some(DiscardedDetail {
        vma: caps.get(1)?.as_str(),
        size: caps.get(2)?.as_str(),
        file: caps.get(3)?.as_str().trim_end(),
    })
}
