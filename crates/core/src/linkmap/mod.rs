//! Linker-map fact extraction.
//!
//! `lines` classifies individual lines; `parser` threads the per-pass state
//! and feeds a [`crate::facts::FactStore`].

pub mod lines;
pub mod parser;

pub use parser::{LinkMapParser, ParseSummary};
