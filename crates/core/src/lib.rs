//! reach-core
//!
//! Core library for building typed fact graphs out of linker maps and for
//! classifying whether vulnerable functions are reachable from a program entry
//! point.
//!
//! This crate defines the fact schema and its on-disk encoding, the fact store
//! used while building a graph, the linker-map parser, the inference rules that
//! derive extra edges, the in-memory fact graph, and the reachability
//! orchestrator that drives an external path-search tool.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from more than one frontend.

pub mod config;
pub mod demangle;
pub mod facts;
pub mod graph;
pub mod infer;
pub mod linkmap;
pub mod reach;
