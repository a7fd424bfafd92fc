//! State document parsing and drift analysis.
//!
//! [`parser::parse`] decodes a state document's bytes into a typed
//! [`types::StateFile`]; [`analyzer::analyze`] compares that document
//! against live inventory and produces a [`types::Perspective`] — the
//! managed/out-of-band split, configuration drift, and dependency graph
//! a caller needs to reason about infrastructure drift.
//!
//! ## Feature Flags
//! - `tracing`: enables debug-level logging of parse results via the
//!   `tracing` crate

pub mod analyzer;
pub mod error;
pub mod parser;
pub mod types;

pub use analyzer::analyze;
pub use error::ParseError;
pub use parser::{normalize_provider, parse};
pub use types::{
    AdoptionPriority, BackendKind, Conflict, ConflictKind, ConflictSeverity, Graph, GraphEdge,
    GraphNode, ManagedEntry, ManagedStatus, OutOfBandEntry, Perspective, Resource,
    ResourceIdentity, StateFile, StateResource, Statistics,
};
