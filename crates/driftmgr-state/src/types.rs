//! The typed document model: a live [`Resource`], a declared [`StateFile`],
//! and the [`Perspective`] an analyzer produces from the two.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An opaque attribute value, preserved verbatim for round-tripping but
/// comparable structurally during drift detection.
pub type AttributeValue = serde_json::Value;

/// A single cloud object observed by discovery.
///
/// Identity is `(provider, region, account, type, id)`; resources are
/// immutable snapshots, so an update is a full replace, never a partial
/// mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub provider: String,
    pub region: String,
    pub account: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    pub state: String,
    pub created: u64,
    pub updated: u64,
}

/// Identity tuple used for dedup and matching between declared and live
/// resources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceIdentity {
    pub provider: String,
    pub region: String,
    pub account: String,
    pub resource_type: String,
    pub id: String,
}

impl Resource {
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            provider: self.provider.clone(),
            region: self.region.clone(),
            account: self.account.clone(),
            resource_type: self.resource_type.clone(),
            id: self.id.clone(),
        }
    }
}

/// Managed/data mode of a declared resource block, per the on-disk schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    Managed,
    Data,
}

/// One declared instance of a [`StateResource`] (the `count`/`for_each`
/// expansion unit).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Instance {
    #[serde(default, rename = "schema_version")]
    pub schema_version: u64,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<String>,
}

/// A declared resource block inside a state document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateResource {
    #[serde(default)]
    pub module: Vec<String>,
    pub mode: ResourceMode,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

impl StateResource {
    /// `[<module-path>.]<type>.<name>` — the first instance has no index
    /// suffix; later instances append `[n]`.
    pub fn address(&self, instance_index: usize) -> String {
        let mut parts = self.module.clone();
        parts.push(format!("{}.{}", self.resource_type, self.name));
        let base = parts.join(".");
        if instance_index == 0 {
            base
        } else {
            format!("{base}[{instance_index}]")
        }
    }
}

/// A fully parsed state document: the typed resource/module graph plus
/// the document-level metadata carried alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct StateFile {
    pub id: String,
    pub path: String,
    pub backend_kind: BackendKind,
    pub version: u64,
    pub serial: u64,
    pub lineage: String,
    pub terraform_version: String,
    pub resources: Vec<StateResource>,
    pub outputs: BTreeMap<String, AttributeValue>,
    pub health: StateHealth,
}

impl StateFile {
    /// Serializes back to the on-disk version-4 schema. `id`, `path`,
    /// `backend_kind`, and `health` are caller-side bookkeeping absent
    /// from the wire format, so `parse(serialize(s), s.id, s.path,
    /// s.backend_kind)` round-trips everything else.
    pub fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&RawStateDocument {
            version: 4,
            terraform_version: self.terraform_version.clone(),
            serial: self.serial,
            lineage: self.lineage.clone(),
            outputs: self.outputs.clone(),
            resources: self.resources.clone(),
        })
    }
}

/// Where the state document is persisted; carried for informational
/// purposes only — parsing treats all backends identically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    S3,
    Azurerm,
    Gcs,
    Remote,
}

/// Diagnostics produced while parsing, distinct from a hard parse error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateHealth {
    pub diagnostics: Vec<String>,
}

/// The on-disk JSON shape (schema version 3 or 4). Kept distinct from
/// [`StateFile`] so the parser can validate and normalize before handing
/// out the typed graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStateDocument {
    pub version: u64,
    #[serde(default)]
    pub terraform_version: String,
    #[serde(default)]
    pub serial: u64,
    #[serde(default)]
    pub lineage: String,
    #[serde(default)]
    pub outputs: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub resources: Vec<StateResource>,
}

/// Classification of each managed entry after comparison against live
/// inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedStatus {
    Exists,
    Missing,
}

/// One declared resource mapped onto (or not onto) a live counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedEntry {
    pub address: String,
    pub identity: ResourceIdentity,
    pub status: ManagedStatus,
    pub live: Option<Resource>,
}

/// A live resource with no declared counterpart in the state.
#[derive(Debug, Clone, PartialEq)]
pub struct OutOfBandEntry {
    pub resource: Resource,
    pub adoption_priority: AdoptionPriority,
    pub suggested_import: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdoptionPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSeverity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConflictKind {
    Missing,
    Configuration { attribute: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub address: String,
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
}

/// Dependency graph node per managed resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphNode {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statistics {
    pub total_managed: usize,
    pub total_out_of_band: usize,
    pub by_provider: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    /// `managed / (managed + outOfBand)`.
    pub coverage: f64,
    /// `drifted / managed`.
    pub drift: f64,
}

/// The result of analyzing a [`StateFile`] against live inventory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Perspective {
    pub managed: Vec<ManagedEntry>,
    pub out_of_band: Vec<OutOfBandEntry>,
    pub conflicts: Vec<Conflict>,
    pub graph: Graph,
    pub statistics: Statistics,
}
