//! Computes a [`Perspective`]: managed vs. out-of-band resources,
//! configuration drift, the dependency graph, and summary statistics.
//!
//! Pure and deterministic — no I/O, no mutation of its inputs. Equal
//! inputs always produce an equal `Perspective` (modulo iteration order,
//! canonicalized here by sorting every output list by address/id).

use crate::types::{
    AdoptionPriority, AttributeValue, Conflict, ConflictKind, ConflictSeverity, Graph, GraphEdge,
    GraphNode, ManagedEntry, ManagedStatus, OutOfBandEntry, Perspective, Resource,
    ResourceIdentity, StateFile, StateResource, Statistics,
};
use std::collections::{BTreeMap, HashMap, HashSet};

const SECURITY_ATTRS: &[&str] = &[
    "security_group",
    "encryption",
    "public",
    "password",
    "key",
    "secret",
    "token",
];
const NETWORK_ATTRS: &[&str] = &["subnet", "vpc", "cidr", "ip", "port", "protocol"];
const SIZING_ATTRS: &[&str] = &[
    "size",
    "count",
    "capacity",
    "instance_type",
    "memory",
    "cpu",
];
const CRITICAL_TYPE_KEYWORDS: &[&str] = &[
    "vpc",
    "subnet",
    "security_group",
    "iam",
    "database",
    "load_balancer",
];
const COMPUTE_STORAGE_KEYWORDS: &[&str] = &["instance", "bucket", "volume", "disk", "storage"];

/// Computes the [`Perspective`] of `state` against `live` inventory.
pub fn analyze(state: &StateFile, live: &[Resource]) -> Perspective {
    let (managed, resource_identities) = index_managed(state);
    let live_by_identity: HashMap<ResourceIdentity, &Resource> =
        live.iter().map(|r| (r.identity(), r)).collect();

    let mut managed_entries = Vec::with_capacity(managed.len());
    let mut conflicts = Vec::new();

    for (address, identity, attributes) in &managed {
        match live_by_identity.get(identity) {
            Some(live_resource) => {
                managed_entries.push(ManagedEntry {
                    address: address.clone(),
                    identity: identity.clone(),
                    status: ManagedStatus::Exists,
                    live: Some((*live_resource).clone()),
                });
                conflicts.extend(configuration_drift(address, attributes, live_resource));
            }
            None => {
                managed_entries.push(ManagedEntry {
                    address: address.clone(),
                    identity: identity.clone(),
                    status: ManagedStatus::Missing,
                    live: None,
                });
                conflicts.push(Conflict {
                    address: address.clone(),
                    kind: ConflictKind::Missing,
                    severity: ConflictSeverity::High,
                });
            }
        }
    }

    let out_of_band: Vec<OutOfBandEntry> = live
        .iter()
        .filter(|r| !resource_identities.contains(&r.identity()))
        .map(out_of_band_entry)
        .collect();

    let graph = build_graph(state, &managed);

    managed_entries.sort_by(|a, b| a.address.cmp(&b.address));
    conflicts.sort_by(|a, b| a.address.cmp(&b.address));
    let mut out_of_band = out_of_band;
    out_of_band.sort_by(|a, b| a.resource.id.cmp(&b.resource.id));

    let statistics = compute_statistics(&managed_entries, &out_of_band, &conflicts, state);

    Perspective {
        managed: managed_entries,
        out_of_band,
        conflicts,
        graph,
        statistics,
    }
}

type IndexedManaged = (String, ResourceIdentity, BTreeMap<String, AttributeValue>);

/// Step 1: maps each declared instance to its address and identity tuple.
/// The first instance is taken when a resource has no explicit index
/// carried in its attributes.
fn index_managed(state: &StateFile) -> (Vec<IndexedManaged>, HashSet<ResourceIdentity>) {
    let mut managed = Vec::new();
    let mut identities = HashSet::new();

    for resource in &state.resources {
        for (i, instance) in resource.instances.iter().enumerate() {
            let address = resource.address(i);
            let identity = instance_identity(resource, instance);
            identities.insert(identity.clone());
            managed.push((address, identity, instance.attributes.clone()));
        }
    }

    (managed, identities)
}

fn instance_identity(
    resource: &StateResource,
    instance: &crate::types::Instance,
) -> ResourceIdentity {
    ResourceIdentity {
        provider: resource.provider.clone(),
        region: attr_str(&instance.attributes, "region").unwrap_or_default(),
        account: attr_str(&instance.attributes, "account_id")
            .or_else(|| attr_str(&instance.attributes, "account"))
            .unwrap_or_default(),
        resource_type: resource.resource_type.clone(),
        id: attr_str(&instance.attributes, "id").unwrap_or_default(),
    }
}

fn attr_str(attributes: &BTreeMap<String, AttributeValue>, key: &str) -> Option<String> {
    attributes.get(key).and_then(|v| match v {
        AttributeValue::String(s) => Some(s.clone()),
        AttributeValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Step 4: attribute-by-attribute string-normalized comparison.
fn configuration_drift(
    address: &str,
    declared: &BTreeMap<String, AttributeValue>,
    live: &Resource,
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (key, declared_value) in declared {
        if let Some(live_value) = live.attributes.get(key) {
            if !values_equal_normalized(declared_value, live_value) {
                conflicts.push(Conflict {
                    address: address.to_string(),
                    kind: ConflictKind::Configuration {
                        attribute: key.clone(),
                    },
                    severity: attribute_severity(key),
                });
            }
        }
    }
    conflicts
}

fn values_equal_normalized(a: &AttributeValue, b: &AttributeValue) -> bool {
    normalize_for_compare(a) == normalize_for_compare(b)
}

fn normalize_for_compare(value: &AttributeValue) -> String {
    match value {
        AttributeValue::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn attribute_severity(attribute: &str) -> ConflictSeverity {
    let lower = attribute.to_lowercase();
    if SECURITY_ATTRS.iter().any(|k| lower.contains(k)) {
        ConflictSeverity::Critical
    } else if NETWORK_ATTRS.iter().any(|k| lower.contains(k)) {
        ConflictSeverity::High
    } else if SIZING_ATTRS.iter().any(|k| lower.contains(k)) {
        ConflictSeverity::Medium
    } else {
        ConflictSeverity::Low
    }
}

/// Step 6: adoption priority and suggested import address for out-of-band
/// resources.
fn out_of_band_entry(resource: &Resource) -> OutOfBandEntry {
    let lower_type = resource.resource_type.to_lowercase();
    let adoption_priority = if CRITICAL_TYPE_KEYWORDS.iter().any(|k| lower_type.contains(k)) {
        AdoptionPriority::High
    } else if COMPUTE_STORAGE_KEYWORDS.iter().any(|k| lower_type.contains(k)) {
        AdoptionPriority::Medium
    } else {
        AdoptionPriority::Low
    };

    let sanitized_name = sanitize_name(&resource.id);
    let suggested_import = format!("{}.{} {}", resource.resource_type, sanitized_name, resource.id);

    OutOfBandEntry {
        resource: resource.clone(),
        adoption_priority,
        suggested_import,
    }
}

fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Step 5: a node per managed resource; an edge per explicit dependency
/// and per detected `<type>.<name>` reference inside an attribute value.
/// Cycles are detected with DFS over a recursion stack; on discovery the
/// back-edge is dropped and a diagnostic conflict is not raised (the
/// graph is best-effort, not an invariant surface) — it is simply
/// excluded from the edge list.
fn build_graph(state: &StateFile, managed: &[IndexedManaged]) -> Graph {
    let addresses: HashSet<&str> = managed.iter().map(|(a, _, _)| a.as_str()).collect();
    let mut nodes: Vec<GraphNode> = managed
        .iter()
        .map(|(address, _, _)| GraphNode {
            address: address.clone(),
        })
        .collect();
    nodes.sort_by(|a, b| a.address.cmp(&b.address));

    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for resource in &state.resources {
        for (i, instance) in resource.instances.iter().enumerate() {
            let from = resource.address(i);
            let mut targets: Vec<String> = instance
                .dependencies
                .iter()
                .filter(|dep| addresses.contains(dep.as_str()))
                .cloned()
                .collect();

            for value in instance.attributes.values() {
                if let AttributeValue::String(s) = value {
                    for candidate in &nodes {
                        if candidate.address != from
                            && s.contains(&candidate.address)
                            && !targets.contains(&candidate.address)
                        {
                            targets.push(candidate.address.clone());
                        }
                    }
                }
            }

            adjacency.entry(from).or_default().extend(targets);
        }
    }

    let edges = acyclic_edges(&nodes, &adjacency);

    Graph { nodes, edges }
}

/// DFS with an explicit recursion stack; an edge that would close a cycle
/// is dropped rather than followed.
fn acyclic_edges(
    nodes: &[GraphNode],
    adjacency: &HashMap<String, Vec<String>>,
) -> Vec<GraphEdge> {
    let mut edges = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut on_stack: HashSet<String> = HashSet::new();

    fn visit(
        node: &str,
        adjacency: &HashMap<String, Vec<String>>,
        visited: &mut HashSet<String>,
        on_stack: &mut HashSet<String>,
        edges: &mut Vec<GraphEdge>,
    ) {
        if visited.contains(node) {
            return;
        }
        visited.insert(node.to_string());
        on_stack.insert(node.to_string());

        if let Some(targets) = adjacency.get(node) {
            for target in targets {
                if on_stack.contains(target) {
                    continue;
                }
                edges.push(GraphEdge {
                    from: node.to_string(),
                    to: target.clone(),
                });
                visit(target, adjacency, visited, on_stack, edges);
            }
        }
        on_stack.remove(node);
    }

    for node in nodes {
        visit(&node.address, adjacency, &mut visited, &mut on_stack, &mut edges);
    }

    edges.sort_by_key(|e| (e.from.clone(), e.to.clone()));
    edges
}

fn compute_statistics(
    managed: &[ManagedEntry],
    out_of_band: &[OutOfBandEntry],
    conflicts: &[Conflict],
    state: &StateFile,
) -> Statistics {
    let mut by_provider = BTreeMap::new();
    let mut by_type = BTreeMap::new();
    let mut by_module = BTreeMap::new();

    for resource in &state.resources {
        *by_provider.entry(resource.provider.clone()).or_insert(0) += resource.instances.len();
        *by_type.entry(resource.resource_type.clone()).or_insert(0) += resource.instances.len();
        let module = if resource.module.is_empty() {
            "root".to_string()
        } else {
            resource.module.join(".")
        };
        *by_module.entry(module).or_insert(0) += resource.instances.len();
    }

    let total_managed = managed.len();
    let total_out_of_band = out_of_band.len();
    let drifted = conflicts
        .iter()
        .filter(|c| matches!(c.kind, ConflictKind::Configuration { .. }))
        .map(|c| c.address.clone())
        .collect::<HashSet<_>>()
        .len();

    let coverage = if total_managed + total_out_of_band == 0 {
        1.0
    } else {
        total_managed as f64 / (total_managed + total_out_of_band) as f64
    };
    let drift = if total_managed == 0 {
        0.0
    } else {
        drifted as f64 / total_managed as f64
    };

    Statistics {
        total_managed,
        total_out_of_band,
        by_provider,
        by_type,
        by_module,
        coverage,
        drift,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendKind, Instance, ResourceMode, StateHealth};
    use serde_json::json;

    fn resource(id: &str, instance_type: &str) -> Resource {
        Resource {
            id: id.to_string(),
            resource_type: "aws_instance".to_string(),
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            account: "acct-1".to_string(),
            tags: Default::default(),
            attributes: BTreeMap::from([("instance_type".to_string(), json!(instance_type))]),
            state: "running".to_string(),
            created: 0,
            updated: 0,
        }
    }

    fn state_with(instance_type: &str, id: &str) -> StateFile {
        StateFile {
            id: "s1".to_string(),
            path: "terraform.tfstate".to_string(),
            backend_kind: BackendKind::Local,
            version: 4,
            serial: 1,
            lineage: "abc".to_string(),
            terraform_version: "1.7.0".to_string(),
            resources: vec![StateResource {
                module: vec![],
                mode: ResourceMode::Managed,
                resource_type: "aws_instance".to_string(),
                name: "web".to_string(),
                provider: "aws".to_string(),
                instances: vec![Instance {
                    schema_version: 1,
                    attributes: BTreeMap::from([
                        ("id".to_string(), json!(id)),
                        ("region".to_string(), json!("us-east-1")),
                        ("account_id".to_string(), json!("acct-1")),
                        ("instance_type".to_string(), json!(instance_type)),
                    ]),
                    dependencies: vec![],
                    private: None,
                }],
            }],
            outputs: Default::default(),
            health: StateHealth::default(),
        }
    }

    #[test]
    fn clean_state_has_no_conflicts() {
        let state = state_with("t3.small", "i-1");
        let live = vec![resource("i-1", "t3.small")];
        let perspective = analyze(&state, &live);

        assert_eq!(perspective.managed.len(), 1);
        assert_eq!(perspective.managed[0].status, ManagedStatus::Exists);
        assert!(perspective.out_of_band.is_empty());
        assert!(perspective.conflicts.is_empty());
        assert_eq!(perspective.statistics.coverage, 1.0);
        assert_eq!(perspective.statistics.drift, 0.0);
    }

    #[test]
    fn configuration_drift_is_classified_by_attribute_category() {
        let state = state_with("t3.small", "i-1");
        let live = vec![resource("i-1", "t3.large")];
        let perspective = analyze(&state, &live);

        assert_eq!(perspective.conflicts.len(), 1);
        assert!(matches!(
            &perspective.conflicts[0].kind,
            ConflictKind::Configuration { attribute } if attribute == "instance_type"
        ));
        assert_eq!(perspective.conflicts[0].severity, ConflictSeverity::Medium);
        assert_eq!(perspective.statistics.drift, 1.0);
    }

    #[test]
    fn out_of_band_resource_gets_adoption_priority_and_suggested_import() {
        let state = StateFile {
            resources: vec![],
            ..state_with("t3.small", "i-1")
        };
        let live = vec![Resource {
            resource_type: "aws_s3_bucket".to_string(),
            ..resource("b-1", "n/a")
        }];
        let perspective = analyze(&state, &live);

        assert!(perspective.managed.is_empty());
        assert_eq!(perspective.out_of_band.len(), 1);
        assert_eq!(
            perspective.out_of_band[0].adoption_priority,
            AdoptionPriority::Medium
        );
        assert_eq!(perspective.out_of_band[0].suggested_import, "aws_s3_bucket.b_1 b-1");
    }

    #[test]
    fn missing_live_resource_is_a_high_severity_conflict() {
        let state = state_with("t3.small", "i-1");
        let perspective = analyze(&state, &[]);

        assert_eq!(perspective.managed[0].status, ManagedStatus::Missing);
        assert_eq!(perspective.conflicts.len(), 1);
        assert!(matches!(perspective.conflicts[0].kind, ConflictKind::Missing));
        assert_eq!(perspective.conflicts[0].severity, ConflictSeverity::High);
    }

    #[test]
    fn managed_and_out_of_band_are_disjoint_by_identity() {
        let state = state_with("t3.small", "i-1");
        let live = vec![resource("i-1", "t3.small"), resource("i-2", "t3.small")];
        let perspective = analyze(&state, &live);

        assert_eq!(perspective.managed.len(), 1);
        assert_eq!(perspective.out_of_band.len(), 1);
        assert_eq!(perspective.out_of_band[0].resource.id, "i-2");
    }

    #[test]
    fn cyclic_dependencies_drop_the_closing_back_edge() {
        let mut state = state_with("t3.small", "i-1");
        state.resources.push(StateResource {
            module: vec![],
            mode: ResourceMode::Managed,
            resource_type: "aws_instance".to_string(),
            name: "db".to_string(),
            provider: "aws".to_string(),
            instances: vec![Instance {
                schema_version: 1,
                attributes: BTreeMap::from([
                    ("id".to_string(), json!("i-2")),
                    ("region".to_string(), json!("us-east-1")),
                    ("account_id".to_string(), json!("acct-1")),
                ]),
                dependencies: vec!["aws_instance.web".to_string()],
                private: None,
            }],
        });
        state.resources[0].instances[0].dependencies = vec!["aws_instance.db".to_string()];

        let perspective = analyze(&state, &[]);
        assert!(perspective.graph.edges.len() <= 1);
    }
}
