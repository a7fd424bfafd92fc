//! State document decoding: version detection, metadata extraction, and
//! provider normalization.

use crate::error::ParseError;
use crate::types::{BackendKind, RawStateDocument, StateFile, StateHealth};
#[cfg(feature = "tracing")]
use tracing::debug;

/// Only version 4 is accepted for round-trip write; version 3 parses
/// with a diagnostic noting the legacy format.
const SUPPORTED_VERSIONS: &str = "3, 4";

/// Decodes a state document's raw bytes into a [`StateFile`].
///
/// `id` and `path` identify the document for the caller (typically a
/// content hash and the backend location); they are not present in the
/// on-disk format and must be supplied by the caller.
pub fn parse(
    bytes: &[u8],
    id: impl Into<String>,
    path: impl Into<String>,
    backend_kind: BackendKind,
) -> Result<StateFile, ParseError> {
    let raw: RawStateDocument = serde_json::from_slice(bytes).map_err(|e| {
        if e.is_syntax() || e.is_eof() {
            ParseError::InvalidFraming(e.to_string())
        } else {
            ParseError::SchemaViolation(e.to_string())
        }
    })?;

    let mut diagnostics = Vec::new();
    match raw.version {
        4 => {}
        3 => diagnostics.push(
            "state document is schema version 3; only version 4 is supported for write".into(),
        ),
        other => {
            return Err(ParseError::VersionMismatch {
                found: other,
                supported: SUPPORTED_VERSIONS,
            })
        }
    }

    let mut resources = raw.resources;
    for resource in &mut resources {
        resource.provider = normalize_provider(&resource.provider, &resource.resource_type);
    }

    #[cfg(feature = "tracing")]
    debug!(
        serial = raw.serial,
        resources = resources.len(),
        "parsed state document"
    );

    Ok(StateFile {
        id: id.into(),
        path: path.into(),
        backend_kind,
        version: raw.version,
        serial: raw.serial,
        lineage: raw.lineage,
        terraform_version: raw.terraform_version,
        resources,
        outputs: raw.outputs,
        health: StateHealth { diagnostics },
    })
}

/// Normalizes a provider string exactly once, at parse time: strips a
/// registry prefix (`registry.terraform.io/hashicorp/aws` → `aws`) and
/// any version decoration, falling back to a type-prefix heuristic when
/// the field is empty or unrecognized.
pub fn normalize_provider(raw_provider: &str, resource_type: &str) -> String {
    let stripped = raw_provider
        .rsplit('/')
        .next()
        .unwrap_or(raw_provider)
        .split(semver_separator)
        .next()
        .unwrap_or(raw_provider)
        .trim_start_matches("provider[")
        .trim_end_matches(']')
        .trim_matches('"');

    if !stripped.is_empty() {
        return stripped.to_string();
    }

    provider_from_type_prefix(resource_type).to_string()
}

fn semver_separator(c: char) -> bool {
    c == ' '
}

fn provider_from_type_prefix(resource_type: &str) -> &'static str {
    if resource_type.starts_with("aws_") {
        "aws"
    } else if resource_type.starts_with("azurerm_") {
        "azure"
    } else if resource_type.starts_with("google_") {
        "gcp"
    } else if resource_type.starts_with("digitalocean_") {
        "digitalocean"
    } else {
        "unknown"
    }
}
