// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Entity decoding
//!
//! Turns archive blobs into typed [`Entity`] records. The record kind comes
//! from the embedded `kind` field, never from the entry name. A bad blob is
//! reported and decoding carries on with the next one.

use tracing::debug;

use crate::archive::ArchiveEntry;
use crate::errors::FlowpackError;
use crate::model::{Entity, EntityId, NodeKind, ResourceType, WorkflowSpec};

/// A decoded record together with the entry it came from
#[derive(Debug, Clone)]
pub struct DecodedEntity {
    pub entry: String,
    pub entity: Entity,
}

/// Decode every entry, collecting one error per undecodable entry.
///
/// Entries are consumed so each blob is released as soon as it is decoded.
pub fn decode_entries(entries: Vec<ArchiveEntry>) -> (Vec<DecodedEntity>, Vec<FlowpackError>) {
    let mut decoded = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();

    for ArchiveEntry { name, data } in entries {
        match decode_entity(&name, &data) {
            Ok(entity) => {
                debug!(entry = %name, entity = %entity.id(), "Decoded entity");
                decoded.push(DecodedEntity {
                    entry: name,
                    entity,
                });
            }
            Err(e) => errors.push(e),
        }
    }

    (decoded, errors)
}

/// Decode a single blob
pub fn decode_entity(entry: &str, data: &[u8]) -> Result<Entity, FlowpackError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| FlowpackError::decode(entry, format!("not valid UTF-8: {}", e)))?;

    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Err(FlowpackError::decode(entry, "entry is empty"));
    }

    let entity: Entity = if trimmed.starts_with('{') {
        serde_json::from_str(text).map_err(|e| FlowpackError::decode(entry, e.to_string()))?
    } else {
        serde_yaml::from_str(text).map_err(|e| FlowpackError::decode(entry, e.to_string()))?
    };

    check_identifiers(&entity).map_err(|reason| FlowpackError::decode(entry, reason))?;
    Ok(entity)
}

/// Identifiers must be well-formed and agree with the kind of record or node
/// that carries them
fn check_identifiers(entity: &Entity) -> Result<(), String> {
    let id = entity.id();
    id.validate()?;
    if id.resource_type != entity.resource_type() {
        return Err(format!(
            "identifier {} is declared in a {} record",
            id,
            entity.resource_type()
        ));
    }

    match entity {
        Entity::Task(_) => Ok(()),
        Entity::Workflow(wf) => check_node_references(wf),
        Entity::LaunchPlan(lp) => expect_kind(&lp.workflow, ResourceType::Workflow, "launch plan target"),
    }
}

fn check_node_references(wf: &WorkflowSpec) -> Result<(), String> {
    for node in wf.all_nodes() {
        let (reference, expected) = match &node.kind {
            NodeKind::Task { reference } => (reference, ResourceType::Task),
            NodeKind::Workflow { reference } => (reference, ResourceType::Workflow),
            NodeKind::LaunchPlan { reference } => (reference, ResourceType::LaunchPlan),
            NodeKind::Branch { .. } | NodeKind::Start | NodeKind::End => continue,
        };
        expect_kind(reference, expected, &format!("node '{}'", node.id))?;
    }
    Ok(())
}

fn expect_kind(reference: &EntityId, expected: ResourceType, what: &str) -> Result<(), String> {
    reference.validate()?;
    if reference.resource_type != expected {
        return Err(format!(
            "{} must reference a {}, found {}",
            what, expected, reference
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK_JSON: &str = r#"{
        "kind": "task",
        "id": {"resource_type": "task", "project": "p", "domain": "d", "name": "t", "version": "1"},
        "interface": {"inputs": {}, "outputs": {}}
    }"#;

    #[test]
    fn test_decode_json_record() {
        let entity = decode_entity("t.json", TASK_JSON.as_bytes()).unwrap();
        assert_eq!(entity.resource_type(), ResourceType::Task);
    }

    #[test]
    fn test_decode_yaml_record() {
        let yaml = "kind: launch_plan\nid: {resource_type: launch_plan, project: p, domain: d, name: lp, version: '1'}\nworkflow: {resource_type: workflow, project: p, domain: d, name: wf, version: '1'}\n";
        let entity = decode_entity("lp.yaml", yaml.as_bytes()).unwrap();
        assert_eq!(entity.resource_type(), ResourceType::LaunchPlan);
        assert_eq!(entity.references().len(), 1);
    }

    #[test]
    fn test_unknown_kind_is_reported() {
        let err = decode_entity("x.json", br#"{"kind": "sensor"}"#).unwrap_err();
        match err {
            FlowpackError::Decode { entry, .. } => assert_eq!(entry, "x.json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_kind_and_identifier_must_agree() {
        let json = TASK_JSON.replace(r#""resource_type": "task""#, r#""resource_type": "workflow""#);
        let err = decode_entity("t.json", json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("declared in a task record"));
    }

    #[test]
    fn test_invalid_bytes_do_not_abort_siblings() {
        let entries = vec![
            ArchiveEntry {
                name: "bad.bin".into(),
                data: vec![0xff, 0xfe, 0x00],
            },
            ArchiveEntry {
                name: "empty.json".into(),
                data: b"   \n".to_vec(),
            },
            ArchiveEntry {
                name: "t.json".into(),
                data: TASK_JSON.as_bytes().to_vec(),
            },
        ];

        let (decoded, errors) = decode_entries(entries);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].entry, "t.json");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("UTF-8"));
        assert!(errors[1].to_string().contains("empty"));
    }

    #[test]
    fn test_node_reference_kind_checked() {
        let json = r#"{
            "kind": "workflow",
            "id": {"resource_type": "workflow", "project": "p", "domain": "d", "name": "wf", "version": "1"},
            "interface": {},
            "nodes": [{"id": "n0", "kind": {"type": "task", "reference": {"resource_type": "workflow", "project": "p", "domain": "d", "name": "x", "version": "1"}}}]
        }"#;
        let err = decode_entity("wf.json", json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("node 'n0' must reference a task"));
    }
}
