// Copyright 2025 Cowboy AI, LLC.

//! Schema validator — the first filter: does the edge make structural sense

use std::collections::HashMap;

use super::models::SchemaCheck;
use crate::config::ValidationSchemaConfig;
use crate::edge::{RawEdge, RelationType, ResolvedEntity};

type Combo = (String, String, RelationType);

/// Stage 1: required fields, entity resolution, label-pair tables, self loops.
///
/// The relation type itself is already a closed enum, so type membership is
/// enforced before an edge can even be constructed.
pub struct SchemaValidator {
    allowed: Vec<Combo>,
    forbidden: HashMap<Combo, String>,
}

impl SchemaValidator {
    /// Build from the validation schema config
    pub fn new(config: &ValidationSchemaConfig) -> Self {
        let mut allowed = Vec::new();
        for combo in &config.allowed_combinations {
            for rel in &combo.relations {
                allowed.push((combo.head_type.clone(), combo.tail_type.clone(), *rel));
            }
        }
        let mut forbidden = HashMap::new();
        for combo in &config.forbidden_combinations {
            for rel in &combo.relations {
                forbidden.insert(
                    (combo.head_type.clone(), combo.tail_type.clone(), *rel),
                    combo.reason.clone(),
                );
            }
        }
        Self { allowed, forbidden }
    }

    /// Run the schema checks for one edge
    pub fn validate(&self, edge: &RawEdge, resolved: &[ResolvedEntity]) -> SchemaCheck {
        let mut errors = Vec::new();

        let has_required = !edge.raw_edge_id.is_empty()
            && !edge.head_entity_id.is_empty()
            && !edge.tail_entity_id.is_empty()
            && !edge.fragment_id.as_str().is_empty();
        if !has_required {
            errors.push("missing_required_fields".to_string());
        }

        let entity_map: HashMap<&str, &ResolvedEntity> = resolved
            .iter()
            .map(|e| (e.entity_id.as_str(), e))
            .collect();
        let head = entity_map.get(edge.head_entity_id.as_str());
        let tail = entity_map.get(edge.tail_entity_id.as_str());

        let mut entity_pair_valid = true;
        match (head, tail) {
            (Some(head), Some(tail)) => {
                if let (Some(head_type), Some(tail_type)) =
                    (&head.canonical_type, &tail.canonical_type)
                {
                    let combo = (head_type.clone(), tail_type.clone(), edge.relation_type);
                    if let Some(reason) = self.forbidden.get(&combo) {
                        entity_pair_valid = false;
                        errors.push(format!("forbidden_entity_pair:{reason}"));
                    } else if !self.allowed.is_empty() && !self.allowed.contains(&combo) {
                        // Not on the allowed list: tolerated, but worth noticing.
                        tracing::warn!(
                            edge = %edge.raw_edge_id,
                            head_type,
                            tail_type,
                            relation = %edge.relation_type,
                            "entity pair not in allowed combinations"
                        );
                    }
                }
            }
            _ => {
                if head.is_none() {
                    errors.push(format!("head_entity_not_found:{}", edge.head_entity_id));
                }
                if tail.is_none() {
                    errors.push(format!("tail_entity_not_found:{}", edge.tail_entity_id));
                }
                entity_pair_valid = false;
            }
        }

        let no_self_loop = edge.head_entity_id != edge.tail_entity_id;
        if !no_self_loop {
            errors.push("self_loop_detected".to_string());
        }

        let schema_valid = has_required && entity_pair_valid && no_self_loop;
        if !schema_valid {
            tracing::debug!(edge = %edge.raw_edge_id, ?errors, "schema validation failed");
        }

        SchemaCheck {
            edge_id: edge.raw_edge_id.clone(),
            schema_valid,
            errors,
            has_required_fields: has_required,
            entity_pair_valid,
            no_self_loop,
        }
    }
}
