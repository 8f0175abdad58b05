// Copyright 2025 Cowboy AI, LLC.

//! Domain candidate intake
//!
//! Normalises a validated edge for Domain evaluation. Fragments that read as
//! personal opinion, or are too short to mean anything, never become Domain
//! candidates.

use chrono::Utc;
use std::collections::HashMap;

use super::models::DomainCandidate;
use crate::edge::{Polarity, RawEdge, ResolvedEntity};
use crate::identifiers::RelationId;
use crate::tags::{SemanticTag, ValidationDestination};
use crate::validation::ValidationResult;

const MIN_FRAGMENT_LEN: usize = 10;

/// Intake filter and normaliser for Domain candidates
pub struct DomainIntake {
    opinion_markers: Vec<String>,
}

impl DomainIntake {
    /// Build with the configured opinion markers
    pub fn new(opinion_markers: Vec<String>) -> Self {
        Self { opinion_markers }
    }

    /// Turn a validated edge into a Domain candidate, or None when the edge
    /// is not Domain material
    pub fn process(
        &self,
        edge: &RawEdge,
        validation: &ValidationResult,
        resolved: &[ResolvedEntity],
    ) -> Option<DomainCandidate> {
        if validation.destination != ValidationDestination::DomainCandidate {
            return None;
        }

        let entity_map: HashMap<&str, &ResolvedEntity> = resolved
            .iter()
            .map(|e| (e.entity_id.as_str(), e))
            .collect();
        let head = entity_map.get(edge.head_entity_id.as_str())?;
        let tail = entity_map.get(edge.tail_entity_id.as_str())?;

        if !self.is_domain_relevant(edge) {
            tracing::info!(edge = %edge.raw_edge_id, "fragment not domain relevant");
            return None;
        }

        // Polarity precedence: sign-stage verdict (which already folds in the
        // static oracle), then the student's guess.
        let polarity = validation
            .sign
            .as_ref()
            .map(|s| s.polarity_final)
            .filter(|p| *p != Polarity::Unknown)
            .unwrap_or(edge.polarity_guess);

        let semantic_tag = validation
            .semantic
            .as_ref()
            .map(|s| s.tag)
            .unwrap_or(SemanticTag::SemAmbiguous);

        let candidate = DomainCandidate {
            candidate_id: RelationId::generate("dcand").as_str().to_string(),
            raw_edge_id: edge.raw_edge_id.clone(),
            head_id: head.graph_id().to_string(),
            head_name: head.display_name().to_string(),
            tail_id: tail.graph_id().to_string(),
            tail_name: tail.display_name().to_string(),
            relation_type: edge.relation_type,
            polarity,
            semantic_tag,
            combined_conf: validation.combined_conf,
            student_conf: edge.student_conf,
            timestamp: Utc::now(),
            freq_count: 1,
            evidence_source: "student".to_string(),
            fragment_text: edge.fragment_text.clone(),
        };

        tracing::debug!(candidate = %candidate.candidate_id, "domain candidate created");
        Some(candidate)
    }

    fn is_domain_relevant(&self, edge: &RawEdge) -> bool {
        let text = edge.fragment_text.as_deref().unwrap_or("");
        if text.len() < MIN_FRAGMENT_LEN {
            return false;
        }
        let lower = text.to_lowercase();
        !self.opinion_markers.iter().any(|m| lower.contains(m.as_str()))
    }
}
