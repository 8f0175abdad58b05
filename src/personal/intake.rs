// Copyright 2025 Cowboy AI, LLC.

//! Personal candidate intake
//!
//! Two routes in: edges the arbiter hinted PERSONAL_CANDIDATE, and edges the
//! Domain side rejected (static conflict or conflict-analyzer demotion).

use std::collections::HashMap;

use super::models::{PersonalCandidate, RelevanceType, SourceType};
use crate::config::RelevanceMarkers;
use crate::domain::{DomainCandidate, DomainProcessResult};
use crate::edge::{Polarity, RawEdge, ResolvedEntity};
use crate::identifiers::{RelationId, UserId};
use crate::tags::{SemanticTag, ValidationDestination};
use crate::validation::ValidationResult;

/// Builds personal candidates out of residual edges
pub struct PersonalIntake {
    user_id: UserId,
    markers: RelevanceMarkers,
}

impl PersonalIntake {
    /// Build for one user partition
    pub fn new(user_id: UserId, markers: RelevanceMarkers) -> Self {
        Self { user_id, markers }
    }

    /// Route (a): the arbiter hinted Personal
    pub fn from_validation(
        &self,
        edge: &RawEdge,
        validation: &ValidationResult,
        resolved: &[ResolvedEntity],
    ) -> Option<PersonalCandidate> {
        if validation.destination != ValidationDestination::PersonalCandidate {
            return None;
        }

        let entity_map: HashMap<&str, &ResolvedEntity> = resolved
            .iter()
            .map(|e| (e.entity_id.as_str(), e))
            .collect();
        let head = entity_map.get(edge.head_entity_id.as_str());
        let tail = entity_map.get(edge.tail_entity_id.as_str());

        let polarity = validation
            .sign
            .as_ref()
            .map(|s| s.polarity_final)
            .filter(|p| *p != Polarity::Unknown)
            .unwrap_or(edge.polarity_guess);

        let candidate = PersonalCandidate {
            candidate_id: RelationId::generate("pcand").as_str().to_string(),
            raw_edge_id: edge.raw_edge_id.clone(),
            head_id: head
                .map(|e| e.graph_id().to_string())
                .unwrap_or_else(|| edge.head_entity_id.clone()),
            head_name: head
                .map(|e| e.display_name().to_string())
                .or_else(|| edge.head_name.clone())
                .unwrap_or_else(|| edge.head_entity_id.clone()),
            tail_id: tail
                .map(|e| e.graph_id().to_string())
                .unwrap_or_else(|| edge.tail_entity_id.clone()),
            tail_name: tail
                .map(|e| e.display_name().to_string())
                .or_else(|| edge.tail_name.clone())
                .unwrap_or_else(|| edge.tail_entity_id.clone()),
            relation_type: edge.relation_type,
            polarity,
            semantic_tag: validation
                .semantic
                .as_ref()
                .map(|s| s.tag)
                .unwrap_or(SemanticTag::SemAmbiguous),
            sign_tag: validation.sign.as_ref().map(|s| s.sign_tag),
            student_conf: edge.student_conf,
            combined_conf: validation.combined_conf,
            user_id: self.user_id.clone(),
            source_type: SourceType::LlmInferred,
            relevance_type: self.classify_relevance(edge.fragment_text.as_deref().unwrap_or("")),
            fragment_text: edge.fragment_text.clone(),
            rejection_reason: Some("validation_personal_candidate".to_string()),
        };

        tracing::debug!(candidate = %candidate.candidate_id, "personal candidate from validation");
        Some(candidate)
    }

    /// Route (b): the Domain side rejected the candidate
    pub fn from_domain_rejection(
        &self,
        domain_candidate: &DomainCandidate,
        domain_result: &DomainProcessResult,
    ) -> PersonalCandidate {
        let rejection_reason = if domain_result
            .static_result
            .as_ref()
            .is_some_and(|s| s.static_conflict)
        {
            "static_conflict".to_string()
        } else if let Some(conflict) = &domain_result.conflict_result {
            format!("domain_conflict:{:?}", conflict.resolution)
        } else {
            "domain_rejection".to_string()
        };

        let candidate = PersonalCandidate {
            candidate_id: RelationId::generate("pcand").as_str().to_string(),
            raw_edge_id: domain_candidate.raw_edge_id.clone(),
            head_id: domain_candidate.head_id.clone(),
            head_name: domain_candidate.head_name.clone(),
            tail_id: domain_candidate.tail_id.clone(),
            tail_name: domain_candidate.tail_name.clone(),
            relation_type: domain_candidate.relation_type,
            polarity: domain_candidate.polarity,
            semantic_tag: domain_candidate.semantic_tag,
            sign_tag: None,
            student_conf: domain_candidate.student_conf,
            combined_conf: domain_candidate.combined_conf,
            user_id: self.user_id.clone(),
            source_type: SourceType::DomainRejected,
            relevance_type: self
                .classify_relevance(domain_candidate.fragment_text.as_deref().unwrap_or("")),
            fragment_text: domain_candidate.fragment_text.clone(),
            rejection_reason: Some(rejection_reason),
        };

        tracing::info!(
            candidate = %candidate.candidate_id,
            reason = candidate.rejection_reason.as_deref().unwrap_or(""),
            "personal candidate from domain rejection"
        );
        candidate
    }

    fn classify_relevance(&self, text: &str) -> RelevanceType {
        let lower = text.to_lowercase();
        let hit = |list: &[String]| list.iter().any(|m| lower.contains(m.as_str()));

        if hit(&self.markers.emotional) {
            RelevanceType::Emotional
        } else if hit(&self.markers.hypothesis) {
            RelevanceType::Hypothesis
        } else if hit(&self.markers.opinion) {
            RelevanceType::Opinion
        } else if hit(&self.markers.observation) {
            RelevanceType::Observation
        } else {
            RelevanceType::Inference
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::FinalDestination;
    use crate::edge::RelationType;
    use crate::identifiers::FragmentId;
    use chrono::Utc;
    use test_case::test_case;

    fn intake() -> PersonalIntake {
        PersonalIntake::new(
            UserId::default_user(),
            Settings::default()
                .with_builtin_patterns()
                .static_domain
                .relevance_markers,
        )
    }

    fn edge(text: &str) -> RawEdge {
        RawEdge {
            raw_edge_id: "e1".into(),
            head_entity_id: "A".into(),
            tail_entity_id: "B".into(),
            head_name: None,
            tail_name: None,
            relation_type: RelationType::Affect,
            polarity_guess: Polarity::Positive,
            student_conf: 0.5,
            fragment_text: Some(text.into()),
            fragment_id: FragmentId::new("f1"),
        }
    }

    fn validation(destination: ValidationDestination) -> ValidationResult {
        ValidationResult {
            edge_id: "e1".into(),
            validation_passed: true,
            destination,
            combined_conf: 0.45,
            student_conf: 0.5,
            sign_score: 0.5,
            semantic_conf: 0.45,
            schema: None,
            sign: None,
            semantic: None,
            rejection_codes: vec![],
        }
    }

    fn entities() -> Vec<ResolvedEntity> {
        vec![
            ResolvedEntity::canonical("A", "Alpha"),
            ResolvedEntity::canonical("B", "Beta"),
        ]
    }

    #[test]
    fn validation_route_builds_llm_inferred_candidate() {
        let c = intake()
            .from_validation(
                &edge("the data shows A lifting B"),
                &validation(ValidationDestination::PersonalCandidate),
                &entities(),
            )
            .unwrap();
        assert_eq!(c.source_type, SourceType::LlmInferred);
        assert_eq!(c.head_name, "Alpha");
        assert_eq!(
            c.rejection_reason.as_deref(),
            Some("validation_personal_candidate")
        );
    }

    #[test]
    fn domain_hint_is_not_picked_up() {
        assert!(intake()
            .from_validation(
                &edge("text"),
                &validation(ValidationDestination::DomainCandidate),
                &entities(),
            )
            .is_none());
    }

    #[test_case("i am worried about rates" => RelevanceType::Emotional)]
    #[test_case("rates might climb further" => RelevanceType::Hypothesis)]
    #[test_case("in my opinion this holds" => RelevanceType::Opinion)]
    #[test_case("the data shows a steady climb" => RelevanceType::Observation)]
    #[test_case("rates climbed last quarter" => RelevanceType::Inference)]
    fn relevance_classification(text: &str) -> RelevanceType {
        intake().classify_relevance(text)
    }

    #[test]
    fn domain_rejection_route_tags_static_conflict() {
        let candidate = DomainCandidate {
            candidate_id: "c1".into(),
            raw_edge_id: "e1".into(),
            head_id: "A".into(),
            head_name: "A".into(),
            tail_id: "B".into(),
            tail_name: "B".into(),
            relation_type: RelationType::Affect,
            polarity: Polarity::Positive,
            semantic_tag: SemanticTag::SemConfident,
            combined_conf: 0.9,
            student_conf: 0.9,
            timestamp: Utc::now(),
            freq_count: 1,
            evidence_source: "student".into(),
            fragment_text: Some("rates will rise".into()),
        };
        let result = DomainProcessResult {
            candidate_id: Some("c1".into()),
            raw_edge_id: "e1".into(),
            final_destination: FinalDestination::Personal,
            candidate: Some(candidate.clone()),
            static_result: Some(crate::domain::StaticGuardResult {
                candidate_id: "c1".into(),
                static_pass: false,
                static_conflict: true,
                action: crate::domain::DomainAction::RejectToPersonal,
                rule_id: Some("SR-001".into()),
                expected_polarity: Some(Polarity::Negative),
                actual_polarity: Polarity::Positive,
                reason: None,
            }),
            dynamic_result: None,
            conflict_result: None,
            drift_result: None,
            domain_relation_id: None,
        };

        let c = intake().from_domain_rejection(&candidate, &result);
        assert_eq!(c.source_type, SourceType::DomainRejected);
        assert_eq!(c.rejection_reason.as_deref(), Some("static_conflict"));
        assert_eq!(c.polarity, Polarity::Positive);
    }
}
