// Copyright 2025 Cowboy AI, LLC.

//! Confidence filter — the final admission decision
//!
//! Admission requires all of:
//!   A. schema valid
//!   B. sign tag ∈ {confident, ambiguous}
//!   C. semantic tag ∈ {sem_confident, sem_weak, sem_ambiguous}
//!   D. combined confidence ≥ personal threshold
//! Admitted edges at or above the domain threshold become Domain candidates;
//! the rest become Personal candidates.

use super::models::{SchemaCheck, SemanticCheck, SignCheck, ValidationResult};
use crate::config::{ConfidenceThresholds, ConfidenceWeights};
use crate::edge::RawEdge;
use crate::tags::ValidationDestination;

/// Stage 4: weighted combination and destination routing
pub struct ConfidenceFilter {
    thresholds: ConfidenceThresholds,
    weights: ConfidenceWeights,
}

impl ConfidenceFilter {
    /// Build from configured thresholds and weights
    pub fn new(thresholds: ConfidenceThresholds, weights: ConfidenceWeights) -> Self {
        Self {
            thresholds,
            weights,
        }
    }

    /// Produce the final verdict for one edge
    pub fn filter(
        &self,
        edge: &RawEdge,
        schema: SchemaCheck,
        sign: SignCheck,
        semantic: SemanticCheck,
    ) -> ValidationResult {
        let mut rejection_codes = Vec::new();

        if !schema.schema_valid {
            rejection_codes.push("schema_invalid".to_string());
        }
        if !sign.sign_tag.admissible() {
            rejection_codes.push(format!("sign_tag:{}", sign.sign_tag));
        }
        if !semantic.tag.admissible() {
            rejection_codes.push(format!("semantic_tag:{}", semantic.tag));
        }

        let student_conf = edge.student_conf.clamp(0.0, 1.0);
        let sign_score = sign.consistency;
        let semantic_conf = semantic.confidence;
        let combined_conf = self.weights.student_conf * student_conf
            + self.weights.sign_score * sign_score
            + self.weights.semantic_conf * semantic_conf;

        let destination = if !rejection_codes.is_empty() {
            ValidationDestination::DropLog
        } else if combined_conf >= self.thresholds.domain_candidate {
            ValidationDestination::DomainCandidate
        } else if combined_conf >= self.thresholds.personal_candidate {
            ValidationDestination::PersonalCandidate
        } else {
            rejection_codes.push("low_confidence".to_string());
            rejection_codes.push(format!(
                "combined_conf:{combined_conf:.3}<{}",
                self.thresholds.personal_candidate
            ));
            ValidationDestination::DropLog
        };

        let validation_passed = destination != ValidationDestination::DropLog;
        if validation_passed {
            tracing::info!(
                edge = %edge.raw_edge_id,
                destination = %destination,
                conf = format!("{combined_conf:.3}"),
                "edge passed validation"
            );
        }

        ValidationResult {
            edge_id: edge.raw_edge_id.clone(),
            validation_passed,
            destination,
            combined_conf,
            student_conf,
            sign_score,
            semantic_conf,
            schema: Some(schema),
            sign: Some(sign),
            semantic: Some(semantic),
            rejection_codes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Polarity, RelationType};
    use crate::identifiers::FragmentId;
    use crate::tags::{SemanticTag, SignTag};
    use test_case::test_case;

    fn edge(student_conf: f64) -> RawEdge {
        RawEdge {
            raw_edge_id: "e1".into(),
            head_entity_id: "A".into(),
            tail_entity_id: "B".into(),
            head_name: None,
            tail_name: None,
            relation_type: RelationType::Affect,
            polarity_guess: Polarity::Positive,
            student_conf,
            fragment_text: None,
            fragment_id: FragmentId::new("f1"),
        }
    }

    fn schema_ok() -> SchemaCheck {
        SchemaCheck {
            edge_id: "e1".into(),
            schema_valid: true,
            errors: vec![],
            has_required_fields: true,
            entity_pair_valid: true,
            no_self_loop: true,
        }
    }

    fn sign(tag: SignTag, consistency: f64) -> SignCheck {
        SignCheck {
            edge_id: "e1".into(),
            polarity_final: Polarity::Positive,
            sign_tag: tag,
            consistency,
            pattern_polarity: None,
            static_polarity: None,
            llm_polarity: None,
            conflict_with_static: false,
        }
    }

    fn semantic(tag: SemanticTag, confidence: f64) -> SemanticCheck {
        SemanticCheck {
            edge_id: "e1".into(),
            tag,
            confidence,
            has_exaggeration: false,
            correlation_as_causation: false,
            weak_evidence: false,
            domain_conflict: false,
            llm_judgement: None,
        }
    }

    fn filter() -> ConfidenceFilter {
        ConfidenceFilter::new(ConfidenceThresholds::default(), ConfidenceWeights::default())
    }

    #[test]
    fn strong_edge_is_a_domain_candidate() {
        let result = filter().filter(
            &edge(0.9),
            schema_ok(),
            sign(SignTag::Confident, 0.9),
            semantic(SemanticTag::SemConfident, 0.85),
        );
        // 0.4*0.9 + 0.3*0.9 + 0.3*0.85 = 0.885
        assert!(result.validation_passed);
        assert_eq!(result.destination, ValidationDestination::DomainCandidate);
        assert!((result.combined_conf - 0.885).abs() < 1e-9);
    }

    #[test]
    fn middling_edge_is_a_personal_candidate() {
        let result = filter().filter(
            &edge(0.4),
            schema_ok(),
            sign(SignTag::Ambiguous, 0.5),
            semantic(SemanticTag::SemWeak, 0.45),
        );
        // 0.16 + 0.15 + 0.135 = 0.445
        assert_eq!(result.destination, ValidationDestination::PersonalCandidate);
    }

    #[test]
    fn weak_edge_drops_with_low_confidence_code() {
        let result = filter().filter(
            &edge(0.1),
            schema_ok(),
            sign(SignTag::Ambiguous, 0.4),
            semantic(SemanticTag::SemAmbiguous, 0.5),
        );
        // 0.04 + 0.12 + 0.15 = 0.31 < 0.35
        assert!(!result.validation_passed);
        assert_eq!(result.destination, ValidationDestination::DropLog);
        assert!(result.rejection_codes.contains(&"low_confidence".to_string()));
    }

    #[test_case(SignTag::Suspect)]
    #[test_case(SignTag::Unknown)]
    fn inadmissible_sign_tags_drop(tag: SignTag) {
        let result = filter().filter(
            &edge(0.9),
            schema_ok(),
            sign(tag, 0.3),
            semantic(SemanticTag::SemConfident, 0.85),
        );
        assert_eq!(result.destination, ValidationDestination::DropLog);
        assert!(result.rejection_codes[0].starts_with("sign_tag:"));
    }

    #[test_case(SemanticTag::SemSpurious)]
    #[test_case(SemanticTag::SemWrong)]
    fn inadmissible_semantic_tags_drop(tag: SemanticTag) {
        let result = filter().filter(
            &edge(0.9),
            schema_ok(),
            sign(SignTag::Confident, 0.9),
            semantic(tag, 0.3),
        );
        assert_eq!(result.destination, ValidationDestination::DropLog);
        assert!(result
            .rejection_codes
            .iter()
            .any(|c| c.starts_with("semantic_tag:")));
    }

    #[test]
    fn admission_iff_all_four_rules_hold() {
        // Passing result: every rule satisfied.
        let pass = filter().filter(
            &edge(0.8),
            schema_ok(),
            sign(SignTag::Confident, 0.9),
            semantic(SemanticTag::SemAmbiguous, 0.5),
        );
        assert!(pass.validation_passed);

        // Break exactly rule A.
        let mut bad_schema = schema_ok();
        bad_schema.schema_valid = false;
        bad_schema.errors.push("self_loop_detected".into());
        let fail = filter().filter(
            &edge(0.8),
            bad_schema,
            sign(SignTag::Confident, 0.9),
            semantic(SemanticTag::SemAmbiguous, 0.5),
        );
        assert!(!fail.validation_passed);
        assert_eq!(fail.rejection_codes[0], "schema_invalid");
    }

    #[test]
    fn threshold_splits_domain_from_personal() {
        // 0.28 + 0.15 + 0.15 = 0.58: above the domain cut.
        let above = filter().filter(
            &edge(0.7),
            schema_ok(),
            sign(SignTag::Confident, 0.5),
            semantic(SemanticTag::SemAmbiguous, 0.5),
        );
        assert_eq!(above.destination, ValidationDestination::DomainCandidate);

        // 0.20 + 0.15 + 0.15 = 0.50: usable, but Personal only.
        let below = filter().filter(
            &edge(0.5),
            schema_ok(),
            sign(SignTag::Confident, 0.5),
            semantic(SemanticTag::SemAmbiguous, 0.5),
        );
        assert_eq!(below.destination, ValidationDestination::PersonalCandidate);
    }
}
