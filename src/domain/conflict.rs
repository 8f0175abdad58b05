// Copyright 2025 Cowboy AI, LLC.

//! Conflict analyzer
//!
//! Invoked when a dynamic update flagged a pending conflict. Decides whether
//! the existing relation stands, drifts, or the candidate is demoted to a
//! personal belief. Overwhelming counter-evidence is treated as a Personal
//! belief rather than a Domain override.

use std::collections::{HashMap, VecDeque};

use super::models::{
    ConflictAnalysisResult, ConflictResolution, ConflictType, DomainCandidate, DynamicRelation,
};
use crate::config::ConflictParams;
use crate::edge::Polarity;
use crate::identifiers::RelationId;

/// Resolves sign/type/path inconsistencies inside the Domain KG
pub struct ConflictAnalyzer {
    params: ConflictParams,
}

impl ConflictAnalyzer {
    /// Build with the configured thresholds
    pub fn new(params: ConflictParams) -> Self {
        Self { params }
    }

    /// Analyse a flagged conflict.
    ///
    /// `graph_relations` is the current Domain relation set used for the
    /// path-consistency walk.
    pub fn analyze(
        &self,
        candidate: &DomainCandidate,
        relation: &DynamicRelation,
        graph_relations: &[DynamicRelation],
    ) -> ConflictAnalysisResult {
        let mut result = self.direct_conflict(candidate, relation);

        if result.resolution != ConflictResolution::KeepExisting {
            let (consistent, bad_path) = self.path_consistency(candidate, graph_relations);
            result.path_consistent = consistent;
            result.inconsistent_path = bad_path;
            if !consistent {
                result.conflict_type = Some(ConflictType::PathConflict);
                result.resolution = ConflictResolution::ToPersonal;
            }
        }

        // Untrustworthy semantics force the candidate out of Domain.
        if candidate.semantic_tag.forces_personal() {
            result.resolution = ConflictResolution::ToPersonal;
        }

        tracing::info!(
            candidate = %candidate.candidate_id,
            relation = %relation.relation_id,
            resolution = ?result.resolution,
            "conflict analysis"
        );
        result
    }

    fn direct_conflict(
        &self,
        candidate: &DomainCandidate,
        relation: &DynamicRelation,
    ) -> ConflictAnalysisResult {
        let mut has_conflict = false;
        let mut conflict_type = None;
        let mut resolution = ConflictResolution::KeepExisting;

        // Counter-evidence accumulated against the stored sign, including the
        // candidate being analysed (the weaken step already counted it).
        let counter_evidence = relation.conflict_count.max(candidate.freq_count);

        if candidate.polarity.conflicts_with(relation.sign) {
            has_conflict = true;
            conflict_type = Some(ConflictType::SignConflict);

            let ratio = counter_evidence as f64 / relation.evidence_count.max(1) as f64;
            resolution = if ratio >= self.params.min_evidence_ratio {
                ConflictResolution::ToPersonal
            } else if relation.domain_conf < self.params.weak_conf_threshold {
                ConflictResolution::ToDrift
            } else {
                ConflictResolution::KeepExisting
            };
        }

        if candidate.relation_type != relation.relation_type {
            has_conflict = true;
            conflict_type = Some(ConflictType::TypeConflict);
            resolution = ConflictResolution::ToPersonal;
        }

        ConflictAnalysisResult {
            candidate_id: candidate.candidate_id.clone(),
            relation_id: relation.relation_id.clone(),
            has_conflict,
            conflict_type,
            resolution,
            existing_sign: relation.sign,
            new_sign: candidate.polarity,
            existing_evidence: relation.evidence_count,
            counter_evidence,
            path_consistent: true,
            inconsistent_path: None,
        }
    }

    /// Walk indirect paths (≥ 2 edges) from head to tail and compare their
    /// combined sign with the candidate's. The direct edge is the sign
    /// conflict itself and is not re-counted here.
    fn path_consistency(
        &self,
        candidate: &DomainCandidate,
        graph_relations: &[DynamicRelation],
    ) -> (bool, Option<Vec<RelationId>>) {
        if !candidate.polarity.is_signed() {
            return (true, None);
        }

        let mut graph: HashMap<&str, Vec<&DynamicRelation>> = HashMap::new();
        for rel in graph_relations {
            graph.entry(rel.head_id.as_str()).or_default().push(rel);
        }

        let start = candidate.head_id.as_str();
        let goal = candidate.tail_id.as_str();

        // BFS over edge sequences, bounded by the configured depth.
        let mut queue: VecDeque<(Vec<&DynamicRelation>, &str)> = VecDeque::new();
        queue.push_back((Vec::new(), start));

        while let Some((path, node)) = queue.pop_front() {
            if path.len() >= self.params.path_depth_limit {
                continue;
            }
            for rel in graph.get(node).into_iter().flatten() {
                // cycle guard on node revisits
                if rel.tail_id == start || path.iter().any(|p| p.tail_id == rel.tail_id) {
                    continue;
                }
                let mut next = path.clone();
                next.push(rel);
                if rel.tail_id == goal {
                    if next.len() >= 2 {
                        let sign = Polarity::combine_all(next.iter().map(|r| r.sign));
                        if let Some(sign) = sign {
                            if sign.conflicts_with(candidate.polarity) {
                                let ids = next.iter().map(|r| r.relation_id.clone()).collect();
                                return (false, Some(ids));
                            }
                        }
                    }
                } else {
                    queue.push_back((next, rel.tail_id.as_str()));
                }
            }
        }

        (true, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::RelationType;
    use crate::tags::SemanticTag;
    use chrono::Utc;

    fn relation(
        head: &str,
        tail: &str,
        sign: Polarity,
        evidence: u32,
        conflicts: u32,
        conf: f64,
    ) -> DynamicRelation {
        DynamicRelation {
            relation_id: RelationId::generate("drel"),
            head_id: head.into(),
            head_name: head.into(),
            tail_id: tail.into(),
            tail_name: tail.into(),
            relation_type: RelationType::Affect,
            sign,
            domain_conf: conf,
            evidence_count: evidence,
            conflict_count: conflicts,
            created_at: Utc::now(),
            last_update: Utc::now(),
            semantic_tags: vec![SemanticTag::SemConfident],
            decay_applied: false,
            drift_flag: false,
            need_conflict_resolution: true,
            origin: "student".into(),
        }
    }

    fn candidate(head: &str, tail: &str, polarity: Polarity, tag: SemanticTag) -> DomainCandidate {
        DomainCandidate {
            candidate_id: "c1".into(),
            raw_edge_id: "e1".into(),
            head_id: head.into(),
            head_name: head.into(),
            tail_id: tail.into(),
            tail_name: tail.into(),
            relation_type: RelationType::Affect,
            polarity,
            semantic_tag: tag,
            combined_conf: 0.8,
            student_conf: 0.8,
            timestamp: Utc::now(),
            freq_count: 1,
            evidence_source: "student".into(),
            fragment_text: None,
        }
    }

    fn analyzer() -> ConflictAnalyzer {
        ConflictAnalyzer::new(ConflictParams::default())
    }

    #[test]
    fn strong_existing_relation_keeps() {
        let rel = relation("A", "B", Polarity::Positive, 8, 1, 0.8);
        let cand = candidate("A", "B", Polarity::Negative, SemanticTag::SemConfident);
        let result = analyzer().analyze(&cand, &rel, &[rel.clone()]);
        assert_eq!(result.conflict_type, Some(ConflictType::SignConflict));
        assert_eq!(result.resolution, ConflictResolution::KeepExisting);
    }

    #[test]
    fn overwhelming_counter_evidence_goes_personal() {
        let rel = relation("A", "B", Polarity::Positive, 2, 6, 0.2);
        let cand = candidate("A", "B", Polarity::Negative, SemanticTag::SemConfident);
        let result = analyzer().analyze(&cand, &rel, &[rel.clone()]);
        // 6 / 2 = 3 >= min ratio
        assert_eq!(result.resolution, ConflictResolution::ToPersonal);
        assert_eq!(result.counter_evidence, 6);
    }

    #[test]
    fn weak_existing_relation_drifts() {
        let rel = relation("A", "B", Polarity::Positive, 3, 2, 0.3);
        let cand = candidate("A", "B", Polarity::Negative, SemanticTag::SemConfident);
        let result = analyzer().analyze(&cand, &rel, &[rel.clone()]);
        assert_eq!(result.resolution, ConflictResolution::ToDrift);
    }

    #[test]
    fn type_conflict_always_goes_personal() {
        let rel = relation("A", "B", Polarity::Positive, 8, 0, 0.8);
        let mut cand = candidate("A", "B", Polarity::Positive, SemanticTag::SemConfident);
        cand.relation_type = RelationType::Cause;
        let result = analyzer().analyze(&cand, &rel, &[rel.clone()]);
        assert_eq!(result.conflict_type, Some(ConflictType::TypeConflict));
        assert_eq!(result.resolution, ConflictResolution::ToPersonal);
    }

    #[test]
    fn disagreeing_indirect_path_overrides_to_personal() {
        // A -> B weak (drift would be chosen), but A -> C -> B carries "+"
        // while the candidate claims "-".
        let direct = relation("A", "B", Polarity::Positive, 3, 2, 0.3);
        let leg1 = relation("A", "C", Polarity::Positive, 2, 0, 0.6);
        let leg2 = relation("C", "B", Polarity::Positive, 2, 0, 0.6);
        let cand = candidate("A", "B", Polarity::Negative, SemanticTag::SemConfident);

        let result =
            analyzer().analyze(&cand, &direct, &[direct.clone(), leg1.clone(), leg2.clone()]);
        assert_eq!(result.conflict_type, Some(ConflictType::PathConflict));
        assert_eq!(result.resolution, ConflictResolution::ToPersonal);
        assert!(!result.path_consistent);
        assert_eq!(
            result.inconsistent_path,
            Some(vec![leg1.relation_id, leg2.relation_id])
        );
    }

    #[test]
    fn agreeing_indirect_path_does_not_override() {
        // A -> C -> B combines to "-", agreeing with the candidate.
        let direct = relation("A", "B", Polarity::Positive, 3, 2, 0.3);
        let leg1 = relation("A", "C", Polarity::Positive, 2, 0, 0.6);
        let leg2 = relation("C", "B", Polarity::Negative, 2, 0, 0.6);
        let cand = candidate("A", "B", Polarity::Negative, SemanticTag::SemConfident);

        let result = analyzer().analyze(&cand, &direct, &[direct.clone(), leg1, leg2]);
        assert!(result.path_consistent);
        assert_eq!(result.resolution, ConflictResolution::ToDrift);
    }

    #[test]
    fn unknown_sign_paths_are_skipped() {
        let direct = relation("A", "B", Polarity::Positive, 3, 2, 0.3);
        let leg1 = relation("A", "C", Polarity::Unknown, 2, 0, 0.6);
        let leg2 = relation("C", "B", Polarity::Positive, 2, 0, 0.6);
        let cand = candidate("A", "B", Polarity::Negative, SemanticTag::SemConfident);

        let result = analyzer().analyze(&cand, &direct, &[direct.clone(), leg1, leg2]);
        // The only indirect path has no defined sign, so no path conflict.
        assert!(result.path_consistent);
    }

    #[test]
    fn spurious_semantics_force_personal_even_when_keeping() {
        let rel = relation("A", "B", Polarity::Positive, 8, 1, 0.8);
        let cand = candidate("A", "B", Polarity::Negative, SemanticTag::SemSpurious);
        let result = analyzer().analyze(&cand, &rel, &[rel.clone()]);
        assert_eq!(result.resolution, ConflictResolution::ToPersonal);
    }
}
