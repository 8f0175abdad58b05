// Copyright 2025 Cowboy AI, LLC.

//! Domain drift detector
//!
//! Scores long-term erosion of a Domain relation: accumulated conflicts,
//! applied decay, and semantic ambiguity. High signals set the drift flag;
//! very high signals also request human QA.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::adapter::DomainKgAdapter;
use super::models::{DriftDetectionResult, DynamicRelation};
use crate::config::DriftParams;
use crate::errors::KgResult;
use crate::identifiers::RelationId;
use crate::repository::Transaction;
use crate::tags::SemanticTag;

/// Long-term drift scoring over Domain relations
pub struct DomainDriftDetector {
    adapter: Arc<DomainKgAdapter>,
    params: DriftParams,
    candidates: Mutex<HashMap<RelationId, DriftDetectionResult>>,
}

impl DomainDriftDetector {
    /// Build over the Domain adapter
    pub fn new(adapter: Arc<DomainKgAdapter>, params: DriftParams) -> Self {
        Self {
            adapter,
            params,
            candidates: Mutex::new(HashMap::new()),
        }
    }

    /// Score one relation; a set drift flag is persisted through `tx`
    pub fn detect(
        &self,
        relation: &DynamicRelation,
        tx: &mut Transaction,
    ) -> KgResult<DriftDetectionResult> {
        let conflict_score = self.conflict_score(relation);
        let opposite_rate = self.opposite_rate(relation);
        let decay_score = if relation.decay_applied { 0.5 } else { 0.0 };
        let semantic_score = self.semantic_score(relation);

        let drift_signal = self.params.conflict_weight * conflict_score
            + self.params.opposite_weight * opposite_rate
            + self.params.decay_weight * decay_score
            + self.params.semantic_weight * semantic_score;

        let is_drift = drift_signal >= self.params.drift_threshold;
        let needs_qa = drift_signal >= self.params.qa_threshold;

        let result = DriftDetectionResult {
            relation_id: relation.relation_id.clone(),
            drift_signal,
            is_drift,
            needs_qa,
            conflict_score,
            opposite_rate,
            decay_score,
            semantic_score,
        };

        if is_drift {
            let mut flagged = relation.clone();
            flagged.drift_flag = true;
            self.adapter.upsert_relation_tx(&flagged, tx)?;
            if let Ok(mut candidates) = self.candidates.lock() {
                candidates.insert(relation.relation_id.clone(), result.clone());
            }
            tracing::info!(
                relation = %relation.relation_id,
                signal = format!("{drift_signal:.2}"),
                needs_qa,
                "drift detected"
            );
        }

        Ok(result)
    }

    fn conflict_score(&self, relation: &DynamicRelation) -> f64 {
        let total = relation.evidence_count + relation.conflict_count;
        if total < self.params.min_sample {
            return 0.0;
        }
        relation.conflict_count as f64 / total as f64
    }

    // Currently mirrors the conflict ratio without the small-sample guard;
    // kept separate as the slot for a richer opposite-evidence metric.
    fn opposite_rate(&self, relation: &DynamicRelation) -> f64 {
        let total = relation.evidence_count + relation.conflict_count;
        if total == 0 {
            return 0.0;
        }
        relation.conflict_count as f64 / total as f64
    }

    fn semantic_score(&self, relation: &DynamicRelation) -> f64 {
        if relation.semantic_tags.contains(&SemanticTag::SemAmbiguous) {
            0.8
        } else if relation.semantic_tags.contains(&SemanticTag::SemWeak) {
            0.5
        } else {
            0.0
        }
    }

    /// Relations flagged so far in this process
    pub fn drift_candidates(&self) -> Vec<DriftDetectionResult> {
        self.candidates
            .lock()
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Score every Domain relation inside one transaction; returns the
    /// number flagged
    pub fn scan_all(&self, tx: &mut Transaction) -> KgResult<usize> {
        let mut flagged = 0;
        for relation in self.adapter.all_relations() {
            if self.detect(&relation, tx)?.is_drift {
                flagged += 1;
            }
        }
        Ok(flagged)
    }
}
