// Copyright 2025 Cowboy AI, LLC.

//! Personal confidence scoring (PCS)
//!
//! Four factors: proximity to the Domain graph, semantic strength, origin
//! trust, and repetition of the same `(head, tail, type, sign)` pattern.
//! The weighted raw score lives in [−1,1] and is mapped linearly to [0,1].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::models::{PcsResult, PersonalCandidate, PersonalLabel};
use crate::config::PcsWeights;
use crate::domain::DomainKgAdapter;
use crate::edge::Polarity;

type PatternKey = (String, String, crate::edge::RelationType, Polarity);

/// PCS classifier with its own pattern history for the consistency factor
pub struct PcsClassifier {
    domain: Option<Arc<DomainKgAdapter>>,
    weights: PcsWeights,
    patterns: Mutex<PatternHistory>,
}

#[derive(Default)]
struct PatternHistory {
    counts: HashMap<PatternKey, u32>,
    total: u32,
}

impl PcsClassifier {
    /// Build with an optional Domain adapter for the proximity factor
    pub fn new(domain: Option<Arc<DomainKgAdapter>>, weights: PcsWeights) -> Self {
        Self {
            domain,
            weights,
            patterns: Mutex::new(PatternHistory::default()),
        }
    }

    /// Score one candidate and update the pattern history
    pub fn classify(&self, candidate: &PersonalCandidate) -> PcsResult {
        let p1 = self.domain_proximity(candidate);
        let p2 = candidate.semantic_tag.pcs_strength();
        let p3 = candidate.source_type.origin_weight();
        let p4 = self.consistency(candidate);

        let raw = self.weights.domain_proximity * p1
            + self.weights.semantic_strength * p2
            + self.weights.user_origin * p3
            + self.weights.consistency * p4;
        let pcs = ((raw + 1.0) / 2.0).clamp(0.0, 1.0);
        let label = PersonalLabel::from_score(pcs);

        self.record_pattern(candidate);

        tracing::debug!(
            candidate = %candidate.candidate_id,
            pcs = format!("{pcs:.3}"),
            ?label,
            "pcs classified"
        );

        PcsResult {
            candidate_id: candidate.candidate_id.clone(),
            pcs_score: pcs,
            personal_label: label,
            domain_proximity: p1,
            semantic_strength: p2,
            user_origin: p3,
            consistency: p4,
        }
    }

    fn domain_proximity(&self, candidate: &PersonalCandidate) -> f64 {
        let Some(domain) = &self.domain else {
            return 0.0;
        };
        let Some(relation) = domain.get_relation(&candidate.key()) else {
            return 0.0;
        };

        if candidate.polarity == relation.sign {
            0.8 * relation.domain_conf
        } else if !candidate.polarity.is_signed() {
            0.3 * relation.domain_conf
        } else {
            -0.6 * relation.domain_conf
        }
    }

    fn consistency(&self, candidate: &PersonalCandidate) -> f64 {
        let Ok(history) = self.patterns.lock() else {
            return 0.0;
        };
        if history.total == 0 {
            return 0.0;
        }
        let same = history
            .counts
            .get(&Self::pattern_key(candidate))
            .copied()
            .unwrap_or(0);
        let ratio = 2.0 * same as f64 / history.total.max(1) as f64;
        ratio.min(0.8)
    }

    fn record_pattern(&self, candidate: &PersonalCandidate) {
        if let Ok(mut history) = self.patterns.lock() {
            *history.counts.entry(Self::pattern_key(candidate)).or_default() += 1;
            history.total += 1;
        }
    }

    fn pattern_key(candidate: &PersonalCandidate) -> PatternKey {
        (
            candidate.head_id.clone(),
            candidate.tail_id.clone(),
            candidate.relation_type,
            candidate.polarity,
        )
    }

    /// (unique patterns, total observations)
    pub fn pattern_stats(&self) -> (usize, u32) {
        self.patterns
            .lock()
            .map(|h| (h.counts.len(), h.total))
            .unwrap_or((0, 0))
    }
}
