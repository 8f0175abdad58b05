// Copyright 2025 Cowboy AI, LLC.

//! Personal drift analysis and Domain promotion
//!
//! A personal belief that keeps recurring, scores well, fills a gap in the
//! Domain graph and has aged enough becomes a promotion candidate — unless
//! the static rulebook already fixes its pair, which is an absolute veto.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::adapter::PersonalKgAdapter;
use super::models::{
    HistoryAction, HistoryEvent, PersonalDriftResult, PersonalRelation,
};
use crate::config::PromotionParams;
use crate::domain::{
    DomainCandidate, DynamicDomainUpdate, DynamicUpdateResult, StaticDomainGuard,
};
use crate::errors::{KgError, KgResult};
use crate::identifiers::{RelationId, RelationKey};
use crate::repository::Transaction;
use crate::tags::SemanticTag;

/// Evidence source tag carried by promoted candidates
pub const PROMOTION_SOURCE: &str = "personal_promotion";

/// Scores personal relations for promotion and executes promotions
pub struct PersonalDriftAnalyzer {
    personal: Arc<PersonalKgAdapter>,
    guard: Arc<StaticDomainGuard>,
    params: PromotionParams,
}

impl PersonalDriftAnalyzer {
    /// Build over the Personal adapter and the static rulebook
    pub fn new(
        personal: Arc<PersonalKgAdapter>,
        guard: Arc<StaticDomainGuard>,
        params: PromotionParams,
    ) -> Self {
        Self {
            personal,
            guard,
            params,
        }
    }

    /// Analyse one relation now
    pub fn analyze(
        &self,
        relation: &PersonalRelation,
        domain: &DynamicDomainUpdate,
    ) -> PersonalDriftResult {
        self.analyze_at(relation, domain, Utc::now())
    }

    /// Analyse one relation at an explicit time (the time factor uses it)
    pub fn analyze_at(
        &self,
        relation: &PersonalRelation,
        domain: &DynamicDomainUpdate,
        now: DateTime<Utc>,
    ) -> PersonalDriftResult {
        let pcs_factor = relation.pcs_score * relation.personal_label.drift_multiplier();
        let consistency_factor = self.consistency_factor(relation);
        let domain_gap_factor = self.domain_gap_factor(relation, domain);
        let time_factor = self.time_factor(relation, now);

        let drift_signal = self.params.pcs_weight * pcs_factor
            + self.params.consistency_weight * consistency_factor
            + self.params.domain_gap_weight * domain_gap_factor
            + self.params.time_weight * time_factor;

        let static_conflict = self
            .guard
            .is_static_pair(&relation.head_id, &relation.tail_id);

        let is_promotion_candidate = drift_signal >= self.params.promotion_threshold
            && relation.occurrence_count >= self.params.min_occurrences
            && !static_conflict;

        let reason = if is_promotion_candidate {
            Some(format!(
                "drift_signal={drift_signal:.3}, occurrences={}",
                relation.occurrence_count
            ))
        } else if static_conflict {
            Some("static_domain_conflict".to_string())
        } else {
            None
        };

        if is_promotion_candidate {
            tracing::info!(
                relation = %relation.relation_id,
                signal = format!("{drift_signal:.3}"),
                "promotion candidate"
            );
        }

        PersonalDriftResult {
            relation_id: relation.relation_id.clone(),
            drift_signal,
            is_promotion_candidate,
            pcs_factor,
            consistency_factor,
            domain_gap_factor,
            time_factor,
            static_conflict,
            reason,
        }
    }

    fn consistency_factor(&self, relation: &PersonalRelation) -> f64 {
        match relation.occurrence_count {
            n if n >= 10 => 1.0,
            n if n >= 5 => 0.7,
            n if n >= 3 => 0.5,
            _ => 0.2,
        }
    }

    fn domain_gap_factor(&self, relation: &PersonalRelation, domain: &DynamicDomainUpdate) -> f64 {
        let Some(domain_rel) = domain.relation_by_key(&relation.key()) else {
            // Not in Domain at all: the belief may be a genuine discovery.
            return 0.8;
        };
        if relation.sign.conflicts_with(domain_rel.sign) {
            if domain_rel.domain_conf < 0.5 {
                0.7
            } else {
                0.2
            }
        } else {
            0.4
        }
    }

    fn time_factor(&self, relation: &PersonalRelation, now: DateTime<Utc>) -> f64 {
        let span = match relation.history.first() {
            Some(first) => (now - first.timestamp).num_days().max(relation.history_span_days()),
            None => 0,
        };
        if span >= 30 {
            1.0
        } else if span >= self.params.min_days_span {
            0.6
        } else {
            0.3
        }
    }

    /// Scan every personal relation; returns the analysis per relation
    pub fn scan_all(&self, domain: &DynamicDomainUpdate) -> Vec<PersonalDriftResult> {
        let results: Vec<PersonalDriftResult> = self
            .personal
            .all_relations()
            .iter()
            .map(|rel| self.analyze(rel, domain))
            .collect();
        let promotable = results.iter().filter(|r| r.is_promotion_candidate).count();
        tracing::info!(
            scanned = results.len(),
            promotable,
            "personal drift scan complete"
        );
        results
    }

    /// Promote a personal relation into the Domain graph.
    ///
    /// The personal row is retained; it gains a `promoted_to_domain` history
    /// event pointing at the Domain row. Fails if the static rulebook vetoes
    /// the pair.
    pub fn promote_to_domain(
        &self,
        relation_id: &RelationId,
        domain: &DynamicDomainUpdate,
        tx: &mut Transaction,
    ) -> KgResult<DynamicUpdateResult> {
        let Some(relation) = self.personal.get_relation_by_id(relation_id) else {
            return Err(KgError::Validation(format!(
                "personal relation not found: {relation_id}"
            )));
        };

        if self
            .guard
            .is_static_pair(&relation.head_id, &relation.tail_id)
        {
            return Err(KgError::Validation(format!(
                "cannot promote {relation_id}: static rule fixes {} -> {}",
                relation.head_id, relation.tail_id
            )));
        }

        let candidate = DomainCandidate {
            candidate_id: RelationId::generate("dcand").as_str().to_string(),
            raw_edge_id: format!("PROMOTED_{relation_id}"),
            head_id: relation.head_id.clone(),
            head_name: relation.head_name.clone(),
            tail_id: relation.tail_id.clone(),
            tail_name: relation.tail_name.clone(),
            relation_type: relation.relation_type,
            polarity: relation.sign,
            semantic_tag: SemanticTag::SemConfident,
            combined_conf: relation.pcs_score,
            student_conf: relation.pcs_score,
            timestamp: Utc::now(),
            freq_count: 1,
            evidence_source: PROMOTION_SOURCE.to_string(),
            fragment_text: None,
        };

        let result = domain.update(&candidate, tx)?;

        let mut updated = relation;
        updated.promotion_candidate = true;
        updated.history.push(HistoryEvent {
            timestamp: Utc::now(),
            action: HistoryAction::PromotedToDomain,
            pcs_score: Some(updated.pcs_score),
            occurrence: Some(updated.occurrence_count),
            fragment: None,
            domain_relation_id: Some(result.relation_id.clone()),
        });
        self.personal.upsert_relation_tx(&updated, tx)?;

        tracing::info!(
            personal = %relation_id,
            domain = %result.relation_id,
            "promoted personal relation to domain"
        );
        Ok(result)
    }

    /// Promotion check for one key without mutating anything
    pub fn would_veto(&self, key: &RelationKey) -> bool {
        self.guard.is_static_pair(&key.head_id, &key.tail_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DomainUpdateParams, StaticRule};
    use crate::domain::DomainKgAdapter;
    use crate::edge::{Polarity, RelationType};
    use crate::identifiers::UserId;
    use crate::personal::models::{PersonalLabel, RelevanceType, SourceType};
    use crate::repository::{GraphRepository, InMemoryGraphRepository, TransactionManager};
    use chrono::Duration;

    struct Fixture {
        mgr: TransactionManager,
        personal: Arc<PersonalKgAdapter>,
        domain: DynamicDomainUpdate,
        analyzer: PersonalDriftAnalyzer,
    }

    fn fixture(rules: Vec<StaticRule>) -> Fixture {
        let repo = Arc::new(InMemoryGraphRepository::new());
        let mgr = TransactionManager::new(repo.clone() as Arc<dyn GraphRepository>);
        let domain_adapter = Arc::new(DomainKgAdapter::new(repo.clone() as Arc<dyn GraphRepository>));
        let personal = Arc::new(PersonalKgAdapter::new(repo as Arc<dyn GraphRepository>));
        let guard = Arc::new(StaticDomainGuard::new(&rules));
        Fixture {
            mgr,
            personal: personal.clone(),
            domain: DynamicDomainUpdate::new(domain_adapter, DomainUpdateParams::default()),
            analyzer: PersonalDriftAnalyzer::new(personal, guard, PromotionParams::default()),
        }
    }

    fn seasoned_relation(occurrences: u32, age_days: i64, pcs: f64) -> PersonalRelation {
        let start = Utc::now() - Duration::days(age_days);
        let mut history = vec![HistoryEvent {
            timestamp: start,
            action: HistoryAction::Created,
            pcs_score: Some(pcs),
            occurrence: Some(1),
            fragment: None,
            domain_relation_id: None,
        }];
        for i in 1..occurrences {
            history.push(HistoryEvent {
                timestamp: start + Duration::days(i as i64),
                action: HistoryAction::Updated,
                pcs_score: Some(pcs),
                occurrence: Some(i + 1),
                fragment: None,
                domain_relation_id: None,
            });
        }
        PersonalRelation {
            relation_id: RelationId::generate("prel"),
            head_id: "Shipping_Rates".into(),
            head_name: "Shipping Rates".into(),
            tail_id: "Retail_Prices".into(),
            tail_name: "Retail Prices".into(),
            relation_type: RelationType::Affect,
            sign: Polarity::Positive,
            user_id: UserId::default_user(),
            pcs_score: pcs,
            personal_weight: pcs,
            personal_label: PersonalLabel::from_score(pcs),
            occurrence_count: occurrences,
            source_type: SourceType::TextReport,
            relevance_types: vec![RelevanceType::Observation],
            history,
            pcs_history: vec![],
            domain_conflict_count: 0,
            promotion_candidate: false,
            drift_flag: false,
            created_at: start,
            last_occurred_at: Utc::now(),
        }
    }

    #[test]
    fn seasoned_strong_belief_qualifies() {
        let f = fixture(vec![]);
        let rel = seasoned_relation(6, 40, 0.82);
        let result = f.analyzer.analyze(&rel, &f.domain);

        // 0.3*0.82 + 0.3*0.7 + 0.2*0.8 + 0.2*1.0 = 0.816
        assert!((result.drift_signal - 0.816).abs() < 1e-9);
        assert!(result.is_promotion_candidate);
        assert!(!result.static_conflict);
    }

    #[test]
    fn young_belief_fails_the_time_factor() {
        let f = fixture(vec![]);
        let rel = seasoned_relation(6, 2, 0.82);
        let result = f.analyzer.analyze(&rel, &f.domain);
        assert_eq!(result.time_factor, 0.3);
        assert!(!result.is_promotion_candidate);
    }

    #[test]
    fn too_few_occurrences_fail_even_with_signal() {
        let f = fixture(vec![]);
        let mut rel = seasoned_relation(2, 40, 0.95);
        rel.occurrence_count = 2;
        let result = f.analyzer.analyze(&rel, &f.domain);
        assert!(!result.is_promotion_candidate);
    }

    #[test]
    fn static_rule_vetoes_promotion() {
        let f = fixture(vec![StaticRule {
            rule_id: "SR-009".into(),
            head: "Shipping_Rates".into(),
            tail: "Retail_Prices".into(),
            polarity: Polarity::Positive,
            relation: RelationType::Affect,
            certainty: 1.0,
            description: "already fixed".into(),
        }]);
        let rel = seasoned_relation(6, 40, 0.82);
        let result = f.analyzer.analyze(&rel, &f.domain);
        assert!(result.static_conflict);
        assert!(!result.is_promotion_candidate);
        assert_eq!(result.reason.as_deref(), Some("static_domain_conflict"));
    }

    #[test]
    fn strong_opposing_domain_suppresses_the_gap_factor() {
        let f = fixture(vec![]);
        let rel = seasoned_relation(6, 40, 0.82);

        // Seed an opposing, confident domain relation on the same key.
        let candidate = DomainCandidate {
            candidate_id: "c1".into(),
            raw_edge_id: "e1".into(),
            head_id: "Shipping_Rates".into(),
            head_name: "Shipping Rates".into(),
            tail_id: "Retail_Prices".into(),
            tail_name: "Retail Prices".into(),
            relation_type: RelationType::Affect,
            polarity: Polarity::Negative,
            semantic_tag: SemanticTag::SemConfident,
            combined_conf: 0.9,
            student_conf: 0.9,
            timestamp: Utc::now(),
            freq_count: 1,
            evidence_source: "student".into(),
            fragment_text: None,
        };
        f.mgr.run(|tx| f.domain.update(&candidate, tx)).unwrap();
        // push conf above 0.5
        for _ in 0..3 {
            f.mgr.run(|tx| f.domain.update(&candidate, tx)).unwrap();
        }

        let result = f.analyzer.analyze(&rel, &f.domain);
        assert_eq!(result.domain_gap_factor, 0.2);
        assert!(!result.is_promotion_candidate);
    }

    #[test]
    fn promotion_writes_domain_and_appends_history() {
        let f = fixture(vec![]);
        let rel = seasoned_relation(6, 40, 0.82);
        f.personal.upsert_relation(&rel).unwrap();

        let result = f
            .mgr
            .run(|tx| f.analyzer.promote_to_domain(&rel.relation_id, &f.domain, tx))
            .unwrap();

        assert!(result.is_new);
        assert_eq!(result.evidence_count, 1);
        assert_eq!(result.domain_conf, 0.5);

        let domain_rel = f.domain.relation_by_key(&rel.key()).unwrap();
        assert_eq!(domain_rel.origin, PROMOTION_SOURCE);
        assert_eq!(domain_rel.sign, Polarity::Positive);

        // personal row survives with a promotion event
        let personal_rel = f.personal.get_relation(&rel.key()).unwrap();
        assert!(personal_rel.promotion_candidate);
        let last = personal_rel.history.last().unwrap();
        assert_eq!(last.action, HistoryAction::PromotedToDomain);
        assert_eq!(last.domain_relation_id, Some(result.relation_id));
    }

    #[test]
    fn promotion_respects_the_static_veto() {
        let f = fixture(vec![StaticRule {
            rule_id: "SR-009".into(),
            head: "Shipping_Rates".into(),
            tail: "Retail_Prices".into(),
            polarity: Polarity::Positive,
            relation: RelationType::Affect,
            certainty: 1.0,
            description: "already fixed".into(),
        }]);
        let rel = seasoned_relation(6, 40, 0.82);
        f.personal.upsert_relation(&rel).unwrap();

        let err = f
            .mgr
            .run(|tx| f.analyzer.promote_to_domain(&rel.relation_id, &f.domain, tx))
            .unwrap_err();
        assert!(matches!(err, KgError::Validation(_)));
        assert!(f.domain.relation_by_key(&rel.key()).is_none());
    }
}
