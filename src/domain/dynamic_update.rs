// Copyright 2025 Cowboy AI, LLC.

//! Dynamic Domain update
//!
//! Evidence accumulation over mutable Domain relations: create, strengthen,
//! weaken, decay. Idempotent on the relation key; the whole update runs
//! inside a caller-supplied transaction.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::adapter::DomainKgAdapter;
use super::models::{DomainAction, DomainCandidate, DynamicRelation, DynamicUpdateResult};
use crate::config::DomainUpdateParams;
use crate::errors::KgResult;
use crate::identifiers::{RelationId, RelationKey};
use crate::repository::Transaction;

/// Applies candidates to the Dynamic Domain graph
pub struct DynamicDomainUpdate {
    adapter: Arc<DomainKgAdapter>,
    params: DomainUpdateParams,
}

impl DynamicDomainUpdate {
    /// Build over the Domain adapter
    pub fn new(adapter: Arc<DomainKgAdapter>, params: DomainUpdateParams) -> Self {
        Self { adapter, params }
    }

    /// The adapter this updater writes through
    pub fn adapter(&self) -> &Arc<DomainKgAdapter> {
        &self.adapter
    }

    /// Apply a candidate now
    pub fn update(
        &self,
        candidate: &DomainCandidate,
        tx: &mut Transaction,
    ) -> KgResult<DynamicUpdateResult> {
        self.update_at(candidate, Utc::now(), tx)
    }

    /// Apply a candidate at an explicit time (decay and timestamps use it)
    pub fn update_at(
        &self,
        candidate: &DomainCandidate,
        now: DateTime<Utc>,
        tx: &mut Transaction,
    ) -> KgResult<DynamicUpdateResult> {
        match self.adapter.get_relation(&candidate.key()) {
            None => self.create_new(candidate, now, tx),
            Some(relation) => self.update_existing(relation, candidate, now, tx),
        }
    }

    fn create_new(
        &self,
        candidate: &DomainCandidate,
        now: DateTime<Utc>,
        tx: &mut Transaction,
    ) -> KgResult<DynamicUpdateResult> {
        let relation = DynamicRelation {
            relation_id: RelationId::generate("drel"),
            head_id: candidate.head_id.clone(),
            head_name: candidate.head_name.clone(),
            tail_id: candidate.tail_id.clone(),
            tail_name: candidate.tail_name.clone(),
            relation_type: candidate.relation_type,
            sign: candidate.polarity,
            domain_conf: self.params.initial_conf,
            evidence_count: 1,
            conflict_count: 0,
            created_at: now,
            last_update: now,
            semantic_tags: vec![candidate.semantic_tag],
            decay_applied: false,
            drift_flag: false,
            need_conflict_resolution: false,
            origin: candidate.evidence_source.clone(),
        };

        self.adapter.upsert_relation_tx(&relation, tx)?;
        tracing::info!(relation = %relation.relation_id, key = %relation.key(), "created dynamic relation");

        Ok(DynamicUpdateResult {
            candidate_id: candidate.candidate_id.clone(),
            relation_id: relation.relation_id,
            action: DomainAction::CreateNew,
            domain_conf: relation.domain_conf,
            evidence_count: relation.evidence_count,
            decayed: false,
            conflict_pending: false,
            previous_conf: None,
            is_new: true,
        })
    }

    fn update_existing(
        &self,
        mut relation: DynamicRelation,
        candidate: &DomainCandidate,
        now: DateTime<Utc>,
        tx: &mut Transaction,
    ) -> KgResult<DynamicUpdateResult> {
        let previous_conf = relation.domain_conf;

        let decayed = self.apply_decay(&mut relation, now);

        let conflict_pending = if candidate.polarity.conflicts_with(relation.sign) {
            self.weaken(&mut relation, now);
            true
        } else {
            // Equal, neutral or unknown polarity all count as support.
            self.strengthen(&mut relation, now);
            false
        };

        if !relation.semantic_tags.contains(&candidate.semantic_tag) {
            relation.semantic_tags.push(candidate.semantic_tag);
        }

        self.adapter.upsert_relation_tx(&relation, tx)?;
        tracing::info!(
            relation = %relation.relation_id,
            conf = format!("{previous_conf:.3} -> {:.3}", relation.domain_conf),
            conflict = conflict_pending,
            "updated dynamic relation"
        );

        Ok(DynamicUpdateResult {
            candidate_id: candidate.candidate_id.clone(),
            relation_id: relation.relation_id.clone(),
            action: if conflict_pending {
                DomainAction::TriggerConflict
            } else {
                DomainAction::UpdateExisting
            },
            domain_conf: relation.domain_conf,
            evidence_count: relation.evidence_count,
            decayed,
            conflict_pending,
            previous_conf: Some(previous_conf),
            is_new: false,
        })
    }

    fn apply_decay(&self, relation: &mut DynamicRelation, now: DateTime<Utc>) -> bool {
        let days_elapsed = (now - relation.last_update).num_days();
        if days_elapsed < self.params.decay_days {
            return false;
        }
        let periods = (days_elapsed / self.params.decay_days) as u32;
        let factor = self.params.decay_rate.powi(periods as i32);
        relation.domain_conf *= factor;
        relation.decay_applied = true;
        tracing::debug!(
            relation = %relation.relation_id,
            periods,
            factor = format!("{factor:.4}"),
            "applied decay"
        );
        true
    }

    fn strengthen(&self, relation: &mut DynamicRelation, now: DateTime<Utc>) {
        relation.evidence_count += 1;
        relation.last_update = now;
        let increase = self.params.conf_increase_rate / (relation.evidence_count as f64).sqrt();
        relation.domain_conf = (relation.domain_conf + increase).min(self.params.conf_cap);
    }

    fn weaken(&self, relation: &mut DynamicRelation, now: DateTime<Utc>) {
        relation.conflict_count += 1;
        relation.last_update = now;
        relation.need_conflict_resolution = true;
        relation.domain_conf =
            (relation.domain_conf - self.params.conf_decrease_rate).max(self.params.conf_floor);
    }

    /// Fetch by key through the adapter
    pub fn relation_by_key(&self, key: &RelationKey) -> Option<DynamicRelation> {
        self.adapter.get_relation(key)
    }

    /// Fetch by row id through the adapter
    pub fn relation_by_id(&self, id: &RelationId) -> Option<DynamicRelation> {
        self.adapter.get_relation_by_id(id)
    }

    /// All Domain relations
    pub fn all_relations(&self) -> Vec<DynamicRelation> {
        self.adapter.all_relations()
    }
}
