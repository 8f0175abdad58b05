// Copyright 2025 Cowboy AI, LLC.

//! Personal KG update — append-only upsert
//!
//! New beliefs are created with a weight derived from their PCS band;
//! repeated beliefs blend scores with an EMA and append to the history
//! trail. Nothing here can delete or rewrite history.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::adapter::PersonalKgAdapter;
use super::models::{
    HistoryAction, HistoryEvent, PcsResult, PcsSample, PersonalCandidate, PersonalLabel,
    PersonalProcessResult, PersonalRelation,
};
use crate::errors::KgResult;
use crate::identifiers::RelationId;
use crate::repository::Transaction;

const FRAGMENT_PREFIX_LEN: usize = 100;
const EMA_KEEP: f64 = 0.7;
const EMA_BLEND: f64 = 0.3;

/// Applies scored candidates to the Personal KG
pub struct PersonalKgUpdate {
    adapter: Arc<PersonalKgAdapter>,
}

impl PersonalKgUpdate {
    /// Build over the Personal adapter
    pub fn new(adapter: Arc<PersonalKgAdapter>) -> Self {
        Self { adapter }
    }

    /// The adapter this updater writes through
    pub fn adapter(&self) -> &Arc<PersonalKgAdapter> {
        &self.adapter
    }

    /// Apply a scored candidate now
    pub fn update(
        &self,
        candidate: &PersonalCandidate,
        pcs: &PcsResult,
        tx: &mut Transaction,
    ) -> KgResult<PersonalProcessResult> {
        self.update_at(candidate, pcs, Utc::now(), tx)
    }

    /// Apply a scored candidate at an explicit time
    pub fn update_at(
        &self,
        candidate: &PersonalCandidate,
        pcs: &PcsResult,
        now: DateTime<Utc>,
        tx: &mut Transaction,
    ) -> KgResult<PersonalProcessResult> {
        match self.adapter.get_relation(&candidate.key()) {
            None => self.create_new(candidate, pcs, now, tx),
            Some(existing) => self.update_existing(existing, candidate, pcs, now, tx),
        }
    }

    fn create_new(
        &self,
        candidate: &PersonalCandidate,
        pcs: &PcsResult,
        now: DateTime<Utc>,
        tx: &mut Transaction,
    ) -> KgResult<PersonalProcessResult> {
        let weight = pcs.pcs_score * pcs.personal_label.weight_multiplier();
        let relation = PersonalRelation {
            relation_id: RelationId::generate("prel"),
            head_id: candidate.head_id.clone(),
            head_name: candidate.head_name.clone(),
            tail_id: candidate.tail_id.clone(),
            tail_name: candidate.tail_name.clone(),
            relation_type: candidate.relation_type,
            sign: candidate.polarity,
            user_id: candidate.user_id.clone(),
            pcs_score: pcs.pcs_score,
            personal_weight: weight,
            personal_label: pcs.personal_label,
            occurrence_count: 1,
            source_type: candidate.source_type,
            relevance_types: vec![candidate.relevance_type],
            history: vec![HistoryEvent {
                timestamp: now,
                action: HistoryAction::Created,
                pcs_score: Some(pcs.pcs_score),
                occurrence: Some(1),
                fragment: fragment_prefix(candidate),
                domain_relation_id: None,
            }],
            pcs_history: vec![PcsSample {
                timestamp: now,
                pcs_score: pcs.pcs_score,
            }],
            // A negative proximity factor means the Domain graph holds the
            // opposite sign for this key.
            domain_conflict_count: (pcs.domain_proximity < 0.0) as u32,
            promotion_candidate: false,
            drift_flag: false,
            created_at: now,
            last_occurred_at: now,
        };

        self.adapter.upsert_relation_tx(&relation, tx)?;
        tracing::info!(relation = %relation.relation_id, key = %relation.key(), "created personal relation");

        Ok(PersonalProcessResult {
            candidate_id: candidate.candidate_id.clone(),
            raw_edge_id: candidate.raw_edge_id.clone(),
            relation_id: relation.relation_id,
            is_new: true,
            pcs: pcs.clone(),
        })
    }

    fn update_existing(
        &self,
        mut relation: PersonalRelation,
        candidate: &PersonalCandidate,
        pcs: &PcsResult,
        now: DateTime<Utc>,
        tx: &mut Transaction,
    ) -> KgResult<PersonalProcessResult> {
        relation.occurrence_count += 1;
        relation.last_occurred_at = now;
        if pcs.domain_proximity < 0.0 {
            relation.domain_conflict_count += 1;
        }

        let new_weight = pcs.pcs_score * pcs.personal_label.weight_multiplier();
        relation.personal_weight = relation.personal_weight * EMA_KEEP + new_weight * EMA_BLEND;
        relation.pcs_score = relation.pcs_score * EMA_KEEP + pcs.pcs_score * EMA_BLEND;
        relation.personal_label = PersonalLabel::from_score(relation.pcs_score);

        if !relation.relevance_types.contains(&candidate.relevance_type) {
            relation.relevance_types.push(candidate.relevance_type);
        }

        relation.history.push(HistoryEvent {
            timestamp: now,
            action: HistoryAction::Updated,
            pcs_score: Some(pcs.pcs_score),
            occurrence: Some(relation.occurrence_count),
            fragment: fragment_prefix(candidate),
            domain_relation_id: None,
        });
        relation.pcs_history.push(PcsSample {
            timestamp: now,
            pcs_score: relation.pcs_score,
        });

        self.adapter.upsert_relation_tx(&relation, tx)?;
        tracing::info!(
            relation = %relation.relation_id,
            occurrences = relation.occurrence_count,
            "updated personal relation"
        );

        Ok(PersonalProcessResult {
            candidate_id: candidate.candidate_id.clone(),
            raw_edge_id: candidate.raw_edge_id.clone(),
            relation_id: relation.relation_id.clone(),
            is_new: false,
            pcs: pcs.clone(),
        })
    }
}

fn fragment_prefix(candidate: &PersonalCandidate) -> Option<String> {
    candidate
        .fragment_text
        .as_ref()
        .map(|t| t.chars().take(FRAGMENT_PREFIX_LEN).collect())
}
