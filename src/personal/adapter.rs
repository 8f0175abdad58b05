// Copyright 2025 Cowboy AI, LLC.

//! Personal KG adapter
//!
//! Persists `PersonalRelation` rows under the `PersonalEntity` label and the
//! `personal:<type>` namespace. There is deliberately no delete method on
//! this adapter: personal knowledge only accumulates.

use serde_json::Value;
use std::sync::Arc;

use super::models::{PersonalLabel, PersonalRelation};
use crate::errors::{KgError, KgResult};
use crate::identifiers::{RelationId, RelationKey, UserId};
use crate::repository::{GraphRepository, PropMap, Transaction};

/// Label for entities owned by the Personal KG
pub const PERSONAL_ENTITY_LABEL: &str = "PersonalEntity";
/// Relation-type namespace prefix for the Personal KG
pub const PERSONAL_NS: &str = "personal";

/// Non-owning view of the repository scoped to the Personal namespace
pub struct PersonalKgAdapter {
    repo: Arc<dyn GraphRepository>,
}

impl PersonalKgAdapter {
    /// Create an adapter over the shared repository
    pub fn new(repo: Arc<dyn GraphRepository>) -> Self {
        Self { repo }
    }

    fn scoped(rel_type: &crate::edge::RelationType) -> String {
        format!("{PERSONAL_NS}:{}", rel_type.as_str())
    }

    fn relation_props(relation: &PersonalRelation) -> KgResult<PropMap> {
        match serde_json::to_value(relation)? {
            Value::Object(map) => Ok(map),
            _ => Err(KgError::Serialization(
                "personal relation did not serialize to an object".into(),
            )),
        }
    }

    fn entity_props(name: &str) -> PropMap {
        let mut props = PropMap::new();
        props.insert("name".to_string(), Value::String(name.to_string()));
        props
    }

    /// Persist a relation inside a caller transaction
    pub fn upsert_relation_tx(
        &self,
        relation: &PersonalRelation,
        tx: &mut Transaction,
    ) -> KgResult<()> {
        let labels = [PERSONAL_ENTITY_LABEL.to_string()];
        tx.upsert_entity(
            &relation.head_id,
            &labels,
            Self::entity_props(&relation.head_name),
        )?;
        tx.upsert_entity(
            &relation.tail_id,
            &labels,
            Self::entity_props(&relation.tail_name),
        )?;
        tx.upsert_relation(
            &relation.head_id,
            &Self::scoped(&relation.relation_type),
            &relation.tail_id,
            Self::relation_props(relation)?,
        )?;
        tracing::debug!(relation = %relation.relation_id, "upserted personal relation");
        Ok(())
    }

    /// Persist a relation directly
    pub fn upsert_relation(&self, relation: &PersonalRelation) -> KgResult<()> {
        let labels = [PERSONAL_ENTITY_LABEL.to_string()];
        self.repo.upsert_entity(
            &relation.head_id,
            &labels,
            Self::entity_props(&relation.head_name),
        )?;
        self.repo.upsert_entity(
            &relation.tail_id,
            &labels,
            Self::entity_props(&relation.tail_name),
        )?;
        self.repo.upsert_relation(
            &relation.head_id,
            &Self::scoped(&relation.relation_type),
            &relation.tail_id,
            Self::relation_props(relation)?,
        )
    }

    /// Fetch a relation by key
    pub fn get_relation(&self, key: &RelationKey) -> Option<PersonalRelation> {
        let record =
            self.repo
                .get_relation(&key.head_id, &Self::scoped(&key.relation_type), &key.tail_id)?;
        serde_json::from_value(Value::Object(record.props)).ok()
    }

    /// Fetch a relation by row id
    pub fn get_relation_by_id(&self, relation_id: &RelationId) -> Option<PersonalRelation> {
        self.all_relations()
            .into_iter()
            .find(|rel| &rel.relation_id == relation_id)
    }

    /// Every relation in the Personal namespace
    pub fn all_relations(&self) -> Vec<PersonalRelation> {
        let prefix = format!("{PERSONAL_NS}:");
        self.repo
            .get_all_relations()
            .into_iter()
            .filter(|rec| rec.rel_type.starts_with(&prefix))
            .filter_map(|rec| serde_json::from_value(Value::Object(rec.props)).ok())
            .collect()
    }

    /// Relations owned by one user
    pub fn user_relations(&self, user_id: &UserId) -> Vec<PersonalRelation> {
        self.all_relations()
            .into_iter()
            .filter(|rel| &rel.user_id == user_id)
            .collect()
    }

    /// Relations currently labelled strong beliefs
    pub fn strong_beliefs(&self) -> Vec<PersonalRelation> {
        self.all_relations()
            .into_iter()
            .filter(|rel| rel.personal_label == PersonalLabel::StrongBelief)
            .collect()
    }

    /// (strong, weak, noisy) counts
    pub fn label_counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for rel in self.all_relations() {
            match rel.personal_label {
                PersonalLabel::StrongBelief => counts.0 += 1,
                PersonalLabel::WeakBelief => counts.1 += 1,
                PersonalLabel::NoisyHypothesis => counts.2 += 1,
            }
        }
        counts
    }

    /// The underlying repository handle
    pub fn repository(&self) -> Arc<dyn GraphRepository> {
        Arc::clone(&self.repo)
    }
}
