// Copyright 2025 Cowboy AI, LLC.

//! Domain KG adapter
//!
//! Persists `DynamicRelation` rows through the shared repository under the
//! `DomainEntity` label and the `domain:<type>` relation namespace. Typed
//! structs serialize to the prop bag here and nowhere else.
//!
//! The Domain graph is bootstrapped from static files and is runtime
//! read-only for destructive operations: deletes require `force` (the
//! offline learning path).

use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::models::DynamicRelation;
use crate::errors::{KgError, KgResult};
use crate::identifiers::{RelationId, RelationKey};
use crate::repository::{Direction, GraphRepository, PropMap, Transaction};

/// Label for entities owned by the Domain KG
pub const DOMAIN_ENTITY_LABEL: &str = "DomainEntity";
/// Relation-type namespace prefix for the Domain KG
pub const DOMAIN_NS: &str = "domain";

#[derive(serde::Deserialize)]
struct BootstrapEntity {
    id: String,
    #[serde(default)]
    props: PropMap,
}

#[derive(serde::Deserialize)]
struct BootstrapRelation {
    head_id: String,
    tail_id: String,
    #[serde(rename = "type")]
    rel_type: String,
    #[serde(default)]
    props: PropMap,
}

/// Non-owning view of the repository scoped to the Domain namespace
pub struct DomainKgAdapter {
    repo: Arc<dyn GraphRepository>,
    gold: Mutex<HashSet<RelationKey>>,
    read_only: bool,
}

impl DomainKgAdapter {
    /// Create an adapter over the shared repository
    pub fn new(repo: Arc<dyn GraphRepository>) -> Self {
        Self {
            repo,
            gold: Mutex::new(HashSet::new()),
            read_only: true,
        }
    }

    /// Allow destructive operations without `force` (offline tooling only)
    pub fn writable(mut self) -> Self {
        self.read_only = false;
        self
    }

    fn scoped(rel_type: &crate::edge::RelationType) -> String {
        format!("{DOMAIN_NS}:{}", rel_type.as_str())
    }

    /// Load `entities.json` and `relations.json` from a bootstrap directory.
    ///
    /// Returns `(entities_loaded, relations_loaded)`. A missing directory is
    /// tolerated (the graph starts empty); malformed files are not.
    pub fn load_bootstrap(&self, dir: impl AsRef<Path>) -> KgResult<(usize, usize)> {
        let dir = dir.as_ref();
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "domain bootstrap directory not found");
            return Ok((0, 0));
        }

        let mut entity_count = 0;
        let entities_file = dir.join("entities.json");
        if entities_file.exists() {
            let raw = std::fs::read_to_string(&entities_file)
                .map_err(|e| KgError::config("entities.json", e.to_string()))?;
            let entities: Vec<BootstrapEntity> = serde_json::from_str(&raw)
                .map_err(|e| KgError::config("entities.json", e.to_string()))?;
            for ent in entities {
                self.repo.upsert_entity(
                    &ent.id,
                    &[DOMAIN_ENTITY_LABEL.to_string()],
                    ent.props,
                )?;
                entity_count += 1;
            }
        }

        let mut relation_count = 0;
        let relations_file = dir.join("relations.json");
        if relations_file.exists() {
            let raw = std::fs::read_to_string(&relations_file)
                .map_err(|e| KgError::config("relations.json", e.to_string()))?;
            let relations: Vec<BootstrapRelation> = serde_json::from_str(&raw)
                .map_err(|e| KgError::config("relations.json", e.to_string()))?;
            for rel in relations {
                let mut props = rel.props;
                props.entry("relation_id".to_string()).or_insert_with(|| {
                    Value::String(format!("{}_{}_{}", rel.head_id, rel.rel_type, rel.tail_id))
                });
                let scoped_type = format!("{DOMAIN_NS}:{}", rel.rel_type);
                self.repo
                    .upsert_relation(&rel.head_id, &scoped_type, &rel.tail_id, props)?;
                relation_count += 1;
            }
        }

        tracing::info!(
            entities = entity_count,
            relations = relation_count,
            "domain bootstrap loaded"
        );
        Ok((entity_count, relation_count))
    }

    fn relation_props(relation: &DynamicRelation) -> KgResult<PropMap> {
        match serde_json::to_value(relation)? {
            Value::Object(map) => Ok(map),
            _ => Err(KgError::Serialization(
                "dynamic relation did not serialize to an object".into(),
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
        relation: &DynamicRelation,
        tx: &mut Transaction,
    ) -> KgResult<()> {
        let labels = [DOMAIN_ENTITY_LABEL.to_string()];
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
        tracing::debug!(relation = %relation.relation_id, "upserted domain relation");
        Ok(())
    }

    /// Persist a relation directly (bootstrap/offline paths)
    pub fn upsert_relation(&self, relation: &DynamicRelation) -> KgResult<()> {
        let labels = [DOMAIN_ENTITY_LABEL.to_string()];
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
    pub fn get_relation(&self, key: &RelationKey) -> Option<DynamicRelation> {
        let record =
            self.repo
                .get_relation(&key.head_id, &Self::scoped(&key.relation_type), &key.tail_id)?;
        serde_json::from_value(Value::Object(record.props)).ok()
    }

    /// Fetch a relation by row id (linear scan over the namespace)
    pub fn get_relation_by_id(&self, relation_id: &RelationId) -> Option<DynamicRelation> {
        self.all_relations()
            .into_iter()
            .find(|rel| &rel.relation_id == relation_id)
    }

    /// Every relation in the Domain namespace
    pub fn all_relations(&self) -> Vec<DynamicRelation> {
        let prefix = format!("{DOMAIN_NS}:");
        self.repo
            .get_all_relations()
            .into_iter()
            .filter(|rec| rec.rel_type.starts_with(&prefix))
            .filter_map(|rec| serde_json::from_value(Value::Object(rec.props)).ok())
            .collect()
    }

    /// Relations on the given `(head, tail)` pair, any relation type
    pub fn pair_relations(&self, head_id: &str, tail_id: &str) -> Vec<DynamicRelation> {
        let prefix = format!("{DOMAIN_NS}:");
        self.repo
            .get_neighbors(head_id, None, Direction::Out)
            .into_iter()
            .filter(|n| n.other_id == tail_id && n.rel_type.starts_with(&prefix))
            .filter_map(|n| serde_json::from_value(Value::Object(n.props)).ok())
            .collect()
    }

    /// Delete a relation; refused while runtime read-only unless forced
    pub fn delete_relation(&self, key: &RelationKey, force: bool) -> KgResult<bool> {
        if self.read_only && !force {
            tracing::warn!(%key, "blocked delete of domain relation (runtime read-only)");
            return Ok(false);
        }
        self.repo
            .delete_relation(&key.head_id, &Self::scoped(&key.relation_type), &key.tail_id)
    }

    /// Mark a relation as human-curated gold
    pub fn mark_gold(&self, key: RelationKey) {
        if let Ok(mut gold) = self.gold.lock() {
            gold.insert(key);
        }
    }

    /// Whether the key carries the gold flag
    pub fn is_gold(&self, key: &RelationKey) -> bool {
        self.gold.lock().map(|g| g.contains(key)).unwrap_or(false)
    }

    /// Entity and relation counts visible through this adapter's repository
    pub fn stats(&self) -> (usize, usize) {
        (self.repo.count_entities(), self.repo.count_relations())
    }

    /// The underlying repository handle
    pub fn repository(&self) -> Arc<dyn GraphRepository> {
        Arc::clone(&self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Polarity, RelationType};
    use crate::repository::{InMemoryGraphRepository, TransactionManager};
    use crate::tags::SemanticTag;
    use chrono::Utc;

    fn relation(head: &str, tail: &str, sign: Polarity) -> DynamicRelation {
        DynamicRelation {
            relation_id: RelationId::generate("drel"),
            head_id: head.into(),
            head_name: head.replace('_', " "),
            tail_id: tail.into(),
            tail_name: tail.replace('_', " "),
            relation_type: RelationType::Affect,
            sign,
            domain_conf: 0.5,
            evidence_count: 1,
            conflict_count: 0,
            created_at: Utc::now(),
            last_update: Utc::now(),
            semantic_tags: vec![SemanticTag::SemConfident],
            decay_applied: false,
            drift_flag: false,
            need_conflict_resolution: false,
            origin: "student".into(),
        }
    }

    fn setup() -> (Arc<InMemoryGraphRepository>, DomainKgAdapter) {
        let repo = Arc::new(InMemoryGraphRepository::new());
        let adapter = DomainKgAdapter::new(repo.clone() as Arc<dyn GraphRepository>);
        (repo, adapter)
    }

    #[test]
    fn relation_round_trips_through_props() {
        let (_, adapter) = setup();
        let rel = relation("Inflation", "Interest_Rate", Polarity::Positive);
        adapter.upsert_relation(&rel).unwrap();

        let loaded = adapter.get_relation(&rel.key()).unwrap();
        assert_eq!(loaded, rel);
    }

    #[test]
    fn entities_carry_domain_label_and_name() {
        let (repo, adapter) = setup();
        adapter
            .upsert_relation(&relation("Oil_Price", "Airline_Costs", Polarity::Positive))
            .unwrap();

        let head = repo.get_entity("Oil_Price").unwrap();
        assert_eq!(head.labels, vec![DOMAIN_ENTITY_LABEL.to_string()]);
        assert_eq!(
            head.props.get("name"),
            Some(&Value::String("Oil Price".into()))
        );
    }

    #[test]
    fn transactional_upsert_rolls_back_cleanly() {
        let (repo, adapter) = setup();
        let mgr = TransactionManager::new(repo.clone() as Arc<dyn GraphRepository>);
        let rel = relation("A", "B", Polarity::Positive);

        let result: KgResult<()> = mgr.run(|tx| {
            adapter.upsert_relation_tx(&rel, tx)?;
            Err(KgError::Validation("abort".into()))
        });
        assert!(result.is_err());
        assert!(adapter.get_relation(&rel.key()).is_none());
        assert_eq!(repo.count_entities(), 0);
    }

    #[test]
    fn namespace_filter_hides_personal_rows() {
        let (repo, adapter) = setup();
        adapter
            .upsert_relation(&relation("A", "B", Polarity::Positive))
            .unwrap();
        repo.upsert_relation("A", "personal:Affect", "C", PropMap::new())
            .unwrap();

        assert_eq!(adapter.all_relations().len(), 1);
        assert!(adapter.pair_relations("A", "C").is_empty());
    }

    #[test]
    fn runtime_delete_requires_force() {
        let (_, adapter) = setup();
        let rel = relation("A", "B", Polarity::Positive);
        adapter.upsert_relation(&rel).unwrap();

        assert!(!adapter.delete_relation(&rel.key(), false).unwrap());
        assert!(adapter.get_relation(&rel.key()).is_some());

        assert!(adapter.delete_relation(&rel.key(), true).unwrap());
        assert!(adapter.get_relation(&rel.key()).is_none());
    }

    #[test]
    fn gold_flags_are_per_key() {
        let (_, adapter) = setup();
        let key = RelationKey::new("A", "B", RelationType::Affect);
        assert!(!adapter.is_gold(&key));
        adapter.mark_gold(key.clone());
        assert!(adapter.is_gold(&key));
        assert!(!adapter.is_gold(&RelationKey::new("A", "B", RelationType::Cause)));
    }

    #[test]
    fn get_relation_by_id_scans_namespace() {
        let (_, adapter) = setup();
        let rel = relation("X", "Y", Polarity::Negative);
        adapter.upsert_relation(&rel).unwrap();
        let found = adapter.get_relation_by_id(&rel.relation_id).unwrap();
        assert_eq!(found.key(), rel.key());
    }
}
