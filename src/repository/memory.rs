// Copyright 2025 Cowboy AI, LLC.

//! In-memory graph repository
//!
//! The default backend: index-backed maps behind one `RwLock`. Outgoing and
//! incoming edge lists per entity keep neighbour queries at O(deg).
//! Iteration order is insertion order, which keeps tests deterministic.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::RwLock;

use super::graph::{
    Direction, EntityRecord, GraphRepository, Neighbor, PropMap, RelationRecord,
};
use crate::errors::{KgError, KgResult};

type RelTriple = (String, String, String);

#[derive(Default)]
struct Store {
    entities: IndexMap<String, EntityRecord>,
    relations: IndexMap<RelTriple, PropMap>,
    // entity id -> [(rel_type, dst_id)]
    edges_out: HashMap<String, Vec<(String, String)>>,
    // entity id -> [(rel_type, src_id)]
    edges_in: HashMap<String, Vec<(String, String)>>,
}

/// Index-backed in-memory [`GraphRepository`]
#[derive(Default)]
pub struct InMemoryGraphRepository {
    store: RwLock<Store>,
}

impl InMemoryGraphRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> KgResult<std::sync::RwLockReadGuard<'_, Store>> {
        self.store
            .read()
            .map_err(|_| KgError::storage("read", "repository lock poisoned"))
    }

    fn write(&self, op: &str) -> KgResult<std::sync::RwLockWriteGuard<'_, Store>> {
        self.store
            .write()
            .map_err(|_| KgError::storage(op, "repository lock poisoned"))
    }
}

impl GraphRepository for InMemoryGraphRepository {
    fn upsert_entity(&self, entity_id: &str, labels: &[String], props: PropMap) -> KgResult<()> {
        let mut store = self.write("upsert_entity")?;
        match store.entities.get_mut(entity_id) {
            Some(existing) => {
                existing.labels = labels.to_vec();
                for (k, v) in props {
                    existing.props.insert(k, v);
                }
            }
            None => {
                store.entities.insert(
                    entity_id.to_string(),
                    EntityRecord {
                        id: entity_id.to_string(),
                        labels: labels.to_vec(),
                        props,
                    },
                );
            }
        }
        Ok(())
    }

    fn upsert_relation(
        &self,
        src_id: &str,
        rel_type: &str,
        dst_id: &str,
        props: PropMap,
    ) -> KgResult<()> {
        let mut store = self.write("upsert_relation")?;
        let key = (
            src_id.to_string(),
            rel_type.to_string(),
            dst_id.to_string(),
        );
        match store.relations.get_mut(&key) {
            Some(existing) => {
                for (k, v) in props {
                    existing.insert(k, v);
                }
            }
            None => {
                store.relations.insert(key, props);
                store
                    .edges_out
                    .entry(src_id.to_string())
                    .or_default()
                    .push((rel_type.to_string(), dst_id.to_string()));
                store
                    .edges_in
                    .entry(dst_id.to_string())
                    .or_default()
                    .push((rel_type.to_string(), src_id.to_string()));
            }
        }
        Ok(())
    }

    fn get_entity(&self, entity_id: &str) -> Option<EntityRecord> {
        self.read().ok()?.entities.get(entity_id).cloned()
    }

    fn get_relation(&self, src_id: &str, rel_type: &str, dst_id: &str) -> Option<RelationRecord> {
        let store = self.read().ok()?;
        let key = (
            src_id.to_string(),
            rel_type.to_string(),
            dst_id.to_string(),
        );
        store.relations.get(&key).map(|props| RelationRecord {
            src_id: src_id.to_string(),
            rel_type: rel_type.to_string(),
            dst_id: dst_id.to_string(),
            props: props.clone(),
        })
    }

    fn get_neighbors(
        &self,
        entity_id: &str,
        rel_type: Option<&str>,
        direction: Direction,
    ) -> Vec<Neighbor> {
        let Ok(store) = self.read() else {
            return Vec::new();
        };
        let mut results = Vec::new();

        if matches!(direction, Direction::Out | Direction::Both) {
            for (rtype, dst) in store.edges_out.get(entity_id).into_iter().flatten() {
                if rel_type.is_some_and(|want| want != rtype) {
                    continue;
                }
                let key = (entity_id.to_string(), rtype.clone(), dst.clone());
                results.push(Neighbor {
                    rel_type: rtype.clone(),
                    other_id: dst.clone(),
                    direction: Direction::Out,
                    props: store.relations.get(&key).cloned().unwrap_or_default(),
                });
            }
        }

        if matches!(direction, Direction::In | Direction::Both) {
            for (rtype, src) in store.edges_in.get(entity_id).into_iter().flatten() {
                if rel_type.is_some_and(|want| want != rtype) {
                    continue;
                }
                let key = (src.clone(), rtype.clone(), entity_id.to_string());
                results.push(Neighbor {
                    rel_type: rtype.clone(),
                    other_id: src.clone(),
                    direction: Direction::In,
                    props: store.relations.get(&key).cloned().unwrap_or_default(),
                });
            }
        }

        results
    }

    fn get_all_entities(&self) -> Vec<EntityRecord> {
        self.read()
            .map(|s| s.entities.values().cloned().collect())
            .unwrap_or_default()
    }

    fn get_all_relations(&self) -> Vec<RelationRecord> {
        self.read()
            .map(|s| {
                s.relations
                    .iter()
                    .map(|((src, rtype, dst), props)| RelationRecord {
                        src_id: src.clone(),
                        rel_type: rtype.clone(),
                        dst_id: dst.clone(),
                        props: props.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn delete_entity(&self, entity_id: &str) -> KgResult<bool> {
        let mut store = self.write("delete_entity")?;
        if store.entities.shift_remove(entity_id).is_none() {
            return Ok(false);
        }

        // Cascade: drop every relation touching the entity.
        let doomed: Vec<RelTriple> = store
            .relations
            .keys()
            .filter(|(src, _, dst)| src == entity_id || dst == entity_id)
            .cloned()
            .collect();
        for key in &doomed {
            store.relations.shift_remove(key);
        }

        store.edges_out.remove(entity_id);
        store.edges_in.remove(entity_id);
        for list in store.edges_out.values_mut() {
            list.retain(|(_, dst)| dst != entity_id);
        }
        for list in store.edges_in.values_mut() {
            list.retain(|(_, src)| src != entity_id);
        }

        Ok(true)
    }

    fn delete_relation(&self, src_id: &str, rel_type: &str, dst_id: &str) -> KgResult<bool> {
        let mut store = self.write("delete_relation")?;
        let key = (
            src_id.to_string(),
            rel_type.to_string(),
            dst_id.to_string(),
        );
        if store.relations.shift_remove(&key).is_none() {
            return Ok(false);
        }
        if let Some(list) = store.edges_out.get_mut(src_id) {
            list.retain(|(rtype, dst)| !(rtype == rel_type && dst == dst_id));
        }
        if let Some(list) = store.edges_in.get_mut(dst_id) {
            list.retain(|(rtype, src)| !(rtype == rel_type && src == src_id));
        }
        Ok(true)
    }

    fn clear(&self) -> KgResult<()> {
        let mut store = self.write("clear")?;
        *store = Store::default();
        Ok(())
    }

    fn count_entities(&self) -> usize {
        self.read().map(|s| s.entities.len()).unwrap_or(0)
    }

    fn count_relations(&self) -> usize {
        self.read().map(|s| s.relations.len()).unwrap_or(0)
    }
}
