// Copyright 2025 Cowboy AI, LLC.

//! Graph repository abstraction
//!
//! The minimal storage surface both KG adapters depend on: typed entity and
//! relation rows, shallow prop merges, and O(deg) neighbour queries. No
//! domain logic lives behind this trait.

use serde_json::{Map, Value};

use crate::errors::KgResult;

/// Property bag stored on entities and relations.
///
/// Typed relation structs serialize into this at the adapter boundary; the
/// repository itself never interprets prop contents.
pub type PropMap = Map<String, Value>;

/// A stored entity row
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Canonical entity id
    pub id: String,
    /// Label namespace(s), e.g. `DomainEntity`, `PersonalEntity`
    pub labels: Vec<String>,
    /// Merged properties
    pub props: PropMap,
}

/// A stored relation row
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRecord {
    /// Source entity id
    pub src_id: String,
    /// Namespaced relation type, e.g. `domain:Affect`
    pub rel_type: String,
    /// Destination entity id
    pub dst_id: String,
    /// Merged properties
    pub props: PropMap,
}

/// Traversal direction for neighbour queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Outgoing edges only
    Out,
    /// Incoming edges only
    In,
    /// Both directions
    Both,
}

/// One neighbour of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Namespaced relation type of the connecting edge
    pub rel_type: String,
    /// The entity on the other side
    pub other_id: String,
    /// Direction of the connecting edge relative to the queried entity
    pub direction: Direction,
    /// Edge properties
    pub props: PropMap,
}

/// Storage surface shared by the Domain and Personal adapters.
///
/// Upserts merge props shallowly into an existing row rather than replacing
/// it. Read misses return `None`; only actual storage failures error.
/// `delete_entity` cascades to every relation incident to the entity.
pub trait GraphRepository: Send + Sync {
    /// Create an entity or merge props into an existing one
    fn upsert_entity(&self, entity_id: &str, labels: &[String], props: PropMap) -> KgResult<()>;

    /// Create a relation or merge props into an existing one
    fn upsert_relation(
        &self,
        src_id: &str,
        rel_type: &str,
        dst_id: &str,
        props: PropMap,
    ) -> KgResult<()>;

    /// Fetch an entity row
    fn get_entity(&self, entity_id: &str) -> Option<EntityRecord>;

    /// Fetch a relation row by its exact `(src, type, dst)` triple
    fn get_relation(&self, src_id: &str, rel_type: &str, dst_id: &str) -> Option<RelationRecord>;

    /// Neighbours of an entity, optionally filtered by relation type
    fn get_neighbors(
        &self,
        entity_id: &str,
        rel_type: Option<&str>,
        direction: Direction,
    ) -> Vec<Neighbor>;

    /// All entity rows
    fn get_all_entities(&self) -> Vec<EntityRecord>;

    /// All relation rows
    fn get_all_relations(&self) -> Vec<RelationRecord>;

    /// Delete an entity and every relation touching it; false if absent
    fn delete_entity(&self, entity_id: &str) -> KgResult<bool>;

    /// Delete one relation; false if absent
    fn delete_relation(&self, src_id: &str, rel_type: &str, dst_id: &str) -> KgResult<bool>;

    /// Remove every row
    fn clear(&self) -> KgResult<()>;

    /// Number of entity rows
    fn count_entities(&self) -> usize;

    /// Number of relation rows
    fn count_relations(&self) -> usize;
}

/// Build a [`PropMap`] from `(key, value)` pairs
pub fn props(pairs: Vec<(&str, Value)>) -> PropMap {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
