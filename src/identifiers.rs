// Copyright 2025 Cowboy AI, LLC.

//! Identifier newtypes used across the knowledge graphs
//!
//! Entity ids are canonical strings chosen by the external resolver; the
//! remaining ids are generated. Newtypes keep the different id spaces from
//! being mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::edge::RelationType;

fn short_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..8])
}

/// Identifier of a stored relation row (e.g. `drel_1a2b3c4d`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationId(String);

impl RelationId {
    /// Generate a fresh id with the given prefix
    pub fn generate(prefix: &str) -> Self {
        Self(short_id(prefix))
    }

    /// Wrap an existing id string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction identifier (e.g. `tx_9f8e7d6c`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(String);

impl TxId {
    /// Generate a fresh transaction id
    pub fn generate() -> Self {
        Self(short_id("tx"))
    }

    /// The underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a text fragment produced by the external extractor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentId(String);

impl FragmentId {
    /// Wrap an existing fragment id
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a reasoning query (e.g. `qry_0badc0de`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryId(String);

impl QueryId {
    /// Generate a fresh query id
    pub fn generate() -> Self {
        Self(short_id("qry"))
    }

    /// The underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner of a Personal KG partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap a user id string
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The default single-user partition
    pub fn default_user() -> Self {
        Self("default_user".to_string())
    }

    /// The underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The logical key of a relation in either KG: `(head, tail, relation_type)`
///
/// Both graphs hold at most one relation row per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationKey {
    /// Canonical head entity id
    pub head_id: String,
    /// Canonical tail entity id
    pub tail_id: String,
    /// Relation type from the closed set
    pub relation_type: RelationType,
}

impl RelationKey {
    /// Build a key
    pub fn new(
        head_id: impl Into<String>,
        tail_id: impl Into<String>,
        relation_type: RelationType,
    ) -> Self {
        Self {
            head_id: head_id.into(),
            tail_id: tail_id.into(),
            relation_type,
        }
    }

    /// The entity pair, used by the static rulebook which keys on
    /// `(head, tail)` regardless of relation type
    pub fn pair(&self) -> (&str, &str) {
        (&self.head_id, &self.tail_id)
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{}]-> {}",
            self.head_id,
            self.relation_type.as_str(),
            self.tail_id
        )
    }
}
