// Copyright 2025 Cowboy AI, LLC.

//! Reasoning data model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::edge::{Polarity, RelationType};
use crate::identifiers::{QueryId, RelationId};
use crate::tags::SemanticTag;

/// Lexical classification of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// "what does A do to B"
    DirectRelation,
    /// "if A rises, what happens to B"
    Conditioned,
    /// "why did B fall"
    Causal,
    /// "where is B headed"
    Predictive,
    /// "A versus B"
    Comparison,
    /// None of the patterns matched
    Unknown,
}

/// A parsed question with localised entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Query id
    pub query_id: QueryId,
    /// The question as asked
    pub original_query: String,
    /// Canonical entity ids in order of appearance
    pub entities: Vec<String>,
    /// Canonical id → display name
    pub entity_names: HashMap<String, String>,
    /// Lexical classification
    pub query_type: QueryType,
    /// Reasoning start entity
    pub head_entity: Option<String>,
    /// Reasoning target entity
    pub tail_entity: Option<String>,
    /// Entities treated as conditions
    pub condition_entities: Vec<String>,
}

/// Which graph an edge was retrieved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSource {
    /// The shared Domain KG
    Domain,
    /// The per-user Personal KG
    Personal,
}

/// One edge pulled out of a graph for reasoning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedEdge {
    /// Stored row id
    pub relation_id: RelationId,
    /// Head entity
    pub head_id: String,
    /// Tail entity
    pub tail_id: String,
    /// Relation type
    pub relation_type: RelationType,
    /// Edge sign
    pub sign: Polarity,
    /// Domain confidence (0 for personal edges)
    pub domain_conf: f64,
    /// PCS score (0 for domain edges)
    pub pcs_score: f64,
    /// Personal weight (0 for domain edges)
    pub personal_weight: f64,
    /// Supporting evidence count
    pub evidence_count: u32,
    /// Representative semantic tag
    pub semantic_tag: SemanticTag,
    /// Whether decay has been applied to the relation
    pub decay_applied: bool,
    /// Whether the relation carries the gold flag
    pub gold_flag: bool,
    /// Whether a Domain row also exists for a personal edge's key
    pub has_domain_instance: bool,
    /// Source graph
    pub source: EdgeSource,
}

/// A retrieved path through one of the graphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPath {
    /// Node sequence, head first
    pub nodes: Vec<String>,
    /// Display names for the node sequence
    pub node_names: Vec<String>,
    /// Edge sequence
    pub edges: Vec<RetrievedEdge>,
    /// Source graph
    pub source: EdgeSource,
}

impl RetrievedPath {
    /// Number of edges on the path
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the path carries no edges
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Retrieval output for one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Single-edge paths
    pub direct_paths: Vec<RetrievedPath>,
    /// Multi-edge paths
    pub indirect_paths: Vec<RetrievedPath>,
    /// Paths sourced from Domain
    pub domain_paths: usize,
    /// Paths sourced from Personal
    pub personal_paths: usize,
}

impl RetrievalResult {
    /// All paths, direct first
    pub fn all_paths(&self) -> Vec<RetrievedPath> {
        self.direct_paths
            .iter()
            .chain(self.indirect_paths.iter())
            .cloned()
            .collect()
    }

    /// Total path count
    pub fn path_count(&self) -> usize {
        self.direct_paths.len() + self.indirect_paths.len()
    }
}

/// One edge after EES weight fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedEdge {
    /// Stored row id
    pub relation_id: RelationId,
    /// Head entity
    pub head_id: String,
    /// Tail entity
    pub tail_id: String,
    /// Edge sign
    pub sign: Polarity,
    /// Domain contribution W_D
    pub domain_weight: f64,
    /// Personal contribution W_P
    pub personal_weight: f64,
    /// Final fused weight W
    pub final_weight: f64,
    /// Semantic score used
    pub semantic_score: f64,
    /// Whether the personal side was discounted for a Domain conflict
    pub personal_discounted: bool,
}

/// A path after fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedPath {
    /// Node sequence
    pub nodes: Vec<String>,
    /// Display names
    pub node_names: Vec<String>,
    /// Fused edges
    pub fused_edges: Vec<FusedEdge>,
    /// Multiplicative path weight
    pub path_weight: f64,
    /// Combined path sign; None when any edge sign is unknown
    pub path_sign: Option<Polarity>,
}

/// Direction of the aggregated answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningDirection {
    /// Net positive influence
    Positive,
    /// Net negative influence
    Negative,
    /// Evidence balances out
    Neutral,
    /// No usable evidence
    Unknown,
}

/// Aggregated reasoning output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResult {
    /// Query answered
    pub query_id: QueryId,
    /// Direction of the answer
    pub direction: ReasoningDirection,
    /// Confidence in [0,1]
    pub confidence: f64,
    /// Sum of positive path weights
    pub positive_evidence: f64,
    /// Sum of negative path weights
    pub negative_evidence: f64,
    /// Negative paths present alongside positive evidence
    pub conflicting_paths: usize,
    /// The heaviest path
    pub strongest_path: Option<FusedPath>,
    /// Paths that contributed evidence
    pub paths_used: usize,
}

impl ReasoningResult {
    /// An empty result for queries with no usable evidence
    pub fn unknown(query_id: QueryId) -> Self {
        Self {
            query_id,
            direction: ReasoningDirection::Unknown,
            confidence: 0.0,
            positive_evidence: 0.0,
            negative_evidence: 0.0,
            conflicting_paths: 0,
            strongest_path: None,
            paths_used: 0,
        }
    }
}

/// Verbal confidence band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceBand {
    /// < 0.2
    VeryLow,
    /// [0.2, 0.4)
    Low,
    /// [0.4, 0.6)
    Medium,
    /// [0.6, 0.8)
    High,
    /// ≥ 0.8
    VeryHigh,
}

impl ConfidenceBand {
    /// Band for a confidence value
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            ConfidenceBand::VeryHigh
        } else if confidence >= 0.6 {
            ConfidenceBand::High
        } else if confidence >= 0.4 {
            ConfidenceBand::Medium
        } else if confidence >= 0.2 {
            ConfidenceBand::Low
        } else {
            ConfidenceBand::VeryLow
        }
    }

    /// English rendering
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::VeryLow => "very low",
            ConfidenceBand::Low => "low",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::High => "high",
            ConfidenceBand::VeryHigh => "very high",
        }
    }
}

/// The rendered answer handed back to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conclusion {
    /// Query answered
    pub query_id: QueryId,
    /// The question as asked
    pub original_query: String,
    /// Main conclusion sentence(s)
    pub text: String,
    /// Supporting explanation
    pub explanation: String,
    /// Direction of the answer
    pub direction: ReasoningDirection,
    /// Confidence in [0,1]
    pub confidence: f64,
    /// Verbal confidence band
    pub confidence_band: ConfidenceBand,
    /// Node-sign-node rendering of the heaviest path
    pub strongest_path: String,
    /// Evidence split summary
    pub evidence_ratio: String,
    /// Paths that contributed evidence
    pub paths_used: usize,
}

/// One downstream effect estimated by the impact simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEstimate {
    /// Affected entity
    pub entity_id: String,
    /// Display name
    pub entity_name: String,
    /// Net signed impact accumulated over all contributing paths
    pub impact: f64,
    /// Shallowest depth at which the entity was reached
    pub depth: usize,
    /// Human-readable strongest contributing path
    pub via: String,
}
