// Copyright 2025 Cowboy AI, LLC.

//! Domain KG data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::edge::{Polarity, RelationType};
use crate::identifiers::{RelationId, RelationKey};
use crate::tags::SemanticTag;

/// Action chosen for a candidate while it moves through the Domain pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainAction {
    /// Candidate agrees with a static rule; counts as supporting evidence
    StrengthenStatic,
    /// Candidate contradicts the static rulebook; re-routed to Personal
    RejectToPersonal,
    /// Candidate is unusable for Domain and only logged
    RejectToLog,
    /// No relation exists for the key; create one
    CreateNew,
    /// Key exists; strengthen or weaken in place
    UpdateExisting,
    /// Update produced a sign conflict needing analysis
    TriggerConflict,
    /// Relation flagged as a drift candidate
    MarkDrift,
}

/// Kind of inconsistency the conflict analyzer found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Opposite polarity on the same key
    SignConflict,
    /// Same pair carrying a different relation type
    TypeConflict,
    /// Conflict only under certain conditions
    ConditionalConflict,
    /// An indirect path disagrees with the candidate's sign
    PathConflict,
}

/// How a Domain conflict is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Existing relation stands; candidate absorbed as conflict evidence
    KeepExisting,
    /// Existing relation replaced outright
    Replace,
    /// Merge both claims
    Merge,
    /// Candidate becomes a personal belief instead
    ToPersonal,
    /// Existing relation becomes a drift candidate
    ToDrift,
}

/// A mutable relation row in the Domain KG
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicRelation {
    /// Stable row id
    pub relation_id: RelationId,
    /// Canonical head entity id
    pub head_id: String,
    /// Display name of the head
    pub head_name: String,
    /// Canonical tail entity id
    pub tail_id: String,
    /// Display name of the tail
    pub tail_name: String,
    /// Relation type
    pub relation_type: RelationType,
    /// Current sign
    pub sign: Polarity,
    /// Confidence in [conf_floor, conf_cap]
    pub domain_conf: f64,
    /// Supporting evidence count (≥ 1)
    pub evidence_count: u32,
    /// Conflicting evidence count
    pub conflict_count: u32,
    /// When the row was created
    pub created_at: DateTime<Utc>,
    /// When the row last changed
    pub last_update: DateTime<Utc>,
    /// Semantic tags contributed by evidence, in arrival order
    pub semantic_tags: Vec<SemanticTag>,
    /// Whether time decay has ever been applied
    pub decay_applied: bool,
    /// Whether the drift detector flagged this relation
    pub drift_flag: bool,
    /// Whether an unresolved sign conflict is pending
    pub need_conflict_resolution: bool,
    /// Where the first evidence came from
    pub origin: String,
}

impl DynamicRelation {
    /// The logical key of this row
    pub fn key(&self) -> RelationKey {
        RelationKey::new(
            self.head_id.clone(),
            self.tail_id.clone(),
            self.relation_type,
        )
    }

    /// The semantic tag fusion should use: the strongest evidence seen
    pub fn representative_tag(&self) -> SemanticTag {
        self.semantic_tags
            .iter()
            .copied()
            .max_by(|a, b| {
                a.fusion_score()
                    .partial_cmp(&b.fusion_score())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(SemanticTag::SemConfident)
    }
}

/// A validated edge normalised for Domain evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCandidate {
    /// Candidate id
    pub candidate_id: String,
    /// The raw edge this came from
    pub raw_edge_id: String,
    /// Canonical head id
    pub head_id: String,
    /// Head display name
    pub head_name: String,
    /// Canonical tail id
    pub tail_id: String,
    /// Tail display name
    pub tail_name: String,
    /// Relation type
    pub relation_type: RelationType,
    /// Polarity after validation (static > sign stage > student)
    pub polarity: Polarity,
    /// Semantic tag from validation
    pub semantic_tag: SemanticTag,
    /// Combined confidence from the arbiter
    pub combined_conf: f64,
    /// The extractor's own confidence
    pub student_conf: f64,
    /// When the candidate was formed
    pub timestamp: DateTime<Utc>,
    /// Evidence multiplicity carried by this candidate
    pub freq_count: u32,
    /// Evidence source tag ("student", "personal_promotion", ...)
    pub evidence_source: String,
    /// Source fragment
    pub fragment_text: Option<String>,
}

impl DomainCandidate {
    /// The logical key this candidate targets
    pub fn key(&self) -> RelationKey {
        RelationKey::new(
            self.head_id.clone(),
            self.tail_id.clone(),
            self.relation_type,
        )
    }
}

/// Static-guard verdict for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticGuardResult {
    /// Candidate checked
    pub candidate_id: String,
    /// Whether the candidate may proceed into Domain
    pub static_pass: bool,
    /// Whether the candidate contradicts the rulebook
    pub static_conflict: bool,
    /// Pipeline action
    pub action: DomainAction,
    /// Matching rule, when one exists
    pub rule_id: Option<String>,
    /// Polarity the rule fixes
    pub expected_polarity: Option<Polarity>,
    /// Polarity the candidate claimed
    pub actual_polarity: Polarity,
    /// Human-readable conflict reason
    pub reason: Option<String>,
}

/// Outcome of a dynamic update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicUpdateResult {
    /// Candidate applied
    pub candidate_id: String,
    /// Relation row touched or created
    pub relation_id: RelationId,
    /// What happened
    pub action: DomainAction,
    /// Confidence after the update
    pub domain_conf: f64,
    /// Evidence count after the update
    pub evidence_count: u32,
    /// Whether decay ran during this update
    pub decayed: bool,
    /// Whether a sign conflict is now pending
    pub conflict_pending: bool,
    /// Confidence before the update (None for new rows)
    pub previous_conf: Option<f64>,
    /// Whether the row was created by this update
    pub is_new: bool,
}

/// Conflict analyzer verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictAnalysisResult {
    /// Candidate analysed
    pub candidate_id: String,
    /// Relation in conflict
    pub relation_id: RelationId,
    /// Whether any inconsistency was found
    pub has_conflict: bool,
    /// Kind of inconsistency
    pub conflict_type: Option<ConflictType>,
    /// Resolution
    pub resolution: ConflictResolution,
    /// Existing sign
    pub existing_sign: Polarity,
    /// Candidate sign
    pub new_sign: Polarity,
    /// Supporting evidence behind the existing relation
    pub existing_evidence: u32,
    /// Accumulated counter-evidence including this candidate
    pub counter_evidence: u32,
    /// Whether indirect paths agree with the candidate
    pub path_consistent: bool,
    /// Relation ids along the first disagreeing path
    pub inconsistent_path: Option<Vec<RelationId>>,
}

/// Drift detector verdict for one Domain relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftDetectionResult {
    /// Relation scored
    pub relation_id: RelationId,
    /// Weighted drift signal in [0,1]
    pub drift_signal: f64,
    /// Whether the drift flag was set
    pub is_drift: bool,
    /// Whether human QA was requested
    pub needs_qa: bool,
    /// Conflict-ratio sub-score
    pub conflict_score: f64,
    /// Opposite-evidence sub-score
    pub opposite_rate: f64,
    /// Decay sub-score
    pub decay_score: f64,
    /// Semantic-ambiguity sub-score
    pub semantic_score: f64,
}

/// Where an edge finally landed after Domain processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalDestination {
    /// Written to (or reinforced in) the Domain KG
    Domain,
    /// Re-routed to the Personal KG
    Personal,
    /// Dropped and logged
    Log,
}

/// Full record of one edge's trip through the Domain pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainProcessResult {
    /// Candidate id, when intake produced one
    pub candidate_id: Option<String>,
    /// Source raw edge
    pub raw_edge_id: String,
    /// Where the edge landed
    pub final_destination: FinalDestination,
    /// Candidate, when intake produced one
    pub candidate: Option<DomainCandidate>,
    /// Static guard verdict
    pub static_result: Option<StaticGuardResult>,
    /// Dynamic update outcome
    pub dynamic_result: Option<DynamicUpdateResult>,
    /// Conflict analysis, when triggered
    pub conflict_result: Option<ConflictAnalysisResult>,
    /// Drift detection, when triggered
    pub drift_result: Option<DriftDetectionResult>,
    /// Relation row the edge ended up in, for Domain destinations
    pub domain_relation_id: Option<RelationId>,
}
