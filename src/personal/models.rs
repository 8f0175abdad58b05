// Copyright 2025 Cowboy AI, LLC.

//! Personal KG data model
//!
//! Personal relations are weaker or private beliefs, kept per user. The hard
//! invariant of this namespace: rows are never deleted, and every update
//! appends to the history trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::edge::{Polarity, RelationType};
use crate::identifiers::{RelationId, RelationKey, UserId};
use crate::tags::{SemanticTag, SignTag};

/// Where a personal belief came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// The user wrote it themselves
    UserWritten,
    /// Extracted from a report the user ingested
    TextReport,
    /// Inferred by the LLM
    LlmInferred,
    /// Rejected by the Domain pipeline and demoted here
    DomainRejected,
}

impl SourceType {
    /// PCS factor P3: trust by origin
    pub fn origin_weight(&self) -> f64 {
        match self {
            SourceType::UserWritten => 0.3,
            SourceType::TextReport => 0.1,
            SourceType::DomainRejected => 0.05,
            SourceType::LlmInferred => 0.0,
        }
    }
}

/// Strength band derived from the PCS score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalLabel {
    /// PCS ≥ 0.7
    StrongBelief,
    /// 0.4 ≤ PCS < 0.7
    WeakBelief,
    /// PCS < 0.4
    NoisyHypothesis,
}

impl PersonalLabel {
    /// Derive the band from a normalised PCS score
    pub fn from_score(pcs: f64) -> Self {
        if pcs >= 0.7 {
            PersonalLabel::StrongBelief
        } else if pcs >= 0.4 {
            PersonalLabel::WeakBelief
        } else {
            PersonalLabel::NoisyHypothesis
        }
    }

    /// Multiplier applied to PCS when deriving the personal weight
    pub fn weight_multiplier(&self) -> f64 {
        match self {
            PersonalLabel::StrongBelief => 1.0,
            PersonalLabel::WeakBelief => 0.5,
            PersonalLabel::NoisyHypothesis => 0.1,
        }
    }

    /// Multiplier used by the promotion drift factor
    pub fn drift_multiplier(&self) -> f64 {
        match self {
            PersonalLabel::StrongBelief => 1.0,
            PersonalLabel::WeakBelief => 0.5,
            PersonalLabel::NoisyHypothesis => 0.2,
        }
    }
}

/// Flavour of a personal belief, classified from lexical markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceType {
    /// Pure sentiment
    Emotional,
    /// A testable guess
    Hypothesis,
    /// Derived from other beliefs
    Inference,
    /// A stated view
    Opinion,
    /// Something the user saw in the data
    Observation,
}

/// What a history event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// Row created
    Created,
    /// Row updated with a new occurrence
    Updated,
    /// Row promoted into the Domain KG (row itself is retained)
    PromotedToDomain,
}

/// One append-only history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// When it happened
    pub timestamp: DateTime<Utc>,
    /// What happened
    pub action: HistoryAction,
    /// PCS score at that moment, for Created/Updated events
    pub pcs_score: Option<f64>,
    /// Occurrence count after the event, for Updated events
    pub occurrence: Option<u32>,
    /// Fragment prefix that triggered the event
    pub fragment: Option<String>,
    /// Domain row created by a promotion event
    pub domain_relation_id: Option<RelationId>,
}

/// One sample in the PCS time series used by drift analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PcsSample {
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
    /// Normalised PCS at that time
    pub pcs_score: f64,
}

/// A relation row in the Personal KG
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalRelation {
    /// Stable row id
    pub relation_id: RelationId,
    /// Canonical head entity id
    pub head_id: String,
    /// Head display name
    pub head_name: String,
    /// Canonical tail entity id
    pub tail_id: String,
    /// Tail display name
    pub tail_name: String,
    /// Relation type
    pub relation_type: RelationType,
    /// Believed sign
    pub sign: Polarity,
    /// Owning user
    pub user_id: UserId,
    /// Current normalised PCS score
    pub pcs_score: f64,
    /// Weight used by the reasoner
    pub personal_weight: f64,
    /// Strength band
    pub personal_label: PersonalLabel,
    /// Times this belief has been observed
    pub occurrence_count: u32,
    /// Origin of the first observation
    pub source_type: SourceType,
    /// Deduplicated relevance flavours seen so far
    pub relevance_types: Vec<RelevanceType>,
    /// Append-only event trail
    pub history: Vec<HistoryEvent>,
    /// PCS time series
    pub pcs_history: Vec<PcsSample>,
    /// Conflicts with Domain observed for this key
    pub domain_conflict_count: u32,
    /// Whether the drift analyzer marked this row for promotion
    pub promotion_candidate: bool,
    /// Whether personal drift was flagged
    pub drift_flag: bool,
    /// When the row was created
    pub created_at: DateTime<Utc>,
    /// When the belief last occurred
    pub last_occurred_at: DateTime<Utc>,
}

impl PersonalRelation {
    /// The logical key of this row
    pub fn key(&self) -> RelationKey {
        RelationKey::new(
            self.head_id.clone(),
            self.tail_id.clone(),
            self.relation_type,
        )
    }

    /// Days spanned by the history trail
    pub fn history_span_days(&self) -> i64 {
        match (self.history.first(), self.history.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_days(),
            _ => 0,
        }
    }
}

/// A residual edge routed into the Personal intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalCandidate {
    /// Candidate id
    pub candidate_id: String,
    /// Source raw edge
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
    /// Claimed sign
    pub polarity: Polarity,
    /// Semantic tag from validation
    pub semantic_tag: SemanticTag,
    /// Sign tag from validation, when available
    pub sign_tag: Option<SignTag>,
    /// Extractor confidence
    pub student_conf: f64,
    /// Combined confidence from the arbiter
    pub combined_conf: f64,
    /// Owning user
    pub user_id: UserId,
    /// Origin route
    pub source_type: SourceType,
    /// Lexical flavour
    pub relevance_type: RelevanceType,
    /// Source fragment
    pub fragment_text: Option<String>,
    /// Why the Domain side rejected it, when it did
    pub rejection_reason: Option<String>,
}

impl PersonalCandidate {
    /// The logical key this candidate targets
    pub fn key(&self) -> RelationKey {
        RelationKey::new(
            self.head_id.clone(),
            self.tail_id.clone(),
            self.relation_type,
        )
    }
}

/// PCS classification output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcsResult {
    /// Candidate scored
    pub candidate_id: String,
    /// Normalised PCS in [0,1]
    pub pcs_score: f64,
    /// Derived band
    pub personal_label: PersonalLabel,
    /// Factor P1: agreement with the Domain graph
    pub domain_proximity: f64,
    /// Factor P2: semantic strength
    pub semantic_strength: f64,
    /// Factor P3: origin trust
    pub user_origin: f64,
    /// Factor P4: pattern consistency
    pub consistency: f64,
}

/// Personal drift / promotion analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalDriftResult {
    /// Relation analysed
    pub relation_id: RelationId,
    /// Weighted drift signal in [0,1]
    pub drift_signal: f64,
    /// Whether the row qualifies for promotion
    pub is_promotion_candidate: bool,
    /// PCS factor
    pub pcs_factor: f64,
    /// Occurrence-consistency factor
    pub consistency_factor: f64,
    /// Domain-gap factor
    pub domain_gap_factor: f64,
    /// History-span factor
    pub time_factor: f64,
    /// Whether a static rule vetoes promotion
    pub static_conflict: bool,
    /// Human-readable reason for the verdict
    pub reason: Option<String>,
}

/// Full record of one edge's trip through the Personal pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalProcessResult {
    /// Candidate processed
    pub candidate_id: String,
    /// Source raw edge
    pub raw_edge_id: String,
    /// Relation row written
    pub relation_id: RelationId,
    /// Whether the row was created by this edge
    pub is_new: bool,
    /// PCS classification
    pub pcs: PcsResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_bands_match_thresholds() {
        assert_eq!(PersonalLabel::from_score(0.7), PersonalLabel::StrongBelief);
        assert_eq!(PersonalLabel::from_score(0.69), PersonalLabel::WeakBelief);
        assert_eq!(PersonalLabel::from_score(0.4), PersonalLabel::WeakBelief);
        assert_eq!(
            PersonalLabel::from_score(0.39),
            PersonalLabel::NoisyHypothesis
        );
    }

    #[test]
    fn origin_weights_follow_trust_order() {
        assert!(SourceType::UserWritten.origin_weight() > SourceType::TextReport.origin_weight());
        assert!(
            SourceType::TextReport.origin_weight() > SourceType::DomainRejected.origin_weight()
        );
        assert_eq!(SourceType::LlmInferred.origin_weight(), 0.0);
    }

    #[test]
    fn history_span_uses_first_and_last_event() {
        let t0 = Utc::now();
        let relation = PersonalRelation {
            relation_id: RelationId::generate("prel"),
            head_id: "A".into(),
            head_name: "A".into(),
            tail_id: "B".into(),
            tail_name: "B".into(),
            relation_type: RelationType::Affect,
            sign: Polarity::Positive,
            user_id: UserId::default_user(),
            pcs_score: 0.5,
            personal_weight: 0.25,
            personal_label: PersonalLabel::WeakBelief,
            occurrence_count: 2,
            source_type: SourceType::TextReport,
            relevance_types: vec![RelevanceType::Inference],
            history: vec![
                HistoryEvent {
                    timestamp: t0,
                    action: HistoryAction::Created,
                    pcs_score: Some(0.5),
                    occurrence: None,
                    fragment: None,
                    domain_relation_id: None,
                },
                HistoryEvent {
                    timestamp: t0 + chrono::Duration::days(12),
                    action: HistoryAction::Updated,
                    pcs_score: Some(0.55),
                    occurrence: Some(2),
                    fragment: None,
                    domain_relation_id: None,
                },
            ],
            pcs_history: vec![],
            domain_conflict_count: 0,
            promotion_candidate: false,
            drift_flag: false,
            created_at: t0,
            last_occurred_at: t0,
        };
        assert_eq!(relation.history_span_days(), 12);
    }
}
