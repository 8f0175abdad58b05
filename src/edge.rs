// Copyright 2025 Cowboy AI, LLC.

//! Raw edges and resolved entities — the input shapes the arbiter consumes
//!
//! An external extractor turns free text into `RawEdge`s between entities an
//! external resolver has already canonicalised. Nothing in this crate parses
//! natural language; these types are the contract at that boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{KgError, KgResult};
use crate::identifiers::{FragmentId, RelationKey};

/// Polarity of a causal/affect relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Head moves tail in the same direction
    #[serde(rename = "+")]
    Positive,
    /// Head moves tail in the opposite direction
    #[serde(rename = "-")]
    Negative,
    /// A relation exists but carries no direction
    #[serde(rename = "neutral")]
    Neutral,
    /// No polarity could be established
    #[serde(rename = "unknown")]
    Unknown,
}

impl Polarity {
    /// Wire representation ("+", "-", "neutral", "unknown")
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Positive => "+",
            Polarity::Negative => "-",
            Polarity::Neutral => "neutral",
            Polarity::Unknown => "unknown",
        }
    }

    /// Whether this polarity carries an actual sign
    pub fn is_signed(&self) -> bool {
        matches!(self, Polarity::Positive | Polarity::Negative)
    }

    /// Sign multiplication along a path step
    ///
    /// Neutral is the identity on sign; Unknown absorbs the whole product,
    /// so a path containing an unknown edge has no defined sign.
    pub fn combine(self, other: Polarity) -> Option<Polarity> {
        use Polarity::*;
        match (self, other) {
            (Unknown, _) | (_, Unknown) => None,
            (Neutral, x) | (x, Neutral) => Some(x),
            (Positive, Positive) | (Negative, Negative) => Some(Positive),
            (Positive, Negative) | (Negative, Positive) => Some(Negative),
        }
    }

    /// Fold a sequence of edge signs into a path sign
    pub fn combine_all<I: IntoIterator<Item = Polarity>>(signs: I) -> Option<Polarity> {
        let mut acc = Polarity::Positive;
        for s in signs {
            acc = acc.combine(s)?;
        }
        Some(acc)
    }

    /// The opposite sign; Neutral and Unknown are their own opposites
    pub fn flipped(self) -> Polarity {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
            other => other,
        }
    }

    /// Whether the two polarities are an actual +/− contradiction
    pub fn conflicts_with(self, other: Polarity) -> bool {
        self.is_signed() && other.is_signed() && self != other
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Polarity {
    type Err = KgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "positive" => Ok(Polarity::Positive),
            "-" | "negative" => Ok(Polarity::Negative),
            "neutral" => Ok(Polarity::Neutral),
            "unknown" | "" => Ok(Polarity::Unknown),
            other => Err(KgError::Validation(format!("unknown polarity: {other}"))),
        }
    }
}

/// Relation types the graphs accept (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// Head influences tail (signed)
    Affect,
    /// Head causally produces tail (signed, stronger claim than Affect)
    Cause,
    /// Head requires tail
    DependOn,
    /// Head precedes tail in time
    TemporalBefore,
    /// Head follows tail in time
    TemporalAfter,
    /// Head and tail move together without a causal claim
    CorrelateWith,
    /// Head is a component of tail
    PartOf,
}

impl RelationType {
    /// All members of the closed set
    pub const ALL: [RelationType; 7] = [
        RelationType::Affect,
        RelationType::Cause,
        RelationType::DependOn,
        RelationType::TemporalBefore,
        RelationType::TemporalAfter,
        RelationType::CorrelateWith,
        RelationType::PartOf,
    ];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Affect => "Affect",
            RelationType::Cause => "Cause",
            RelationType::DependOn => "DependOn",
            RelationType::TemporalBefore => "TemporalBefore",
            RelationType::TemporalAfter => "TemporalAfter",
            RelationType::CorrelateWith => "CorrelateWith",
            RelationType::PartOf => "PartOf",
        }
    }

    /// The two relation types the reasoner treats as signed influence edges
    pub fn is_influence(&self) -> bool {
        matches!(self, RelationType::Affect | RelationType::Cause)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = KgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationType::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| KgError::Validation(format!("unknown relation type: {s}")))
    }
}

/// An entity mention the external resolver has mapped to a canonical id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    /// Id the extractor assigned to the mention
    pub entity_id: String,
    /// Canonical id chosen from the alias dictionary (None when unresolved)
    pub canonical_id: Option<String>,
    /// Display name for the canonical entity
    pub canonical_name: Option<String>,
    /// Entity type from the `entity_types` enumeration, when known
    pub canonical_type: Option<String>,
    /// Resolver confidence in [0,1]
    pub resolution_conf: f64,
}

impl ResolvedEntity {
    /// A fully-resolved entity whose mention id equals its canonical id
    pub fn canonical(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            entity_id: id.clone(),
            canonical_id: Some(id),
            canonical_name: Some(name.into()),
            canonical_type: None,
            resolution_conf: 1.0,
        }
    }

    /// Attach an entity type
    pub fn with_type(mut self, entity_type: impl Into<String>) -> Self {
        self.canonical_type = Some(entity_type.into());
        self
    }

    /// The id the graphs should use: canonical when available
    pub fn graph_id(&self) -> &str {
        self.canonical_id.as_deref().unwrap_or(&self.entity_id)
    }

    /// The name the graphs should display
    pub fn display_name(&self) -> &str {
        self.canonical_name.as_deref().unwrap_or(&self.entity_id)
    }
}

/// One extracted edge awaiting arbitration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    /// Edge id assigned by the extractor
    pub raw_edge_id: String,
    /// Head entity mention id
    pub head_entity_id: String,
    /// Tail entity mention id
    pub tail_entity_id: String,
    /// Display name the extractor saw for the head, if any
    pub head_name: Option<String>,
    /// Display name the extractor saw for the tail, if any
    pub tail_name: Option<String>,
    /// Claimed relation type
    pub relation_type: RelationType,
    /// The extractor's polarity guess
    pub polarity_guess: Polarity,
    /// The extractor's confidence in [0,1]
    pub student_conf: f64,
    /// Source fragment text, when available
    pub fragment_text: Option<String>,
    /// Source fragment id
    pub fragment_id: FragmentId,
}

impl RawEdge {
    /// Reject malformed input (empty required fields, self loop ids missing).
    ///
    /// Content problems — bad polarity, implausible pairs — are validation
    /// *rejections*, not errors; this only guards against shapes the
    /// pipeline cannot process at all.
    pub fn check_shape(&self) -> KgResult<()> {
        if self.raw_edge_id.is_empty() {
            return Err(KgError::Validation("raw_edge_id is empty".into()));
        }
        if self.head_entity_id.is_empty() || self.tail_entity_id.is_empty() {
            return Err(KgError::Validation(format!(
                "edge {} has an empty entity id",
                self.raw_edge_id
            )));
        }
        if self.fragment_id.as_str().is_empty() {
            return Err(KgError::Validation(format!(
                "edge {} has an empty fragment id",
                self.raw_edge_id
            )));
        }
        Ok(())
    }

    /// The logical relation key claimed by this edge
    pub fn key(&self) -> RelationKey {
        RelationKey::new(
            self.head_entity_id.clone(),
            self.tail_entity_id.clone(),
            self.relation_type,
        )
    }
}

/// Output of one extractor invocation over a document (consumed interface)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Fragment texts keyed by fragment id
    pub fragments: Vec<(FragmentId, String)>,
    /// Raw entity mentions before resolution
    pub entity_candidates: Vec<String>,
    /// Resolver output for the document
    pub resolved_entities: Vec<ResolvedEntity>,
    /// Edges awaiting arbitration
    pub raw_edges: Vec<RawEdge>,
    /// Wall-clock spent by the extractor
    pub processing_time_ms: u64,
    /// Number of extraction errors the extractor swallowed
    pub error_count: u32,
    /// Warnings worth surfacing to the host
    pub warning_messages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn edge(head: &str, tail: &str) -> RawEdge {
        RawEdge {
            raw_edge_id: "edge_1".into(),
            head_entity_id: head.into(),
            tail_entity_id: tail.into(),
            head_name: None,
            tail_name: None,
            relation_type: RelationType::Affect,
            polarity_guess: Polarity::Positive,
            student_conf: 0.8,
            fragment_text: Some("rates rise".into()),
            fragment_id: FragmentId::new("frag_1"),
        }
    }

    #[test_case(Polarity::Positive, Polarity::Positive => Some(Polarity::Positive))]
    #[test_case(Polarity::Positive, Polarity::Negative => Some(Polarity::Negative))]
    #[test_case(Polarity::Negative, Polarity::Negative => Some(Polarity::Positive))]
    #[test_case(Polarity::Neutral, Polarity::Negative => Some(Polarity::Negative))]
    #[test_case(Polarity::Unknown, Polarity::Positive => None)]
    fn sign_multiplication(a: Polarity, b: Polarity) -> Option<Polarity> {
        a.combine(b)
    }

    #[test]
    fn combine_all_folds_a_path() {
        let signs = [Polarity::Positive, Polarity::Negative, Polarity::Negative];
        assert_eq!(Polarity::combine_all(signs), Some(Polarity::Positive));

        let with_unknown = [Polarity::Positive, Polarity::Unknown];
        assert_eq!(Polarity::combine_all(with_unknown), None);
    }

    #[test]
    fn polarity_round_trips_through_wire_strings() {
        for p in [
            Polarity::Positive,
            Polarity::Negative,
            Polarity::Neutral,
            Polarity::Unknown,
        ] {
            assert_eq!(p.as_str().parse::<Polarity>().unwrap(), p);
        }
        let json = serde_json::to_string(&Polarity::Negative).unwrap();
        assert_eq!(json, "\"-\"");
    }

    #[test]
    fn relation_type_from_str_rejects_unknown() {
        assert_eq!(
            "CorrelateWith".parse::<RelationType>().unwrap(),
            RelationType::CorrelateWith
        );
        assert!("Causes".parse::<RelationType>().is_err());
    }

    #[test]
    fn conflicts_require_two_actual_signs() {
        assert!(Polarity::Positive.conflicts_with(Polarity::Negative));
        assert!(!Polarity::Positive.conflicts_with(Polarity::Unknown));
        assert!(!Polarity::Neutral.conflicts_with(Polarity::Negative));
        assert!(!Polarity::Positive.conflicts_with(Polarity::Positive));
    }

    #[test]
    fn check_shape_accepts_complete_edges() {
        assert!(edge("A", "B").check_shape().is_ok());
    }

    #[test]
    fn check_shape_rejects_empty_ids() {
        let e = edge("", "B");
        let err = e.check_shape().unwrap_err();
        assert!(matches!(err, KgError::Validation(_)));
    }

    #[test]
    fn resolved_entity_prefers_canonical_id() {
        let mut e = ResolvedEntity::canonical("Interest_Rate", "Interest Rate");
        assert_eq!(e.graph_id(), "Interest_Rate");
        e.canonical_id = None;
        e.entity_id = "mention_7".into();
        assert_eq!(e.graph_id(), "mention_7");
    }
}
