// Copyright 2025 Cowboy AI, LLC.

//! Closed tag vocabularies produced by the validation arbiter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of the sign stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignTag {
    /// Every oracle that produced a sign agreed
    Confident,
    /// Some support, some disagreement
    Ambiguous,
    /// Contradicts a high-certainty static rule
    Suspect,
    /// No oracle produced a sign
    Unknown,
}

impl SignTag {
    /// Whether the confidence filter admits edges with this tag
    pub fn admissible(&self) -> bool {
        matches!(self, SignTag::Confident | SignTag::Ambiguous)
    }

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SignTag::Confident => "confident",
            SignTag::Ambiguous => "ambiguous",
            SignTag::Suspect => "suspect",
            SignTag::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SignTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the semantic stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticTag {
    /// Context, domain and (when consulted) the LLM all accept the relation
    SemConfident,
    /// Plausible but under-evidenced
    SemWeak,
    /// More than one reading is defensible
    SemAmbiguous,
    /// Correlation dressed up as causation, or an exaggerated causal claim
    SemSpurious,
    /// Directly contradicts established domain knowledge
    SemWrong,
}

impl SemanticTag {
    /// Whether the confidence filter admits edges with this tag
    pub fn admissible(&self) -> bool {
        matches!(
            self,
            SemanticTag::SemConfident | SemanticTag::SemWeak | SemanticTag::SemAmbiguous
        )
    }

    /// Score used by the reasoner's edge fusion (EES semantic term)
    pub fn fusion_score(&self) -> f64 {
        match self {
            SemanticTag::SemConfident => 1.0,
            SemanticTag::SemWeak => 0.7,
            SemanticTag::SemAmbiguous => 0.4,
            SemanticTag::SemSpurious => 0.2,
            SemanticTag::SemWrong => 0.1,
        }
    }

    /// Score used by the personal confidence classifier (PCS factor P2)
    pub fn pcs_strength(&self) -> f64 {
        match self {
            SemanticTag::SemConfident => 1.0,
            SemanticTag::SemWeak => 0.5,
            SemanticTag::SemAmbiguous => 0.2,
            SemanticTag::SemSpurious => -0.4,
            SemanticTag::SemWrong => -1.0,
        }
    }

    /// Tags that force the conflict analyzer to re-route a candidate
    pub fn forces_personal(&self) -> bool {
        matches!(self, SemanticTag::SemWrong | SemanticTag::SemSpurious)
    }

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticTag::SemConfident => "sem_confident",
            SemanticTag::SemWeak => "sem_weak",
            SemanticTag::SemAmbiguous => "sem_ambiguous",
            SemanticTag::SemSpurious => "sem_spurious",
            SemanticTag::SemWrong => "sem_wrong",
        }
    }
}

impl fmt::Display for SemanticTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the arbiter routed an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationDestination {
    /// Strong enough for the shared Domain KG intake
    DomainCandidate,
    /// Usable, but only as a personal belief
    PersonalCandidate,
    /// Unusable; recorded in the drop log
    DropLog,
}

impl ValidationDestination {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationDestination::DomainCandidate => "domain_candidate",
            ValidationDestination::PersonalCandidate => "personal_candidate",
            ValidationDestination::DropLog => "drop_log",
        }
    }
}

impl fmt::Display for ValidationDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
