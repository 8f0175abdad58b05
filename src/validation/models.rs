// Copyright 2025 Cowboy AI, LLC.

//! Validation stage results

use serde::{Deserialize, Serialize};

use crate::edge::Polarity;
use crate::tags::{SemanticTag, SignTag, ValidationDestination};

/// Stage 1 result: structural and schema plausibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaCheck {
    /// Edge checked
    pub edge_id: String,
    /// Whether every schema condition held
    pub schema_valid: bool,
    /// Machine-readable failure codes, first failure first
    pub errors: Vec<String>,
    /// All required fields present and non-empty
    pub has_required_fields: bool,
    /// Head and tail resolved and their type pair is permitted
    pub entity_pair_valid: bool,
    /// head ≠ tail
    pub no_self_loop: bool,
}

/// Stage 2 result: polarity arbitration across the three oracles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignCheck {
    /// Edge checked
    pub edge_id: String,
    /// Final polarity after arbitration
    pub polarity_final: Polarity,
    /// Tag summarising oracle agreement
    pub sign_tag: SignTag,
    /// Consistency score in [0,1] fed to the confidence filter
    pub consistency: f64,
    /// Polarity suggested by lexical patterns, when any cue fired
    pub pattern_polarity: Option<Polarity>,
    /// Polarity fixed by a static rule, when one matched the pair
    pub static_polarity: Option<Polarity>,
    /// Polarity returned by the LLM probe, when consulted
    pub llm_polarity: Option<Polarity>,
    /// Whether the student contradicted a static rule
    pub conflict_with_static: bool,
}

/// What the optional LLM semantic probe concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmJudgement {
    /// Relation reads as contextually sound
    Valid,
    /// Possible but under-evidenced
    Weak,
    /// Causal overreach or correlation-as-causation
    Spurious,
    /// Plainly incorrect
    Wrong,
    /// Multiple readings possible
    Ambiguous,
}

impl LlmJudgement {
    /// Parse the probe's wire string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "valid" => Some(Self::Valid),
            "weak" => Some(Self::Weak),
            "spurious" => Some(Self::Spurious),
            "wrong" => Some(Self::Wrong),
            "ambiguous" => Some(Self::Ambiguous),
            _ => None,
        }
    }
}

/// Stage 3 result: is the relation itself plausible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticCheck {
    /// Edge checked
    pub edge_id: String,
    /// Final semantic tag
    pub tag: SemanticTag,
    /// Semantic confidence in [0,1] fed to the confidence filter
    pub confidence: f64,
    /// Overclaiming cue present
    pub has_exaggeration: bool,
    /// Cause relation with correlation phrasing
    pub correlation_as_causation: bool,
    /// Hedging cue present
    pub weak_evidence: bool,
    /// A pre-existing Domain relation carries the opposite polarity
    pub domain_conflict: bool,
    /// LLM contextual judgement, when consulted
    pub llm_judgement: Option<LlmJudgement>,
}

/// Final arbitration verdict for one raw edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Edge checked
    pub edge_id: String,
    /// Whether the edge is usable at all
    pub validation_passed: bool,
    /// Where the edge goes next
    pub destination: ValidationDestination,
    /// Weighted combination of the three confidences
    pub combined_conf: f64,
    /// Extractor confidence input
    pub student_conf: f64,
    /// Sign consistency input
    pub sign_score: f64,
    /// Semantic confidence input
    pub semantic_conf: f64,
    /// Stage 1 result
    pub schema: Option<SchemaCheck>,
    /// Stage 2 result
    pub sign: Option<SignCheck>,
    /// Stage 3 result
    pub semantic: Option<SemanticCheck>,
    /// Rejection codes, first failure first; empty when passed
    pub rejection_codes: Vec<String>,
}

impl ValidationResult {
    /// A drop verdict carrying only the schema stage
    pub fn schema_drop(schema: SchemaCheck) -> Self {
        Self {
            edge_id: schema.edge_id.clone(),
            validation_passed: false,
            destination: ValidationDestination::DropLog,
            combined_conf: 0.0,
            student_conf: 0.0,
            sign_score: 0.0,
            semantic_conf: 0.0,
            rejection_codes: schema.errors.clone(),
            schema: Some(schema),
            sign: None,
            semantic: None,
        }
    }
}

/// Running counters kept by the validation pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    /// Edges seen
    pub total: u64,
    /// Edges that survived the schema stage
    pub schema_passed: u64,
    /// Edges routed to the Domain intake
    pub domain_candidates: u64,
    /// Edges routed to the Personal intake
    pub personal_candidates: u64,
    /// Edges dropped
    pub dropped: u64,
}
