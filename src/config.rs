// Copyright 2025 Cowboy AI, LLC.

//! Configuration — one source of truth for every tunable
//!
//! All constants and parameters live here instead of being scattered through
//! the code. Config files are read-only YAML loaded at start; re-loading is
//! an explicit operation. A missing or malformed file is a CRITICAL
//! `KgError::Config`; built-in defaults exist so tests can run without a
//! config directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::edge::{Polarity, RelationType};
use crate::errors::{KgError, KgResult};

/// One immutable rule in the static rulebook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticRule {
    /// Stable rule identifier
    pub rule_id: String,
    /// Canonical head entity id
    pub head: String,
    /// Canonical tail entity id
    pub tail: String,
    /// The polarity the rule fixes
    pub polarity: Polarity,
    /// The relation type the rule describes
    pub relation: RelationType,
    /// How certain the rulebook is; 1.0 for textbook laws
    #[serde(default = "default_certainty")]
    pub certainty: f64,
    /// Human-readable statement of the rule
    #[serde(default)]
    pub description: String,
}

fn default_certainty() -> f64 {
    0.8
}

/// Lexical cue lists used by the sign stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignPatterns {
    /// Cues for a positive influence
    #[serde(default)]
    pub positive: Vec<String>,
    /// Cues for a negative influence
    #[serde(default)]
    pub negative: Vec<String>,
    /// Cues naming an inverse relationship outright
    #[serde(default)]
    pub inverse: Vec<String>,
}

/// Lexical cue lists used by the semantic stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticPatterns {
    /// Overclaiming markers ("always", "guaranteed", ...)
    #[serde(default)]
    pub exaggeration: Vec<String>,
    /// Co-movement markers that suggest correlation mistaken for causation
    #[serde(default)]
    pub correlation_as_causation: Vec<String>,
    /// Hedging markers ("maybe", "seems", ...)
    #[serde(default)]
    pub weak_evidence: Vec<String>,
}

/// Markers for classifying the flavour of a personal belief
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelevanceMarkers {
    /// Emotional expressions
    #[serde(default)]
    pub emotional: Vec<String>,
    /// Hypothesis language
    #[serde(default)]
    pub hypothesis: Vec<String>,
    /// Opinion language
    #[serde(default)]
    pub opinion: Vec<String>,
    /// Observation language
    #[serde(default)]
    pub observation: Vec<String>,
}

/// Contents of `static_domain.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticDomainConfig {
    /// The immutable rulebook
    #[serde(default)]
    pub static_rules: Vec<StaticRule>,
    /// Sign-stage lexical cues
    #[serde(default)]
    pub sign_patterns: SignPatterns,
    /// Semantic-stage lexical cues
    #[serde(default)]
    pub semantic_patterns: SemanticPatterns,
    /// Personal-opinion markers that disqualify a fragment from Domain intake
    #[serde(default)]
    pub opinion_markers: Vec<String>,
    /// Personal relevance classification markers
    #[serde(default)]
    pub relevance_markers: RelevanceMarkers,
}

/// An allowed `(head_type, tail_type)` pair with its permitted relations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelCombination {
    /// Head entity type
    pub head_type: String,
    /// Tail entity type
    pub tail_type: String,
    /// Relations allowed (or forbidden) for the pair
    pub relations: Vec<RelationType>,
    /// Rationale, used in rejection codes for forbidden pairs
    #[serde(default)]
    pub reason: String,
}

/// Admission thresholds for the confidence filter
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    /// Combined confidence at or above which an edge is a Domain candidate
    pub domain_candidate: f64,
    /// Minimum combined confidence to be usable at all
    pub personal_candidate: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            domain_candidate: 0.55,
            personal_candidate: 0.35,
        }
    }
}

/// Weights for the combined-confidence formula
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    /// Weight of the extractor's own confidence
    pub student_conf: f64,
    /// Weight of the sign-consistency score
    pub sign_score: f64,
    /// Weight of the semantic confidence
    pub semantic_conf: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            student_conf: 0.4,
            sign_score: 0.3,
            semantic_conf: 0.3,
        }
    }
}

/// Contents of `validation_schema.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSchemaConfig {
    /// Entity-type pairs explicitly allowed (empty list = permissive)
    #[serde(default)]
    pub allowed_combinations: Vec<LabelCombination>,
    /// Entity-type pairs explicitly forbidden
    #[serde(default)]
    pub forbidden_combinations: Vec<LabelCombination>,
    /// Admission thresholds
    #[serde(default)]
    pub confidence_thresholds: ConfidenceThresholds,
    /// Combined-confidence weights
    #[serde(default)]
    pub confidence_weights: ConfidenceWeights,
}

/// Contents of `alias_dictionary.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasDictionary {
    /// alias (lowercased surface form) → canonical entity id
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// canonical entity id → display name
    #[serde(default)]
    pub display_names: BTreeMap<String, String>,
}

/// Contents of `entity_types.yaml` / `relation_types.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeEnumerations {
    /// Entity type names
    #[serde(default)]
    pub entity_types: Vec<String>,
    /// Relation type → description
    #[serde(default)]
    pub relation_types: BTreeMap<String, String>,
}

/// Dynamic Domain update tunables
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DomainUpdateParams {
    /// Confidence a brand-new relation starts with
    pub initial_conf: f64,
    /// Base confidence increase per supporting evidence (divided by √n)
    pub conf_increase_rate: f64,
    /// Confidence decrease per conflicting evidence
    pub conf_decrease_rate: f64,
    /// Multiplicative decay applied per elapsed decay period
    pub decay_rate: f64,
    /// Days per decay period
    pub decay_days: i64,
    /// Lower confidence bound
    pub conf_floor: f64,
    /// Upper confidence bound
    pub conf_cap: f64,
}

impl Default for DomainUpdateParams {
    fn default() -> Self {
        Self {
            initial_conf: 0.5,
            conf_increase_rate: 0.05,
            conf_decrease_rate: 0.08,
            decay_rate: 0.98,
            decay_days: 30,
            conf_floor: 0.10,
            conf_cap: 0.95,
        }
    }
}

/// Conflict analyzer tunables
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConflictParams {
    /// Counter-evidence ratio at which strong contradiction routes to Personal
    pub min_evidence_ratio: f64,
    /// BFS depth limit for the path-consistency walk
    pub path_depth_limit: usize,
    /// Existing confidence below which a sign conflict marks drift instead
    pub weak_conf_threshold: f64,
}

impl Default for ConflictParams {
    fn default() -> Self {
        Self {
            min_evidence_ratio: 3.0,
            path_depth_limit: 3,
            weak_conf_threshold: 0.4,
        }
    }
}

/// Domain drift detector tunables
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DriftParams {
    /// Weight of the conflict ratio
    pub conflict_weight: f64,
    /// Weight of the opposite-evidence rate
    pub opposite_weight: f64,
    /// Weight of the decay signal
    pub decay_weight: f64,
    /// Weight of the semantic-ambiguity signal
    pub semantic_weight: f64,
    /// Signal at which the drift flag is set
    pub drift_threshold: f64,
    /// Signal at which human QA is requested
    pub qa_threshold: f64,
    /// Minimum evidence+conflict total before the conflict ratio counts
    pub min_sample: u32,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            conflict_weight: 0.3,
            opposite_weight: 0.25,
            decay_weight: 0.25,
            semantic_weight: 0.2,
            drift_threshold: 0.6,
            qa_threshold: 0.7,
            min_sample: 5,
        }
    }
}

/// PCS classifier weights
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PcsWeights {
    /// Weight of domain proximity (P1)
    pub domain_proximity: f64,
    /// Weight of semantic strength (P2)
    pub semantic_strength: f64,
    /// Weight of user origin (P3)
    pub user_origin: f64,
    /// Weight of pattern consistency (P4)
    pub consistency: f64,
}

impl Default for PcsWeights {
    fn default() -> Self {
        Self {
            domain_proximity: 0.25,
            semantic_strength: 0.3,
            user_origin: 0.2,
            consistency: 0.25,
        }
    }
}

/// Personal drift / promotion tunables
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PromotionParams {
    /// Weight of the PCS factor
    pub pcs_weight: f64,
    /// Weight of the occurrence-consistency factor
    pub consistency_weight: f64,
    /// Weight of the domain-gap factor
    pub domain_gap_weight: f64,
    /// Weight of the time-span factor
    pub time_weight: f64,
    /// Drift signal required for promotion candidacy
    pub promotion_threshold: f64,
    /// Minimum occurrence count required for promotion candidacy
    pub min_occurrences: u32,
    /// Days of history required for the middle time-factor band
    pub min_days_span: i64,
}

impl Default for PromotionParams {
    fn default() -> Self {
        Self {
            pcs_weight: 0.3,
            consistency_weight: 0.3,
            domain_gap_weight: 0.2,
            time_weight: 0.2,
            promotion_threshold: 0.8,
            min_occurrences: 3,
            min_days_span: 7,
        }
    }
}

/// Retrieval / fusion / aggregation tunables
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReasoningParams {
    /// Maximum edges per retrieved path
    pub max_path_length: usize,
    /// Maximum retrieved paths per query
    pub max_paths: usize,
    /// Domain path count below which the Personal KG is also consulted
    pub domain_sufficiency: usize,
    /// Dead band (fraction of total evidence) inside which direction is neutral
    pub neutral_band: f64,
    /// Floor applied to per-edge weights in the path product
    pub min_edge_weight: f64,
    /// Per-evidence bonus rate in the EES formula
    pub evidence_bonus_rate: f64,
    /// Cap on the evidence bonus
    pub evidence_bonus_cap: f64,
    /// Multiplier for gold-flagged edges
    pub gold_bonus: f64,
    /// Discount on personal weight when a Domain instance also exists
    pub personal_discount: f64,
    /// Decay factor charged against domain weight when decay was applied
    pub decay_weight: f64,
}

impl Default for ReasoningParams {
    fn default() -> Self {
        Self {
            max_path_length: 4,
            max_paths: 10,
            domain_sufficiency: 3,
            neutral_band: 0.05,
            min_edge_weight: 0.01,
            evidence_bonus_rate: 0.02,
            evidence_bonus_cap: 0.2,
            gold_bonus: 1.2,
            personal_discount: 0.3,
            decay_weight: 0.1,
        }
    }
}

/// Impact simulator tunables
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Maximum propagation depth
    pub max_depth: usize,
    /// Per-hop attenuation of the shock
    pub attenuation: f64,
    /// Impacts below this magnitude are not reported
    pub min_impact: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            attenuation: 0.9,
            min_impact: 0.1,
        }
    }
}

/// LLM gateway tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmParams {
    /// Base URL of the primary backend
    pub base_url: String,
    /// Model name requested from the backend
    pub model_name: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for polarity/semantic probes
    pub probe_temperature: f64,
    /// Temperature for conclusion polishing
    pub polish_temperature: f64,
    /// Retry attempts per client
    pub max_retries: u32,
    /// Base backoff delay in milliseconds (doubles per attempt)
    pub base_delay_ms: u64,
    /// Response cache capacity (entries); 0 disables the cache
    pub cache_capacity: usize,
}

impl Default for LlmParams {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            timeout_secs: 120,
            probe_temperature: 0.1,
            polish_temperature: 0.3,
            max_retries: 3,
            base_delay_ms: 1000,
            cache_capacity: 256,
        }
    }
}

/// Full engine settings: file-backed vocabularies plus tunables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Closed type enumerations
    pub types: TypeEnumerations,
    /// Alias → canonical mapping for the built-in resolver
    pub alias_dictionary: AliasDictionary,
    /// Validation schema (label rules, thresholds, weights)
    pub validation: ValidationSchemaConfig,
    /// Static rulebook and lexical patterns
    pub static_domain: StaticDomainConfig,
    /// Dynamic Domain update parameters
    #[serde(default)]
    pub domain_update: DomainUpdateParams,
    /// Conflict analyzer parameters
    #[serde(default)]
    pub conflict: ConflictParams,
    /// Domain drift parameters
    #[serde(default)]
    pub drift: DriftParams,
    /// PCS weights
    #[serde(default)]
    pub pcs: PcsWeights,
    /// Promotion parameters
    #[serde(default)]
    pub promotion: PromotionParams,
    /// Reasoning parameters
    #[serde(default)]
    pub reasoning: ReasoningParams,
    /// Simulator parameters
    #[serde(default)]
    pub simulation: SimulationParams,
    /// LLM gateway parameters
    #[serde(default)]
    pub llm: LlmParams,
    /// Directory the file-backed parts were loaded from
    #[serde(skip)]
    config_dir: Option<PathBuf>,
}

impl Settings {
    /// Load the file-backed vocabularies from a config directory.
    ///
    /// Expects `entity_types.yaml`, `relation_types.yaml`,
    /// `alias_dictionary.yaml`, `validation_schema.yaml` and
    /// `static_domain.yaml`. Any missing or malformed file fails the load.
    pub fn load(dir: impl AsRef<Path>) -> KgResult<Self> {
        let dir = dir.as_ref();
        let mut settings = Settings {
            types: TypeEnumerations {
                entity_types: load_yaml::<TypeEnumerations>(dir, "entity_types.yaml")?
                    .entity_types,
                relation_types: load_yaml::<TypeEnumerations>(dir, "relation_types.yaml")?
                    .relation_types,
            },
            alias_dictionary: load_yaml(dir, "alias_dictionary.yaml")?,
            validation: load_yaml(dir, "validation_schema.yaml")?,
            static_domain: load_yaml(dir, "static_domain.yaml")?,
            ..Settings::default()
        };
        settings.config_dir = Some(dir.to_path_buf());
        tracing::info!(
            dir = %dir.display(),
            rules = settings.static_domain.static_rules.len(),
            aliases = settings.alias_dictionary.aliases.len(),
            "settings loaded"
        );
        Ok(settings)
    }

    /// Re-read the file-backed parts from the directory used at load time.
    pub fn reload(&mut self) -> KgResult<()> {
        let dir = self
            .config_dir
            .clone()
            .ok_or_else(|| KgError::config("settings", "no config directory to reload from"))?;
        let fresh = Settings::load(dir)?;
        self.types = fresh.types;
        self.alias_dictionary = fresh.alias_dictionary;
        self.validation = fresh.validation;
        self.static_domain = fresh.static_domain;
        Ok(())
    }

    /// Built-in English lexical defaults for running without config files.
    pub fn with_builtin_patterns(mut self) -> Self {
        let sp = &mut self.static_domain.sign_patterns;
        if sp.positive.is_empty() {
            sp.positive = to_strings(&[
                "rise", "rises", "increase", "increases", "boost", "boosts", "strengthen",
                "rally", "surge", "gain", "lift", "push up",
            ]);
        }
        if sp.negative.is_empty() {
            sp.negative = to_strings(&[
                "fall", "falls", "drop", "drops", "decline", "declines", "weaken", "plunge",
                "slump", "cut", "lower", "push down",
            ]);
        }
        if sp.inverse.is_empty() {
            sp.inverse = to_strings(&[
                "inverse",
                "inversely",
                "opposite direction",
                "negatively correlated",
            ]);
        }
        let sem = &mut self.static_domain.semantic_patterns;
        if sem.exaggeration.is_empty() {
            sem.exaggeration =
                to_strings(&["always", "never", "certainly", "guaranteed", "must", "inevitably"]);
        }
        if sem.correlation_as_causation.is_empty() {
            sem.correlation_as_causation = to_strings(&[
                "together with",
                "alongside",
                "coincides with",
                "at the same time",
                "in tandem",
            ]);
        }
        if sem.weak_evidence.is_empty() {
            sem.weak_evidence = to_strings(&[
                "maybe", "perhaps", "might", "seems", "appears", "i guess", "possibly",
            ]);
        }
        if self.static_domain.opinion_markers.is_empty() {
            self.static_domain.opinion_markers = to_strings(&[
                "personally",
                "i think",
                "i feel",
                "in my opinion",
                "my guess",
                "my hunch",
            ]);
        }
        let rel = &mut self.static_domain.relevance_markers;
        if rel.emotional.is_empty() {
            rel.emotional =
                to_strings(&["worried", "afraid", "excited", "nervous", "hope", "anxious"]);
        }
        if rel.hypothesis.is_empty() {
            rel.hypothesis = to_strings(&["might", "maybe", "perhaps", "suspect", "expect"]);
        }
        if rel.opinion.is_empty() {
            rel.opinion = to_strings(&["i think", "in my opinion", "believe", "my view"]);
        }
        if rel.observation.is_empty() {
            rel.observation = to_strings(&["observed", "noticed", "saw", "data shows"]);
        }
        self
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn load_yaml<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> KgResult<T> {
    let path = dir.join(file);
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| KgError::config(file, format!("cannot read {}: {e}", path.display())))?;
    serde_yaml::from_str(&raw).map_err(|e| KgError::config(file, format!("malformed YAML: {e}")))
}
