// Copyright 2025 Cowboy AI, LLC.

//! # Causal KG
//!
//! A dual knowledge-graph engine: free-form text (already fragmented,
//! NER-tagged and canonicalised by external collaborators) enters as raw
//! edges, passes a four-stage validation arbiter, and lands either in the
//! shared **Domain KG** of general causal/affect relations or in a per-user
//! **Personal KG** of weaker beliefs. Questions are answered by signed-path
//! reasoning over both graphs.
//!
//! ## Subsystems
//!
//! - **Repository & transactions**: typed entity/relation rows behind one
//!   store of truth, with change-log transactions and reverse-order undo
//! - **Validation arbiter**: schema → sign → semantic → confidence filter
//! - **Domain pipeline**: intake, immutable static guard, evidence
//!   accumulation with decay, conflict analysis, drift detection
//! - **Personal pipeline**: four-factor confidence scoring over an
//!   append-only belief store, drift analysis and Domain promotion
//! - **Reasoning core**: BFS retrieval, EES weight fusion, sign
//!   propagation, multi-path aggregation, natural-language conclusions
//! - **LLM gateway**: retries, backoff, caching and fallback around an
//!   optional model backend; every consumer degrades to rule-based
//!   operation without it
//!
//! ## Design principles
//!
//! 1. **Closed vocabularies**: polarity, tags, destinations and resolutions
//!    are enums, not strings
//! 2. **Rejections are data**: validation failure is a routed outcome with
//!    machine-readable codes, never an exception
//! 3. **One store of truth**: both KG adapters are non-owning views over
//!    the same repository, separated by label namespaces
//! 4. **Append-only beliefs**: personal relations are never deleted and
//!    every change extends their history trail
//! 5. **Injected dependencies**: resolver, repository and LLM backend are
//!    swappable at the bootstrap seam

#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod edge;
pub mod engine;
pub mod errors;
pub mod identifiers;
pub mod llm;
pub mod personal;
pub mod reasoning;
pub mod repository;
pub mod resolve;
pub mod tags;
pub mod validation;

// Re-export the core surface
pub use bootstrap::{global_context, init_global, reset_all, KgContext, KgContextBuilder};
pub use config::{Settings, StaticRule};
pub use edge::{ExtractionOutput, Polarity, RawEdge, RelationType, ResolvedEntity};
pub use engine::{DroppedEdge, EngineStats, IngestOutcome, KnowledgeEngine};
pub use errors::{ErrorSeverity, KgError, KgResult};
pub use identifiers::{FragmentId, QueryId, RelationId, RelationKey, TxId, UserId};
pub use tags::{SemanticTag, SignTag, ValidationDestination};

pub use domain::{
    DomainKgAdapter, DomainPipeline, DynamicRelation, FinalDestination, StaticDomainGuard,
};
pub use llm::{LlmClient, LlmGateway, LlmRequest, LlmResponse, MockLlmClient};
pub use personal::{PersonalKgAdapter, PersonalPipeline, PersonalRelation};
pub use reasoning::{Conclusion, ReasoningDirection, ReasoningPipeline};
pub use repository::{GraphRepository, InMemoryGraphRepository, Transaction, TransactionManager};
pub use resolve::{AliasResolver, EntityResolver};
pub use validation::{ValidationPipeline, ValidationResult};
