// Copyright 2025 Cowboy AI, LLC.

//! Validation arbiter: schema → sign → semantic → confidence filter
//!
//! The arbiter decides whether an extracted edge is usable and hints its
//! destination (Domain vs Personal). Rejections are normal results with
//! machine-readable codes; only malformed input errors.

mod confidence;
mod models;
mod schema;
mod semantic;
mod sign;

pub use confidence::ConfidenceFilter;
pub use models::{
    LlmJudgement, SchemaCheck, SemanticCheck, SignCheck, ValidationResult, ValidationStats,
};
pub use schema::SchemaValidator;
pub use semantic::SemanticValidator;
pub use sign::SignValidator;

use std::sync::{Arc, Mutex};

use crate::config::Settings;
use crate::domain::DomainKgAdapter;
use crate::edge::{RawEdge, ResolvedEntity};
use crate::errors::KgResult;
use crate::llm::LlmGateway;
use crate::tags::ValidationDestination;

/// The four-stage validation pipeline
pub struct ValidationPipeline {
    schema: SchemaValidator,
    sign: SignValidator,
    semantic: SemanticValidator,
    filter: ConfidenceFilter,
    domain: Option<Arc<DomainKgAdapter>>,
    stats: Mutex<ValidationStats>,
}

impl ValidationPipeline {
    /// Wire the pipeline from settings, an optional gateway and an optional
    /// Domain adapter (used by the semantic consistency probe)
    pub fn new(
        settings: &Settings,
        gateway: Option<Arc<LlmGateway>>,
        domain: Option<Arc<DomainKgAdapter>>,
    ) -> Self {
        Self {
            schema: SchemaValidator::new(&settings.validation),
            sign: SignValidator::new(
                &settings.static_domain,
                gateway.clone(),
                settings.llm.probe_temperature,
            ),
            semantic: SemanticValidator::new(
                settings.static_domain.semantic_patterns.clone(),
                gateway,
                settings.llm.probe_temperature,
            ),
            filter: ConfidenceFilter::new(
                settings.validation.confidence_thresholds,
                settings.validation.confidence_weights,
            ),
            domain,
            stats: Mutex::new(ValidationStats::default()),
        }
    }

    /// Arbitrate one edge
    pub async fn validate(
        &self,
        edge: &RawEdge,
        resolved: &[ResolvedEntity],
    ) -> KgResult<ValidationResult> {
        edge.check_shape()?;
        self.bump(|s| s.total += 1);

        let fragment_text = edge.fragment_text.clone().unwrap_or_default();

        let schema = self.schema.validate(edge, resolved);
        if !schema.schema_valid {
            self.bump(|s| s.dropped += 1);
            return Ok(ValidationResult::schema_drop(schema));
        }
        self.bump(|s| s.schema_passed += 1);

        // The two probe stages are independent; their LLM calls overlap.
        let (sign, semantic) = futures::join!(
            self.sign.validate(edge, &fragment_text, resolved),
            self.semantic
                .validate(edge, &fragment_text, resolved, self.domain.as_deref())
        );

        let result = self.filter.filter(edge, schema, sign, semantic);
        self.bump(|s| match result.destination {
            ValidationDestination::DomainCandidate => s.domain_candidates += 1,
            ValidationDestination::PersonalCandidate => s.personal_candidates += 1,
            ValidationDestination::DropLog => s.dropped += 1,
        });

        Ok(result)
    }

    /// Arbitrate a batch of edges against one resolved-entity set
    pub async fn validate_batch(
        &self,
        edges: &[RawEdge],
        resolved: &[ResolvedEntity],
    ) -> KgResult<Vec<ValidationResult>> {
        let mut results = Vec::with_capacity(edges.len());
        for edge in edges {
            results.push(self.validate(edge, resolved).await?);
        }
        tracing::info!(stats = ?self.stats(), "batch validation complete");
        Ok(results)
    }

    /// Running counters
    pub fn stats(&self) -> ValidationStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    /// Reset counters (tests)
    pub fn reset_stats(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            *stats = ValidationStats::default();
        }
    }

    fn bump(&self, f: impl FnOnce(&mut ValidationStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }
}
