// Copyright 2025 Cowboy AI, LLC.

//! Reasoning core: parse → retrieve → fuse → aggregate → conclude
//!
//! Queries traverse both KGs through the shared repository. A question with
//! no locatable entities or no usable paths yields an UNKNOWN conclusion,
//! never an error.

pub mod models;

mod conclusion;
mod fusion;
mod path;
mod query;
mod retrieval;
mod simulator;

pub use conclusion::ConclusionSynthesizer;
pub use fusion::EdgeWeightFusion;
pub use models::{
    Conclusion, ConfidenceBand, EdgeSource, FusedEdge, FusedPath, ImpactEstimate, ParsedQuery,
    QueryType, ReasoningDirection, ReasoningResult, RetrievalResult, RetrievedEdge, RetrievedPath,
};
pub use path::PathReasoner;
pub use query::QueryParser;
pub use retrieval::GraphRetrieval;
pub use simulator::ImpactSimulator;

use std::sync::Arc;

use crate::config::Settings;
use crate::domain::DomainKgAdapter;
use crate::errors::KgResult;
use crate::llm::LlmGateway;
use crate::personal::PersonalKgAdapter;
use crate::resolve::EntityResolver;

/// End-to-end reasoning over both KGs
pub struct ReasoningPipeline {
    parser: QueryParser,
    retrieval: GraphRetrieval,
    fusion: EdgeWeightFusion,
    reasoner: PathReasoner,
    synthesizer: ConclusionSynthesizer,
    simulator: ImpactSimulator,
}

impl ReasoningPipeline {
    /// Wire the pipeline over both adapters, a resolver and an optional
    /// polishing gateway
    pub fn new(
        settings: &Settings,
        resolver: Arc<dyn EntityResolver>,
        domain: Arc<DomainKgAdapter>,
        personal: Arc<PersonalKgAdapter>,
        gateway: Option<Arc<LlmGateway>>,
    ) -> Self {
        Self {
            parser: QueryParser::new(resolver),
            retrieval: GraphRetrieval::new(domain.clone(), personal, settings.reasoning),
            fusion: EdgeWeightFusion::new(settings.reasoning),
            reasoner: PathReasoner::new(settings.reasoning),
            synthesizer: ConclusionSynthesizer::new(gateway, settings.llm.polish_temperature),
            simulator: ImpactSimulator::new(domain, settings.simulation),
        }
    }

    /// Answer a natural-language question
    pub async fn reason(&self, question: &str) -> KgResult<Conclusion> {
        let parsed = self.parser.parse(question);

        let Some(head) = parsed.head_entity.clone() else {
            let result = ReasoningResult::unknown(parsed.query_id.clone());
            return Ok(self.synthesizer.synthesize(&parsed, &result).await);
        };

        let retrieval = self.retrieval.retrieve(
            &head,
            parsed.tail_entity.as_deref(),
            &parsed.entity_names,
        );
        let mut fused = self.fusion.fuse_all(&retrieval.all_paths());

        // Every retrieved path may be sign-void (unknown edges). When the
        // Domain yielded paths but none survive, fall back to Personal.
        let none_usable = fused.iter().all(|p| p.path_sign.is_none());
        if none_usable && retrieval.domain_paths > 0 && retrieval.personal_paths == 0 {
            if let Some(tail) = parsed.tail_entity.as_deref() {
                let personal = self.retrieval.retrieve_personal(&head, tail, &parsed.entity_names);
                if !personal.is_empty() {
                    tracing::info!(query = %parsed.query_id, "domain paths unusable, falling back to personal");
                    fused = self.fusion.fuse_all(&personal);
                }
            }
        }

        let result = self.reasoner.reason(parsed.query_id.clone(), fused);
        Ok(self.synthesizer.synthesize(&parsed, &result).await)
    }

    /// Propagate a hypothetical shock from the given entities
    pub fn simulate(&self, triggers: &[&str]) -> Vec<ImpactEstimate> {
        self.simulator.simulate(triggers)
    }
}
