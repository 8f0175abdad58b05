// Copyright 2025 Cowboy AI, LLC.

//! The knowledge-arbitration engine facade
//!
//! One `KnowledgeEngine` wires validation, the two KG pipelines and the
//! reasoner over a shared repository. Ingestion runs one edge (or one batch)
//! per transaction; queries are read paths.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Mutex;

use crate::bootstrap::KgContext;
use crate::domain::{DomainPipeline, DomainStats, DynamicUpdateResult, FinalDestination};
use crate::edge::{RawEdge, ResolvedEntity};
use crate::errors::KgResult;
use crate::identifiers::{RelationId, UserId};
use crate::personal::{PersonalDriftResult, PersonalPipeline, PersonalStats};
use crate::reasoning::{Conclusion, ImpactEstimate, ReasoningPipeline};
use crate::repository::TransactionStats;
use crate::tags::ValidationDestination;
use crate::validation::{ValidationPipeline, ValidationResult, ValidationStats};

const DROP_LOG_LIMIT: usize = 256;

/// One entry in the drop log
#[derive(Debug, Clone)]
pub struct DroppedEdge {
    /// The rejected edge
    pub raw_edge_id: String,
    /// Machine-readable rejection codes
    pub rejection_codes: Vec<String>,
    /// When the rejection happened
    pub timestamp: DateTime<Utc>,
}

/// Everything that happened to one ingested edge
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The edge
    pub raw_edge_id: String,
    /// Arbitration verdict
    pub validation: ValidationResult,
    /// Domain pipeline record, when the edge reached it
    pub domain: Option<crate::domain::DomainProcessResult>,
    /// Personal pipeline record, when the edge landed there
    pub personal: Option<crate::personal::PersonalProcessResult>,
}

/// Aggregated counters across the engine
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    /// Validation counters
    pub validation: ValidationStats,
    /// Domain pipeline counters
    pub domain: DomainStats,
    /// Personal pipeline counters
    pub personal: PersonalStats,
    /// Transaction counters
    pub transactions: TransactionStats,
}

/// The engine facade
pub struct KnowledgeEngine {
    context: KgContext,
    validation: ValidationPipeline,
    domain: DomainPipeline,
    personal: PersonalPipeline,
    reasoning: ReasoningPipeline,
    drop_log: Mutex<Vec<DroppedEdge>>,
}

impl KnowledgeEngine {
    /// Wire an engine over a context for the default user
    pub fn new(context: KgContext) -> Self {
        Self::for_user(context, UserId::default_user())
    }

    /// Wire an engine over a context for one user partition
    pub fn for_user(context: KgContext, user_id: UserId) -> Self {
        let validation = ValidationPipeline::new(
            &context.settings,
            context.gateway.clone(),
            Some(context.domain_adapter.clone()),
        );
        let domain = DomainPipeline::new(
            &context.settings,
            context.domain_adapter.clone(),
            context.guard.clone(),
        );
        let personal = PersonalPipeline::new(
            &context.settings,
            user_id,
            context.personal_adapter.clone(),
            Some(context.domain_adapter.clone()),
            context.guard.clone(),
        );
        let reasoning = ReasoningPipeline::new(
            &context.settings,
            context.resolver.clone(),
            context.domain_adapter.clone(),
            context.personal_adapter.clone(),
            context.gateway.clone(),
        );
        Self {
            context,
            validation,
            domain,
            personal,
            reasoning,
            drop_log: Mutex::new(Vec::new()),
        }
    }

    /// Load the Domain bootstrap files (entities.json / relations.json)
    pub fn load_domain_bootstrap(&self, dir: impl AsRef<Path>) -> KgResult<(usize, usize)> {
        self.context.domain_adapter.load_bootstrap(dir)
    }

    /// Validate and route one edge inside its own transaction
    pub async fn ingest(
        &self,
        edge: &RawEdge,
        resolved: &[ResolvedEntity],
    ) -> KgResult<IngestOutcome> {
        let validation = self.validation.validate(edge, resolved).await?;
        self.process(edge, &validation, resolved)
    }

    /// Route an edge whose arbitration verdict the caller already holds
    pub fn process(
        &self,
        edge: &RawEdge,
        validation: &ValidationResult,
        resolved: &[ResolvedEntity],
    ) -> KgResult<IngestOutcome> {
        self.context
            .tx_manager
            .run(|tx| self.route(edge, validation, resolved, tx))
    }

    /// Validate and route a batch of edges inside one transaction
    pub async fn ingest_batch(
        &self,
        edges: &[RawEdge],
        resolved: &[ResolvedEntity],
    ) -> KgResult<Vec<IngestOutcome>> {
        let mut validations = Vec::with_capacity(edges.len());
        for edge in edges {
            validations.push(self.validation.validate(edge, resolved).await?);
        }
        self.context.tx_manager.run(|tx| {
            let mut outcomes = Vec::with_capacity(edges.len());
            for (edge, validation) in edges.iter().zip(&validations) {
                outcomes.push(self.route(edge, validation, resolved, tx)?);
            }
            Ok(outcomes)
        })
    }

    fn route(
        &self,
        edge: &RawEdge,
        validation: &ValidationResult,
        resolved: &[ResolvedEntity],
        tx: &mut crate::repository::Transaction,
    ) -> KgResult<IngestOutcome> {
        let mut outcome = IngestOutcome {
            raw_edge_id: edge.raw_edge_id.clone(),
            validation: validation.clone(),
            domain: None,
            personal: None,
        };

        match validation.destination {
            ValidationDestination::DropLog => {
                self.log_drop(edge, validation);
            }
            ValidationDestination::DomainCandidate => {
                let domain_result = self.domain.process(edge, validation, resolved, tx)?;
                if domain_result.final_destination == FinalDestination::Personal {
                    if let Some(candidate) = &domain_result.candidate {
                        outcome.personal = Some(self.personal.process_from_domain_rejection(
                            candidate,
                            &domain_result,
                            tx,
                        )?);
                    }
                }
                outcome.domain = Some(domain_result);
            }
            ValidationDestination::PersonalCandidate => {
                outcome.personal = self
                    .personal
                    .process_from_validation(edge, validation, resolved, tx)?;
            }
        }

        Ok(outcome)
    }

    fn log_drop(&self, edge: &RawEdge, validation: &ValidationResult) {
        if let Ok(mut log) = self.drop_log.lock() {
            log.push(DroppedEdge {
                raw_edge_id: edge.raw_edge_id.clone(),
                rejection_codes: validation.rejection_codes.clone(),
                timestamp: Utc::now(),
            });
            if log.len() > DROP_LOG_LIMIT {
                let overflow = log.len() - DROP_LOG_LIMIT;
                log.drain(..overflow);
            }
        }
    }

    /// Answer a natural-language question over both KGs
    pub async fn reason(&self, question: &str) -> KgResult<Conclusion> {
        self.reasoning.reason(question).await
    }

    /// Propagate a hypothetical shock through the Domain graph
    pub fn simulate(&self, triggers: &[&str]) -> Vec<ImpactEstimate> {
        self.reasoning.simulate(triggers)
    }

    /// Scan personal relations for drift/promotion candidates
    pub fn scan_promotions(&self) -> Vec<PersonalDriftResult> {
        self.personal.drift_scan(self.domain.updater())
    }

    /// Promote a personal relation into the Domain graph
    pub fn promote(&self, relation_id: &RelationId) -> KgResult<DynamicUpdateResult> {
        self.context.tx_manager.run(|tx| {
            self.personal
                .analyzer()
                .promote_to_domain(relation_id, self.domain.updater(), tx)
        })
    }

    /// Run a Domain drift scan in one transaction; returns flagged count
    pub fn domain_drift_scan(&self) -> KgResult<usize> {
        self.context.tx_manager.run(|tx| self.domain.drift_scan(tx))
    }

    /// Recently dropped edges, oldest first
    pub fn drop_log(&self) -> Vec<DroppedEdge> {
        self.drop_log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Aggregated counters
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            validation: self.validation.stats(),
            domain: self.domain.stats(),
            personal: self.personal.stats(),
            transactions: self.context.tx_manager.stats(),
        }
    }

    /// The context this engine runs on
    pub fn context(&self) -> &KgContext {
        &self.context
    }
}
