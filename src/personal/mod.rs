// Copyright 2025 Cowboy AI, LLC.

//! Personal KG: intake, PCS classification, append-only update, promotion
//!
//! The per-user graph of weaker or private beliefs. Rows are never deleted;
//! recurring beliefs can be promoted into the Domain graph under strict
//! conditions.

mod adapter;
mod intake;
pub mod models;
mod pcs;
mod promotion;
mod update;

pub use adapter::{PersonalKgAdapter, PERSONAL_ENTITY_LABEL, PERSONAL_NS};
pub use intake::PersonalIntake;
pub use models::{
    HistoryAction, HistoryEvent, PcsResult, PcsSample, PersonalCandidate, PersonalDriftResult,
    PersonalLabel, PersonalProcessResult, PersonalRelation, RelevanceType, SourceType,
};
pub use pcs::PcsClassifier;
pub use promotion::{PersonalDriftAnalyzer, PROMOTION_SOURCE};
pub use update::PersonalKgUpdate;

use std::sync::{Arc, Mutex};

use crate::config::Settings;
use crate::domain::{DomainCandidate, DomainProcessResult, DynamicDomainUpdate, StaticDomainGuard};
use crate::edge::{RawEdge, ResolvedEntity};
use crate::errors::KgResult;
use crate::identifiers::UserId;
use crate::repository::Transaction;
use crate::validation::ValidationResult;

/// Running counters kept by the Personal pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersonalStats {
    /// Candidates processed
    pub total: u64,
    /// Rows created
    pub created: u64,
    /// Rows updated
    pub updated: u64,
    /// Candidates arriving via domain rejection
    pub from_domain_rejection: u64,
}

/// Intake → PCS → append-only update, plus drift/promotion entry points
pub struct PersonalPipeline {
    intake: PersonalIntake,
    classifier: PcsClassifier,
    update: PersonalKgUpdate,
    analyzer: PersonalDriftAnalyzer,
    stats: Mutex<PersonalStats>,
}

impl PersonalPipeline {
    /// Wire the pipeline for one user partition
    pub fn new(
        settings: &Settings,
        user_id: UserId,
        personal_adapter: Arc<PersonalKgAdapter>,
        domain_adapter: Option<Arc<crate::domain::DomainKgAdapter>>,
        guard: Arc<StaticDomainGuard>,
    ) -> Self {
        Self {
            intake: PersonalIntake::new(
                user_id,
                settings.static_domain.relevance_markers.clone(),
            ),
            classifier: PcsClassifier::new(domain_adapter, settings.pcs),
            update: PersonalKgUpdate::new(personal_adapter.clone()),
            analyzer: PersonalDriftAnalyzer::new(personal_adapter, guard, settings.promotion),
            stats: Mutex::new(PersonalStats::default()),
        }
    }

    /// The Personal adapter behind this pipeline
    pub fn adapter(&self) -> &Arc<PersonalKgAdapter> {
        self.update.adapter()
    }

    /// Process an edge the arbiter hinted PERSONAL_CANDIDATE
    pub fn process_from_validation(
        &self,
        edge: &RawEdge,
        validation: &ValidationResult,
        resolved: &[ResolvedEntity],
        tx: &mut Transaction,
    ) -> KgResult<Option<PersonalProcessResult>> {
        let Some(candidate) = self.intake.from_validation(edge, validation, resolved) else {
            return Ok(None);
        };
        self.apply(&candidate, tx).map(Some)
    }

    /// Process a candidate the Domain pipeline rejected
    pub fn process_from_domain_rejection(
        &self,
        domain_candidate: &DomainCandidate,
        domain_result: &DomainProcessResult,
        tx: &mut Transaction,
    ) -> KgResult<PersonalProcessResult> {
        let candidate = self
            .intake
            .from_domain_rejection(domain_candidate, domain_result);
        self.bump(|s| s.from_domain_rejection += 1);
        self.apply(&candidate, tx)
    }

    fn apply(
        &self,
        candidate: &PersonalCandidate,
        tx: &mut Transaction,
    ) -> KgResult<PersonalProcessResult> {
        let pcs = self.classifier.classify(candidate);
        let result = self.update.update(candidate, &pcs, tx)?;
        self.bump(|s| {
            s.total += 1;
            if result.is_new {
                s.created += 1;
            } else {
                s.updated += 1;
            }
        });
        Ok(result)
    }

    /// Scan all personal relations for drift/promotion candidates
    pub fn drift_scan(&self, domain: &DynamicDomainUpdate) -> Vec<PersonalDriftResult> {
        self.analyzer.scan_all(domain)
    }

    /// The drift analyzer (promotion entry point)
    pub fn analyzer(&self) -> &PersonalDriftAnalyzer {
        &self.analyzer
    }

    /// Running counters
    pub fn stats(&self) -> PersonalStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    fn bump(&self, f: impl FnOnce(&mut PersonalStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }
}
