// Copyright 2025 Cowboy AI, LLC.

//! Domain KG: intake, static guard, dynamic update, conflict analysis, drift
//!
//! The shared graph of general causal/affect relations. Candidates arrive
//! from the validation arbiter, are screened against the immutable rulebook,
//! accumulate as evidence, and can be demoted to personal beliefs when they
//! contradict what the Domain already knows.

mod adapter;
mod conflict;
mod drift;
mod dynamic_update;
mod intake;
pub mod models;
mod static_guard;

pub use adapter::{DomainKgAdapter, DOMAIN_ENTITY_LABEL, DOMAIN_NS};
pub use conflict::ConflictAnalyzer;
pub use drift::DomainDriftDetector;
pub use dynamic_update::DynamicDomainUpdate;
pub use intake::DomainIntake;
pub use models::{
    ConflictAnalysisResult, ConflictResolution, ConflictType, DomainAction, DomainCandidate,
    DomainProcessResult, DriftDetectionResult, DynamicRelation, DynamicUpdateResult,
    FinalDestination, StaticGuardResult,
};
pub use static_guard::StaticDomainGuard;

use std::sync::{Arc, Mutex};

use crate::config::Settings;
use crate::edge::{RawEdge, ResolvedEntity};
use crate::errors::KgResult;
use crate::repository::Transaction;
use crate::tags::ValidationDestination;
use crate::validation::ValidationResult;

/// Running counters kept by the Domain pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainStats {
    /// Edges seen
    pub total: u64,
    /// Edges that ended in the Domain graph
    pub domain_accepted: u64,
    /// Edges re-routed to Personal
    pub personal_redirected: u64,
    /// Edges dropped to the log
    pub logged: u64,
    /// Candidates matching a static rule
    pub static_matched: u64,
    /// Candidates contradicting a static rule
    pub static_conflicts: u64,
    /// New relations created
    pub new_relations: u64,
    /// Existing relations updated
    pub updated_relations: u64,
    /// Conflicts run through the analyzer
    pub conflicts_analyzed: u64,
}

/// Intake → static guard → dynamic update → conflict analysis → drift
pub struct DomainPipeline {
    intake: DomainIntake,
    guard: Arc<StaticDomainGuard>,
    update: DynamicDomainUpdate,
    analyzer: ConflictAnalyzer,
    drift: DomainDriftDetector,
    stats: Mutex<DomainStats>,
}

impl DomainPipeline {
    /// Wire the pipeline over a shared adapter and rulebook
    pub fn new(
        settings: &Settings,
        adapter: Arc<DomainKgAdapter>,
        guard: Arc<StaticDomainGuard>,
    ) -> Self {
        Self {
            intake: DomainIntake::new(settings.static_domain.opinion_markers.clone()),
            guard,
            update: DynamicDomainUpdate::new(adapter.clone(), settings.domain_update),
            analyzer: ConflictAnalyzer::new(settings.conflict),
            drift: DomainDriftDetector::new(adapter, settings.drift),
            stats: Mutex::new(DomainStats::default()),
        }
    }

    /// The static rulebook this pipeline guards with
    pub fn guard(&self) -> &Arc<StaticDomainGuard> {
        &self.guard
    }

    /// The dynamic updater (shared with promotion)
    pub fn updater(&self) -> &DynamicDomainUpdate {
        &self.update
    }

    /// Process one validated edge inside the caller's transaction
    pub fn process(
        &self,
        edge: &RawEdge,
        validation: &ValidationResult,
        resolved: &[ResolvedEntity],
        tx: &mut Transaction,
    ) -> KgResult<DomainProcessResult> {
        self.bump(|s| s.total += 1);

        let Some(candidate) = self.intake.process(edge, validation, resolved) else {
            let destination = if validation.destination == ValidationDestination::PersonalCandidate
            {
                self.bump(|s| s.personal_redirected += 1);
                FinalDestination::Personal
            } else {
                self.bump(|s| s.logged += 1);
                FinalDestination::Log
            };
            return Ok(DomainProcessResult {
                candidate_id: None,
                raw_edge_id: edge.raw_edge_id.clone(),
                final_destination: destination,
                candidate: None,
                static_result: None,
                dynamic_result: None,
                conflict_result: None,
                drift_result: None,
                domain_relation_id: None,
            });
        };

        let static_result = self.guard.check(&candidate);
        if static_result.static_conflict {
            self.bump(|s| {
                s.static_conflicts += 1;
                s.personal_redirected += 1;
            });
            return Ok(DomainProcessResult {
                candidate_id: Some(candidate.candidate_id.clone()),
                raw_edge_id: edge.raw_edge_id.clone(),
                final_destination: FinalDestination::Personal,
                candidate: Some(candidate),
                static_result: Some(static_result),
                dynamic_result: None,
                conflict_result: None,
                drift_result: None,
                domain_relation_id: None,
            });
        }
        if static_result.action == DomainAction::StrengthenStatic {
            self.bump(|s| s.static_matched += 1);
        }

        let dynamic_result = self.update.update(&candidate, tx)?;
        self.bump(|s| {
            if dynamic_result.is_new {
                s.new_relations += 1;
            } else {
                s.updated_relations += 1;
            }
        });

        let mut conflict_result = None;
        let mut drift_result = None;

        if dynamic_result.conflict_pending {
            if let Some(relation) = self.update.relation_by_id(&dynamic_result.relation_id) {
                let graph = self.update.all_relations();
                let analysis = self.analyzer.analyze(&candidate, &relation, &graph);
                self.bump(|s| s.conflicts_analyzed += 1);

                match analysis.resolution {
                    ConflictResolution::ToPersonal => {
                        self.bump(|s| s.personal_redirected += 1);
                        return Ok(DomainProcessResult {
                            candidate_id: Some(candidate.candidate_id.clone()),
                            raw_edge_id: edge.raw_edge_id.clone(),
                            final_destination: FinalDestination::Personal,
                            candidate: Some(candidate),
                            static_result: Some(static_result),
                            dynamic_result: Some(dynamic_result),
                            conflict_result: Some(analysis),
                            drift_result: None,
                            domain_relation_id: None,
                        });
                    }
                    ConflictResolution::ToDrift => {
                        drift_result = Some(self.drift.detect(&relation, tx)?);
                    }
                    _ => {}
                }
                conflict_result = Some(analysis);
            }
        }

        self.bump(|s| s.domain_accepted += 1);
        Ok(DomainProcessResult {
            candidate_id: Some(candidate.candidate_id.clone()),
            raw_edge_id: edge.raw_edge_id.clone(),
            final_destination: FinalDestination::Domain,
            candidate: Some(candidate),
            static_result: Some(static_result),
            domain_relation_id: Some(dynamic_result.relation_id.clone()),
            dynamic_result: Some(dynamic_result),
            conflict_result,
            drift_result,
        })
    }

    /// Run a full drift scan inside the caller's transaction
    pub fn drift_scan(&self, tx: &mut Transaction) -> KgResult<usize> {
        self.drift.scan_all(tx)
    }

    /// Running counters
    pub fn stats(&self) -> DomainStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    fn bump(&self, f: impl FnOnce(&mut DomainStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }
}
