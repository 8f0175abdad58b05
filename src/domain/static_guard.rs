// Copyright 2025 Cowboy AI, LLC.

//! Static domain guard
//!
//! The immutable rulebook: textbook economic relations that incoming
//! evidence must not overwrite. A candidate that contradicts a rule is
//! re-routed to the Personal KG, never written to Domain.

use std::collections::HashMap;

use super::models::{DomainAction, DomainCandidate, StaticGuardResult};
use crate::config::StaticRule;

const TYPE_CONFLICT_CERTAINTY: f64 = 0.95;

/// Read-only `(head, tail)` → rule map
pub struct StaticDomainGuard {
    rules: HashMap<(String, String), StaticRule>,
}

impl StaticDomainGuard {
    /// Build from the loaded rulebook
    pub fn new(rules: &[StaticRule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| ((r.head.clone(), r.tail.clone()), r.clone()))
                .collect(),
        }
    }

    /// Check one candidate against the rulebook
    pub fn check(&self, candidate: &DomainCandidate) -> StaticGuardResult {
        let key = (candidate.head_id.clone(), candidate.tail_id.clone());

        let Some(rule) = self.rules.get(&key) else {
            return StaticGuardResult {
                candidate_id: candidate.candidate_id.clone(),
                static_pass: true,
                static_conflict: false,
                action: DomainAction::CreateNew,
                rule_id: None,
                expected_polarity: None,
                actual_polarity: candidate.polarity,
                reason: None,
            };
        };

        if candidate.polarity.conflicts_with(rule.polarity) {
            tracing::warn!(
                candidate = %candidate.candidate_id,
                rule = %rule.rule_id,
                expected = %rule.polarity,
                actual = %candidate.polarity,
                "static conflict"
            );
            return StaticGuardResult {
                candidate_id: candidate.candidate_id.clone(),
                static_pass: false,
                static_conflict: true,
                action: DomainAction::RejectToPersonal,
                rule_id: Some(rule.rule_id.clone()),
                expected_polarity: Some(rule.polarity),
                actual_polarity: candidate.polarity,
                reason: Some(format!(
                    "polarity conflict with static rule: {}",
                    rule.description
                )),
            };
        }

        if candidate.relation_type != rule.relation && rule.certainty >= TYPE_CONFLICT_CERTAINTY {
            // Affect vs Cause drift is tolerated below near-certain rules.
            tracing::debug!(
                candidate = %candidate.candidate_id,
                rule = %rule.rule_id,
                static_type = %rule.relation,
                candidate_type = %candidate.relation_type,
                "relation type mismatch against a near-certain rule"
            );
        }

        StaticGuardResult {
            candidate_id: candidate.candidate_id.clone(),
            static_pass: true,
            static_conflict: false,
            action: DomainAction::StrengthenStatic,
            rule_id: Some(rule.rule_id.clone()),
            expected_polarity: Some(rule.polarity),
            actual_polarity: candidate.polarity,
            reason: None,
        }
    }

    /// Look up the rule for an exact pair
    pub fn rule_for(&self, head_id: &str, tail_id: &str) -> Option<&StaticRule> {
        self.rules.get(&(head_id.to_string(), tail_id.to_string()))
    }

    /// Whether any rule fixes this pair (the promotion veto)
    pub fn is_static_pair(&self, head_id: &str, tail_id: &str) -> bool {
        self.rules
            .contains_key(&(head_id.to_string(), tail_id.to_string()))
    }
}
