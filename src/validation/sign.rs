// Copyright 2025 Cowboy AI, LLC.

//! Sign validator — does the claimed +/− direction hold up
//!
//! Three independent oracles: lexical patterns over the fragment, the static
//! rulebook, and an LLM probe consulted only when the patterns are silent.
//! A high-certainty static rule overrides everything and marks the edge
//! suspect.

use std::collections::HashMap;
use std::sync::Arc;

use super::models::SignCheck;
use crate::config::{SignPatterns, StaticDomainConfig, StaticRule};
use crate::edge::{Polarity, RawEdge, ResolvedEntity};
use crate::llm::{LlmGateway, LlmRequest};
use crate::tags::SignTag;

const STATIC_OVERRIDE_CERTAINTY: f64 = 0.9;

/// Stage 2: polarity arbitration
pub struct SignValidator {
    patterns: SignPatterns,
    rules: HashMap<(String, String), StaticRule>,
    gateway: Option<Arc<LlmGateway>>,
    probe_temperature: f64,
}

impl SignValidator {
    /// Build from the static-domain config and an optional LLM gateway
    pub fn new(
        config: &StaticDomainConfig,
        gateway: Option<Arc<LlmGateway>>,
        probe_temperature: f64,
    ) -> Self {
        let rules = config
            .static_rules
            .iter()
            .map(|r| ((r.head.clone(), r.tail.clone()), r.clone()))
            .collect();
        Self {
            patterns: config.sign_patterns.clone(),
            rules,
            gateway,
            probe_temperature,
        }
    }

    /// Arbitrate the polarity of one edge
    pub async fn validate(
        &self,
        edge: &RawEdge,
        fragment_text: &str,
        resolved: &[ResolvedEntity],
    ) -> SignCheck {
        let pattern_polarity = self.estimate_from_patterns(fragment_text);

        let entity_map: HashMap<&str, &ResolvedEntity> = resolved
            .iter()
            .map(|e| (e.entity_id.as_str(), e))
            .collect();
        let head_canonical = entity_map
            .get(edge.head_entity_id.as_str())
            .map(|e| e.graph_id().to_string());
        let tail_canonical = entity_map
            .get(edge.tail_entity_id.as_str())
            .map(|e| e.graph_id().to_string());

        let mut static_polarity = None;
        let mut static_certainty = 0.0;
        let mut conflict_with_static = false;
        if let (Some(head), Some(tail)) = (head_canonical, tail_canonical) {
            if let Some(rule) = self.rules.get(&(head, tail)) {
                static_polarity = Some(rule.polarity);
                static_certainty = rule.certainty;
                if edge.polarity_guess.conflicts_with(rule.polarity) {
                    conflict_with_static = true;
                    tracing::warn!(
                        edge = %edge.raw_edge_id,
                        student = %edge.polarity_guess,
                        rule = %rule.rule_id,
                        expected = %rule.polarity,
                        "student polarity contradicts static rule"
                    );
                }
            }
        }

        // The LLM probe runs only when lexical evidence is absent.
        let llm_polarity = if pattern_polarity.is_none() {
            self.probe_llm(edge, fragment_text).await
        } else {
            None
        };

        let (polarity_final, sign_tag, consistency) = decide_sign(
            edge.polarity_guess,
            pattern_polarity,
            static_polarity,
            static_certainty,
            conflict_with_static,
            llm_polarity,
        );

        SignCheck {
            edge_id: edge.raw_edge_id.clone(),
            polarity_final,
            sign_tag,
            consistency,
            pattern_polarity,
            static_polarity,
            llm_polarity,
            conflict_with_static,
        }
    }

    fn estimate_from_patterns(&self, text: &str) -> Option<Polarity> {
        let lower = text.to_lowercase();

        // Inverse-relationship phrasing wins over individual direction words.
        if self.patterns.inverse.iter().any(|p| lower.contains(p)) {
            return Some(Polarity::Negative);
        }

        let pos = self
            .patterns
            .positive
            .iter()
            .filter(|p| lower.contains(p.as_str()))
            .count();
        let neg = self
            .patterns
            .negative
            .iter()
            .filter(|p| lower.contains(p.as_str()))
            .count();

        match (pos, neg) {
            (p, 0) if p > 0 => Some(Polarity::Positive),
            (0, n) if n > 0 => Some(Polarity::Negative),
            _ => None,
        }
    }

    async fn probe_llm(&self, edge: &RawEdge, fragment_text: &str) -> Option<Polarity> {
        let gateway = self.gateway.as_ref()?;
        let head = edge.head_name.as_deref().unwrap_or(&edge.head_entity_id);
        let tail = edge.tail_name.as_deref().unwrap_or(&edge.tail_entity_id);
        let prompt = format!(
            "Judge the direction of the influence of \"{head}\" on \"{tail}\" in this sentence.\n\
             \n\
             Sentence: \"{fragment_text}\"\n\
             \n\
             Respond as JSON: {{\"polarity\": \"+\"}}\n\
             Allowed polarity values:\n\
             - \"+\": positive influence (rise, increase, strength)\n\
             - \"-\": negative influence (fall, decrease, weakness)\n\
             - \"neutral\": no direction\n\
             - \"unknown\": cannot judge"
        );
        let request = LlmRequest::new(prompt, self.probe_temperature).json();
        match gateway.generate_json(&request).await {
            Ok(value) => value
                .get("polarity")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<Polarity>().ok()),
            Err(e) => {
                // Degrade to rule-based arbitration.
                tracing::warn!(edge = %edge.raw_edge_id, error = %e, "LLM polarity probe failed");
                None
            }
        }
    }
}

fn decide_sign(
    student: Polarity,
    pattern: Option<Polarity>,
    static_polarity: Option<Polarity>,
    static_certainty: f64,
    conflict_with_static: bool,
    llm: Option<Polarity>,
) -> (Polarity, SignTag, f64) {
    // A near-certain static rule is authoritative; contradiction is suspect.
    if conflict_with_static && static_certainty >= STATIC_OVERRIDE_CERTAINTY {
        return (
            static_polarity.unwrap_or(Polarity::Unknown),
            SignTag::Suspect,
            0.3,
        );
    }

    let student_vote = (student != Polarity::Unknown).then_some(student);
    let sources: Vec<Polarity> = [student_vote, pattern, static_polarity, llm]
        .into_iter()
        .flatten()
        .filter(|p| *p != Polarity::Unknown)
        .collect();

    if sources.is_empty() {
        return (Polarity::Unknown, SignTag::Unknown, 0.0);
    }

    if sources.iter().all(|p| *p == sources[0]) {
        return (sources[0], SignTag::Confident, 0.9);
    }

    // The static oracle, when present, anchors the decision.
    if let Some(static_pol) = static_polarity {
        let matching = sources.iter().filter(|p| **p == static_pol).count();
        if matching * 2 >= sources.len() {
            return (static_pol, SignTag::Confident, 0.8);
        }
        return (static_pol, SignTag::Ambiguous, 0.6);
    }

    // Majority vote among the remaining oracles.
    let mut counts: HashMap<Polarity, usize> = HashMap::new();
    for p in &sources {
        *counts.entry(*p).or_default() += 1;
    }
    if let Some((winner, count)) = counts.into_iter().max_by_key(|(_, c)| *c) {
        if count * 2 > sources.len() {
            return (winner, SignTag::Ambiguous, 0.5);
        }
    }

    (student, SignTag::Ambiguous, 0.4)
}
