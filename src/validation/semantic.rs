// Copyright 2025 Cowboy AI, LLC.

//! Semantic validator — even a well-formed, well-signed edge can be nonsense

use std::sync::Arc;

use super::models::{LlmJudgement, SemanticCheck};
use crate::config::SemanticPatterns;
use crate::domain::DomainKgAdapter;
use crate::edge::{RawEdge, RelationType, ResolvedEntity};
use crate::llm::{LlmGateway, LlmRequest};
use crate::tags::SemanticTag;

/// Stage 3: local heuristics, a Domain consistency probe, and an optional
/// LLM contextual judgement.
pub struct SemanticValidator {
    patterns: SemanticPatterns,
    gateway: Option<Arc<LlmGateway>>,
    probe_temperature: f64,
}

impl SemanticValidator {
    /// Build from the semantic patterns and an optional LLM gateway
    pub fn new(
        patterns: SemanticPatterns,
        gateway: Option<Arc<LlmGateway>>,
        probe_temperature: f64,
    ) -> Self {
        Self {
            patterns,
            gateway,
            probe_temperature,
        }
    }

    /// Judge one edge
    pub async fn validate(
        &self,
        edge: &RawEdge,
        fragment_text: &str,
        resolved: &[ResolvedEntity],
        domain: Option<&DomainKgAdapter>,
    ) -> SemanticCheck {
        let lower = fragment_text.to_lowercase();

        let has_exaggeration = self
            .patterns
            .exaggeration
            .iter()
            .any(|p| lower.contains(p.as_str()));
        // Only a Cause claim can commit the correlation-as-causation sin.
        let correlation_as_causation = edge.relation_type == RelationType::Cause
            && self
                .patterns
                .correlation_as_causation
                .iter()
                .any(|p| lower.contains(p.as_str()));
        let weak_evidence = self
            .patterns
            .weak_evidence
            .iter()
            .any(|p| lower.contains(p.as_str()));

        let domain_conflict = domain
            .map(|adapter| self.check_domain_conflict(edge, resolved, adapter))
            .unwrap_or(false);

        let llm_judgement = self.probe_llm(edge, fragment_text).await;

        let (tag, confidence) = decide_semantic(
            has_exaggeration,
            correlation_as_causation,
            weak_evidence,
            domain_conflict,
            llm_judgement,
        );

        SemanticCheck {
            edge_id: edge.raw_edge_id.clone(),
            tag,
            confidence,
            has_exaggeration,
            correlation_as_causation,
            weak_evidence,
            domain_conflict,
            llm_judgement,
        }
    }

    fn check_domain_conflict(
        &self,
        edge: &RawEdge,
        resolved: &[ResolvedEntity],
        domain: &DomainKgAdapter,
    ) -> bool {
        let find = |mention: &str| {
            resolved
                .iter()
                .find(|e| e.entity_id == mention)
                .map(|e| e.graph_id().to_string())
        };
        let (Some(head), Some(tail)) = (find(&edge.head_entity_id), find(&edge.tail_entity_id))
        else {
            return false;
        };
        domain
            .pair_relations(&head, &tail)
            .iter()
            .any(|rel| rel.sign.conflicts_with(edge.polarity_guess))
    }

    async fn probe_llm(&self, edge: &RawEdge, fragment_text: &str) -> Option<LlmJudgement> {
        let gateway = self.gateway.as_ref()?;
        let head = edge.head_name.as_deref().unwrap_or(&edge.head_entity_id);
        let tail = edge.tail_name.as_deref().unwrap_or(&edge.tail_entity_id);
        let prompt = format!(
            "Assess whether this relation is contextually sound.\n\
             \n\
             Sentence: \"{fragment_text}\"\n\
             Relation: {head} --[{}]--> {tail}\n\
             \n\
             Pick exactly one judgement:\n\
             - valid: contextually sound\n\
             - weak: possible but under-evidenced\n\
             - spurious: causal overreach or correlation read as causation\n\
             - wrong: plainly incorrect\n\
             - ambiguous: multiple readings\n\
             \n\
             Respond as JSON: {{\"judgement\": \"valid\"}}",
            edge.relation_type
        );
        let request = LlmRequest::new(prompt, self.probe_temperature).json();
        match gateway.generate_json(&request).await {
            Ok(value) => value
                .get("judgement")
                .and_then(|v| v.as_str())
                .and_then(LlmJudgement::parse),
            Err(e) => {
                tracing::warn!(edge = %edge.raw_edge_id, error = %e, "LLM semantic probe failed");
                None
            }
        }
    }
}

fn decide_semantic(
    has_exaggeration: bool,
    correlation_as_causation: bool,
    weak_evidence: bool,
    domain_conflict: bool,
    llm: Option<LlmJudgement>,
) -> (SemanticTag, f64) {
    if domain_conflict {
        return (SemanticTag::SemWrong, 0.2);
    }
    if llm == Some(LlmJudgement::Wrong) {
        return (SemanticTag::SemWrong, 0.25);
    }
    if correlation_as_causation || llm == Some(LlmJudgement::Spurious) {
        return (SemanticTag::SemSpurious, 0.35);
    }
    if llm == Some(LlmJudgement::Valid) && !has_exaggeration && !weak_evidence {
        return (SemanticTag::SemConfident, 0.85);
    }
    if has_exaggeration {
        return (SemanticTag::SemWeak, 0.5);
    }
    if weak_evidence {
        return (SemanticTag::SemWeak, 0.45);
    }
    match llm {
        Some(LlmJudgement::Weak) => (SemanticTag::SemWeak, 0.5),
        Some(LlmJudgement::Ambiguous) => (SemanticTag::SemAmbiguous, 0.55),
        Some(LlmJudgement::Valid) => (SemanticTag::SemConfident, 0.75),
        _ => (SemanticTag::SemAmbiguous, 0.5),
    }
}
