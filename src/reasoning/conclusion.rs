// Copyright 2025 Cowboy AI, LLC.

//! Conclusion synthesis
//!
//! Renders the reasoning result into prose. The numbers come straight from
//! the graph computation; an optional LLM pass may only reword the prose and
//! can never change direction or figures.

use std::sync::Arc;

use super::models::{Conclusion, ConfidenceBand, FusedPath, ParsedQuery, ReasoningDirection, ReasoningResult};
use crate::edge::Polarity;
use crate::llm::{LlmGateway, LlmRequest};

/// Turns reasoning results into natural language
pub struct ConclusionSynthesizer {
    gateway: Option<Arc<LlmGateway>>,
    polish_temperature: f64,
}

impl ConclusionSynthesizer {
    /// Build with an optional polishing gateway
    pub fn new(gateway: Option<Arc<LlmGateway>>, polish_temperature: f64) -> Self {
        Self {
            gateway,
            polish_temperature,
        }
    }

    /// Render one result
    pub async fn synthesize(&self, query: &ParsedQuery, result: &ReasoningResult) -> Conclusion {
        let text = self.conclusion_text(query, result);
        let explanation = self.explanation(result);
        let strongest_path = describe_path(result.strongest_path.as_ref());
        let evidence_ratio = evidence_summary(result);

        let text = match self.polish(&text, &query.original_query).await {
            Some(polished) => polished,
            None => text,
        };

        Conclusion {
            query_id: query.query_id.clone(),
            original_query: query.original_query.clone(),
            text,
            explanation,
            direction: result.direction,
            confidence: result.confidence,
            confidence_band: ConfidenceBand::from_confidence(result.confidence),
            strongest_path,
            evidence_ratio,
            paths_used: result.paths_used,
        }
    }

    fn conclusion_text(&self, query: &ParsedQuery, result: &ReasoningResult) -> String {
        let name = |id: &Option<String>| {
            id.as_ref()
                .map(|i| {
                    query
                        .entity_names
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| i.replace('_', " "))
                })
                .unwrap_or_default()
        };
        let head = name(&query.head_entity);
        let tail = name(&query.tail_entity);

        let direction_text = match result.direction {
            ReasoningDirection::Positive => "a positive influence (upward pressure)",
            ReasoningDirection::Negative => "a negative influence (downward pressure)",
            ReasoningDirection::Neutral => "a balanced influence with no clear direction",
            ReasoningDirection::Unknown => "no established influence",
        };
        let band = ConfidenceBand::from_confidence(result.confidence);

        if head.is_empty() {
            return "No entities could be located in the question.".to_string();
        }
        if tail.is_empty() {
            return format!(
                "Analysis for {head}: {direction_text} is expected (confidence: {}).",
                band.as_str()
            );
        }
        format!(
            "{head} exerts {direction_text} on {tail} (confidence: {}).",
            band.as_str()
        )
    }

    fn explanation(&self, result: &ReasoningResult) -> String {
        let mut lines = vec![
            format!("Paths used: {}", result.paths_used),
            format!(
                "Positive evidence: {:.3}, negative evidence: {:.3}",
                result.positive_evidence, result.negative_evidence
            ),
        ];
        if result.conflicting_paths > 0 {
            lines.push(format!(
                "Note: {} conflicting path(s) found",
                result.conflicting_paths
            ));
        }
        lines.join("\n")
    }

    async fn polish(&self, text: &str, original_query: &str) -> Option<String> {
        let gateway = self.gateway.as_ref()?;
        let prompt = format!(
            "Reword this analysis result as two or three natural English sentences.\n\
             Question: {original_query}\n\
             Result: {text}\n\
             \n\
             Rules:\n\
             1. Never change the meaning.\n\
             2. Never alter figures or the direction.\n\
             3. Keep it brief."
        );
        match gateway
            .generate(&LlmRequest::new(prompt, self.polish_temperature))
            .await
        {
            Ok(response) => {
                let polished = response.content.trim().to_string();
                (!polished.is_empty()).then_some(polished)
            }
            Err(e) => {
                tracing::warn!(error = %e, "conclusion polish failed, keeping rule-based text");
                None
            }
        }
    }
}

/// Render a path as a node-sign-node chain, e.g. "Oil ↑ → Airlines ↓ → Fares"
fn describe_path(path: Option<&FusedPath>) -> String {
    let Some(path) = path else {
        return "no path".to_string();
    };
    let mut parts = Vec::with_capacity(path.node_names.len());
    for (i, name) in path.node_names.iter().enumerate() {
        if i < path.fused_edges.len() {
            let arrow = match path.fused_edges[i].sign {
                Polarity::Positive => "↑",
                Polarity::Negative => "↓",
                _ => "→",
            };
            parts.push(format!("{name} {arrow}"));
        } else {
            parts.push(name.clone());
        }
    }
    parts.join(" → ")
}

fn evidence_summary(result: &ReasoningResult) -> String {
    let total = result.positive_evidence + result.negative_evidence;
    if total == 0.0 {
        return "no usable evidence".to_string();
    }
    format!(
        "positive evidence {:.1}%, negative evidence {:.1}%",
        result.positive_evidence / total * 100.0,
        result.negative_evidence / total * 100.0
    )
}
