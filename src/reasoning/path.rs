// Copyright 2025 Cowboy AI, LLC.

//! Path reasoner — sign propagation and multi-path aggregation
//!
//! Paths with an undefined sign contribute nothing and are dropped. The
//! rest pour their weight into positive or negative evidence; direction is
//! decided against a dead band proportional to total evidence.

use super::models::{FusedPath, ReasoningDirection, ReasoningResult};
use crate::config::ReasoningParams;
use crate::edge::Polarity;
use crate::identifiers::QueryId;

/// Aggregates fused paths into a directed conclusion
pub struct PathReasoner {
    params: ReasoningParams,
}

impl PathReasoner {
    /// Build with the configured aggregation parameters
    pub fn new(params: ReasoningParams) -> Self {
        Self { params }
    }

    /// Aggregate the usable paths for one query
    pub fn reason(&self, query_id: QueryId, fused_paths: Vec<FusedPath>) -> ReasoningResult {
        let usable: Vec<FusedPath> = fused_paths
            .into_iter()
            .filter(|p| p.path_sign.is_some() && !p.fused_edges.is_empty())
            .collect();

        if usable.is_empty() {
            return ReasoningResult::unknown(query_id);
        }

        let mut positive_evidence = 0.0;
        let mut negative_evidence = 0.0;
        let mut negative_paths = 0usize;

        for path in &usable {
            match path.path_sign {
                Some(Polarity::Positive) => positive_evidence += path.path_weight,
                Some(Polarity::Negative) => {
                    negative_evidence += path.path_weight;
                    negative_paths += 1;
                }
                // Neutral paths carry no directional evidence.
                _ => {}
            }
        }

        let total = positive_evidence + negative_evidence;
        let net = positive_evidence - negative_evidence;

        let (direction, confidence) = if total == 0.0 {
            (ReasoningDirection::Unknown, 0.0)
        } else {
            let band = self.params.neutral_band * total;
            let direction = if net > band {
                ReasoningDirection::Positive
            } else if net < -band {
                ReasoningDirection::Negative
            } else {
                ReasoningDirection::Neutral
            };
            let confidence = (net.abs() / total.max(0.01)).min(1.0);
            (direction, confidence)
        };

        let conflicting_paths = if positive_evidence > 0.0 && negative_evidence > 0.0 {
            negative_paths
        } else {
            0
        };

        let strongest_path = usable
            .iter()
            .max_by(|a, b| {
                a.path_weight
                    .partial_cmp(&b.path_weight)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned();

        tracing::info!(
            query = %query_id,
            ?direction,
            confidence = format!("{confidence:.3}"),
            paths = usable.len(),
            "reasoning complete"
        );

        ReasoningResult {
            query_id,
            direction,
            confidence,
            positive_evidence,
            negative_evidence,
            conflicting_paths,
            strongest_path,
            paths_used: usable.len(),
        }
    }
}
