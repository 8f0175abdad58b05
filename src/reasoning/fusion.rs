// Copyright 2025 Cowboy AI, LLC.

//! Edge weight fusion (EES)
//!
//! Per edge:
//!   W_D = domain_conf · (1 − decay) · semantic_score · evidence_bonus · gold_bonus
//!   W_P = pcs · personal_weight · discount   (discount when Domain also has the key)
//!   W   = W_D + W_P, with Domain authoritative when both sides exist
//! Per path: weight = Π max(Wᵢ, floor), sign = Π edge signs.

use super::models::{EdgeSource, FusedEdge, FusedPath, RetrievedEdge, RetrievedPath};
use crate::config::ReasoningParams;
use crate::edge::Polarity;

/// EES fusion over retrieved paths
pub struct EdgeWeightFusion {
    params: ReasoningParams,
}

impl EdgeWeightFusion {
    /// Build with the configured fusion parameters
    pub fn new(params: ReasoningParams) -> Self {
        Self { params }
    }

    /// Fuse every edge of a path and compute the path metrics
    pub fn fuse_path(&self, path: &RetrievedPath) -> FusedPath {
        let fused_edges: Vec<FusedEdge> = path.edges.iter().map(|e| self.fuse_edge(e)).collect();

        let mut path_weight = 1.0;
        for edge in &fused_edges {
            path_weight *= edge.final_weight.max(self.params.min_edge_weight);
        }
        let path_sign = Polarity::combine_all(fused_edges.iter().map(|e| e.sign));

        FusedPath {
            nodes: path.nodes.clone(),
            node_names: path.node_names.clone(),
            fused_edges,
            path_weight,
            path_sign,
        }
    }

    /// Fuse a batch of paths
    pub fn fuse_all(&self, paths: &[RetrievedPath]) -> Vec<FusedPath> {
        paths.iter().map(|p| self.fuse_path(p)).collect()
    }

    fn fuse_edge(&self, edge: &RetrievedEdge) -> FusedEdge {
        let mut domain_weight = 0.0;
        let mut personal_weight = 0.0;
        let mut semantic_score = 1.0;
        let mut personal_discounted = false;

        match edge.source {
            EdgeSource::Domain => {
                semantic_score = edge.semantic_tag.fusion_score();
                let decay = if edge.decay_applied {
                    self.params.decay_weight
                } else {
                    0.0
                };
                let evidence_bonus = 1.0
                    + (self.params.evidence_bonus_rate * edge.evidence_count as f64)
                        .min(self.params.evidence_bonus_cap);
                let gold_bonus = if edge.gold_flag {
                    self.params.gold_bonus
                } else {
                    1.0
                };
                domain_weight =
                    edge.domain_conf * (1.0 - decay) * semantic_score * evidence_bonus * gold_bonus;
            }
            EdgeSource::Personal => {
                personal_weight = edge.pcs_score * edge.personal_weight;
                if edge.has_domain_instance {
                    personal_weight *= self.params.personal_discount;
                    personal_discounted = true;
                }
            }
        }

        // Domain is authoritative when both contributions exist.
        let final_weight = if domain_weight > 0.0 && personal_weight > 0.0 {
            domain_weight
        } else {
            domain_weight + personal_weight
        };

        FusedEdge {
            relation_id: edge.relation_id.clone(),
            head_id: edge.head_id.clone(),
            tail_id: edge.tail_id.clone(),
            sign: edge.sign,
            domain_weight,
            personal_weight,
            final_weight,
            semantic_score,
            personal_discounted,
        }
    }
}
