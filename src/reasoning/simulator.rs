// Copyright 2025 Cowboy AI, LLC.

//! Impact simulator
//!
//! Propagates a hypothetical shock from trigger entities through the Domain
//! graph: impact multiplies by edge confidence, flips with edge sign, and
//! attenuates per hop. Weak tails are pruned. Read-only over the graph.

use std::collections::HashMap;
use std::sync::Arc;

use super::models::ImpactEstimate;
use crate::config::SimulationParams;
use crate::domain::{DomainKgAdapter, DynamicRelation};
use crate::edge::Polarity;

/// Signed shock propagation over the Domain KG
pub struct ImpactSimulator {
    domain: Arc<DomainKgAdapter>,
    params: SimulationParams,
}

impl ImpactSimulator {
    /// Build over the Domain adapter
    pub fn new(domain: Arc<DomainKgAdapter>, params: SimulationParams) -> Self {
        Self { domain, params }
    }

    /// Simulate an assumed rise at each trigger entity.
    ///
    /// Returns downstream estimates sorted by absolute net impact, strongest
    /// first; triggers themselves and sub-threshold noise are omitted.
    pub fn simulate(&self, triggers: &[&str]) -> Vec<ImpactEstimate> {
        let mut edges: HashMap<&str, Vec<&DynamicRelation>> = HashMap::new();
        let relations = self.domain.all_relations();
        for rel in &relations {
            edges.entry(rel.head_id.as_str()).or_default().push(rel);
        }

        struct Accum {
            score: f64,
            depth: usize,
            best_path: Vec<String>,
            best_strength: f64,
        }
        let mut impacts: HashMap<String, Accum> = HashMap::new();

        // (node, sign, strength, visited node path)
        let mut queue: Vec<(String, f64, f64, Vec<String>)> = triggers
            .iter()
            .map(|t| (t.to_string(), 1.0, 1.0, vec![t.to_string()]))
            .collect();

        while let Some((node, sign, strength, path)) = queue.pop() {
            if path.len() > self.params.max_depth {
                continue;
            }
            for rel in edges.get(node.as_str()).into_iter().flatten() {
                if path.contains(&rel.tail_id) {
                    continue;
                }
                let edge_sign = match rel.sign {
                    Polarity::Positive | Polarity::Neutral => 1.0,
                    Polarity::Negative => -1.0,
                    Polarity::Unknown => continue,
                };
                let next_sign = sign * edge_sign;
                let next_strength = strength * rel.domain_conf * self.params.attenuation;
                if next_strength < self.params.min_impact {
                    continue;
                }

                let mut next_path = path.clone();
                next_path.push(rel.tail_id.clone());

                let entry = impacts.entry(rel.tail_id.clone()).or_insert(Accum {
                    score: 0.0,
                    depth: next_path.len() - 1,
                    best_path: next_path.clone(),
                    best_strength: 0.0,
                });
                entry.score += next_sign * next_strength;
                entry.depth = entry.depth.min(next_path.len() - 1);
                if next_strength > entry.best_strength {
                    entry.best_strength = next_strength;
                    entry.best_path = next_path.clone();
                }

                queue.push((rel.tail_id.clone(), next_sign, next_strength, next_path));
            }
        }

        let names: HashMap<&str, &str> = relations
            .iter()
            .flat_map(|r| {
                [
                    (r.head_id.as_str(), r.head_name.as_str()),
                    (r.tail_id.as_str(), r.tail_name.as_str()),
                ]
            })
            .collect();

        let mut estimates: Vec<ImpactEstimate> = impacts
            .into_iter()
            .filter(|(id, _)| !triggers.contains(&id.as_str()))
            .filter(|(_, acc)| acc.score.abs() >= self.params.min_impact)
            .map(|(id, acc)| ImpactEstimate {
                entity_name: names.get(id.as_str()).map(|n| n.to_string()).unwrap_or_else(|| id.clone()),
                entity_id: id,
                impact: acc.score,
                depth: acc.depth,
                via: acc.best_path.join(" -> "),
            })
            .collect();

        estimates.sort_by(|a, b| {
            b.impact
                .abs()
                .partial_cmp(&a.impact.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        tracing::debug!(triggers = ?triggers, impacted = estimates.len(), "simulation complete");
        estimates
    }
}
