// Copyright 2025 Cowboy AI, LLC.

//! Graph retrieval — Domain first, Personal as a supplement
//!
//! Collects the direct influence edge and BFS paths between the query's head
//! and tail. Personal paths are consulted only when the Domain graph does
//! not yield enough.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::models::{EdgeSource, RetrievalResult, RetrievedEdge, RetrievedPath};
use crate::config::ReasoningParams;
use crate::domain::{DomainKgAdapter, DynamicRelation};
use crate::edge::RelationType;
use crate::identifiers::RelationKey;
use crate::personal::{PersonalKgAdapter, PersonalRelation};

/// Path retrieval over both KGs
pub struct GraphRetrieval {
    domain: Arc<DomainKgAdapter>,
    personal: Arc<PersonalKgAdapter>,
    params: ReasoningParams,
}

impl GraphRetrieval {
    /// Build over both adapters
    pub fn new(
        domain: Arc<DomainKgAdapter>,
        personal: Arc<PersonalKgAdapter>,
        params: ReasoningParams,
    ) -> Self {
        Self {
            domain,
            personal,
            params,
        }
    }

    /// Retrieve paths for a head/tail pair
    pub fn retrieve(&self, head: &str, tail: Option<&str>, names: &HashMap<String, String>) -> RetrievalResult {
        let mut result = RetrievalResult::default();
        let Some(tail) = tail else {
            return result;
        };

        // Direct Domain influence edge (Affect, then Cause).
        for rel_type in [RelationType::Affect, RelationType::Cause] {
            let key = RelationKey::new(head, tail, rel_type);
            if let Some(rel) = self.domain.get_relation(&key) {
                result
                    .direct_paths
                    .push(self.domain_path(vec![rel], names));
                result.domain_paths += 1;
                break;
            }
        }

        // Multi-step Domain paths.
        let domain_edges = self.domain_edge_map();
        let multi = self.bfs_paths(head, tail, &domain_edges);
        for path in multi {
            if path.len() > 1 {
                result.indirect_paths.push(self.finish_path(path, names, EdgeSource::Domain));
                result.domain_paths += 1;
            }
        }

        // Personal supplement, only when Domain came up short.
        if result.path_count() < self.params.domain_sufficiency {
            for path in self.retrieve_personal(head, tail, names) {
                if path.len() == 1 {
                    result.direct_paths.push(path);
                } else {
                    result.indirect_paths.push(path);
                }
                result.personal_paths += 1;
            }
        }

        result.indirect_paths.truncate(self.params.max_paths);
        tracing::debug!(
            head,
            tail,
            direct = result.direct_paths.len(),
            indirect = result.indirect_paths.len(),
            personal = result.personal_paths,
            "retrieval complete"
        );
        result
    }

    /// Personal-KG paths for the same pair (also the unknown-sign fallback)
    pub fn retrieve_personal(
        &self,
        head: &str,
        tail: &str,
        names: &HashMap<String, String>,
    ) -> Vec<RetrievedPath> {
        let personal_edges = self.personal_edge_map();
        let mut paths: Vec<RetrievedPath> = self
            .bfs_paths(head, tail, &personal_edges)
            .into_iter()
            .map(|p| self.finish_path(p, names, EdgeSource::Personal))
            .collect();
        paths.truncate(self.params.max_paths);
        paths
    }

    fn domain_edge_map(&self) -> HashMap<String, Vec<RetrievedEdge>> {
        let mut map: HashMap<String, Vec<RetrievedEdge>> = HashMap::new();
        for rel in self.domain.all_relations() {
            let edge = self.domain_edge(&rel);
            map.entry(rel.head_id.clone()).or_default().push(edge);
        }
        map
    }

    fn personal_edge_map(&self) -> HashMap<String, Vec<RetrievedEdge>> {
        let mut map: HashMap<String, Vec<RetrievedEdge>> = HashMap::new();
        for rel in self.personal.all_relations() {
            let edge = self.personal_edge(&rel);
            map.entry(rel.head_id.clone()).or_default().push(edge);
        }
        map
    }

    fn domain_edge(&self, rel: &DynamicRelation) -> RetrievedEdge {
        RetrievedEdge {
            relation_id: rel.relation_id.clone(),
            head_id: rel.head_id.clone(),
            tail_id: rel.tail_id.clone(),
            relation_type: rel.relation_type,
            sign: rel.sign,
            domain_conf: rel.domain_conf,
            pcs_score: 0.0,
            personal_weight: 0.0,
            evidence_count: rel.evidence_count,
            semantic_tag: rel.representative_tag(),
            decay_applied: rel.decay_applied,
            gold_flag: self.domain.is_gold(&rel.key()),
            has_domain_instance: true,
            source: EdgeSource::Domain,
        }
    }

    fn personal_edge(&self, rel: &PersonalRelation) -> RetrievedEdge {
        let has_domain_instance = self.domain.get_relation(&rel.key()).is_some();
        RetrievedEdge {
            relation_id: rel.relation_id.clone(),
            head_id: rel.head_id.clone(),
            tail_id: rel.tail_id.clone(),
            relation_type: rel.relation_type,
            sign: rel.sign,
            domain_conf: 0.0,
            pcs_score: rel.pcs_score,
            personal_weight: rel.personal_weight,
            evidence_count: rel.occurrence_count,
            semantic_tag: crate::tags::SemanticTag::SemConfident,
            decay_applied: false,
            gold_flag: false,
            has_domain_instance,
            source: EdgeSource::Personal,
        }
    }

    /// Cycle-free BFS paths from `start` to `goal`, deduplicated by node
    /// sequence and capped at `max_paths` / `max_path_length` edges.
    fn bfs_paths(
        &self,
        start: &str,
        goal: &str,
        edges: &HashMap<String, Vec<RetrievedEdge>>,
    ) -> Vec<Vec<RetrievedEdge>> {
        if start == goal {
            return Vec::new();
        }

        let mut paths = Vec::new();
        let mut seen_sequences: Vec<Vec<String>> = Vec::new();
        let mut queue: VecDeque<(String, Vec<String>, Vec<RetrievedEdge>)> = VecDeque::new();
        queue.push_back((start.to_string(), vec![start.to_string()], Vec::new()));

        while let Some((node, node_path, edge_path)) = queue.pop_front() {
            if paths.len() >= self.params.max_paths {
                break;
            }
            if edge_path.len() >= self.params.max_path_length {
                continue;
            }
            for edge in edges.get(&node).into_iter().flatten() {
                let next = &edge.tail_id;
                if node_path.contains(next) {
                    continue;
                }
                let mut new_nodes = node_path.clone();
                new_nodes.push(next.clone());
                let mut new_edges = edge_path.clone();
                new_edges.push(edge.clone());

                if next == goal {
                    if !seen_sequences.contains(&new_nodes) {
                        seen_sequences.push(new_nodes);
                        paths.push(new_edges);
                    }
                } else {
                    queue.push_back((next.clone(), new_nodes, new_edges));
                }
            }
        }

        paths
    }

    fn finish_path(
        &self,
        edges: Vec<RetrievedEdge>,
        names: &HashMap<String, String>,
        source: EdgeSource,
    ) -> RetrievedPath {
        let mut nodes = Vec::with_capacity(edges.len() + 1);
        if let Some(first) = edges.first() {
            nodes.push(first.head_id.clone());
        }
        for edge in &edges {
            nodes.push(edge.tail_id.clone());
        }
        let node_names = nodes
            .iter()
            .map(|n| names.get(n).cloned().unwrap_or_else(|| n.replace('_', " ")))
            .collect();
        RetrievedPath {
            nodes,
            node_names,
            edges,
            source,
        }
    }

    fn domain_path(
        &self,
        relations: Vec<DynamicRelation>,
        names: &HashMap<String, String>,
    ) -> RetrievedPath {
        let edges = relations.iter().map(|r| self.domain_edge(r)).collect();
        self.finish_path(edges, names, EdgeSource::Domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Polarity;
    use crate::identifiers::{RelationId, UserId};
    use crate::personal::models::{PersonalLabel, RelevanceType, SourceType};
    use crate::repository::{GraphRepository, InMemoryGraphRepository};
    use crate::tags::SemanticTag;
    use chrono::Utc;

    fn fixture() -> (Arc<DomainKgAdapter>, Arc<PersonalKgAdapter>, GraphRetrieval) {
        let repo = Arc::new(InMemoryGraphRepository::new());
        let domain = Arc::new(DomainKgAdapter::new(repo.clone() as Arc<dyn GraphRepository>));
        let personal = Arc::new(PersonalKgAdapter::new(repo as Arc<dyn GraphRepository>));
        let retrieval = GraphRetrieval::new(
            domain.clone(),
            personal.clone(),
            ReasoningParams::default(),
        );
        (domain, personal, retrieval)
    }

    fn domain_rel(head: &str, tail: &str, sign: Polarity, rel_type: RelationType) -> DynamicRelation {
        DynamicRelation {
            relation_id: RelationId::generate("drel"),
            head_id: head.into(),
            head_name: head.into(),
            tail_id: tail.into(),
            tail_name: tail.into(),
            relation_type: rel_type,
            sign,
            domain_conf: 0.6,
            evidence_count: 2,
            conflict_count: 0,
            created_at: Utc::now(),
            last_update: Utc::now(),
            semantic_tags: vec![SemanticTag::SemConfident],
            decay_applied: false,
            drift_flag: false,
            need_conflict_resolution: false,
            origin: "student".into(),
        }
    }

    fn personal_rel(head: &str, tail: &str, sign: Polarity) -> PersonalRelation {
        let now = Utc::now();
        PersonalRelation {
            relation_id: RelationId::generate("prel"),
            head_id: head.into(),
            head_name: head.into(),
            tail_id: tail.into(),
            tail_name: tail.into(),
            relation_type: RelationType::Affect,
            sign,
            user_id: UserId::default_user(),
            pcs_score: 0.6,
            personal_weight: 0.3,
            personal_label: PersonalLabel::WeakBelief,
            occurrence_count: 2,
            source_type: SourceType::TextReport,
            relevance_types: vec![RelevanceType::Inference],
            history: vec![],
            pcs_history: vec![],
            domain_conflict_count: 0,
            promotion_candidate: false,
            drift_flag: false,
            created_at: now,
            last_occurred_at: now,
        }
    }

    #[test]
    fn direct_affect_edge_is_retrieved_first() {
        let (domain, _, retrieval) = fixture();
        domain
            .upsert_relation(&domain_rel("A", "B", Polarity::Positive, RelationType::Affect))
            .unwrap();

        let result = retrieval.retrieve("A", Some("B"), &HashMap::new());
        assert_eq!(result.direct_paths.len(), 1);
        assert_eq!(result.direct_paths[0].len(), 1);
        assert_eq!(result.direct_paths[0].nodes, vec!["A", "B"]);
    }

    #[test]
    fn indirect_paths_dedupe_and_stay_cycle_free() {
        let (domain, _, retrieval) = fixture();
        domain
            .upsert_relation(&domain_rel("A", "B", Polarity::Positive, RelationType::Affect))
            .unwrap();
        domain
            .upsert_relation(&domain_rel("A", "C", Polarity::Positive, RelationType::Affect))
            .unwrap();
        domain
            .upsert_relation(&domain_rel("C", "B", Polarity::Negative, RelationType::Affect))
            .unwrap();
        // cycle back to A must not loop the walk
        domain
            .upsert_relation(&domain_rel("C", "A", Polarity::Positive, RelationType::Affect))
            .unwrap();

        let result = retrieval.retrieve("A", Some("B"), &HashMap::new());
        assert_eq!(result.direct_paths.len(), 1);
        assert_eq!(result.indirect_paths.len(), 1);
        assert_eq!(result.indirect_paths[0].nodes, vec!["A", "C", "B"]);
    }

    #[test]
    fn personal_supplement_kicks_in_below_sufficiency() {
        let (_, personal, retrieval) = fixture();
        personal
            .upsert_relation(&personal_rel("A", "B", Polarity::Positive))
            .unwrap();

        let result = retrieval.retrieve("A", Some("B"), &HashMap::new());
        assert_eq!(result.domain_paths, 0);
        assert_eq!(result.personal_paths, 1);
        assert_eq!(result.direct_paths[0].source, EdgeSource::Personal);
    }

    #[test]
    fn rich_domain_results_suppress_personal() {
        let (domain, personal, retrieval) = fixture();
        personal
            .upsert_relation(&personal_rel("A", "B", Polarity::Negative))
            .unwrap();
        domain
            .upsert_relation(&domain_rel("A", "B", Polarity::Positive, RelationType::Affect))
            .unwrap();
        for mid in ["C", "D"] {
            domain
                .upsert_relation(&domain_rel("A", mid, Polarity::Positive, RelationType::Affect))
                .unwrap();
            domain
                .upsert_relation(&domain_rel(mid, "B", Polarity::Positive, RelationType::Affect))
                .unwrap();
        }

        let result = retrieval.retrieve("A", Some("B"), &HashMap::new());
        assert!(result.path_count() >= 3);
        assert_eq!(result.personal_paths, 0);
    }

    #[test]
    fn personal_edges_note_domain_instances() {
        let (domain, personal, retrieval) = fixture();
        domain
            .upsert_relation(&domain_rel("A", "B", Polarity::Positive, RelationType::Affect))
            .unwrap();
        personal
            .upsert_relation(&personal_rel("A", "B", Polarity::Negative))
            .unwrap();

        let paths = retrieval.retrieve_personal("A", "B", &HashMap::new());
        assert_eq!(paths.len(), 1);
        assert!(paths[0].edges[0].has_domain_instance);
    }

    #[test]
    fn missing_tail_retrieves_nothing() {
        let (_, _, retrieval) = fixture();
        let result = retrieval.retrieve("A", None, &HashMap::new());
        assert_eq!(result.path_count(), 0);
    }

    #[test]
    fn path_length_cap_holds() {
        let (domain, _, retrieval) = fixture();
        // chain A -> n1 -> n2 -> n3 -> n4 -> B (5 edges, over the cap)
        let chain = ["A", "n1", "n2", "n3", "n4", "B"];
        for pair in chain.windows(2) {
            domain
                .upsert_relation(&domain_rel(
                    pair[0],
                    pair[1],
                    Polarity::Positive,
                    RelationType::Affect,
                ))
                .unwrap();
        }
        let result = retrieval.retrieve("A", Some("B"), &HashMap::new());
        assert_eq!(result.path_count(), 0);
    }
}
