// Copyright 2025 Cowboy AI, LLC.

//! Query parsing and entity localisation
//!
//! Entities come from the external resolver, in order of appearance; the
//! first becomes the reasoning head, the last the tail, and anything in
//! between a condition. Query types are matched lexically, most specific
//! patterns first.

use regex::RegexSet;
use std::collections::HashMap;
use std::sync::Arc;

use super::models::{ParsedQuery, QueryType};
use crate::identifiers::QueryId;
use crate::resolve::EntityResolver;

/// Lexical query parser over an injected resolver
pub struct QueryParser {
    resolver: Arc<dyn EntityResolver>,
    comparison: RegexSet,
    conditioned: RegexSet,
    causal: RegexSet,
    predictive: RegexSet,
    direct: RegexSet,
}

impl QueryParser {
    /// Build over the given resolver
    pub fn new(resolver: Arc<dyn EntityResolver>) -> Self {
        // Panics here would mean a typo in a literal pattern; the sets are
        // compiled once at construction.
        Self {
            resolver,
            comparison: RegexSet::new([r"\bversus\b", r"\bvs\.?\b", r"\bcompare", r"\bbetter than\b"])
                .expect("comparison patterns"),
            conditioned: RegexSet::new([
                r"\bif\b.*\b(rises?|falls?|increases?|decreases?|climbs?|drops?)\b",
                r"\bwhen\b.*\b(rises?|falls?|increases?|decreases?|climbs?|drops?)\b",
                r"\bin case of\b",
            ])
            .expect("conditioned patterns"),
            causal: RegexSet::new([r"^\s*why\b", r"\breason for\b", r"\bcause of\b", r"\bwhat (drove|caused)\b"])
                .expect("causal patterns"),
            predictive: RegexSet::new([
                r"\boutlook\b",
                r"\bforecast\b",
                r"\bgoing forward\b",
                r"\bwhere (is|are).*headed\b",
                r"\bwill\b.*\b(rise|fall|go|move)\b",
            ])
            .expect("predictive patterns"),
            direct: RegexSet::new([
                r"\baffect",
                r"\bimpact\b",
                r"\binfluence\b",
                r"\brelationship between\b",
                r"\bwhat does\b.*\bdo to\b",
            ])
            .expect("direct patterns"),
        }
    }

    /// Parse one question
    pub fn parse(&self, query: &str) -> ParsedQuery {
        let resolved = self.resolver.resolve_text(query);

        let mut entities = Vec::new();
        let mut entity_names = HashMap::new();
        for entity in &resolved {
            let id = entity.graph_id().to_string();
            if !entities.contains(&id) {
                entity_names.insert(id.clone(), entity.display_name().to_string());
                entities.push(id);
            }
        }

        let query_type = self.classify(query);

        let (head_entity, tail_entity, condition_entities) = match entities.len() {
            0 => (None, None, Vec::new()),
            1 => (Some(entities[0].clone()), None, Vec::new()),
            n => (
                Some(entities[0].clone()),
                Some(entities[n - 1].clone()),
                entities[1..n - 1].to_vec(),
            ),
        };

        let parsed = ParsedQuery {
            query_id: QueryId::generate(),
            original_query: query.to_string(),
            entities,
            entity_names,
            query_type,
            head_entity,
            tail_entity,
            condition_entities,
        };

        tracing::debug!(
            query = %parsed.query_id,
            ?query_type,
            entities = parsed.entities.len(),
            head = parsed.head_entity.as_deref().unwrap_or("-"),
            tail = parsed.tail_entity.as_deref().unwrap_or("-"),
            "query parsed"
        );
        parsed
    }

    fn classify(&self, query: &str) -> QueryType {
        let lower = query.to_lowercase();
        if self.comparison.is_match(&lower) {
            QueryType::Comparison
        } else if self.conditioned.is_match(&lower) {
            QueryType::Conditioned
        } else if self.causal.is_match(&lower) {
            QueryType::Causal
        } else if self.predictive.is_match(&lower) {
            QueryType::Predictive
        } else if self.direct.is_match(&lower) {
            QueryType::DirectRelation
        } else {
            QueryType::Unknown
        }
    }
}
