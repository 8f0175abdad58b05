// Copyright 2025 Cowboy AI, LLC.

//! Entity resolution interface
//!
//! NER and canonicalisation live outside the core; the reasoner only needs
//! something that maps free text to canonical entities. `AliasResolver` is
//! the built-in dictionary-backed implementation; hosts may plug in an
//! NER-backed one.

use crate::config::AliasDictionary;
use crate::edge::ResolvedEntity;

/// Maps free text to resolved canonical entities
pub trait EntityResolver: Send + Sync {
    /// Entities mentioned in the text, ordered by first appearance
    fn resolve_text(&self, text: &str) -> Vec<ResolvedEntity>;
}

/// Dictionary-backed resolver over the alias table
pub struct AliasResolver {
    // (lowercased alias, canonical id), longest aliases first so that
    // "us 10y treasury" wins over "treasury"
    aliases: Vec<(String, String)>,
    dictionary: AliasDictionary,
}

impl AliasResolver {
    /// Build from the alias dictionary config
    pub fn new(dictionary: AliasDictionary) -> Self {
        let mut aliases: Vec<(String, String)> = dictionary
            .aliases
            .iter()
            .map(|(alias, canonical)| (alias.to_lowercase(), canonical.clone()))
            .collect();
        // Canonical ids resolve to themselves.
        for canonical in dictionary.display_names.keys() {
            aliases.push((canonical.to_lowercase().replace('_', " "), canonical.clone()));
        }
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            aliases,
            dictionary,
        }
    }

    fn display_name(&self, canonical: &str) -> String {
        self.dictionary
            .display_names
            .get(canonical)
            .cloned()
            .unwrap_or_else(|| canonical.replace('_', " "))
    }
}

impl EntityResolver for AliasResolver {
    fn resolve_text(&self, text: &str) -> Vec<ResolvedEntity> {
        let lower = text.to_lowercase();
        let mut hits: Vec<(usize, &str)> = Vec::new();

        for (alias, canonical) in &self.aliases {
            if let Some(pos) = lower.find(alias.as_str()) {
                if !hits.iter().any(|(_, c)| c == canonical) {
                    hits.push((pos, canonical));
                }
            }
        }

        hits.sort_by_key(|(pos, _)| *pos);
        hits.into_iter()
            .map(|(_, canonical)| {
                ResolvedEntity::canonical(canonical, self.display_name(canonical))
            })
            .collect()
    }
}
