//! Grammar assembly and the cache (de)serialization contract.
//!
//! A `Grammar` is an immutable bundle: the generated patterns, the ontology's
//! namespace table, the content fingerprint of the source document, and a
//! creation timestamp. The cache collaborator persists the JSON
//! representation keyed by fingerprint and discards blobs whose stored
//! fingerprint no longer matches the current ontology; that comparison is
//! the collaborator's job, not this crate's.

use chrono::{DateTime, Utc};
use ontoquery_ontology::SchemaModel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::pattern::Pattern;
use crate::GrammarError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    pub patterns: Vec<Pattern>,
    pub namespaces: BTreeMap<String, String>,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl Grammar {
    /// Bundle generated patterns with the model's namespace table and the
    /// caller-computed ontology fingerprint.
    ///
    /// The fingerprint is opaque here; the grammar never re-reads the
    /// ontology. Zero patterns is valid (an empty ontology generates an
    /// empty grammar); duplicate pattern ids are a generator defect.
    pub fn assemble(
        patterns: Vec<Pattern>,
        model: &SchemaModel,
        fingerprint: impl Into<String>,
    ) -> Result<Self, GrammarError> {
        let mut seen = BTreeSet::new();
        for pattern in &patterns {
            if !seen.insert(pattern.id.as_str()) {
                return Err(GrammarError::DuplicatePatternId {
                    id: pattern.id.clone(),
                });
            }
        }

        Ok(Self {
            patterns,
            namespaces: model.prefixes.clone(),
            fingerprint: fingerprint.into(),
            created_at: Utc::now(),
        })
    }

    pub fn pattern_by_id(&self, id: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn patterns_with_keyword(&self, keyword: &str) -> Vec<&Pattern> {
        let keyword = keyword.to_lowercase();
        self.patterns
            .iter()
            .filter(|p| p.keywords.iter().any(|k| *k == keyword))
            .collect()
    }

    /// Serialization-ready representation for the cache collaborator.
    /// Pattern order is preserved, maps are sorted; the output is stable
    /// for identical grammars.
    pub fn to_cache_json(&self) -> Result<String, GrammarError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild a grammar from its cached representation.
    pub fn from_cache_json(text: &str) -> Result<Self, GrammarError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256_fingerprint;
    use crate::generate::generate;
    use ontoquery_ontology::{build_schema, parse_document_str, OntologyFormat};

    const SAMPLE_TTL: &str = r#"
@prefix kb: <http://example.org/kb#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

kb:Meeting a owl:Class .
kb:Person a owl:Class .
kb:hasAttendee a owl:ObjectProperty ;
    rdfs:domain kb:Meeting ;
    rdfs:range kb:Person .
"#;

    fn sample_grammar() -> Grammar {
        let doc = parse_document_str(SAMPLE_TTL, OntologyFormat::Turtle).expect("parse");
        let model = build_schema(&doc);
        let patterns = generate(&model).expect("generate");
        let fingerprint = sha256_fingerprint(SAMPLE_TTL.as_bytes());
        Grammar::assemble(patterns, &model, fingerprint).expect("assemble")
    }

    #[test]
    fn assemble_carries_namespaces_and_fingerprint() {
        let grammar = sample_grammar();
        assert!(!grammar.patterns.is_empty());
        assert_eq!(
            grammar.namespaces.get("kb").map(String::as_str),
            Some("http://example.org/kb#")
        );
        assert!(grammar.fingerprint.starts_with("sha256:"));
    }

    #[test]
    fn cache_round_trip_preserves_ids_templates_and_fingerprint() {
        let grammar = sample_grammar();
        let blob = grammar.to_cache_json().expect("serialize");
        let rebuilt = Grammar::from_cache_json(&blob).expect("deserialize");

        assert_eq!(rebuilt.fingerprint, grammar.fingerprint);
        assert_eq!(rebuilt.patterns.len(), grammar.patterns.len());
        for (a, b) in grammar.patterns.iter().zip(rebuilt.patterns.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.template, b.template);
            assert_eq!(a.keywords, b.keywords);
        }
        assert_eq!(rebuilt, grammar);
    }

    #[test]
    fn keyword_lookup_finds_patterns() {
        let grammar = sample_grammar();
        assert!(!grammar.patterns_with_keyword("meetings").is_empty());
        assert!(grammar.patterns_with_keyword("nonexistent").is_empty());
    }

    #[test]
    fn empty_grammar_is_valid() {
        let doc = parse_document_str("", OntologyFormat::Turtle).expect("parse");
        let model = build_schema(&doc);
        let grammar =
            Grammar::assemble(Vec::new(), &model, "sha256:0").expect("assemble");
        assert!(grammar.patterns.is_empty());
    }
}
