//! Query patterns: a natural-language template paired with the ontology
//! identifiers needed to rebuild the query edge, typed placeholders, and
//! derived keywords.

use ontoquery_ontology::{Iri, PropertyKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::GrammarError;

/// Words excluded from the derived keyword set.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "at", "but", "by", "for", "in", "of", "on", "or", "the", "to", "with",
];

/// One piece of a template: literal text or a `{name}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    Literal(String),
    Placeholder(String),
}

/// Split a template into literal and placeholder segments.
///
/// An unclosed `{` is treated as literal text; placeholder names are taken
/// verbatim between the braces.
pub fn template_segments(template: &str) -> Vec<TemplateSegment> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        match rest[open..].find('}') {
            Some(close_rel) => {
                let close = open + close_rel;
                if open > 0 {
                    segments.push(TemplateSegment::Literal(rest[..open].to_string()));
                }
                segments.push(TemplateSegment::Placeholder(
                    rest[open + 1..close].to_string(),
                ));
                rest = &rest[close + 1..];
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        segments.push(TemplateSegment::Literal(rest.to_string()));
    }
    segments
}

/// The ontology identifiers a pattern carries so the query builder can
/// reconstruct the graph-pattern edge without re-reading the ontology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternBinding {
    pub property: Iri,
    pub domain: Iri,
    pub range: Iri,
    pub kind: PropertyKind,
    /// Placeholder name → expected type IRI.
    pub placeholder_types: BTreeMap<String, Iri>,
}

/// A generated query pattern. Created once by the generator, immutable,
/// owned by a [`Grammar`](crate::Grammar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub template: String,
    pub sparql_template: String,
    pub binding: PatternBinding,
    pub confidence: f64,
    pub examples: Vec<String>,
    pub keywords: Vec<String>,
}

impl Pattern {
    /// Construct a validated pattern; keywords are derived here.
    ///
    /// Fails when the template has no placeholder, the confidence is out of
    /// range, the examples are empty, or the query template is blank. Any of
    /// these indicates a generator defect, not bad user input.
    pub fn new(
        id: String,
        template: String,
        sparql_template: String,
        binding: PatternBinding,
        confidence: f64,
        examples: Vec<String>,
    ) -> Result<Self, GrammarError> {
        let segments = template_segments(&template);
        let has_placeholder = segments
            .iter()
            .any(|s| matches!(s, TemplateSegment::Placeholder(_)));
        if !has_placeholder {
            return Err(GrammarError::NoPlaceholders { id });
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(GrammarError::ConfidenceOutOfRange { id, confidence });
        }
        if examples.is_empty() {
            return Err(GrammarError::NoExamples { id });
        }
        if sparql_template.trim().is_empty() {
            return Err(GrammarError::EmptyQueryTemplate { id });
        }

        let keywords = extract_keywords(&segments);

        Ok(Self {
            id,
            template,
            sparql_template,
            binding,
            confidence,
            examples,
            keywords,
        })
    }

    /// Placeholder names in template order.
    pub fn placeholder_names(&self) -> Vec<String> {
        template_segments(&self.template)
            .into_iter()
            .filter_map(|s| match s {
                TemplateSegment::Placeholder(name) => Some(name),
                TemplateSegment::Literal(_) => None,
            })
            .collect()
    }
}

/// Template words with placeholders removed, stop-words removed, lowercased.
/// Short words (≤ 2 chars) are dropped as noise.
fn extract_keywords(segments: &[TemplateSegment]) -> Vec<String> {
    let mut keywords = Vec::new();
    for segment in segments {
        let TemplateSegment::Literal(text) = segment else {
            continue;
        };
        for raw in text.split_whitespace() {
            let word: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            if word.len() > 2 && !STOP_WORDS.contains(&word.as_str()) && !keywords.contains(&word) {
                keywords.push(word);
            }
        }
    }
    keywords
}
