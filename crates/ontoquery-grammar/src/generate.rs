//! Pattern generation: a pure, deterministic function of the schema model.
//!
//! Every property with a known domain *and* range contributes a small set of
//! template variants; everything else is skipped (not an error). Properties
//! are enumerated sorted by IRI and variants are numbered in a fixed order,
//! so regenerating from the same ontology yields byte-identical patterns.

use ontoquery_ontology::{Iri, OntologyProperty, PropertyKind, SchemaModel};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::digest::pattern_id;
use crate::pattern::{Pattern, PatternBinding};
use crate::GrammarError;

/// Baseline confidence for generated object-property patterns. Generation
/// never claims certainty; runtime confidence is the matcher's job.
const OBJECT_CONFIDENCE: f64 = 0.85;
/// Datatype-property variants are slightly less trusted phrasings.
const DATATYPE_CONFIDENCE: f64 = 0.80;

/// Property-name suffixes that suggest a preposition cue.
const SUFFIX_CUES: &[(&str, &str)] = &[
    ("By", "by"),
    ("To", "to"),
    ("In", "in"),
    ("At", "at"),
    ("From", "from"),
];

/// Curated phrasings for well-known predicates. These bypass the generic
/// suffix-cue derivation; the minimum prepositional/possessive variants are
/// still emitted.
const OVERRIDE_PHRASES: &[(&str, &[&str])] = &[
    ("hasAttendee", &["attended by", "including"]),
    ("assignedTo", &["assigned to", "owned by"]),
    ("hasTag", &["tagged", "tagged with"]),
    ("hasAuthor", &["written by", "authored by"]),
    ("mentionedIn", &["mentioned in", "found in"]),
    ("locatedIn", &["located in"]),
];

/// Generate the full pattern list for a schema model.
///
/// Identical model content always yields an identical pattern list: same
/// ids, same order. An empty model yields an empty list.
pub fn generate(model: &SchemaModel) -> Result<Vec<Pattern>, GrammarError> {
    let mut patterns = Vec::new();

    for (uri, prop) in &model.properties {
        let (Some(domain), Some(range)) = (&prop.domain, &prop.range) else {
            debug!(property = %uri, "skipping property without both domain and range");
            continue;
        };
        patterns.extend(property_patterns(prop, domain, range)?);
    }

    info!(patterns = patterns.len(), "generated query patterns");
    Ok(patterns)
}

fn property_patterns(
    prop: &OntologyProperty,
    domain: &Iri,
    range: &Iri,
) -> Result<Vec<Pattern>, GrammarError> {
    let domain_simple = simplified(domain);
    let domain_plural = pluralize(&domain_simple);
    let placeholder = placeholder_name(prop, range);

    let mut templates: Vec<String> = vec![
        format!("{domain_plural} with {{{placeholder}}}"),
        format!("{{{placeholder}}}'s {domain_plural}"),
    ];

    // Every datatype property gets a tagged-value phrasing, whatever its
    // local name.
    if prop.kind == PropertyKind::Datatype {
        templates.push(format!("{domain_plural} tagged {{{placeholder}}}"));
    }

    if let Some(phrases) = override_phrases(&prop.local_name) {
        for phrase in phrases {
            templates.push(format!("{domain_plural} {phrase} {{{placeholder}}}"));
        }
    } else if let Some((suffix, cue)) = SUFFIX_CUES
        .iter()
        .find(|(s, _)| prop.local_name.ends_with(s) && prop.local_name.len() > s.len())
    {
        let stem = &prop.local_name[..prop.local_name.len() - suffix.len()];
        let verb = split_words(stem).join(" ");
        if !verb.is_empty() {
            templates.push(format!("{domain_plural} {verb} {cue} {{{placeholder}}}"));
        }
    }

    // Cue phrasings can coincide with the generic variants; keep the first
    // occurrence so variant indexes stay stable.
    let mut seen = Vec::new();
    templates.retain(|t| {
        if seen.contains(t) {
            false
        } else {
            seen.push(t.clone());
            true
        }
    });

    let confidence = match prop.kind {
        PropertyKind::Object => OBJECT_CONFIDENCE,
        PropertyKind::Datatype => DATATYPE_CONFIDENCE,
    };

    let mut placeholder_types = BTreeMap::new();
    placeholder_types.insert(placeholder.clone(), range.clone());
    let binding = PatternBinding {
        property: prop.uri.clone(),
        domain: domain.clone(),
        range: range.clone(),
        kind: prop.kind,
        placeholder_types,
    };

    let sparql_template = format!(
        "?item a <{}> .\n?item <{}> ?{} .",
        domain, prop.uri, placeholder
    );

    let mut patterns = Vec::with_capacity(templates.len());
    for (variant, template) in templates.into_iter().enumerate() {
        let examples = example_phrasings(&template, &placeholder, range);
        patterns.push(Pattern::new(
            pattern_id(&prop.uri, variant),
            template,
            sparql_template.clone(),
            binding.clone(),
            confidence,
            examples,
        )?);
    }
    Ok(patterns)
}

fn override_phrases(local_name: &str) -> Option<&'static [&'static str]> {
    OVERRIDE_PHRASES
        .iter()
        .find(|(name, _)| *name == local_name)
        .map(|(_, phrases)| *phrases)
}

/// Simplified class name: final IRI segment, lowercased; `entity` when the
/// IRI has no usable segment.
fn simplified(iri: &Iri) -> String {
    let local = iri.local_name().to_lowercase();
    if local.is_empty() {
        "entity".to_string()
    } else {
        local
    }
}

/// Placeholder name for a property's extracted value. Object properties use
/// the range class; datatype properties use the property's base phrase.
fn placeholder_name(prop: &OntologyProperty, range: &Iri) -> String {
    let raw = match prop.kind {
        PropertyKind::Object => simplified(range),
        PropertyKind::Datatype => base_phrase(&prop.local_name).join("_"),
    };
    let name: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() {
        "value".to_string()
    } else {
        name
    }
}

/// Split camelCase / snake_case / kebab-case into lowercase words.
pub fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_was_lower = false;

    for c in name.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_was_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_was_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_was_lower = c.is_lowercase();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Base phrase for a property: words of the local name with a leading
/// `has`/`is` auxiliary stripped (`hasAttendee` → `attendee`).
pub fn base_phrase(local_name: &str) -> Vec<String> {
    let mut words = split_words(local_name);
    if words.len() > 1 && matches!(words[0].as_str(), "has" | "is") {
        words.remove(0);
    }
    words
}

/// Simple plural suffix rule: `y`→`ies`, trailing `s`/`x`→`+es`, else `+s`.
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        format!("{stem}ies")
    } else if word.ends_with('s') || word.ends_with('x') {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

/// 1–3 representative example phrasings per template, chosen by the range's
/// declared type category.
fn example_phrasings(template: &str, placeholder: &str, range: &Iri) -> Vec<String> {
    let needle = format!("{{{placeholder}}}");
    example_values(range)
        .iter()
        .map(|value| template.replace(&needle, value))
        .collect()
}

fn example_values(range: &Iri) -> &'static [&'static str] {
    let local = range.local_name().to_lowercase();
    if local.contains("person") || local.contains("agent") || local.contains("user") {
        &["John Smith", "Sarah Chen"]
    } else if local.contains("date") || local.contains("time") {
        &["today", "last week"]
    } else {
        &["example"]
    }
}
