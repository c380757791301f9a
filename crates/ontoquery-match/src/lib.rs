//! Matching free-text input against a grammar's patterns.
//!
//! Two strategies per pattern, best one wins:
//!
//! - **exact**: the template compiled to an anchored, case-insensitive
//!   matcher; placeholders capture one-or-more tokens. Confidence 1.0.
//! - **fuzzy**: literal template tokens aligned against input tokens in
//!   lockstep; a placeholder consumes tokens greedily up to the next
//!   aligning literal (first-match-wins, no backtracking). Confidence is
//!   the similarity ratio over the aligned literal sequences.
//!
//! Absence of matches is a normal, representable outcome: the matcher then
//! answers with ranked "did you mean" suggestions instead, never an error.

use ontoquery_grammar::pattern::STOP_WORDS;
use ontoquery_grammar::{template_segments, Grammar, Pattern, TemplateSegment};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Per-token similarity floor for aligning a literal template word against
/// an input word during fuzzy matching. Single-word typos stay above this;
/// unrelated words fall below it.
const LITERAL_ALIGN_FLOOR: f64 = 0.6;
/// A placeholder is assumed to consume at most this many input tokens.
const MAX_ENTITY_TOKENS: usize = 6;
/// Token-count slack for the cheap pre-similarity guard.
const TOKEN_SLACK: usize = 2;
/// Maximum number of suggestions returned on a failed match.
const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

/// One pattern aligned to the input, with extracted entity bindings.
/// Produced and consumed within a single translation call; never persisted.
#[derive(Debug, Clone)]
pub struct MatchResult<'g> {
    pub pattern: &'g Pattern,
    pub confidence: f64,
    pub kind: MatchKind,
    /// Placeholder name → extracted value (original casing preserved).
    pub bindings: BTreeMap<String, String>,
}

/// Outcome of a matching call: either a non-empty ranked candidate list or
/// a (possibly empty) suggestion list.
#[derive(Debug, Clone)]
pub enum MatchOutcome<'g> {
    Found(Vec<MatchResult<'g>>),
    NoMatch { suggestions: Vec<String> },
}

impl<'g> MatchOutcome<'g> {
    pub fn best(&self) -> Option<&MatchResult<'g>> {
        match self {
            Self::Found(results) => results.first(),
            Self::NoMatch { .. } => None,
        }
    }
}

/// Matcher over a grammar's patterns. The two thresholds are independent:
/// one gates fuzzy match acceptance, the other gates suggestion relevance.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    fuzzy_threshold: f64,
    suggestion_threshold: f64,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.7,
            suggestion_threshold: 0.3,
        }
    }
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn with_suggestion_threshold(mut self, threshold: f64) -> Self {
        self.suggestion_threshold = threshold;
        self
    }

    /// Match input against every pattern; at most one result per pattern.
    ///
    /// Results are ordered by confidence descending, ties broken by pattern
    /// id ascending. When nothing matches, keyword-overlap suggestions are
    /// computed against the same grammar.
    pub fn find_matches<'g>(&self, input: &str, grammar: &'g Grammar) -> MatchOutcome<'g> {
        let normalized = normalize(input);
        let input_tokens = tokenize(&normalized);

        let mut results: Vec<MatchResult<'g>> = Vec::new();
        for pattern in &grammar.patterns {
            if let Some(result) = self.match_pattern(&normalized, &input_tokens, pattern) {
                results.push(result);
            }
        }

        if results.is_empty() {
            let suggestions = self.suggest(&input_tokens, grammar);
            debug!(input = %normalized, suggestions = suggestions.len(), "no pattern matched");
            return MatchOutcome::NoMatch { suggestions };
        }

        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.pattern.id.cmp(&b.pattern.id))
        });
        MatchOutcome::Found(results)
    }

    fn match_pattern<'g>(
        &self,
        normalized: &str,
        input_tokens: &[String],
        pattern: &'g Pattern,
    ) -> Option<MatchResult<'g>> {
        if let Some(bindings) = exact_match(normalized, pattern) {
            return Some(MatchResult {
                pattern,
                confidence: 1.0,
                kind: MatchKind::Exact,
                bindings,
            });
        }

        let (confidence, bindings) = fuzzy_match(input_tokens, pattern)?;
        if confidence < self.fuzzy_threshold {
            return None;
        }
        Some(MatchResult {
            pattern,
            confidence,
            kind: MatchKind::Fuzzy,
            bindings,
        })
    }

    /// Keyword-overlap suggestions: Jaccard score between input keywords and
    /// each pattern's keyword set, deduplicated example phrasings of the
    /// patterns scoring above the suggestion threshold.
    fn suggest(&self, input_tokens: &[String], grammar: &Grammar) -> Vec<String> {
        let input_keywords: Vec<String> = input_tokens
            .iter()
            .map(|t| t.to_lowercase())
            .filter(|t| t.len() > 2 && !STOP_WORDS.contains(&t.as_str()))
            .collect();
        if input_keywords.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &str)> = Vec::new();
        for pattern in &grammar.patterns {
            let score = jaccard(&input_keywords, &pattern.keywords);
            if score > self.suggestion_threshold {
                for example in pattern.examples.iter().take(2) {
                    scored.push((score, example.as_str()));
                }
            }
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut suggestions: Vec<String> = Vec::new();
        for (_, example) in scored {
            if !suggestions.iter().any(|s| s == example) {
                suggestions.push(example.to_string());
            }
            if suggestions.len() == MAX_SUGGESTIONS {
                break;
            }
        }
        suggestions
    }
}

// ============================================================================
// Normalization and tokenization
// ============================================================================

/// Trim and collapse internal whitespace. Case is preserved so extracted
/// entity values keep the user's casing; matching itself ignores case.
fn normalize(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+(?:'\w+)?").expect("token regex"))
}

/// Word tokens, keeping intra-word apostrophes (`John's` is one token).
fn tokenize(text: &str) -> Vec<String> {
    token_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

// ============================================================================
// Exact matching
// ============================================================================

/// Compile the template into an anchored, case-insensitive regex: literals
/// escaped, placeholders as lazy one-or-more captures, possessive `'s`
/// relaxed so `John's` and `Johns` both align.
fn template_to_regex(template: &str) -> Option<Regex> {
    let mut body = String::from("(?i)^");
    for segment in template_segments(template) {
        match segment {
            TemplateSegment::Literal(text) => {
                body.push_str(&regex::escape(&text).replace("'s", "'?s?"));
            }
            TemplateSegment::Placeholder(_) => body.push_str("(.+?)"),
        }
    }
    body.push('$');
    Regex::new(&body).ok()
}

fn exact_match(normalized: &str, pattern: &Pattern) -> Option<BTreeMap<String, String>> {
    let re = template_to_regex(&pattern.template)?;
    let captures = re.captures(normalized)?;

    let names = pattern.placeholder_names();
    let mut bindings = BTreeMap::new();
    for (i, name) in names.iter().enumerate() {
        let value = captures.get(i + 1)?.as_str().trim();
        if value.is_empty() {
            return None;
        }
        bindings.insert(name.clone(), value.to_string());
    }
    Some(bindings)
}

// ============================================================================
// Fuzzy matching
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateToken {
    Literal(String),
    Hole(String),
}

/// Tokenize the template, lowercasing literal words. The stray `s` token a
/// possessive leaves behind (`{person}'s`) is dropped so it never demands
/// its own input token.
fn template_tokens(template: &str) -> Vec<TemplateToken> {
    let mut tokens = Vec::new();
    for segment in template_segments(template) {
        match segment {
            TemplateSegment::Placeholder(name) => tokens.push(TemplateToken::Hole(name)),
            TemplateSegment::Literal(text) => {
                let after_hole = matches!(tokens.last(), Some(TemplateToken::Hole(_)));
                for (i, word) in tokenize(&text.to_lowercase()).into_iter().enumerate() {
                    if i == 0 && after_hole && word == "s" && text.starts_with("'") {
                        continue;
                    }
                    tokens.push(TemplateToken::Literal(word));
                }
            }
        }
    }
    tokens
}

/// Greedy lockstep alignment. Literal tokens must align (within the
/// similarity floor) or the candidate is rejected; a placeholder consumes
/// one-or-more tokens up to the first input token that aligns with the next
/// literal. No backtracking: first match wins.
fn fuzzy_match(
    input_tokens: &[String],
    pattern: &Pattern,
) -> Option<(f64, BTreeMap<String, String>)> {
    let tokens = template_tokens(&pattern.template);
    let literal_count = tokens
        .iter()
        .filter(|t| matches!(t, TemplateToken::Literal(_)))
        .count();
    let hole_count = tokens.len() - literal_count;
    if literal_count == 0 || hole_count == 0 {
        return None;
    }

    // Cheap length guard before the similarity work; generous bounds so it
    // only skips clearly unproductive comparisons.
    let n = input_tokens.len();
    if n + TOKEN_SLACK < literal_count + hole_count
        || n > literal_count + hole_count * MAX_ENTITY_TOKENS + TOKEN_SLACK
    {
        return None;
    }

    let mut bindings = BTreeMap::new();
    let mut similarities: Vec<f64> = Vec::with_capacity(literal_count);
    let mut i = 0usize;

    for (idx, token) in tokens.iter().enumerate() {
        match token {
            TemplateToken::Literal(word) => {
                if i >= n {
                    return None;
                }
                let sim = char_similarity(&input_tokens[i].to_lowercase(), word);
                if sim < LITERAL_ALIGN_FLOOR {
                    return None;
                }
                similarities.push(sim);
                i += 1;
            }
            TemplateToken::Hole(name) => {
                if i >= n {
                    return None;
                }
                let next_literal = tokens[idx + 1..].iter().find_map(|t| match t {
                    TemplateToken::Literal(w) => Some(w.as_str()),
                    TemplateToken::Hole(_) => None,
                });
                let end = match next_literal {
                    None => n,
                    Some(word) => {
                        // The placeholder takes at least one token; scan for
                        // the first later token that aligns with the literal.
                        let found = (i + 1..n).find(|&j| {
                            char_similarity(&input_tokens[j].to_lowercase(), word)
                                >= LITERAL_ALIGN_FLOOR
                        });
                        found?
                    }
                };
                let value = strip_possessive(&input_tokens[i..end].join(" "));
                if value.is_empty() {
                    return None;
                }
                bindings.insert(name.clone(), value);
                i = end;
            }
        }
    }

    if i != n {
        return None;
    }

    // Sequence-similarity ratio: 2·Σsim / (aligned input literals + pattern
    // literals). Alignment is one-to-one, so this is the mean per-token
    // similarity over the literal sequence.
    let confidence =
        2.0 * similarities.iter().sum::<f64>() / (similarities.len() + literal_count) as f64;
    Some((confidence, bindings))
}

fn strip_possessive(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(stem) = trimmed
        .strip_suffix("'s")
        .or_else(|| trimmed.strip_suffix("'S"))
    {
        stem.to_string()
    } else {
        trimmed.trim_end_matches('\'').to_string()
    }
}

/// Character-level sequence similarity: `2·LCS / (|a| + |b|)`, in [0, 1].
fn char_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }

    let mut prev = vec![0usize; b_chars.len() + 1];
    let mut row = vec![0usize; b_chars.len() + 1];
    for &ac in &a_chars {
        for (j, &bc) in b_chars.iter().enumerate() {
            row[j + 1] = if ac == bc {
                prev[j] + 1
            } else {
                prev[j + 1].max(row[j])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    let lcs = prev[b_chars.len()];
    2.0 * lcs as f64 / (a_chars.len() + b_chars.len()) as f64
}

/// Jaccard overlap between two keyword sets.
fn jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_set: std::collections::BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b_set: std::collections::BTreeSet<&str> = b.iter().map(String::as_str).collect();
    let intersection = a_set.intersection(&b_set).count();
    let union = a_set.union(&b_set).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ontoquery_grammar::{generate, sha256_fingerprint, Grammar};
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
        Grammar::assemble(patterns, &model, sha256_fingerprint(SAMPLE_TTL.as_bytes()))
            .expect("assemble")
    }

    #[test]
    fn exact_match_extracts_multi_token_entity() {
        let grammar = sample_grammar();
        let matcher = PatternMatcher::new();

        let outcome = matcher.find_matches("meetings with John Smith", &grammar);
        let best = outcome.best().expect("match");
        assert_eq!(best.kind, MatchKind::Exact);
        assert!((best.confidence - 1.0).abs() < 1e-9);
        assert_eq!(best.bindings.get("person").map(String::as_str), Some("John Smith"));
    }

    #[test]
    fn every_generated_example_exact_matches_its_own_pattern() {
        let grammar = sample_grammar();
        let matcher = PatternMatcher::new();

        for pattern in &grammar.patterns {
            for example in &pattern.examples {
                let outcome = matcher.find_matches(example, &grammar);
                let best = outcome.best().unwrap_or_else(|| {
                    panic!("example {example:?} of {} did not match", pattern.id)
                });
                assert_eq!(best.pattern.id, pattern.id, "example {example:?}");
                assert_eq!(best.kind, MatchKind::Exact);
                assert!((best.confidence - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn typo_falls_back_to_fuzzy_with_same_binding() {
        let grammar = sample_grammar();
        let matcher = PatternMatcher::new();

        let outcome = matcher.find_matches("meetigns with John Smith", &grammar);
        let best = outcome.best().expect("fuzzy match");
        assert_eq!(best.kind, MatchKind::Fuzzy);
        assert!(best.confidence >= 0.7, "confidence {}", best.confidence);
        assert!(best.confidence < 1.0);
        assert_eq!(best.bindings.get("person").map(String::as_str), Some("John Smith"));
    }

    #[test]
    fn possessive_template_matches_and_strips_apostrophe() {
        let grammar = sample_grammar();
        let matcher = PatternMatcher::new();

        let outcome = matcher.find_matches("Sarah Chen's meetings", &grammar);
        let best = outcome.best().expect("match");
        assert_eq!(best.kind, MatchKind::Exact);
        assert_eq!(
            best.bindings.get("person").map(String::as_str),
            Some("Sarah Chen")
        );
    }

    #[test]
    fn whitespace_and_case_are_normalized_for_matching() {
        let grammar = sample_grammar();
        let matcher = PatternMatcher::new();

        let outcome = matcher.find_matches("  Meetings   WITH   John Smith ", &grammar);
        let best = outcome.best().expect("match");
        assert_eq!(best.kind, MatchKind::Exact);
        assert_eq!(best.bindings.get("person").map(String::as_str), Some("John Smith"));
    }

    #[test]
    fn unrelated_input_yields_related_suggestions() {
        let grammar = sample_grammar();
        let matcher = PatternMatcher::new();

        // Shares the "meetings" keyword but fits no template.
        let outcome = matcher.find_matches("meetings about stuff", &grammar);
        match outcome {
            MatchOutcome::NoMatch { suggestions } => {
                assert!(!suggestions.is_empty());
                assert!(suggestions.len() <= MAX_SUGGESTIONS);
                assert!(suggestions.iter().any(|s| s.contains("meetings")));
            }
            MatchOutcome::Found(results) => panic!("unexpected match: {results:?}"),
        }
    }

    #[test]
    fn input_sharing_no_keywords_yields_empty_suggestions() {
        let grammar = sample_grammar();
        let matcher = PatternMatcher::new();

        let outcome = matcher.find_matches("purple elephants dancing", &grammar);
        match outcome {
            MatchOutcome::NoMatch { suggestions } => assert!(suggestions.is_empty()),
            MatchOutcome::Found(results) => panic!("unexpected match: {results:?}"),
        }
    }

    #[test]
    fn results_are_ordered_by_confidence_then_id() {
        let grammar = sample_grammar();
        let matcher = PatternMatcher::new();

        if let MatchOutcome::Found(results) = matcher.find_matches("meetings with John Smith", &grammar) {
            for pair in results.windows(2) {
                let ordered = pair[0].confidence > pair[1].confidence
                    || (pair[0].confidence == pair[1].confidence
                        && pair[0].pattern.id < pair[1].pattern.id);
                assert!(ordered, "{} before {}", pair[0].pattern.id, pair[1].pattern.id);
            }
        } else {
            panic!("expected a match");
        }
    }

    #[test]
    fn char_similarity_behaves() {
        assert!((char_similarity("with", "with") - 1.0).abs() < 1e-9);
        assert!(char_similarity("meetigns", "meetings") > 0.8);
        assert!(char_similarity("purple", "meetings") < 0.4);
    }

    #[test]
    fn thresholds_are_configurable() {
        let grammar = sample_grammar();
        let strict = PatternMatcher::new().with_fuzzy_threshold(0.99);

        let outcome = strict.find_matches("meetigns with John Smith", &grammar);
        assert!(matches!(outcome, MatchOutcome::NoMatch { .. }));
    }
}
