//! End-to-end pipeline tests: ontology text in, SPARQL out.
//!
//! Each test drives the real crates in sequence (parse → schema → generate
//! → grammar → match → build) rather than poking at one layer.

use ontoquery_grammar::{generate, sha256_fingerprint, Grammar};
use ontoquery_match::{MatchKind, MatchOutcome, PatternMatcher};
use ontoquery_ontology::{build_schema, parse_document_str, Iri, OntologyFormat};
use ontoquery_sparql::{QueryBuilder, QueryOptions};

const KB_TTL: &str = r#"
@prefix kb: <http://example.org/kb#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

kb:Meeting a owl:Class ;
    rdfs:label "Meeting" .
kb:Person a owl:Class ;
    rdfs:label "Person" .
kb:Project a owl:Class .

kb:hasAttendee a owl:ObjectProperty ;
    rdfs:domain kb:Meeting ;
    rdfs:range kb:Person .

kb:hasTag a owl:DatatypeProperty ;
    rdfs:domain kb:Project ;
    rdfs:range xsd:string .
"#;

fn pipeline_grammar(ttl: &str) -> Grammar {
    let doc = parse_document_str(ttl, OntologyFormat::Turtle).expect("parse ontology");
    let model = build_schema(&doc);
    let patterns = generate(&model).expect("generate patterns");
    Grammar::assemble(patterns, &model, sha256_fingerprint(ttl.as_bytes())).expect("assemble")
}

fn translate(input: &str, options: &QueryOptions) -> String {
    let grammar = pipeline_grammar(KB_TTL);
    let matcher = PatternMatcher::new();
    let MatchOutcome::Found(results) = matcher.find_matches(input, &grammar) else {
        panic!("input {input:?} did not match");
    };
    QueryBuilder::for_grammar(&grammar)
        .build(&results[0], options)
        .expect("build query")
}

#[test]
fn attendee_question_translates_end_to_end() {
    let grammar = pipeline_grammar(KB_TTL);
    let matcher = PatternMatcher::new();

    let MatchOutcome::Found(results) = matcher.find_matches("meetings with John Smith", &grammar)
    else {
        panic!("expected a match");
    };
    let best = &results[0];
    assert_eq!(best.kind, MatchKind::Exact);
    assert_eq!(
        best.bindings.get("person").map(String::as_str),
        Some("John Smith")
    );

    let query = QueryBuilder::for_grammar(&grammar)
        .build(best, &QueryOptions::default())
        .expect("build");
    assert!(query.contains("?item a kb:Meeting ."));
    assert!(query.contains("?item kb:hasAttendee ?person ."));
    assert!(query.contains("?person rdfs:label|foaf:name ?person_name ."));
    assert!(query.contains("FILTER(LCASE(STR(?person_name)) = LCASE(\"John Smith\"))"));
}

#[test]
fn typo_still_translates_with_the_same_binding() {
    let grammar = pipeline_grammar(KB_TTL);
    let matcher = PatternMatcher::new();

    let MatchOutcome::Found(results) = matcher.find_matches("meetigns with John Smith", &grammar)
    else {
        panic!("expected a fuzzy match");
    };
    let best = &results[0];
    assert_eq!(best.kind, MatchKind::Fuzzy);
    assert!(best.confidence >= 0.7);
    assert_eq!(
        best.bindings.get("person").map(String::as_str),
        Some("John Smith")
    );

    let query = QueryBuilder::for_grammar(&grammar)
        .build(best, &QueryOptions::default())
        .expect("build");
    assert!(query.contains("LCASE(\"John Smith\")"));
}

#[test]
fn adversarial_entity_value_never_escapes_its_literal() {
    let query = translate(
        "meetings with Robert\" } UNION { ?s ?p ?o } #",
        &QueryOptions::default(),
    );

    // The payload's quote is escaped, so the injected UNION stays inside
    // the literal and contributes no graph pattern of its own.
    assert!(query.contains(r#"Robert\" } UNION { ?s ?p ?o } #"#));
    // No unescaped quote anywhere: `Robert"` never appears bare.
    assert!(!query.contains("Robert\""));
}

#[test]
fn two_named_graphs_become_a_union_of_graph_blocks() {
    let options = QueryOptions {
        named_graphs: vec![
            "http://example.org/graph/work".to_string(),
            "http://example.org/graph/personal".to_string(),
        ],
        ..Default::default()
    };
    let query = translate("meetings with John Smith", &options);

    assert_eq!(query.matches("GRAPH <").count(), 2);
    assert_eq!(query.matches("UNION").count(), 1);
}

#[test]
fn requested_limit_is_clamped() {
    let options = QueryOptions {
        limit: Some(50_000),
        ..Default::default()
    };
    let query = translate("meetings with John Smith", &options);
    assert!(query.ends_with("LIMIT 1000"));

    let query = translate("meetings with John Smith", &QueryOptions::default());
    assert!(!query.contains("LIMIT"));
}

#[test]
fn datatype_question_filters_the_literal_directly() {
    let query = translate("projects tagged urgent", &QueryOptions::default());
    assert!(query.contains("?item a kb:Project ."));
    assert!(query.contains("FILTER(LCASE(STR(?tag)) = LCASE(\"urgent\"))"));
    assert!(!query.contains("foaf:name"));
}

#[test]
fn grammar_survives_its_cache_representation() {
    let grammar = pipeline_grammar(KB_TTL);
    let blob = grammar.to_cache_json().expect("serialize");
    let rebuilt = Grammar::from_cache_json(&blob).expect("deserialize");
    assert_eq!(rebuilt, grammar);

    // The rebuilt grammar matches and builds exactly like the original.
    let matcher = PatternMatcher::new();
    let MatchOutcome::Found(results) = matcher.find_matches("meetings with John Smith", &rebuilt)
    else {
        panic!("expected a match");
    };
    let query = QueryBuilder::for_grammar(&rebuilt)
        .build(&results[0], &QueryOptions::default())
        .expect("build");
    assert!(query.contains("kb:hasAttendee"));
}

#[test]
fn regeneration_is_deterministic() {
    let first = pipeline_grammar(KB_TTL);
    let second = pipeline_grammar(KB_TTL);

    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(first.patterns, second.patterns);
    assert_eq!(first.namespaces, second.namespaces);
}

#[test]
fn unanswerable_question_yields_suggestions_or_silence() {
    let grammar = pipeline_grammar(KB_TTL);
    let matcher = PatternMatcher::new();

    // Shares a keyword: suggestions point at related phrasings.
    match matcher.find_matches("meetings about stuff", &grammar) {
        MatchOutcome::NoMatch { suggestions } => {
            assert!(!suggestions.is_empty());
            assert!(suggestions.len() <= 5);
        }
        MatchOutcome::Found(results) => panic!("unexpected match: {results:?}"),
    }

    // Shares nothing: silence, not noise.
    match matcher.find_matches("quantum flux capacitors", &grammar) {
        MatchOutcome::NoMatch { suggestions } => assert!(suggestions.is_empty()),
        MatchOutcome::Found(results) => panic!("unexpected match: {results:?}"),
    }
}

#[test]
fn duplicate_domain_declarations_keep_the_first() {
    let ttl = r#"
@prefix kb: <http://example.org/kb#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

kb:Meeting a owl:Class .
kb:Workshop a owl:Class .
kb:Person a owl:Class .

kb:hasAttendee a owl:ObjectProperty ;
    rdfs:domain kb:Meeting ;
    rdfs:domain kb:Workshop ;
    rdfs:range kb:Person .
"#;
    let doc = parse_document_str(ttl, OntologyFormat::Turtle).expect("parse");
    let model = build_schema(&doc);
    let prop = model
        .property(&Iri::new("http://example.org/kb#hasAttendee"))
        .expect("property");
    assert_eq!(
        prop.domain.as_ref().map(|d| d.as_str()),
        Some("http://example.org/kb#Meeting")
    );

    // Patterns downstream speak about meetings, not workshops.
    let grammar = pipeline_grammar(ttl);
    assert!(grammar
        .patterns
        .iter()
        .any(|p| p.template == "meetings with {person}"));
    assert!(!grammar.patterns.iter().any(|p| p.template.contains("workshop")));
}
