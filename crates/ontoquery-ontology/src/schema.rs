//! Typed schema model extracted from an ontology document.
//!
//! `build_schema` interprets the statement-level view: class declarations,
//! property declarations with domain/range, labels/comments, and the prefix
//! table. Schema anomalies (duplicate domain declarations, references to
//! external vocabularies) are absorbed locally so one odd property never
//! blocks the rest of the ontology.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::{vocab, Iri, ObjectTerm, OntologyDocument, SubjectNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Object,
    Datatype,
}

/// A class declared by the ontology. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyClass {
    pub uri: Iri,
    pub local_name: String,
    pub label: String,
    pub comment: Option<String>,
    pub parents: Vec<Iri>,
}

/// A property declared by the ontology.
///
/// Domain/range IRIs need not resolve to a known class; ontologies routinely
/// reference external vocabularies. A property with neither domain nor range
/// produces no query patterns downstream, which is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyProperty {
    pub uri: Iri,
    pub local_name: String,
    pub kind: PropertyKind,
    pub domain: Option<Iri>,
    pub range: Option<Iri>,
    pub label: Option<String>,
    pub comment: Option<String>,
}

/// Immutable typed view of an ontology: classes, properties, prefixes.
///
/// An ontology with zero classes or zero properties is a valid, empty model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    pub classes: BTreeMap<Iri, OntologyClass>,
    pub properties: BTreeMap<Iri, OntologyProperty>,
    pub prefixes: BTreeMap<String, String>,
}

impl SchemaModel {
    pub fn class(&self, uri: &Iri) -> Option<&OntologyClass> {
        self.classes.get(uri)
    }

    pub fn property(&self, uri: &Iri) -> Option<&OntologyProperty> {
        self.properties.get(uri)
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.properties.is_empty()
    }
}

fn subject_iri(subject: &SubjectNode) -> Option<&Iri> {
    match subject {
        SubjectNode::Iri(iri) => Some(iri),
        // Blank-node class expressions (restrictions etc.) are out of scope.
        SubjectNode::Blank(_) => None,
    }
}

fn object_iri(object: &ObjectTerm) -> Option<&Iri> {
    match object {
        ObjectTerm::Iri(iri) => Some(iri),
        _ => None,
    }
}

fn object_text(object: &ObjectTerm) -> Option<&str> {
    match object {
        ObjectTerm::Literal(lit) => Some(&lit.lexical),
        _ => None,
    }
}

/// Build a `SchemaModel` from a parsed ontology document.
///
/// Only structurally malformed input fails, and that failure is signaled by
/// the document parser before this function ever runs; extraction itself is
/// total over well-formed statements.
pub fn build_schema(doc: &OntologyDocument) -> SchemaModel {
    let mut classes: BTreeMap<Iri, OntologyClass> = BTreeMap::new();
    let mut properties: BTreeMap<Iri, OntologyProperty> = BTreeMap::new();

    // Pass 1: declarations.
    for st in &doc.statements {
        if st.predicate.as_str() != vocab::RDF_TYPE {
            continue;
        }
        let Some(subject) = subject_iri(&st.subject) else {
            continue;
        };
        let Some(ty) = object_iri(&st.object) else {
            continue;
        };
        match ty.as_str() {
            vocab::OWL_CLASS | vocab::RDFS_CLASS => {
                classes.entry(subject.clone()).or_insert_with(|| OntologyClass {
                    uri: subject.clone(),
                    local_name: subject.local_name().to_string(),
                    label: subject.local_name().to_string(),
                    comment: None,
                    parents: Vec::new(),
                });
            }
            vocab::OWL_OBJECT_PROPERTY => {
                properties
                    .entry(subject.clone())
                    .or_insert_with(|| new_property(subject, PropertyKind::Object));
            }
            vocab::OWL_DATATYPE_PROPERTY => {
                properties
                    .entry(subject.clone())
                    .or_insert_with(|| new_property(subject, PropertyKind::Datatype));
            }
            _ => {}
        }
    }

    // Pass 2: annotations and structure, in document order so the first
    // domain/range declaration wins.
    for st in &doc.statements {
        let Some(subject) = subject_iri(&st.subject) else {
            continue;
        };
        match st.predicate.as_str() {
            vocab::RDFS_SUBCLASS_OF => {
                let Some(parent) = object_iri(&st.object) else {
                    continue;
                };
                if parent.as_str() == vocab::OWL_THING {
                    continue;
                }
                if let Some(class) = classes.get_mut(subject) {
                    if !class.parents.contains(parent) {
                        class.parents.push(parent.clone());
                    }
                }
            }
            vocab::RDFS_DOMAIN => {
                let Some(domain) = object_iri(&st.object) else {
                    continue;
                };
                if let Some(prop) = properties.get_mut(subject) {
                    if prop.domain.is_some() {
                        warn!(
                            property = %subject,
                            ignored = %domain,
                            "duplicate rdfs:domain declaration; keeping the first"
                        );
                    } else {
                        prop.domain = Some(domain.clone());
                    }
                }
            }
            vocab::RDFS_RANGE => {
                let Some(range) = object_iri(&st.object) else {
                    continue;
                };
                if let Some(prop) = properties.get_mut(subject) {
                    if prop.range.is_some() {
                        warn!(
                            property = %subject,
                            ignored = %range,
                            "duplicate rdfs:range declaration; keeping the first"
                        );
                    } else {
                        prop.range = Some(range.clone());
                    }
                }
            }
            vocab::RDFS_LABEL => {
                let Some(text) = object_text(&st.object) else {
                    continue;
                };
                if let Some(class) = classes.get_mut(subject) {
                    class.label = text.to_string();
                }
                if let Some(prop) = properties.get_mut(subject) {
                    prop.label = Some(text.to_string());
                }
            }
            vocab::RDFS_COMMENT => {
                let Some(text) = object_text(&st.object) else {
                    continue;
                };
                if let Some(class) = classes.get_mut(subject) {
                    class.comment = Some(text.to_string());
                }
                if let Some(prop) = properties.get_mut(subject) {
                    prop.comment = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    debug!(
        classes = classes.len(),
        properties = properties.len(),
        prefixes = doc.prefixes.len(),
        "extracted schema model"
    );

    SchemaModel {
        classes,
        properties,
        prefixes: doc.prefixes.clone(),
    }
}

fn new_property(uri: &Iri, kind: PropertyKind) -> OntologyProperty {
    OntologyProperty {
        uri: uri.clone(),
        local_name: uri.local_name().to_string(),
        kind,
        domain: None,
        range: None,
        label: None,
        comment: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_document_str, OntologyFormat};

    const SAMPLE_TTL: &str = r#"
@prefix kb: <http://example.org/kb#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

kb:Meeting a owl:Class ;
    rdfs:label "Meeting" ;
    rdfs:comment "A scheduled gathering." .
kb:Person a owl:Class ;
    rdfs:subClassOf owl:Thing .
kb:Workshop a owl:Class ;
    rdfs:subClassOf kb:Meeting .

kb:hasAttendee a owl:ObjectProperty ;
    rdfs:domain kb:Meeting ;
    rdfs:range kb:Person .
kb:hasTag a owl:DatatypeProperty ;
    rdfs:domain kb:Meeting ;
    rdfs:range xsd:string .
kb:orphan a owl:ObjectProperty .
"#;

    fn sample_schema() -> SchemaModel {
        let doc = parse_document_str(SAMPLE_TTL, OntologyFormat::Turtle).expect("parse");
        build_schema(&doc)
    }

    #[test]
    fn extracts_classes_with_parents() {
        let schema = sample_schema();
        assert_eq!(schema.classes.len(), 3);

        let workshop = schema
            .class(&Iri::new("http://example.org/kb#Workshop"))
            .expect("workshop");
        assert_eq!(workshop.parents, vec![Iri::new("http://example.org/kb#Meeting")]);

        // owl:Thing parents are dropped.
        let person = schema
            .class(&Iri::new("http://example.org/kb#Person"))
            .expect("person");
        assert!(person.parents.is_empty());
    }

    #[test]
    fn extracts_properties_with_domain_and_range() {
        let schema = sample_schema();
        let attendee = schema
            .property(&Iri::new("http://example.org/kb#hasAttendee"))
            .expect("hasAttendee");
        assert_eq!(attendee.kind, PropertyKind::Object);
        assert_eq!(
            attendee.domain.as_ref().map(Iri::as_str),
            Some("http://example.org/kb#Meeting")
        );
        assert_eq!(
            attendee.range.as_ref().map(Iri::as_str),
            Some("http://example.org/kb#Person")
        );

        let tag = schema
            .property(&Iri::new("http://example.org/kb#hasTag"))
            .expect("hasTag");
        assert_eq!(tag.kind, PropertyKind::Datatype);
        assert!(tag.range.as_ref().is_some_and(Iri::is_xsd_datatype));

        // Declared but unconstrained: kept in the model, skipped by generation.
        let orphan = schema
            .property(&Iri::new("http://example.org/kb#orphan"))
            .expect("orphan");
        assert!(orphan.domain.is_none() && orphan.range.is_none());
    }

    #[test]
    fn first_domain_declaration_wins() {
        let ttl = r#"
@prefix kb: <http://example.org/kb#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

kb:p a owl:ObjectProperty ;
    rdfs:domain kb:First ;
    rdfs:domain kb:Second .
"#;
        let doc = parse_document_str(ttl, OntologyFormat::Turtle).expect("parse");
        let schema = build_schema(&doc);
        let p = schema.property(&Iri::new("http://example.org/kb#p")).expect("p");
        assert_eq!(
            p.domain.as_ref().map(Iri::as_str),
            Some("http://example.org/kb#First")
        );
    }

    #[test]
    fn empty_ontology_yields_empty_model() {
        let doc = parse_document_str("", OntologyFormat::Turtle).expect("parse");
        let schema = build_schema(&doc);
        assert!(schema.is_empty());
    }

    #[test]
    fn labels_and_comments_are_attached() {
        let schema = sample_schema();
        let meeting = schema
            .class(&Iri::new("http://example.org/kb#Meeting"))
            .expect("meeting");
        assert_eq!(meeting.label, "Meeting");
        assert_eq!(meeting.comment.as_deref(), Some("A scheduled gathering."));
    }
}
