//! Ontology ingestion for Ontoquery (boundary adapter).
//!
//! This crate sits at the interop boundary:
//!
//! - It parses OWL/RDF-shaped ontology documents (untrusted input).
//! - It exposes a statement-level view (`OntologyDocument`) and a typed
//!   schema model (`SchemaModel`) for the grammar pipeline.
//! - It does *not* interpret instance data; only the schema vocabulary
//!   (classes, properties, domain/range, labels, prefixes) is extracted.
//!
//! Parsing uses **Sophia** for the common RDF serializations:
//! - Turtle (`.ttl`)
//! - N-Triples (`.nt`)
//! - RDF/XML (`.rdf`, `.owl`, `.xml`)

pub mod schema;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use sophia::api::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub use schema::{build_schema, OntologyClass, OntologyProperty, PropertyKind, SchemaModel};

/// Well-known vocabulary IRIs used during schema extraction.
pub mod vocab {
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
    pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    pub const RDFS_DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
    pub const RDFS_RANGE: &str = "http://www.w3.org/2000/01/rdf-schema#range";
    pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
    pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
    pub const OWL_THING: &str = "http://www.w3.org/2002/07/owl#Thing";
    pub const OWL_OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
    pub const OWL_DATATYPE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";
    pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const FOAF_NAME: &str = "http://xmlns.com/foaf/0.1/name";
}

// ============================================================================
// IRI value type
// ============================================================================

/// An IRI as a distinct value type.
///
/// Keeping IRIs out of bare `String`s means domain/range/placeholder mixups
/// are caught at construction time rather than by runtime string comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(String);

impl Iri {
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path/fragment segment ("simplified name").
    ///
    /// External-vocabulary references that never resolve to a known class
    /// still produce a usable display name this way.
    pub fn local_name(&self) -> &str {
        self.0.rsplit(['#', '/']).next().unwrap_or(&self.0)
    }

    /// Namespace part of the IRI, up to and including the `#`/`/` separator.
    pub fn namespace(&self) -> &str {
        match self.0.rfind(['#', '/']) {
            Some(idx) => &self.0[..=idx],
            None => "",
        }
    }

    /// True for XML Schema datatype IRIs (`xsd:string`, `xsd:date`, ...).
    pub fn is_xsd_datatype(&self) -> bool {
        self.0.starts_with(vocab::XSD_NS)
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Iri {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Iri {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// Statement-level view
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectNode {
    Iri(Iri),
    Blank(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<Iri>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectTerm {
    Iri(Iri),
    Blank(String),
    Literal(Literal),
}

/// One parsed triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub subject: SubjectNode,
    pub predicate: Iri,
    pub object: ObjectTerm,
}

/// The statement-level view of an ontology document, plus its declared
/// prefix bindings. Statements appear in document order; "first encountered
/// wins" rules downstream rely on that ordering.
#[derive(Debug, Clone, Default)]
pub struct OntologyDocument {
    pub statements: Vec<Statement>,
    pub prefixes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OntologyFormat {
    Turtle,
    NTriples,
    RdfXml,
}

impl OntologyFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ttl" | "turtle" => Some(Self::Turtle),
            "nt" | "ntriples" => Some(Self::NTriples),
            "rdf" | "owl" | "xml" => Some(Self::RdfXml),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct TripleSinkError {
    message: String,
}

impl From<anyhow::Error> for TripleSinkError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

// ============================================================================
// Term parsing (display form)
// ============================================================================

fn unescape_literal_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_object_term(term: &str) -> Result<ObjectTerm> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(ObjectTerm::Iri(Iri::new(rest)));
    }

    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(ObjectTerm::Blank(rest.to_string()));
    }

    if s.starts_with('"') {
        // Small literal parser over the N-Triples-ish display form.
        let mut end_quote = None;
        let mut prev_was_escape = false;
        for (i, ch) in s.char_indices().skip(1) {
            if ch == '"' && !prev_was_escape {
                end_quote = Some(i);
                break;
            }
            prev_was_escape = ch == '\\' && !prev_was_escape;
            if ch != '\\' {
                prev_was_escape = false;
            }
        }
        let Some(end) = end_quote else {
            return Err(anyhow!("invalid literal term (missing closing quote): {s}"));
        };

        let lexical = unescape_literal_text(&s[1..end]);
        let rest = s[end + 1..].trim();

        let mut language = None;
        let mut datatype = None;
        if let Some(lang) = rest.strip_prefix('@') {
            language = Some(lang.to_string());
        } else if let Some(dt) = rest.strip_prefix("^^") {
            let dt = dt.trim();
            if let Some(dt_iri) = dt.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
                datatype = Some(Iri::new(dt_iri));
            } else if !dt.is_empty() {
                datatype = Some(Iri::new(dt));
            }
        }

        return Ok(ObjectTerm::Literal(Literal {
            lexical,
            datatype,
            language,
        }));
    }

    Err(anyhow!("unsupported RDF term form: {s}"))
}

fn parse_subject_term(term: &str) -> Result<SubjectNode> {
    match parse_object_term(term)? {
        ObjectTerm::Iri(iri) => Ok(SubjectNode::Iri(iri)),
        ObjectTerm::Blank(b) => Ok(SubjectNode::Blank(b)),
        ObjectTerm::Literal(_) => Err(anyhow!("expected IRI/blank node, got literal: {term}")),
    }
}

fn parse_predicate_term(term: &str) -> Result<Option<Iri>> {
    match parse_object_term(term)? {
        ObjectTerm::Iri(iri) => Ok(Some(iri)),
        // Generalized RDF allows blank predicates; skip them rather than fail.
        _ => Ok(None),
    }
}

// ============================================================================
// Prefix extraction
// ============================================================================

/// Collect declared prefix bindings from the raw document text.
///
/// Sophia's streaming parsers don't surface the prefix table, so we scan
/// the source for Turtle (`@prefix ex: <...> .`), SPARQL-style
/// (`PREFIX ex: <...>`) and RDF/XML (`xmlns:ex="..."`) declarations.
/// The default (empty-prefix) namespace is skipped.
fn extract_prefixes(text: &str) -> BTreeMap<String, String> {
    let mut prefixes = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        let rest = if let Some(rest) = line.strip_prefix("@prefix") {
            rest
        } else if line
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("prefix"))
        {
            // get(..6) returned Some, so byte 6 is a char boundary.
            &line[6..]
        } else {
            continue;
        };
        let rest = rest.trim();
        let Some(colon) = rest.find(':') else {
            continue;
        };
        let prefix = rest[..colon].trim();
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            continue;
        }
        let after = rest[colon + 1..].trim();
        let Some(iri) = after
            .strip_prefix('<')
            .and_then(|t| t.split('>').next())
        else {
            continue;
        };
        prefixes.insert(prefix.to_string(), iri.to_string());
    }

    // RDF/XML namespace declarations.
    let mut search = text;
    while let Some(pos) = search.find("xmlns:") {
        let decl = &search[pos + "xmlns:".len()..];
        if let Some(eq) = decl.find('=') {
            let prefix = decl[..eq].trim();
            let after = decl[eq + 1..].trim_start();
            let quote = after.chars().next();
            if matches!(quote, Some('"') | Some('\'')) {
                let q = quote.unwrap_or('"');
                if let Some(end) = after[1..].find(q) {
                    let iri = &after[1..=end];
                    if !prefix.is_empty()
                        && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                    {
                        prefixes.entry(prefix.to_string()).or_insert_with(|| iri.to_string());
                    }
                }
            }
        }
        search = &search[pos + "xmlns:".len()..];
    }

    prefixes
}

// ============================================================================
// Document parsing
// ============================================================================

/// Parse an ontology document from raw bytes in the given format.
pub fn parse_document(bytes: &[u8], format: OntologyFormat) -> Result<OntologyDocument> {
    let cursor = std::io::Cursor::new(bytes);
    let reader = std::io::BufReader::new(cursor);

    let mut statements: Vec<Statement> = Vec::new();
    let mut sink = |s: String, p: String, o: String| -> std::result::Result<(), TripleSinkError> {
        let subject = parse_subject_term(&s).map_err(TripleSinkError::from)?;
        let Some(predicate) = parse_predicate_term(&p).map_err(TripleSinkError::from)? else {
            return Ok(());
        };
        let object = parse_object_term(&o).map_err(TripleSinkError::from)?;
        statements.push(Statement {
            subject,
            predicate,
            object,
        });
        Ok(())
    };

    match format {
        OntologyFormat::Turtle => {
            let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| sink(t.s().to_string(), t.p().to_string(), t.o().to_string()))
                .map_err(|e| anyhow!("failed to parse Turtle: {e}"))?;
        }
        OntologyFormat::NTriples => {
            let mut parser = sophia::turtle::parser::nt::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| sink(t.s().to_string(), t.p().to_string(), t.o().to_string()))
                .map_err(|e| anyhow!("failed to parse N-Triples: {e}"))?;
        }
        OntologyFormat::RdfXml => {
            let mut parser = sophia::xml::parser::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| sink(t.s().to_string(), t.p().to_string(), t.o().to_string()))
                .map_err(|e| anyhow!("failed to parse RDF/XML: {e}"))?;
        }
    }

    let text = String::from_utf8_lossy(bytes);
    let prefixes = extract_prefixes(&text);

    Ok(OntologyDocument {
        statements,
        prefixes,
    })
}

/// Parse an ontology document from a string (format given explicitly).
pub fn parse_document_str(text: &str, format: OntologyFormat) -> Result<OntologyDocument> {
    parse_document(text.as_bytes(), format)
}

/// Parse an ontology file, selecting the format from the file extension.
pub fn parse_document_file(path: &Path) -> Result<OntologyDocument> {
    let bytes = std::fs::read(path)?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let format = OntologyFormat::from_extension(ext)
        .ok_or_else(|| anyhow!("unsupported ontology format: .{ext}"))?;
    parse_document(&bytes, format)
}

// ============================================================================
// Tests
// ============================================================================
