//! SELECT query construction from a matched pattern.
//!
//! Every extracted value enters the query as an escaped, quoted literal —
//! never as raw syntax and never as an identifier — regardless of how
//! confidently it was matched. Graph scoping, ordering, and limits come
//! from [`QueryOptions`].

use ontoquery_grammar::Pattern;
use ontoquery_match::MatchResult;
use ontoquery_ontology::PropertyKind;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Hard ceiling on requested `LIMIT` values.
pub const MAX_ROW_LIMIT: u64 = 1000;

const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
const FOAF_NS: &str = "http://xmlns.com/foaf/0.1/";
const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
const DCTERMS_CREATED: &str = "http://purl.org/dc/terms/created";

/// Domain classes that carry a `dcterms:created` timestamp and get
/// newest-first ordering when the caller asks for no ordering at all.
const TIME_STAMPED_CLASSES: &[&str] = &["Meeting", "DailyNote", "Event"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Caller-side knobs for a single build. The default asks for nothing:
/// no limit, no explicit ordering, no graph scoping.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Row cap; silently clamped to [`MAX_ROW_LIMIT`]. Zero means no limit.
    pub limit: Option<u64>,
    /// Explicit ordering: property (full IRI or prefixed name) + direction.
    pub order_by: Option<(String, OrderDirection)>,
    /// Scope the body to a single graph.
    pub default_graph: Option<String>,
    /// Scope the body to any of these graphs (OR semantics via `UNION`).
    pub named_graphs: Vec<String>,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("pattern {id} carries an empty domain IRI")]
    EmptyDomain { id: String },
    #[error("pattern {id} carries an empty property IRI")]
    EmptyProperty { id: String },
}

/// Builds SELECT queries against the namespace table of one grammar.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    namespaces: BTreeMap<String, String>,
}

impl QueryBuilder {
    pub fn new(namespaces: BTreeMap<String, String>) -> Self {
        Self { namespaces }
    }

    pub fn for_grammar(grammar: &ontoquery_grammar::Grammar) -> Self {
        Self::new(grammar.namespaces.clone())
    }

    /// Render the match into a complete SELECT query.
    ///
    /// Fails only when the pattern's domain or property IRI is empty; every
    /// other input renders to valid (if unanswerable) SPARQL.
    pub fn build(
        &self,
        result: &MatchResult<'_>,
        options: &QueryOptions,
    ) -> Result<String, BuildError> {
        let pattern = result.pattern;
        if pattern.binding.domain.as_str().is_empty() {
            return Err(BuildError::EmptyDomain {
                id: pattern.id.clone(),
            });
        }
        if pattern.binding.property.as_str().is_empty() {
            return Err(BuildError::EmptyProperty {
                id: pattern.id.clone(),
            });
        }

        let mut used = BTreeMap::new();
        let body = self.body_lines(pattern, &result.bindings, &mut used);
        let scoped = scope_to_graphs(&body, options);

        let mut select_vars = vec!["?item".to_string()];
        for name in result.bindings.keys() {
            select_vars.push(format!("?{name}"));
        }

        let mut where_block = scoped;
        let order_clause = self.order_clause(pattern, options, &mut where_block, &mut used);

        let mut query = String::new();
        for (prefix, base) in &used {
            query.push_str(&format!("PREFIX {prefix}: <{base}>\n"));
        }
        if !used.is_empty() {
            query.push('\n');
        }

        query.push_str(&format!("SELECT DISTINCT {} WHERE {{\n", select_vars.join(" ")));
        for line in &where_block {
            query.push_str(&format!("  {line}\n"));
        }
        query.push('}');

        if let Some(order) = order_clause {
            query.push('\n');
            query.push_str(&order);
        }
        if let Some(limit) = options.limit.filter(|&n| n > 0) {
            let clamped = limit.min(MAX_ROW_LIMIT);
            if clamped != limit {
                debug!(requested = limit, clamped, "limit clamped");
            }
            query.push_str(&format!("\nLIMIT {clamped}"));
        }

        Ok(query)
    }

    /// Graph-pattern body: one type constraint, one edge per extracted
    /// value, and a value filter per edge. Object ranges go through an
    /// `rdfs:label|foaf:name` lookup; datatype ranges compare the literal
    /// directly. Comparison is case-insensitive either way.
    fn body_lines(
        &self,
        pattern: &Pattern,
        bindings: &BTreeMap<String, String>,
        used: &mut BTreeMap<String, String>,
    ) -> Vec<String> {
        let domain = self.compact(pattern.binding.domain.as_str(), used);
        let property = self.compact(pattern.binding.property.as_str(), used);

        let mut lines = vec![format!("?item a {domain} .")];
        for (name, value) in bindings {
            let literal = escape_literal(value);
            lines.push(format!("?item {property} ?{name} ."));

            let object_range = pattern.binding.kind == PropertyKind::Object
                && !pattern.binding.range.is_xsd_datatype();
            if object_range {
                used.insert("rdfs".to_string(), RDFS_NS.to_string());
                used.insert("foaf".to_string(), FOAF_NS.to_string());
                lines.push(format!("?{name} rdfs:label|foaf:name ?{name}_name ."));
                lines.push(format!(
                    "FILTER(LCASE(STR(?{name}_name)) = LCASE(\"{literal}\"))"
                ));
            } else {
                lines.push(format!("FILTER(LCASE(STR(?{name})) = LCASE(\"{literal}\"))"));
            }
        }
        lines
    }

    /// Explicit ordering wins; otherwise time-stamped domain classes get
    /// newest-first on `dcterms:created`. The sort edge is OPTIONAL so
    /// unsorted-but-matching rows still appear.
    fn order_clause(
        &self,
        pattern: &Pattern,
        options: &QueryOptions,
        where_block: &mut Vec<String>,
        used: &mut BTreeMap<String, String>,
    ) -> Option<String> {
        if let Some((property, direction)) = &options.order_by {
            let rendered = self.render_order_property(property, used);
            where_block.push(format!("OPTIONAL {{ ?item {rendered} ?order_value . }}"));
            let dir = match direction {
                OrderDirection::Asc => "ASC",
                OrderDirection::Desc => "DESC",
            };
            return Some(format!("ORDER BY {dir}(?order_value)"));
        }

        let domain_local = pattern.binding.domain.local_name();
        if TIME_STAMPED_CLASSES.contains(&domain_local) {
            let created = self.compact(DCTERMS_CREATED, used);
            where_block.push(format!("OPTIONAL {{ ?item {created} ?created . }}"));
            return Some("ORDER BY DESC(?created)".to_string());
        }
        None
    }

    fn render_order_property(&self, property: &str, used: &mut BTreeMap<String, String>) -> String {
        if property.starts_with("http://") || property.starts_with("https://") {
            return self.compact(property, used);
        }
        if let Some((prefix, _)) = property.split_once(':') {
            if let Some(base) = self.ancillary_or_grammar_base(prefix) {
                used.insert(prefix.to_string(), base);
            }
        }
        property.to_string()
    }

    fn ancillary_or_grammar_base(&self, prefix: &str) -> Option<String> {
        if let Some(base) = self.namespaces.get(prefix) {
            return Some(base.clone());
        }
        match prefix {
            "rdfs" => Some(RDFS_NS.to_string()),
            "foaf" => Some(FOAF_NS.to_string()),
            "dcterms" => Some(DCTERMS_NS.to_string()),
            _ => None,
        }
    }

    /// Prefixed form when a known namespace matches and the remainder is a
    /// plain local name; angle-bracketed full IRI otherwise.
    fn compact(&self, iri: &str, used: &mut BTreeMap<String, String>) -> String {
        let ancillary = [
            ("rdfs", RDFS_NS),
            ("foaf", FOAF_NS),
            ("dcterms", DCTERMS_NS),
        ];
        let candidates = self
            .namespaces
            .iter()
            .map(|(p, b)| (p.as_str(), b.as_str()))
            .chain(ancillary);

        for (prefix, base) in candidates {
            if let Some(local) = iri.strip_prefix(base) {
                if !local.is_empty()
                    && local
                        .chars()
                        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
                {
                    used.insert(prefix.to_string(), base.to_string());
                    return format!("{prefix}:{local}");
                }
            }
        }
        format!("<{iri}>")
    }
}

/// Wrap the body per the graph options: each named graph gets its own
/// structurally identical `GRAPH` block, alternatives joined with `UNION`.
fn scope_to_graphs(body: &[String], options: &QueryOptions) -> Vec<String> {
    let graph_block = |graph: &str| -> Vec<String> {
        let graph = escape_graph_iri(graph);
        let mut lines = vec![format!("GRAPH <{graph}> {{")];
        for line in body {
            lines.push(format!("  {line}"));
        }
        lines.push("}".to_string());
        lines
    };

    if !options.named_graphs.is_empty() {
        let mut lines = Vec::new();
        for (i, graph) in options.named_graphs.iter().enumerate() {
            if i > 0 {
                lines.push("UNION".to_string());
            }
            lines.push("{".to_string());
            for line in graph_block(graph) {
                lines.push(format!("  {line}"));
            }
            lines.push("}".to_string());
        }
        return lines;
    }
    if let Some(graph) = &options.default_graph {
        return graph_block(graph);
    }
    body.to_vec()
}

/// Percent-encode the characters an IRIREF may not contain (`<`, `>`,
/// quotes, braces, whitespace, control chars, ...) so a graph identifier
/// can never terminate its own angle brackets.
pub fn escape_graph_iri(iri: &str) -> String {
    let mut out = String::with_capacity(iri.len());
    for c in iri.chars() {
        match c {
            '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                for b in c.to_string().as_bytes() {
                    out.push_str(&format!("%{b:02X}"));
                }
            }
            c if c.is_whitespace() || (c as u32) < 0x21 => {
                for b in c.to_string().as_bytes() {
                    out.push_str(&format!("%{b:02X}"));
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Escape a value for inclusion in a double-quoted SPARQL literal.
/// Backslash, quotes, newline, carriage return, tab, and remaining control
/// characters are all encoded.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
