//! Ontology-driven query grammar for Ontoquery.
//!
//! The grammar pipeline is pure computation:
//!
//! - [`generate`] derives natural-language query patterns from a
//!   [`SchemaModel`](ontoquery_ontology::SchemaModel), deterministically.
//! - [`Grammar`] bundles the patterns with the namespace table and the
//!   ontology fingerprint used for cache validation.
//!
//! Nothing here performs I/O; the cache store and the ontology parser are
//! external collaborators.

pub mod digest;
pub mod generate;
pub mod grammar;
pub mod pattern;

pub use digest::{pattern_id, sha256_fingerprint};
pub use generate::generate;
pub use grammar::Grammar;
pub use pattern::{template_segments, Pattern, PatternBinding, TemplateSegment};

/// Errors surfaced by pattern construction and grammar (de)serialization.
///
/// Construction-time invariant violations (a pattern without placeholders)
/// signal a generator defect; they are not recoverable user-facing outcomes.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("pattern {id} has no entity placeholders")]
    NoPlaceholders { id: String },

    #[error("pattern {id} confidence {confidence} is outside [0, 1]")]
    ConfidenceOutOfRange { id: String, confidence: f64 },

    #[error("pattern {id} must have at least one example phrasing")]
    NoExamples { id: String },

    #[error("pattern {id} has an empty query template")]
    EmptyQueryTemplate { id: String },

    #[error("grammar contains duplicate pattern id {id}")]
    DuplicatePatternId { id: String },

    #[error("failed to (de)serialize grammar: {0}")]
    Serialization(#[from] serde_json::Error),
}
