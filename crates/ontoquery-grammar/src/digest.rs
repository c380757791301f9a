//! Stable identifiers and content fingerprints.
//!
//! Two different digests with two different jobs:
//!
//! - **Pattern ids** use FNV-1a 64-bit over the property IRI. They are
//!   stability/identity tools: regenerating a grammar from the same ontology
//!   must yield the same ids. Not a security primitive.
//! - **Ontology fingerprints** use SHA-256 over the raw document bytes. The
//!   cache collaborator compares fingerprints to decide whether a persisted
//!   grammar is stale. The core treats the value as an opaque key; this
//!   helper exists so callers agree on one encoding.

use sha2::{Digest, Sha256};

/// Prefix used in serialized ontology fingerprints.
pub const FINGERPRINT_PREFIX: &str = "sha256:";

/// Prefix used in generated pattern ids.
pub const PATTERN_ID_PREFIX: &str = "pat::";

fn fnv1a64_hex(bytes: &[u8]) -> String {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x00000100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= (*b) as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    format!("{hash:016x}")
}

fn sanitize_id_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "_".to_string()
    } else {
        out
    }
}

/// Stable id for one pattern variant: `pat::<local>::<digest>::<variant>`.
///
/// Derived from the property IRI plus the variant index, never random, so
/// regeneration from the same ontology yields the same ids and the same
/// tie-break ordering in the matcher.
pub fn pattern_id(property_iri: &ontoquery_ontology::Iri, variant: usize) -> String {
    let local = sanitize_id_component(property_iri.local_name());
    let digest = fnv1a64_hex(property_iri.as_str().as_bytes());
    format!("{PATTERN_ID_PREFIX}{local}::{digest}::{variant}")
}

/// SHA-256 content fingerprint of the raw ontology bytes.
pub fn sha256_fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{FINGERPRINT_PREFIX}{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoquery_ontology::Iri;

    #[test]
    fn pattern_ids_are_stable_and_distinct_per_variant() {
        let prop = Iri::new("http://example.org/kb#hasAttendee");
        let a = pattern_id(&prop, 0);
        let b = pattern_id(&prop, 0);
        let c = pattern_id(&prop, 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("pat::hasAttendee::"));
    }

    #[test]
    fn pattern_ids_distinguish_same_local_name_across_namespaces() {
        let a = pattern_id(&Iri::new("http://example.org/a#name"), 0);
        let b = pattern_id(&Iri::new("http://example.org/b#name"), 0);
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_has_expected_prefix_and_width() {
        let fp = sha256_fingerprint(b"@prefix kb: <http://example.org/kb#> .\n");
        assert!(fp.starts_with(FINGERPRINT_PREFIX));
        assert_eq!(fp.len(), FINGERPRINT_PREFIX.len() + 64);
    }

    #[test]
    fn fingerprint_changes_with_content() {
        assert_ne!(sha256_fingerprint(b"a"), sha256_fingerprint(b"b"));
    }
}
