//! Fingerprint-keyed grammar cache on disk.
//!
//! One JSON blob per ontology fingerprint. A blob whose stored fingerprint
//! does not match the requested one (or that no longer parses) is stale and
//! gets deleted on load. Writes go through a temp file + rename so a
//! half-written blob is never observed.

use anyhow::{Context, Result};
use ontoquery_grammar::Grammar;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct GrammarStore {
    dir: PathBuf,
}

impl GrammarStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating cache directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Default location: `$ONTOQUERY_CACHE_DIR`, else `$HOME/.cache/ontoquery`.
    pub fn open_default() -> Result<Self> {
        let dir = match env::var_os("ONTOQUERY_CACHE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = env::var_os("HOME").context("HOME is not set")?;
                Path::new(&home).join(".cache").join("ontoquery")
            }
        };
        Self::open(dir)
    }

    fn blob_path(&self, fingerprint: &str) -> PathBuf {
        let name: String = fingerprint
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    /// Load the grammar cached for `fingerprint`, if any.
    ///
    /// Returns `None` on absence, on a fingerprint mismatch, or on an
    /// unreadable blob; the latter two delete the blob.
    pub fn load(&self, fingerprint: &str) -> Result<Option<Grammar>> {
        let path = self.blob_path(fingerprint);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading cache blob {}", path.display()))
            }
        };

        match Grammar::from_cache_json(&text) {
            Ok(grammar) if grammar.fingerprint == fingerprint => {
                debug!(%fingerprint, "grammar cache hit");
                Ok(Some(grammar))
            }
            Ok(grammar) => {
                warn!(
                    stored = %grammar.fingerprint,
                    requested = %fingerprint,
                    "discarding stale grammar blob"
                );
                let _ = fs::remove_file(&path);
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "discarding unreadable grammar blob");
                let _ = fs::remove_file(&path);
                Ok(None)
            }
        }
    }

    /// Persist a grammar under its own fingerprint, atomically.
    pub fn store(&self, grammar: &Grammar) -> Result<()> {
        let path = self.blob_path(&grammar.fingerprint);
        let tmp = path.with_extension("json.tmp");
        let blob = grammar.to_cache_json()?;
        fs::write(&tmp, blob)
            .with_context(|| format!("writing cache blob {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("installing cache blob {}", path.display()))?;
        debug!(fingerprint = %grammar.fingerprint, "grammar cached");
        Ok(())
    }
}
