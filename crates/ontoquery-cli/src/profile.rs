//! Named endpoint profiles.
//!
//! Profiles live in one JSON file (`$ONTOQUERY_PROFILES`, else
//! `$HOME/.config/ontoquery/profiles.json`). Validation happens on use,
//! not on load, so one broken profile never blocks the others.

use anyhow::{bail, Context, Result};
use ontoquery_sparql::Auth;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    None,
    Basic,
    Bearer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub url: String,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Profile {
    /// Check the profile is usable: a URL, and the credentials its auth
    /// type requires.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.url.trim().is_empty() {
            bail!("profile {name}: url is empty");
        }
        match self.auth_type {
            AuthType::None => {}
            AuthType::Basic => {
                if self.username.is_none() || self.password.is_none() {
                    bail!("profile {name}: basic auth requires username and password");
                }
            }
            AuthType::Bearer => {
                if self.token.is_none() {
                    bail!("profile {name}: bearer auth requires a token");
                }
            }
        }
        Ok(())
    }

    /// Client-side auth for a validated profile.
    pub fn auth(&self) -> Auth {
        match self.auth_type {
            AuthType::None => Auth::None,
            AuthType::Basic => Auth::Basic {
                username: self.username.clone().unwrap_or_default(),
                password: self.password.clone().unwrap_or_default(),
            },
            AuthType::Bearer => Auth::Bearer {
                token: self.token.clone().unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl ProfileFile {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("ONTOQUERY_PROFILES") {
            return Ok(PathBuf::from(path));
        }
        let home = env::var_os("HOME").context("HOME is not set")?;
        Ok(Path::new(&home)
            .join(".config")
            .join("ontoquery")
            .join("profiles.json"))
    }

    /// Load the profile file; a missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("parsing profiles file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading profiles file {}", path.display())),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }

    /// Look up a profile and validate it before handing it out.
    pub fn get(&self, name: &str) -> Result<&Profile> {
        let Some(profile) = self.profiles.get(name) else {
            bail!("no profile named {name}");
        };
        profile.validate(name)?;
        Ok(profile)
    }
}
