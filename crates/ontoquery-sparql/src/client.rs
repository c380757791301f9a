//! Blocking SPARQL protocol client.
//!
//! Queries are POSTed form-encoded with an
//! `Accept: application/sparql-results+json` header; the JSON result
//! document is flattened to one string value per variable per row. The
//! core crates never touch this module; only the CLI wires it in.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub enum Auth {
    #[default]
    None,
    Basic { username: String, password: String },
    Bearer { token: String },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },
    #[error("malformed result document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Flattened SELECT results: variable order from the endpoint's `head`,
/// one map of variable → plain string value per solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    pub variables: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

pub struct SparqlClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    auth: Auth,
}

impl SparqlClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(endpoint, Duration::from_secs(30))
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            auth: Auth::None,
        })
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Execute a SELECT query and flatten the JSON results.
    pub fn select(&self, query: &str) -> Result<ResultSet, ClientError> {
        debug!(endpoint = %self.endpoint, "posting query");
        let mut request = self
            .http
            .post(&self.endpoint)
            .header("Accept", "application/sparql-results+json")
            .form(&[("query", query)]);
        request = match &self.auth {
            Auth::None => request,
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Bearer { token } => request.bearer_auth(token),
        };

        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(ClientError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }
        parse_results(&body)
    }
}

#[derive(Deserialize)]
struct ResultsDocument {
    head: Head,
    results: Bindings,
}

#[derive(Deserialize)]
struct Head {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct Bindings {
    bindings: Vec<BTreeMap<String, Term>>,
}

#[derive(Deserialize)]
struct Term {
    value: String,
}

/// Parse a `application/sparql-results+json` document. Unbound variables
/// are simply absent from their row.
pub fn parse_results(body: &str) -> Result<ResultSet, ClientError> {
    let document: ResultsDocument = serde_json::from_str(body)?;
    let rows = document
        .results
        .bindings
        .into_iter()
        .map(|solution| {
            solution
                .into_iter()
                .map(|(var, term)| (var, term.value))
                .collect()
        })
        .collect();
    Ok(ResultSet {
        variables: document.head.vars,
        rows,
    })
}
