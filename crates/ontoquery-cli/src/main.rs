//! Ontoquery CLI
//!
//! Command-line surface over the pipeline:
//! - Generating and inspecting grammars from ontology files
//! - Translating natural-language questions into SPARQL
//! - Executing queries against configured endpoints

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ontoquery_grammar::{generate, sha256_fingerprint, Grammar};
use ontoquery_match::{MatchKind, MatchOutcome, PatternMatcher};
use ontoquery_ontology::{build_schema, parse_document, OntologyFormat};
use ontoquery_sparql::{
    OrderDirection, OutputFormat, QueryBuilder, QueryOptions, SparqlClient,
};

mod cache;
mod profile;

use cache::GrammarStore;
use profile::ProfileFile;

#[derive(Parser)]
#[command(name = "ontoquery")]
#[command(
    author,
    version,
    about = "Ontology-driven natural-language to SPARQL translation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and inspect query grammars.
    Grammar {
        #[command(subcommand)]
        command: GrammarCommands,
    },

    /// Translate a question into SPARQL (and optionally run it).
    Query(QueryArgs),

    /// Manage endpoint profiles.
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
}

#[derive(Subcommand)]
enum GrammarCommands {
    /// Build (or refresh) the grammar for an ontology file.
    Generate {
        /// Ontology file (.ttl, .nt, .rdf/.owl/.xml)
        ontology: PathBuf,
        /// Regenerate even when a cached grammar exists
        #[arg(long)]
        no_cache: bool,
    },

    /// List the patterns of an ontology's grammar.
    Show {
        /// Ontology file
        ontology: PathBuf,
        /// Only patterns carrying this keyword
        #[arg(long)]
        keyword: Option<String>,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Ontology file the grammar is generated from
    ontology: PathBuf,
    /// The question, e.g. "meetings with John Smith"
    text: String,
    /// Print the SPARQL query without executing it
    #[arg(long)]
    sparql_only: bool,
    /// Row limit (capped server-side at 1000)
    #[arg(long)]
    limit: Option<u64>,
    /// Order by this property (full IRI or prefixed name)
    #[arg(long)]
    order_by: Option<String>,
    /// Order descending instead of ascending
    #[arg(long)]
    desc: bool,
    /// Scope the query to a single graph
    #[arg(long)]
    graph: Option<String>,
    /// Scope the query to any of these graphs (repeatable)
    #[arg(long = "named-graph")]
    named_graphs: Vec<String>,
    /// Result rendering: table, json, or csv
    #[arg(long, default_value = "table")]
    format: OutputFormat,
    /// Endpoint profile to execute against
    #[arg(long)]
    profile: Option<String>,
    /// Endpoint URL (overrides --profile)
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// List configured endpoint profiles.
    List,

    /// Add or replace an endpoint profile.
    Add {
        /// Profile name
        name: String,
        /// Endpoint URL
        url: String,
        /// Auth type: none, basic, or bearer
        #[arg(long, default_value = "none")]
        auth: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        token: Option<String>,
        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Grammar { command } => match command {
            GrammarCommands::Generate { ontology, no_cache } => grammar_generate(&ontology, no_cache),
            GrammarCommands::Show { ontology, keyword } => grammar_show(&ontology, keyword.as_deref()),
        },
        Commands::Query(args) => query(args),
        Commands::Profile { command } => match command {
            ProfileCommands::List => profile_list(),
            ProfileCommands::Add {
                name,
                url,
                auth,
                username,
                password,
                token,
                timeout,
            } => profile_add(name, url, &auth, username, password, token, timeout),
        },
    }
}

/// Load the grammar for an ontology file, consulting the cache unless told
/// not to. The cache key is the content fingerprint, so edits to the file
/// regenerate automatically.
fn load_grammar(ontology: &Path, use_cache: bool) -> Result<Grammar> {
    let bytes = fs::read(ontology)
        .with_context(|| format!("reading ontology {}", ontology.display()))?;
    let fingerprint = sha256_fingerprint(&bytes);

    let store = GrammarStore::open_default()?;
    if use_cache {
        if let Some(grammar) = store.load(&fingerprint)? {
            return Ok(grammar);
        }
    }

    let format = ontology
        .extension()
        .and_then(|e| e.to_str())
        .and_then(OntologyFormat::from_extension)
        .ok_or_else(|| anyhow!("unrecognized ontology extension: {}", ontology.display()))?;
    let document = parse_document(&bytes, format)?;
    let model = build_schema(&document);
    let patterns = generate(&model)?;
    let grammar = Grammar::assemble(patterns, &model, fingerprint)?;
    store.store(&grammar)?;
    Ok(grammar)
}

fn grammar_generate(ontology: &Path, no_cache: bool) -> Result<()> {
    let grammar = load_grammar(ontology, !no_cache)?;
    println!(
        "{} {} patterns ({})",
        "generated".green().bold(),
        grammar.patterns.len(),
        grammar.fingerprint
    );
    Ok(())
}

fn grammar_show(ontology: &Path, keyword: Option<&str>) -> Result<()> {
    let grammar = load_grammar(ontology, true)?;
    let patterns: Vec<_> = match keyword {
        Some(keyword) => grammar.patterns_with_keyword(keyword),
        None => grammar.patterns.iter().collect(),
    };

    for pattern in &patterns {
        println!(
            "{}  {}  {:.2}",
            pattern.id.dimmed(),
            pattern.template.cyan(),
            pattern.confidence
        );
        if let Some(example) = pattern.examples.first() {
            println!("    e.g. {}", example.dimmed());
        }
    }
    println!("{} pattern(s)", patterns.len());
    Ok(())
}

fn query(args: QueryArgs) -> Result<()> {
    let grammar = load_grammar(&args.ontology, true)?;
    let matcher = PatternMatcher::new();

    let results = match matcher.find_matches(&args.text, &grammar) {
        MatchOutcome::Found(results) => results,
        MatchOutcome::NoMatch { suggestions } => {
            eprintln!("{}", "no matching pattern".red().bold());
            if !suggestions.is_empty() {
                eprintln!("did you mean:");
                for suggestion in &suggestions {
                    eprintln!("  {}", suggestion.yellow());
                }
            }
            return Err(anyhow!("no pattern matched: {}", args.text));
        }
    };

    let best = &results[0];
    let fuzzy_note = match best.kind {
        MatchKind::Exact => String::new(),
        MatchKind::Fuzzy => format!(" (fuzzy, {:.2})", best.confidence),
    };
    eprintln!(
        "{} {}{}",
        "matched".green().bold(),
        best.pattern.template.cyan(),
        fuzzy_note
    );

    let direction = if args.desc {
        OrderDirection::Desc
    } else {
        OrderDirection::Asc
    };
    let options = QueryOptions {
        limit: args.limit,
        order_by: args.order_by.clone().map(|p| (p, direction)),
        default_graph: args.graph.clone(),
        named_graphs: args.named_graphs.clone(),
    };
    let sparql = QueryBuilder::for_grammar(&grammar).build(best, &options)?;

    let endpoint = resolve_endpoint(&args)?;
    if args.sparql_only || endpoint.is_none() {
        println!("{sparql}");
        return Ok(());
    }

    let (url, auth, timeout) = endpoint.ok_or_else(|| anyhow!("no endpoint configured"))?;
    let client = SparqlClient::with_timeout(url, timeout)?.with_auth(auth);
    let results = client.select(&sparql)?;
    println!("{}", args.format.render(&results));
    Ok(())
}

type Endpoint = (String, ontoquery_sparql::Auth, Duration);

fn resolve_endpoint(args: &QueryArgs) -> Result<Option<Endpoint>> {
    if let Some(url) = &args.endpoint {
        return Ok(Some((
            url.clone(),
            ontoquery_sparql::Auth::None,
            Duration::from_secs(30),
        )));
    }
    let Some(name) = &args.profile else {
        return Ok(None);
    };
    let path = ProfileFile::default_path()?;
    let file = ProfileFile::load(&path)?;
    let profile = file.get(name)?;
    Ok(Some((
        profile.url.clone(),
        profile.auth(),
        Duration::from_secs(profile.timeout_secs),
    )))
}

fn profile_list() -> Result<()> {
    let path = ProfileFile::default_path()?;
    let file = ProfileFile::load(&path)?;
    if file.profiles.is_empty() {
        println!("no profiles configured ({})", path.display());
        return Ok(());
    }
    for (name, profile) in &file.profiles {
        let auth = match profile.auth_type {
            profile::AuthType::None => "none",
            profile::AuthType::Basic => "basic",
            profile::AuthType::Bearer => "bearer",
        };
        println!("{}  {}  auth={}", name.cyan().bold(), profile.url, auth);
    }
    Ok(())
}

fn profile_add(
    name: String,
    url: String,
    auth: &str,
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
    timeout: u64,
) -> Result<()> {
    let auth_type = match auth {
        "none" => profile::AuthType::None,
        "basic" => profile::AuthType::Basic,
        "bearer" => profile::AuthType::Bearer,
        other => return Err(anyhow!("unknown auth type: {other}")),
    };
    let profile = profile::Profile {
        url,
        auth_type,
        username,
        password,
        token,
        timeout_secs: timeout,
    };
    profile.validate(&name)?;

    let path = ProfileFile::default_path()?;
    let mut file = ProfileFile::load(&path)?;
    file.profiles.insert(name.clone(), profile);
    file.save(&path)?;
    println!("{} profile {}", "saved".green().bold(), name.cyan());
    Ok(())
}
