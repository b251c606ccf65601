mod config;
mod error;

use std::path::{Path, PathBuf};

use bundle::{Record, RuleBundle, Value};
use clap::{Parser, Subcommand};
use policy::{CapabilityRegistry, Resolver};
use runtime::{Category, Engine};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "quarry.toml";

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Run sandboxed scraping rules", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show bundle metadata
    Info {
        /// Rule bundle (.yaml, .yml or .toml)
        bundle: PathBuf,
    },
    /// List rules and how their imports resolve under the current policy
    Rules {
        bundle: PathBuf,
    },
    /// Run a rule and print its result as JSON
    Run {
        bundle: PathBuf,
        /// Rule identifier, e.g. search or chapter-list
        rule: String,
        /// Input value as key=value; values are parsed as JSON when possible
        #[arg(short, long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,
        /// Compile on every run
        #[arg(long)]
        no_cache: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(config = %cli.config.display(), deny = ?config.policy.deny, "configuration loaded");

    match cli.command {
        Commands::Info { bundle } => cmd_info(&bundle),
        Commands::Rules { bundle } => cmd_rules(&bundle, &config),
        Commands::Run {
            bundle,
            rule,
            inputs,
            no_cache,
        } => cmd_run(&bundle, rule, &inputs, no_cache, config).await,
    }
}

fn cmd_info(path: &Path) -> Result<()> {
    let bundle = RuleBundle::load(path)?;
    let meta = &bundle.metadata;

    println!("{} {}", meta.name, meta.version);
    println!("{:<12}{}", "identifier", meta.identifier);
    println!("{:<12}{}", "author", meta.author);
    println!("{:<12}{}", "language", meta.language);
    for source in &meta.sources {
        println!("{:<12}{source}", "source");
    }
    println!("{:<12}{}", "rules", bundle.rules.len());
    println!("{:<12}{}", "functions", bundle.functions.len());
    if !bundle.env.is_empty() {
        let keys: Vec<&str> = bundle.env.keys().map(String::as_str).collect();
        println!("{:<12}{}", "env", keys.join(", "));
    }
    Ok(())
}

fn cmd_rules(path: &Path, config: &Config) -> Result<()> {
    let bundle = RuleBundle::load(path)?;
    let registry = CapabilityRegistry::builtin();
    let resolver = Resolver::new(&registry, &config.policy);

    println!("{:<16}  {:<10}  {:<24}  SKIPPED", "RULE", "SCHEMA", "CAPABILITIES");
    println!("{}", "-".repeat(72));

    for (id, rule) in &bundle.rules {
        let resolution = resolver.resolve(rule, &bundle.functions);
        let schema = if Category::from_rule_id(id).is_some() {
            "yes"
        } else {
            "-"
        };
        let issues: Vec<String> = resolution.issues.iter().map(ToString::to_string).collect();
        println!(
            "{id:<16}  {schema:<10}  {:<24}  {}",
            resolution.allowed.join(","),
            issues.join("; ")
        );
    }
    Ok(())
}

async fn cmd_run(
    path: &Path,
    rule: String,
    raw_inputs: &[String],
    no_cache: bool,
    config: Config,
) -> Result<()> {
    let bundle = RuleBundle::load(path)?;
    let inputs = parse_inputs(raw_inputs)?;

    let engine = Engine::builder(bundle)
        .policy(config.policy)
        .http(config.http.to_config())
        .max_operations(config.engine.max_operations)
        .cache(config.engine.cache && !no_cache)
        .build();

    // Rules block on HTTP; keep them off the async workers.
    let value = tokio::task::spawn_blocking(move || match Category::from_rule_id(&rule) {
        Some(category) => engine
            .run_category(category, inputs)
            .map(|validated| validated.into_value()),
        None => engine.run_rule(&rule, inputs),
    })
    .await??;

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Parse `key=value` arguments. Values that are valid JSON keep their type,
/// anything else is taken as a plain string.
fn parse_inputs(raw: &[String]) -> Result<Record> {
    raw.iter()
        .map(|arg| {
            let (key, value) = arg
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| Error::InvalidInput(arg.clone()))?;
            let value = serde_json::from_str::<Value>(value)
                .unwrap_or_else(|_| Value::String(value.to_string()));
            Ok((key.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn inputs_keep_json_types() {
        let inputs = parse_inputs(&args(&["query=dune", "page=2", "tags=[\"sf\"]", "raw=\"2\""])).unwrap();
        assert_eq!(inputs.get("query"), Some(&Value::from("dune")));
        assert_eq!(inputs.get("page"), Some(&Value::Int(2)));
        assert_eq!(inputs.get("tags"), Some(&Value::Sequence(vec!["sf".into()])));
        assert_eq!(inputs.get("raw"), Some(&Value::from("2")));
    }

    #[test]
    fn value_may_contain_equals() {
        let inputs = parse_inputs(&args(&["url=https://a.example/?q=1"])).unwrap();
        assert_eq!(inputs.get("url"), Some(&Value::from("https://a.example/?q=1")));
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        assert!(matches!(parse_inputs(&args(&["novalue"])), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_inputs(&args(&["=x"])), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn cli_parses_run_arguments() {
        let cli = Cli::try_parse_from([
            "quarry", "run", "novels.yaml", "search", "-i", "query=dune", "--no-cache",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { rule, inputs, no_cache, .. } => {
                assert_eq!(rule, "search");
                assert_eq!(inputs, vec!["query=dune"]);
                assert!(no_cache);
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
    }
}
