use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use frameroute::config::load_config;
use frameroute::observability::init_logging_or_report;
use frameroute::routing::{Matcher, PathMatcher};
use frameroute::{AppRegistry, Configurator};

#[derive(Parser)]
#[command(name = "frameroute-cli")]
#[command(about = "Inspect the routes declared in a frameroute settings file", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "frameroute.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the settings file and its declarative routes
    Check,
    /// List declarative routes with their compiled matchers
    Routes,
    /// Show which route a path resolves to
    Match {
        path: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging_or_report(&config.observability);

    let registry = Configurator::from_config(&config)?.freeze()?;

    match cli.command {
        Commands::Check => {
            let routes: usize = registry.routes().values().map(|ns| ns.len()).sum();
            println!(
                "{}: {} routes in {} namespaces",
                cli.config.display(),
                routes,
                registry.routes().len()
            );
        }
        Commands::Routes => {
            print_json(&describe(&registry)?)?;
        }
        Commands::Match { path } => match find(&registry, &path)? {
            Some(found) => print_json(&found)?,
            None => {
                eprintln!("No route matches {}", path);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn describe(registry: &AppRegistry) -> Result<Value, Box<dyn std::error::Error>> {
    let mut namespaces = serde_json::Map::new();
    for (namespace, routes) in registry.routes() {
        let mut entries = Vec::new();
        for route in routes.values() {
            let matcher = PathMatcher::compile(&route.pattern, &route.rules, "")?;
            let rules: serde_json::Map<String, Value> = route
                .rules
                .iter()
                .map(|(name, rule)| (name.clone(), Value::String(rule.expand())))
                .collect();
            entries.push(json!({
                "name": route.name,
                "pattern": route.pattern,
                "regex": matcher.as_str(),
                "rules": rules,
                "extra": route.extra,
            }));
        }
        namespaces.insert(namespace.clone(), Value::Array(entries));
    }
    Ok(Value::Object(namespaces))
}

fn find(registry: &AppRegistry, path: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    for (namespace, routes) in registry.routes() {
        for route in routes.values() {
            let matcher = PathMatcher::compile(&route.pattern, &route.rules, "")?;
            if let Some(captures) = matcher.captures(path) {
                let captures: serde_json::Map<String, Value> =
                    captures.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
                return Ok(Some(json!({
                    "namespace": namespace,
                    "route": route.name,
                    "captures": captures,
                })));
            }
        }
    }
    Ok(None)
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
