//! frameroute server.
//!
//! Loads a settings file, registers its declarative routes together with the
//! built-in status endpoint, freezes the registry and serves it until Ctrl+C.
//!
//! ```text
//! settings.toml → Configurator::from_config → scan (status endpoint)
//!               → freeze → AppService::run (binds [http] bind_address)
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use frameroute::config::{load_config, FrameConfig};
use frameroute::observability::init_logging_or_report;
use frameroute::{AppRegistry, AppService, ConfigResult, Configurator, EndpointSpec, Scan, ViewResult, ViewTarget};

/// Namespace holding the server's own endpoints.
const STATUS_NAMESPACE: &str = "frameroute";

#[derive(Parser)]
#[command(name = "frameroute")]
#[command(about = "Serve the routes declared in a frameroute settings file", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "frameroute.toml")]
    config: PathBuf,
}

frameroute::http_endpoint!(
    status,
    ViewTarget::function("status", |_, _| {
        Ok(ViewResult::Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })))
    }),
    EndpointSpec::new("status").request_method(["GET"]).renderer("json")
);

fn build_registry(config: &FrameConfig) -> ConfigResult<std::sync::Arc<AppRegistry>> {
    let mut configurator = Configurator::from_config(config)?;
    let scope = configurator.root_scope().with_namespace(STATUS_NAMESPACE);
    configurator.add_route(&scope, "status", "/_status")?;
    configurator.scan(&scope, Scan::new(module_path!()).namespace(STATUS_NAMESPACE))?;
    configurator.freeze()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        FrameConfig::default()
    };
    init_logging_or_report(&config.observability);

    tracing::info!(
        config = %args.config.display(),
        bind_address = %config.http.bind_address,
        routes = config.routes.len(),
        "frameroute v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let registry = build_registry(&config)?;
    AppService::new(&registry, &config)?.run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
