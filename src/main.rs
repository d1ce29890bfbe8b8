//! `route-probe`: resolve paths against a route configuration.
//!
//! ```text
//! route-probe --config routes.toml /top/2 /gist#test/edit
//! route-probe --config routes.toml --list
//! ```
//!
//! Each path is navigated in order on one router, so guards, redirects and
//! the active state behave as they would in a running app. One JSON object
//! is printed per path.

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use client_router::config::loader::load_config;
use client_router::navigation::{NavigateOptions, Navigation};
use client_router::observability::logging::init_logging;
use client_router::Router;

#[derive(Parser)]
#[command(name = "route-probe")]
#[command(about = "Resolve paths against a router configuration", long_about = None)]
struct Cli {
    /// Router configuration (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Document URL the router starts at
    #[arg(short, long, default_value = "/")]
    initial: String,

    /// Print the flattened route table instead of resolving paths
    #[arg(short, long)]
    list: bool,

    /// Paths to navigate to, in order
    paths: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(&config.observability);

    let router = Router::from_config(&config, &cli.initial)?;

    if cli.list {
        println!("{}", serde_json::to_string_pretty(&router.table().flatten())?);
        return Ok(());
    }

    for path in &cli.paths {
        let output = match router.navigate_to(path, NavigateOptions::default()).await {
            Navigation::Settled(settled) => {
                let labels: Vec<&str> = settled
                    .active()
                    .map(|active| {
                        active
                            .chain
                            .iter()
                            .filter_map(|id| router.table().node(*id))
                            .map(|node| node.label())
                            .collect()
                    })
                    .unwrap_or_default();

                json!({
                    "path": path,
                    "href": router.resolve_href(path, None),
                    "settled": &*settled,
                    "labels": labels,
                    "error": settled.error().map(|e| e.to_string()),
                })
            }
            Navigation::Superseded => json!({ "path": path, "superseded": true }),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}
