//! spa-navigator CLI
//!
//! Drives a headless navigator against a live server, which is handy for
//! checking that a site's markup survives in-app navigation.
//!
//! ```text
//! spa-navigator [--config FILE] render <start> [next...]
//! spa-navigator [--config FILE] match <url>
//! spa-navigator [--config FILE] check
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use url::Url;

use spa_navigator::config::{load_config, validate_config, ConfigError, NavigatorConfig};
use spa_navigator::dom::{MemoryDom, Selector};
use spa_navigator::host::{HeadlessWindow, Host, MemoryHistory, RecordingScripts};
use spa_navigator::observability::logging::init_logging;
use spa_navigator::routing::RouteTable;
use spa_navigator::transport::{HttpTransport, Transport, TransportRequest};
use spa_navigator::{NavigateOptions, Navigator};

#[derive(Parser)]
#[command(name = "spa-navigator")]
#[command(about = "Headless client-side navigation against a live site", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a page, then navigate in-app through further URLs
    Render {
        start: String,
        next: Vec<String>,
    },
    /// Show which configured route matches a URL
    Match { url: String },
    /// Validate the configuration and print it
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => NavigatorConfig::default(),
    };
    init_logging(&config.observability.log_filter);

    match cli.command {
        Commands::Render { start, next } => render(config, &start, &next).await?,
        Commands::Match { url } => {
            let table = RouteTable::from_config(&config.routes)?;
            match table.match_str(&url) {
                Some(m) => {
                    println!("pattern: {}", m.route.pattern.source());
                    println!("kind:    {:?}", m.route.kind);
                    let mut params: Vec<_> = m.params.iter().collect();
                    params.sort();
                    for (name, value) in params {
                        println!("param:   {} = {}", name, value);
                    }
                }
                None => println!("no route matches {}", url),
            }
        }
        Commands::Check => {
            validate_config(&config).map_err(ConfigError::Validation)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn render(
    config: NavigatorConfig,
    start: &str,
    next: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let location = Url::parse(start)?;
    let transport = Arc::new(HttpTransport::new(Duration::from_secs(
        config.request_timeout_secs,
    ))?);

    // The first load is a conventional one, so no in-app header.
    let response = transport.fetch(TransportRequest::get(location.as_str())).await?;
    if !response.is_success() {
        return Err(format!("{} responded with status {}", location, response.status).into());
    }

    let window = Arc::new(HeadlessWindow::new());
    let scripts = Arc::new(RecordingScripts::new());
    let host = Host {
        surface: Arc::new(Mutex::new(MemoryDom::from_html(&response.body))),
        transport,
        history: Arc::new(MemoryHistory::new()),
        window: window.clone(),
        scripts: scripts.clone(),
    };
    let container = Selector::parse(&config.container)?;
    let navigator = Navigator::new(config, host, location)?;

    print_page(&navigator, &container, "loaded");
    for target in next {
        let outcome = navigator.navigate(target, NavigateOptions::default()).await;
        print_page(&navigator, &container, outcome.label());
        if let Some(url) = window.hard_navigations().last() {
            println!("(host would now load {} conventionally)", url);
            break;
        }
    }
    println!("scripts activated: {}", scripts.runs().len());
    Ok(())
}

fn print_page(navigator: &Navigator, container: &Selector, outcome: &str) {
    let surface = navigator.surface().lock();
    let html = surface
        .query(container)
        .map(|node| surface.inner_html(node))
        .unwrap_or_default();
    println!("== {} [{}] {}", navigator.location(), outcome, navigator.title());
    println!("{}", html);
}
