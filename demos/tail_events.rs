//! Tail debug overlay events from a running application.
//!
//! Demonstrates:
//! - Building options from an origin and base path
//! - Queuing subscriptions before the socket opens
//! - Watching lifecycle events while the manager reconnects
//!
//! Usage:
//!   cargo run --example tail_events -- http://localhost:8000 /_debug logs queries
//!   cargo run --example tail_events -- --debug http://localhost:8000

// ============================================================================
// Imports
// ============================================================================

use anyhow::Result;
use overlay_link::{ConnectionEvent, ConnectionManager, ConnectionOptions, ParsedEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_ORIGIN: &str = "http://localhost:8000";
const DEFAULT_BASE_PATH: &str = "/_debug";
const DEFAULT_PANELS: &[&str] = &["logs", "queries", "timings"];

// ============================================================================
// Args
// ============================================================================

#[derive(Debug)]
struct Args {
    debug: bool,
    origin: String,
    base_path: String,
    panels: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        let mut debug = false;
        let mut positional = Vec::new();
        for arg in std::env::args().skip(1) {
            if arg == "--debug" {
                debug = true;
            } else {
                positional.push(arg);
            }
        }

        let mut positional = positional.into_iter();
        let origin = positional
            .next()
            .or_else(|| std::env::var("OVERLAY_ORIGIN").ok())
            .unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
        let base_path = positional
            .next()
            .or_else(|| std::env::var("OVERLAY_BASE_PATH").ok())
            .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());
        let mut panels: Vec<String> = positional.collect();
        if panels.is_empty() {
            panels = DEFAULT_PANELS.iter().map(|p| (*p).to_string()).collect();
        }

        Self {
            debug,
            origin,
            base_path,
            panels,
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "overlay_link=debug"
    } else {
        "overlay_link=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== tail_events ===\n");

    let options = ConnectionOptions::new(&args.origin)
        .with_base_path(&args.base_path)
        .on_event(|event| print_event(&event.parse()))
        .on_error(|message| eprintln!("[error] {message}"));

    let manager = match ConnectionManager::with_websocket(options) {
        Ok(manager) => manager,
        Err(e) if e.is_config_error() => {
            anyhow::bail!("{e}\n        Usage: tail_events [--debug] <origin> [base_path] [panels...]")
        }
        Err(e) => return Err(e.into()),
    };
    println!("[Setup] Endpoint: {}", manager.url());

    let mut lifecycle = manager.events();

    manager.subscribe(args.panels.clone());
    manager.connect();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = lifecycle.recv() => match event {
                Ok(ConnectionEvent::Opened { .. }) => {
                    println!("[open] subscribed to {}", args.panels.join(", "));
                }
                Ok(ConnectionEvent::Reconnecting { attempt, delay }) => {
                    println!("[wait] attempt {attempt} in {}ms", delay.as_millis());
                }
                Ok(ConnectionEvent::GaveUp { attempts }) => {
                    println!("[stop] gave up after {attempts} attempts");
                    break;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    manager.close();
    println!("\n=== Done ===");
    Ok(())
}

fn print_event(event: &ParsedEvent) {
    match event {
        ParsedEvent::Snapshot { panels } => {
            println!("[snapshot] {} panels", panels.len());
        }
        ParsedEvent::PanelUpdate { panel, data } => {
            println!("[{panel}] {data}");
        }
        ParsedEvent::Cleared { panels } => {
            println!("[cleared] {}", panels.join(", "));
        }
        ParsedEvent::Subscribed { panels } | ParsedEvent::Unsubscribed { panels } => {
            println!("[ack] {}", panels.join(", "));
        }
        ParsedEvent::Unknown { kind, .. } => {
            println!("[?] {}", kind.as_deref().unwrap_or("untyped"));
        }
    }
}
