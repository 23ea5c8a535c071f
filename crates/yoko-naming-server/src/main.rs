// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Yoko Naming Server
//!
//! Standalone transient CosNaming service. Clients reach the root context
//! through `corbaloc::<host>:<port>/NameService` or the printed IOR.
//!
//! # Usage
//!
//! ```bash
//! # Start on the registered naming port (2809)
//! yoko-naming-server
//!
//! # Custom port, IOR written to a file
//! yoko-naming-server --port 12809 --ior-file ns.ior
//!
//! # Bind all interfaces, publish a routable name
//! yoko-naming-server --host 0.0.0.0 --publish-host names.example.org
//! ```

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::FmtSubscriber;

mod config;
mod server;

pub use config::ServerConfig;
pub use server::NamingServer;

/// Yoko Naming Server - transient CosNaming service over IIOP
#[derive(Parser, Debug)]
#[command(name = "yoko-naming-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IIOP port to listen on
    #[arg(short, long, default_value = "2809")]
    port: u16,

    /// Bind address (0.0.0.0 for all interfaces)
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Host published in object references
    #[arg(long)]
    publish_host: Option<String>,

    /// Configuration file (JSON format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the root context IOR to this file
    #[arg(long)]
    ior_file: Option<PathBuf>,

    /// Print the root context IOR on stdout
    #[arg(long, default_value = "false")]
    print_ior: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // try_init also routes the library's `log` records into the subscriber
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .finish()
        .try_init()?;

    // Load or create config
    let config = if let Some(config_path) = &args.config {
        info!("Loading config from {:?}", config_path);
        ServerConfig::from_file(config_path)?
    } else {
        ServerConfig {
            host: args.host.clone(),
            port: args.port,
            publish_host: args.publish_host.clone(),
            ior_file: args.ior_file.clone(),
            ..Default::default()
        }
    };
    let server = NamingServer::new(config)?;
    let config = server.config();
    let bound = server
        .bound_endpoint()
        .map_or_else(|| "-".to_string(), |e| e.to_string());

    info!("+----------------------------------------------------+");
    info!(
        "|       Yoko Naming Server v{}                   |",
        env!("CARGO_PKG_VERSION")
    );
    info!("+----------------------------------------------------+");
    info!("|  Bind:    {:40} |", bound);
    info!("|  Publish: {:40} |", config.published_host());
    info!("|  GIOP:    {:40} |", format!("1.{}", config.giop_minor));
    info!("+----------------------------------------------------+");
    info!("Root context: {}", server.corbaloc().unwrap_or_default());

    if args.print_ior {
        println!("{}", server.root_ior()?);
    }
    server.write_ior_file()?;

    // Handle shutdown signals
    let handle = server.shutdown_handle();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received, stopping server...");
        handle.shutdown();
    })?;

    // Run server
    let result = server.run();
    server.destroy();
    result?;
    Ok(())
}
