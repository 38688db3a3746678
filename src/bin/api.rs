//! PUML web API server binary.
//!
//! Loads configuration, wires both datasources and refuses to serve unless
//! both databases answer.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use miette::Diagnostic;
use puml::api::{self, ApiError, Config};
use puml::app::Application;
use puml::config::AppConfig;
use puml::db::DbError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
enum BinaryError {
    #[error("Database error: {0}")]
    #[diagnostic(code(puml::binary::database))]
    Database(#[from] DbError),

    #[error("API server error: {0}")]
    #[diagnostic(code(puml::binary::api))]
    Api(#[from] ApiError),
}

#[derive(Parser)]
#[command(name = "puml-web")]
#[command(author, version, about = "Dual datasource sample API server", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "PUML_CONFIG")]
    config: Option<PathBuf>,

    /// Host address to bind to (overrides config and APP_SERVER_HOST)
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on (overrides config and APP_SERVER_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    api::init_tracing();
    serve(cli).await?;
    Ok(())
}

async fn serve(cli: Cli) -> Result<(), BinaryError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config = config.with_host(host);
    }
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }

    let app = Application::start(&config).await?;

    api::run(Config::from(&config.server), app.state, app.registry).await?;
    Ok(())
}
