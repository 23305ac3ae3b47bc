use anyhow::Result;
use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use heron_server::{configuration, logging, routes, state};

#[derive(Parser)]
#[command(author, version, about = "Unified chat gateway for local and hosted models")]
struct Cli {
    /// Bind address, overrides HERON_SERVER__HOST
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides HERON_SERVER__PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::setup_logging();

    let cli = Cli::parse();
    let mut settings = configuration::Settings::new()?;
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }

    tracing::info!("Starting herond...");
    let gateway_settings = heron::Settings::from_env();
    let state = state::AppState::new(gateway_settings)?;

    let cors = match &settings.frontend_url {
        Some(origin) => {
            let origin = origin.parse::<HeaderValue>()?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.socket_addr()).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
