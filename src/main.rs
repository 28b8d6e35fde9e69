mod app;
mod assets;
mod http_client;
mod model;
mod xero;

use clap::Parser;
use model::arg::Args;
use model::config::Config;
use tower_sessions::MemoryStore;
use xero::XeroClient;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // A missing env file is fine, the variables may come from the environment
    match dotenvy::from_filename(&args.env_file) {
        Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => tracing::debug!("No env file at {}", args.env_file),
        Err(e) => {
            tracing::error!("Failed to read {}: {}", args.env_file, e);
            std::process::exit(1);
        }
    }

    // Load configuration
    let mut config = Config::from_env().unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {}", e);
        std::process::exit(1);
    });
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    tracing::debug!("Config: {:?}", config);

    if let Some(proxy_url) = &config.proxy_url {
        tracing::info!("HTTP proxy configured: {}", proxy_url);
    }

    let http = http_client::build_from_config(&config).unwrap_or_else(|e| {
        tracing::error!("Failed to build HTTP client: {}", e);
        std::process::exit(1);
    });
    let xero = XeroClient::new(&config, http).unwrap_or_else(|e| {
        tracing::error!("Failed to create Xero client: {}", e);
        std::process::exit(1);
    });
    tracing::info!("Requesting scopes: {}", xero.scope());

    let settings = app::SessionSettings::from_config(&config).unwrap_or_else(|e| {
        tracing::error!("Failed to configure sessions: {}", e);
        std::process::exit(1);
    });
    let app = app::create_router(
        app::AppState::new(xero),
        MemoryStore::default(),
        settings,
    );

    // Start server
    let addr = config.listen_addr();
    tracing::info!("Starting server: http://{}", addr);
    tracing::info!("OAuth redirect URI: {}", config.redirect_uri);
    tracing::info!("Available pages:");
    tracing::info!("  GET  /");
    tracing::info!("  GET  /connect");
    tracing::info!("  GET  /callback");
    tracing::info!("  GET  /accounts");
    tracing::info!("  GET  /organisation");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
