use chat_relay::config::config_search_paths;
use chat_relay::{build_router, AppState, RelayConfig, SharedLogger, UpstreamClient};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chat-relay",
    about = "Relay chat and structured-output requests to an OpenAI-compatible LLM gateway",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream gateway base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Model identifier sent upstream (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// Exchange log file path
    #[arg(long, default_value = "chat-relay.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = RelayConfig::find_and_load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(base_url) = cli.base_url {
        config.upstream.base_url = Some(base_url);
    }
    if let Some(model) = cli.model {
        config.upstream.model = model;
    }

    let logger = SharedLogger::open(&cli.log_file)?;

    // A missing key does not stop startup; every upstream call reports it.
    let api_key = config.resolve_api_key().unwrap_or_else(|e| {
        warn!("{}", e);
        logger.warn("startup", e.to_string());
        String::new()
    });
    let settings = config.upstream_settings(api_key)?;
    let upstream = UpstreamClient::new(settings)?;

    info!("chat-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("  Base URL:  {}", upstream.base_url());
    info!("  Model:     {}", upstream.model());
    info!("  API key:   ${}", config.upstream.api_key_env);
    info!("  Timeout:   {}s", config.upstream.timeout_secs);
    info!("  Port:      {}", config.port);
    info!("  Log file:  {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting chat-relay base_url={} model={} port={}",
            upstream.base_url(),
            upstream.model(),
            config.port
        ),
    );

    let state = Arc::new(AppState { upstream, logger });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
