use std::env;
use std::sync::Arc;

use counsel_booking::cli;
use counsel_booking::clients::backend_client::HttpTransport;
use counsel_booking::config::{AppConfig, Settings};
use counsel_booking::service::api_service::ApiService;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config_path = env::var("CONFIG_FILE").ok();
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let settings = match Settings::from_config(&config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let transport = match HttpTransport::new(&settings.base_url, settings.token.clone(), settings.timeout) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let api = ApiService::new(Arc::new(transport)).with_timezone(settings.timezone);
    if let Err(e) = cli::cli(api, settings).await {
        eprintln!("Error: {}", e.message());
        std::process::exit(1);
    }
}
