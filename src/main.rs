//! Tontine gateway binary.
//!
//! Loads config, initializes logging, wires the in-memory stores and
//! services, and serves the HTTP API.

use tontine::config::AppConfig;
use tontine::gateway::{self, state::AppState};

fn get_env() -> String {
    std::env::var("RUN_ENV").unwrap_or_else(|_| "dev".to_string())
}

fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env);
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = tontine::logging::init_logging(&app_config);

    tracing::info!("starting tontine gateway in {} mode", env);

    let state = AppState::build(&app_config);
    gateway::serve(state, &app_config.gateway).await
}
