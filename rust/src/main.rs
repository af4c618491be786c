use anyhow::{Context, Result};
use ideaforge::config_store::{ConfigStore, StoreBackend};
use ideaforge::credentials::CredentialPool;
use ideaforge::generator::IdeaGenerator;
use ideaforge::idea_store::{IdeaStore, JsonIdeaStore};
use ideaforge::path_utils::{get_base_dir, resolve_config_path};
use ideaforge::provider::GeminiProvider;
use ideaforge::server::{AppServer, AppState};
use ideaforge::supabase_store::SupabaseIdeaStore;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ideaforge=info")),
        )
        .init();

    let args = parse_args();
    let base_dir = get_base_dir();
    let config_path = resolve_config_path(args.config, &base_dir);

    let config = ConfigStore::new(config_path.clone())
        .with_context(|| format!("config error: {}", config_path.display()))?;
    info!("loaded config from {}", config_path.display());

    let timeout_secs = config.request_timeout_secs();
    let store: Arc<dyn IdeaStore> = match config.store_backend() {
        StoreBackend::Json => {
            let data_dir = config.data_dir();
            let store = JsonIdeaStore::new(data_dir.clone())
                .with_context(|| format!("failed to open idea store in {}", data_dir.display()))?;
            info!("storing ideas in {}", store.ideas_json_path().display());
            Arc::new(store)
        }
        StoreBackend::Supabase => {
            let store = SupabaseIdeaStore::from_env(timeout_secs)
                .context("failed to configure Supabase store")?;
            Arc::new(store)
        }
    };

    let credentials = CredentialPool::from_env();
    if credentials.is_empty() {
        warn!("no GEMINI_API_KEY or GEMINI_API_KEY_<n> set; generation requests will fail");
    } else {
        info!("loaded {} provider credential(s)", credentials.len());
    }

    let provider = Arc::new(GeminiProvider::new(
        config.endpoint(),
        config.model(),
        timeout_secs,
    ));
    let generator = Arc::new(IdeaGenerator::new(
        provider,
        store,
        credentials,
        config.thinking_budget(),
    ));
    let state = Arc::new(AppState::new(
        Arc::new(config.catalog()),
        generator,
        config.timer_enabled(),
    ));

    let mut server =
        AppServer::start(state, config.port()).context("failed to start idea server")?;
    info!("IdeaForge listening on http://127.0.0.1:{}/", server.port());

    wait_for_shutdown()?;
    info!("shutting down");
    server.stop();
    Ok(())
}

fn parse_args() -> Args {
    let mut config = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(value) = args.next() {
                config = Some(value);
            }
        }
    }

    Args { config }
}

fn wait_for_shutdown() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;
    runtime
        .block_on(tokio::signal::ctrl_c())
        .context("failed to listen for ctrl-c")
}
