// src/main.rs — winear entry point

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use winear::api::{self, ApiState};
use winear::cli::{Cli, Commands};
use winear::infra::config::{Config, GenerationConfig, SessionBackend};
use winear::infra::{logger, paths};
use winear::interview::finalizer::SummaryFinalizer;
use winear::interview::generator::QuestionGenerator;
use winear::interview::machine::{InterviewMachine, InterviewPolicy};
use winear::interview::memory::{MemoryProfileRepository, MemorySessionStore};
use winear::interview::{ProfileRepository, RecommendationClient, SessionStore};
use winear::provider::openai::OpenAIProvider;
use winear::provider::ModelProvider;
use winear::recommend::HttpRecommendationClient;
use winear::storage::Database;

const PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init_logging(&cli.log_level);

    // Falls back to defaults if no config.toml
    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        Commands::Migrate { status, rollback } => {
            winear::cli::migrate::run_migrate(
                &config.sessions.resolved_db_path(),
                status,
                rollback,
            )
        }
        Commands::Chat { user } => {
            let services = build_services(&config).await?;
            winear::cli::chat::run_chat(&services.machine, &user).await
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let services = build_services(&config).await?;
            spawn_purge_task(services.store.clone());
            let state = ApiState {
                machine: services.machine,
                profiles: services.profiles,
                recommender: services.recommender,
                token: config.server.token.clone(),
            };
            api::start_server(&config.server, state).await
        }
    }
}

/// Everything a front end (HTTP or terminal) needs to drive interviews.
struct Services {
    machine: Arc<InterviewMachine>,
    profiles: Arc<dyn ProfileRepository>,
    recommender: Option<Arc<dyn RecommendationClient>>,
    store: Arc<dyn SessionStore>,
}

async fn build_services(config: &Config) -> anyhow::Result<Services> {
    let provider = build_provider(&config.generation)?;
    let generator = QuestionGenerator::new(provider, config.generation.model.clone())
        .with_timeout(config.generation.timeout())
        .with_temperature(Some(config.generation.temperature));

    let (store, profiles): (Arc<dyn SessionStore>, Arc<dyn ProfileRepository>) =
        match config.sessions.backend {
            SessionBackend::Memory => {
                tracing::info!("Using in-memory session store");
                let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
                let profiles: Arc<dyn ProfileRepository> = Arc::new(MemoryProfileRepository::new());
                (store, profiles)
            }
            SessionBackend::Sqlite => {
                paths::ensure_dirs().await?;
                let db_path = config.sessions.resolved_db_path();
                let (handle, _join) = Database::open(&db_path)?.spawn();
                tracing::info!(path = %db_path.display(), "Using SQLite session store");
                let store: Arc<dyn SessionStore> = Arc::new(handle.clone());
                let profiles: Arc<dyn ProfileRepository> = Arc::new(handle);
                (store, profiles)
            }
        };

    let recommender: Option<Arc<dyn RecommendationClient>> = if config.recommendation.enabled {
        let client = HttpRecommendationClient::from_config(&config.recommendation);
        tracing::info!(endpoint = client.endpoint(), "Recommendation backend enabled");
        Some(Arc::new(client))
    } else {
        None
    };

    let finalizer = SummaryFinalizer::new(profiles.clone(), recommender.clone());
    let machine = InterviewMachine::new(
        store.clone(),
        generator,
        finalizer,
        InterviewPolicy::from_config(config),
    );

    Ok(Services {
        machine: Arc::new(machine),
        profiles,
        recommender,
        store,
    })
}

fn build_provider(config: &GenerationConfig) -> anyhow::Result<Arc<dyn ModelProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key found. Set {} to your OpenAI-compatible API key.",
            config.api_key_env
        )
    })?;
    Ok(Arc::new(OpenAIProvider::with_base_url(
        api_key,
        config.base_url.clone(),
    )))
}

fn spawn_purge_task(store: Arc<dyn SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::debug!(removed = n, "Purged expired sessions"),
                Err(e) => tracing::warn!("Expired session purge failed: {}", e),
            }
        }
    });
}
