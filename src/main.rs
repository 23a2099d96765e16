//! Socratic Tutor server binary.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use socratic_tutor::adapters::ai::{MockAIProvider, OpenAIConfig, OpenAIProvider};
use socratic_tutor::adapters::memory::InMemoryStore;
use socratic_tutor::adapters::postgres::PostgresTutorStore;
use socratic_tutor::adapters::websocket::{tutor_router, TutorState};
use socratic_tutor::application::{ExchangeCoordinator, SessionManager};
use socratic_tutor::config::{AiConfig, AiProviderKind, AppConfig, DatabaseConfig, ServerConfig};
use socratic_tutor::domain::fallback::{FallbackGenerator, FallbackTemplates};
use socratic_tutor::ports::{
    AIProvider, ConversationRepository, KnowledgeRepository, ProfileReader,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct Stores {
    profiles: Arc<dyn ProfileReader>,
    conversations: Arc<dyn ConversationRepository>,
    knowledge: Arc<dyn KnowledgeRepository>,
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_current_span(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
}

async fn build_stores(database: Option<&DatabaseConfig>) -> Result<Stores, BoxError> {
    let Some(database) = database else {
        tracing::warn!("No database configured, using the in-memory store");
        let store = Arc::new(InMemoryStore::new());
        return Ok(Stores {
            profiles: store.clone(),
            conversations: store.clone(),
            knowledge: store,
        });
    };

    let pool = database
        .pool_options()
        .connect(database.url.expose_secret())
        .await?;
    tracing::info!(url = %database.redacted_url(), "Connected to PostgreSQL");
    let store = Arc::new(PostgresTutorStore::new(pool));

    if database.run_migrations {
        store.migrate().await?;
        tracing::info!("Database migrations applied");
    }

    Ok(Stores {
        profiles: store.clone(),
        conversations: store.clone(),
        knowledge: store,
    })
}

fn build_provider(ai: &AiConfig) -> Result<Arc<dyn AIProvider>, BoxError> {
    match ai.provider {
        AiProviderKind::OpenAI => {
            let key = ai
                .openai_api_key
                .clone()
                .ok_or("OPENAI_API_KEY is required for the openai provider")?;
            let config = OpenAIConfig::new(key.expose_secret().clone())
                .with_model(&ai.model)
                .with_base_url(&ai.base_url)
                .with_timeout(ai.timeout())
                .with_max_retries(ai.max_retries)
                .with_retry_backoff(ai.retry_backoff());
            Ok(Arc::new(OpenAIProvider::new(config)?))
        }
        AiProviderKind::Mock => {
            tracing::warn!("Using the mock AI provider");
            Ok(Arc::new(MockAIProvider::new()))
        }
    }
}

fn cors_layer(server: &ServerConfig) -> Result<CorsLayer, BoxError> {
    let origins = server.allowed_origins()?;
    if origins.is_empty() {
        Ok(CorsLayer::new().allow_origin(Any))
    } else {
        Ok(CorsLayer::new().allow_origin(origins))
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let stores = build_stores(config.database.as_ref()).await?;
    let provider = build_provider(&config.ai)?;

    let fallback = match &config.tutor.fallback_templates_path {
        Some(path) => FallbackTemplates::load_from_path(path)?,
        None => FallbackTemplates::default(),
    };

    let coordinator = Arc::new(
        ExchangeCoordinator::new(
            stores.profiles.clone(),
            stores.conversations.clone(),
            stores.knowledge.clone(),
            provider.clone(),
            config.tutor.context_config(),
            config.tutor.exchange_config(&config.ai),
        )
        .with_fallback(FallbackGenerator::new(fallback)),
    );
    let sessions = Arc::new(SessionManager::new(
        coordinator,
        stores.profiles,
        stores.conversations,
    ));

    // The last layer added runs first, so the request id exists before tracing starts.
    let state = TutorState::new(sessions)
        .with_max_message_bytes(config.server.ws_max_message_bytes);
    let app = tutor_router(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server)?)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let info = provider.provider_info();
    tracing::info!(
        %addr,
        provider = %info.name,
        model = %info.model,
        environment = %config.server.environment,
        "Socratic tutor listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
