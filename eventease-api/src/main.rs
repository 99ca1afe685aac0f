use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use eventease_api::{app, state::{AppState, AuthConfig}};
use eventease_core::notify::{ChangeNotifier, LogChangeNotifier};
use eventease_core::{Clock, InquiryRepository, LiveViewHub, SystemClock};
use eventease_lifecycle::LifecycleRules;
use eventease_store::app_config::{Config, LifecycleConfig};
use eventease_store::{DbClient, EventProducer, InMemoryInquiryRepository, KafkaChangeNotifier, PgInquiryRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn lifecycle_rules(config: &LifecycleConfig) -> LifecycleRules {
    LifecycleRules {
        supported_currencies: config
            .supported_currencies
            .iter()
            .map(|code| code.trim().to_ascii_uppercase())
            .collect(),
        response_window: match config.response_window_hours {
            0 => None,
            hours => Some(chrono::Duration::hours(hours as i64)),
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "eventease_api=debug,eventease_lifecycle=debug,eventease_store=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting EventEase API on port {}", config.server.port);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hub = LiveViewHub::new(config.lifecycle.live_buffer);

    let repo: Arc<dyn InquiryRepository> = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.migrate().await.context("Failed to run migrations")?;
            let repo = PgInquiryRepository::new(db.pool.clone(), hub);
            repo.spawn_listener()
                .await
                .context("Failed to listen for inquiry changes")?;
            Arc::new(repo)
        }
        None => {
            tracing::warn!("No database configured; inquiries are kept in memory only");
            Arc::new(InMemoryInquiryRepository::with_hub(clock.clone(), hub))
        }
    };

    let notifier: Arc<dyn ChangeNotifier> = match &config.kafka.brokers {
        Some(brokers) => {
            let producer = EventProducer::new(brokers).context("Failed to create Kafka producer")?;
            Arc::new(KafkaChangeNotifier::new(producer, config.kafka.topic.clone()))
        }
        None => Arc::new(LogChangeNotifier),
    };

    let app_state = AppState::new(
        repo,
        notifier,
        clock,
        lifecycle_rules(&config.lifecycle),
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
