use std::io::Error;
use std::sync::Arc;

use poem::{Route, Server, listener::TcpListener};
use poem_openapi::OpenApiService;
use sqlx::postgres::PgPoolOptions;
use tokio::main;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sms_gateway::{
    application::{
        handlers::message_listener::{MessageListener, MessageListenerConfig},
        services::{
            expiration::ExpirationScheduler,
            heartbeats::HeartbeatService,
            jwt::{JwtService, JwtServiceConfig},
            messages::MessageService,
        },
    },
    config::Config,
    domain::repositories::{HeartbeatRepository, MessageRepository},
    infrastructure::{
        messaging::jetstream::JetstreamDispatcher,
        repositories::{
            in_memory::{InMemoryHeartbeatRepository, InMemoryMessageRepository},
            postgres::{PostgresHeartbeatRepository, PostgresMessageRepository},
        },
    },
    presentation::http::endpoints::{
        heartbeats::HeartbeatsEndpoints,
        messages::MessagesEndpoints,
        root::{ApiState, Endpoints},
    },
};

#[main]
async fn main() -> Result<(), Error> {
    let config = Config::try_parse().map_err(Error::other)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let server_url = format!("{}://{}:{}", config.scheme, config.host, config.port);

    let message_repo: Arc<dyn MessageRepository>;
    let heartbeat_repo: Arc<dyn HeartbeatRepository>;
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .map_err(Error::other)?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(Error::other)?;
            message_repo = PostgresMessageRepository::new(pool.clone());
            heartbeat_repo = PostgresHeartbeatRepository::new(pool);
        }
        None => {
            warn!("DATABASE_URL is not set, messages are kept in memory");
            message_repo = Arc::new(InMemoryMessageRepository::new());
            heartbeat_repo = Arc::new(InMemoryHeartbeatRepository::new());
        }
    }

    let (dispatcher, worker) = JetstreamDispatcher::new(&config.jetstream)
        .await
        .map_err(Error::other)?;

    let message_service = Arc::new(MessageService::new(
        message_repo.clone(),
        dispatcher.clone(),
    ));
    let expiration_scheduler = Arc::new(ExpirationScheduler::new(
        message_repo,
        dispatcher.clone(),
    ));
    let heartbeat_service = Arc::new(HeartbeatService::new(heartbeat_repo, dispatcher));

    let listener = Arc::new(MessageListener::new(
        message_service.clone(),
        expiration_scheduler,
        MessageListenerConfig {
            source: config.event_source.clone(),
            expiration: config.message_expiration,
        },
    ));
    let _worker = worker.spawn(listener);

    let state = Arc::new(ApiState {
        message_service,
        heartbeat_service,
        jwt: JwtService::new(JwtServiceConfig {
            secret: config.jwt_secret.clone(),
            expiration: config.jwt_expiration,
        }),
        source: config.event_source.clone(),
    });

    info!(%server_url, "starting server");

    let api_service = OpenApiService::new(
        (
            Endpoints,
            MessagesEndpoints::new(state.clone()),
            HeartbeatsEndpoints::new(state),
        ),
        "SMS Gateway API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("{}/api", server_url));
    let ui = api_service.swagger_ui();
    let app = Route::new().nest("/api", api_service).nest("/", ui);

    Server::new(TcpListener::bind(format!("0.0.0.0:{}", config.port)))
        .run(app)
        .await
}
