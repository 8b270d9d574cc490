use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use medistream_core::classify::{Classifier, RemoteClassifier};
use medistream_core::risk::EscalationPolicy;
use medistream_core::store::{PgStore, Store};
use medistream_core::summary::{DisabledSummaryGenerator, GeminiSummaryGenerator, SummaryGenerator};

mod cors;
mod error;
mod routes;
mod state;

/// Placeholder clinician identity until auth lands.
const DEFAULT_SENDER_ID: &str = "235b4451-e7f9-4dc6-9ffd-3bf8ce30ca9b";

const CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(5);
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MediStream Backend",
        version = "0.1.0",
        description = "Hospital shift coordination: chat-driven task/alert mutations, deterministic risk scoring, shift rotation."
    ),
    paths(
        routes::health::health_check,
        routes::chat::chat,
        routes::shift::shift_tasks,
        routes::shift::shift_status,
        routes::shift::shift_end,
        routes::task::change_task_status,
        routes::task::create_task,
    ),
    components(schemas(
        routes::health::HealthResponse,
        error::ErrorResponse,
        routes::chat::ChatRequest,
        routes::chat::ChatData,
        routes::shift::TaskView,
        routes::shift::ShiftStatusData,
        routes::task::TaskStatusRequest,
        routes::task::TaskCreateRequest,
        routes::task::TaskCreateData,
        routes::ApiResponse<routes::chat::ChatData>,
        routes::ApiResponse<Vec<routes::shift::TaskView>>,
        routes::ApiResponse<routes::shift::ShiftStatusData>,
        routes::ApiResponse<routes::task::TaskCreateData>,
        routes::ApiResponse<medistream_core::lifecycle::Rotation>,
        routes::ApiResponse<medistream_core::transition::TaskTransition>,
        medistream_core::classify::Intent,
        medistream_core::model::TaskStatus,
        medistream_core::model::TaskPriority,
        medistream_core::risk::RiskOutcome,
        medistream_core::lifecycle::Rotation,
        medistream_core::transition::TaskTransition,
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medistream_api=debug,medistream_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Database connection
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    // Connection check — report, keep serving either way.
    match store.ping().await {
        Ok(()) => tracing::info!("database link ok"),
        Err(err) => tracing::error!(error = %err, "database inaccessible at startup"),
    }

    let classifier_url = std::env::var("CLASSIFIER_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8090".to_string());
    let classifier: Arc<dyn Classifier> = Arc::new(
        RemoteClassifier::new(classifier_url, CLASSIFIER_TIMEOUT)
            .expect("Failed to build classifier client"),
    );

    // Pre-warm the classification pipeline once on startup.
    match classifier.classify("Test warmup CREATE_TASK").await {
        Ok(_) => tracing::info!("classifier link ok"),
        Err(err) => tracing::warn!(error = %err, "classifier warmup failed"),
    }

    let summarizer: Arc<dyn SummaryGenerator> = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => Arc::new(
            GeminiSummaryGenerator::new(key, SUMMARY_TIMEOUT)
                .expect("Failed to build summary client"),
        ),
        _ => {
            tracing::warn!("GEMINI_API_KEY not set, shift summaries will use fallback text");
            Arc::new(DisabledSummaryGenerator)
        }
    };

    let escalation_policy = std::env::var("ESCALATION_POLICY")
        .ok()
        .and_then(|v| EscalationPolicy::parse(&v))
        .unwrap_or_default();

    let sender_id =
        std::env::var("MEDISTREAM_SENDER_ID").unwrap_or_else(|_| DEFAULT_SENDER_ID.to_string());

    let app_state = state::AppState::new(store, classifier, summarizer, escalation_policy, sender_id);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::chat::router())
        .merge(routes::shift::router())
        .merge(routes::task::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors::build_cors_layer()),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("MediStream backend listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
