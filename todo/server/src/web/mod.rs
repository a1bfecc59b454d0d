use axum::Router;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use sea_orm::{ConnectOptions, Database};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::Config;
use crate::response::{ErrorMessage, Metadata};
use crate::task::{self, MySqlTaskRepository, Task, TaskService, TaskState, create_task_router};

#[derive(OpenApi)]
#[openapi(
    paths(
        task::api::v1::fetch_tasks_handler,
        task::api::v1::insert_task_handler,
        task::api::v1::get_task_handler,
        task::api::v1::update_task_handler,
        task::api::v1::delete_task_handler,
    ),
    components(schemas(Task, Metadata, ErrorMessage)),
    tags((name = "Tasks", description = "Task management"))
)]
pub struct ApiDoc;

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let mut options = ConnectOptions::new(config.database_url());
    options
        .max_connections(config.max_connections)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    tracing::info!(
        host = %config.mysql_host,
        database = %config.mysql_database,
        "Connected to task store"
    );

    let repository = Arc::new(MySqlTaskRepository::new(Arc::new(db)));
    let use_case = Arc::new(TaskService::new(repository));
    let state = Arc::new(TaskState { use_case });

    let app = create_app(state, Duration::from_secs(config.request_timeout_secs));

    let server_address = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped");
    Ok(())
}

/// Assembles every route and the shared middleware stack.
///
/// Requests running longer than `request_timeout` are dropped, which also
/// cancels any storage call still in flight.
pub fn create_app(state: Arc<TaskState>, request_timeout: Duration) -> Router {
    Router::new()
        .merge(create_task_router(state))
        .route("/health", get(health_check_handler))
        .route("/api-docs/openapi.json", get(openapi_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                )),
        )
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
