mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::{Config, SwaggerConfig};
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::auth::{self, JwtValidator};
use crate::features::resources::{self, ResourceService};
use crate::features::surveys::{self, SurveyService};
use crate::modules::storage::MinIOClient;
use axum::{extract::DefaultBodyLimit, middleware::from_fn_with_state, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(serve(worker_threads))
}

async fn serve(worker_threads: usize) -> anyhow::Result<()> {
    // RUST_LOG may come from .env, so load it before the subscriber
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(
        "Configuration loaded: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );

    let pool = database::create_pool(&config.database).await?;
    database::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    shared::views::init_views(&config.views);
    tracing::info!("Views loaded from {}", config.views.template_dir);

    let jwks_client = Arc::new(auth::JwksClient::new(
        &config.auth.jwks_url,
        config.auth.jwks_cache_ttl,
    ));
    let jwt_validator = Arc::new(JwtValidator::new(jwks_client, &config.auth));

    let storage = Arc::new(
        MinIOClient::new(config.minio.clone())
            .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO client: {}", e))?,
    );
    storage
        .ensure_bucket_exists()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to ensure MinIO bucket exists: {}", e))?;
    tracing::info!("Storage ready, bucket: {}", storage.bucket_name());

    let resource_service = Arc::new(ResourceService::new(pool.clone(), storage));
    let survey_service = Arc::new(SurveyService::new(pool));

    let app = app_router(&config, jwt_validator, resource_service, survey_service);

    let addr = config.app.server_address();
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;
    let listener = bind_listener(socket_addr)?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Survey page at http://{}/survey", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> axum::http::StatusCode {
    axum::http::StatusCode::OK
}

/// Assemble every route group with the shared layers on top
fn app_router(
    config: &Config,
    jwt_validator: Arc<JwtValidator>,
    resource_service: Arc<ResourceService>,
    survey_service: Arc<SurveyService>,
) -> Router {
    // JWT only guards the admin groups, route_layer keeps unmatched paths at 404
    let admin = Router::new()
        .merge(resources::admin_routes(Arc::clone(&resource_service)))
        .merge(surveys::admin_routes(Arc::clone(&survey_service)))
        .route_layer(from_fn_with_state(jwt_validator, middleware::auth_middleware));

    let public = Router::new()
        .merge(resources::public_routes(Arc::clone(&resource_service)))
        .merge(surveys::public_routes(Arc::clone(&survey_service)))
        .route("/health", axum::routing::get(health_check));

    let pages = Router::new()
        .merge(resources::page_routes(resource_service))
        .merge(surveys::page_routes(survey_service));

    Router::new()
        .merge(swagger_router(&config.swagger))
        .merge(admin)
        .merge(public)
        .merge(pages)
        .layer(DefaultBodyLimit::max(config.app.max_request_body_size))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Client-provided X-Request-Id wins, otherwise a UUID v7 is generated
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
}

fn swagger_router(config: &SwaggerConfig) -> Router {
    let mut openapi = ApiDoc::openapi();
    SwaggerInfoModifier {
        title: config.title.clone(),
        version: config.version.clone(),
        description: config.description.clone(),
    }
    .modify(&mut openapi);

    let ui =
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));
    match config.credentials() {
        Some(credentials) => {
            tracing::info!("Swagger UI basic auth enabled");
            ui.layer(from_fn_with_state(
                Arc::new(credentials),
                middleware::basic_auth_middleware,
            ))
        }
        None => {
            tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
            ui
        }
    }
}

fn bind_listener(addr: SocketAddr) -> std::io::Result<tokio::net::TcpListener> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;
    socket.set_tcp_keepalive(&socket2::TcpKeepalive::new().with_time(Duration::from_secs(60)))?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    tokio::net::TcpListener::from_std(socket.into())
}
