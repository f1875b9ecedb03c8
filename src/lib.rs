//! Estate CMS - content backend and admin editor for blog posts, projects
//! and property listings, with images kept on an asset CDN.

pub mod assets;
pub mod client;
pub mod config;
pub mod content;
pub mod db;
pub mod editor;
pub mod error;
pub mod logging;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;

use axum::{
    http::{HeaderValue, Method},
    middleware, Router,
};
use sqlx::PgPool;
use std::{io, net::SocketAddr, sync::Arc};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::assets::{AssetStore, CloudinaryStore, NoAssetStore};
use crate::config::AppConfig;
use crate::content::{BlogPost, Project, Property};
use crate::db::{
    CommentStore, ContentStore, LikeCounter, PgStore, PostListings, SimilarListings, Unavailable,
};
use crate::routes::auth::AuthConfig;
use crate::routes::health::HealthState;
use crate::routes::upload::UploadState;

/// Headroom over the largest upload for multipart framing and JSON bodies.
const BODY_OVERHEAD: usize = 256 * 1024;

/// Everything the HTTP layer is built from.
#[derive(Clone)]
pub struct AppState {
    pub blog: Arc<dyn ContentStore<BlogPost>>,
    pub projects: Arc<dyn ContentStore<Project>>,
    pub properties: Arc<dyn ContentStore<Property>>,
    pub likes: Arc<dyn LikeCounter>,
    pub similar: Arc<dyn SimilarListings>,
    pub comments: Arc<dyn CommentStore>,
    pub listings: Arc<dyn PostListings>,
    pub assets: Arc<dyn AssetStore>,
    pub assets_configured: bool,
    pub auth: AuthConfig,
    pub pool: Option<PgPool>,
    pub max_upload_bytes: usize,
}

/// CORS for the configured frontend origins. Origins that are not valid
/// header values are skipped.
pub fn configure_cors(origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState, cors: CorsLayer) -> Router {
    let blog = routes::collections::router(state.blog, state.auth.clone())
        .merge(routes::engagement::like_router(state.likes))
        .merge(routes::engagement::comments_router(state.comments))
        .merge(routes::engagement::post_listings_router(state.listings));
    let projects = routes::collections::router(state.projects, state.auth.clone());
    let properties = routes::collections::router(state.properties, state.auth.clone())
        .merge(routes::engagement::similar_router(state.similar));

    let upload = routes::upload::router(UploadState {
        assets: state.assets,
        auth: state.auth,
        max_bytes: state.max_upload_bytes,
    });
    let health = routes::health::router(HealthState {
        pool: state.pool,
        assets_configured: state.assets_configured,
    });

    Router::new()
        .nest("/api/blog", blog)
        .nest("/api/projects", projects)
        .nest("/api/properties", properties)
        .merge(upload)
        .merge(health)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(
            state.max_upload_bytes + BODY_OVERHEAD,
        ))
        .layer(cors)
}

/// Stores and asset backend for the given configuration. Missing or broken
/// backends degrade to stand-ins that answer "unavailable".
pub async fn build_state(config: &AppConfig) -> AppState {
    let pool = match &config.database {
        Some(db_config) => match db::init_pool(db_config).await {
            Ok(pool) => {
                if let Err(e) = db::run_migrations(&pool).await {
                    tracing::error!("Failed to run database migrations: {}", e);
                }
                Some(pool)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize database pool: {}. Continuing without database.",
                    e
                );
                None
            }
        },
        None => {
            tracing::info!("DATABASE_URL not set. Running without database connection.");
            None
        }
    };

    let assets: Option<Arc<dyn AssetStore>> = match &config.cloudinary {
        Some(cloudinary) => {
            match CloudinaryStore::new(cloudinary.clone(), config.request_timeout) {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    tracing::warn!("Failed to set up asset store: {}", e);
                    None
                }
            }
        }
        None => {
            tracing::info!("Cloudinary is not configured. Uploads are disabled.");
            None
        }
    };
    let assets_configured = assets.is_some();
    let assets = assets.unwrap_or_else(|| Arc::new(NoAssetStore));

    let auth = AuthConfig::new(config.auth_secret.clone());

    match pool {
        Some(pool) => {
            let store = Arc::new(PgStore::new(pool.clone()));
            AppState {
                blog: store.clone(),
                projects: store.clone(),
                properties: store.clone(),
                likes: store.clone(),
                similar: store.clone(),
                comments: store.clone(),
                listings: store,
                assets,
                assets_configured,
                auth,
                pool: Some(pool),
                max_upload_bytes: config.max_upload_bytes,
            }
        }
        None => AppState {
            blog: Arc::new(Unavailable),
            projects: Arc::new(Unavailable),
            properties: Arc::new(Unavailable),
            likes: Arc::new(Unavailable),
            similar: Arc::new(Unavailable),
            comments: Arc::new(Unavailable),
            listings: Arc::new(Unavailable),
            assets,
            assets_configured,
            auth,
            pool: None,
            max_upload_bytes: config.max_upload_bytes,
        },
    }
}

/// Run the server (used by main).
pub async fn run() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Dropping these stops the background log writers.
    let _log_guards = logging::init(&logging::LogSettings::from_env());

    routes::health::init_start_time();

    let config = AppConfig::from_env();

    if config.is_production() && config.auth_secret.is_none() {
        panic!(
            "FATAL: AUTH_JWT_SECRET must be set in production. \
             Refusing to start with admin writes disabled."
        );
    }
    if config.auth_secret.is_none() {
        tracing::warn!("AUTH_JWT_SECRET is not set. Admin writes will answer 503.");
    }

    let state = build_state(&config).await;
    let cors = configure_cors(&config.allowed_origins);
    tracing::info!(origins = ?config.allowed_origins, "CORS configured");
    let app = create_app(state, cors);

    let addr = config
        .socket_addr()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
