use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use carpool_backend::{
    db,
    entities::user::{self, UserRole},
    middleware::rate_limit::{create_global_governor, log_request},
    routes,
    store::{MemoryStore, PgStore, Store, StoreError},
    utils::password::hash_password,
    AppState, Config,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carpool_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let db = db::connect(url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Connected to database");

            migration::Migrator::up(&db, None)
                .await
                .expect("Failed to run migrations");
            tracing::info!("Migrations complete");

            Arc::new(PgStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    seed_admin(store.as_ref(), &config).await;

    let state = AppState::new(store, config.clone());

    let app = routes::create_router(state)
        .layer(axum::middleware::from_fn(log_request))
        .layer(create_global_governor())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    // Peer addresses feed the per-IP limiter
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

/// Create the admin account when ADMIN_PASSWORD is configured
async fn seed_admin(store: &dyn Store, config: &Config) {
    let Some(password) = &config.admin_password else {
        tracing::debug!("ADMIN_PASSWORD not set, skipping admin seed");
        return;
    };

    let admin = user::Model {
        id: Uuid::new_v4(),
        email: config.admin_email.trim().to_lowercase(),
        password_hash: hash_password(password).expect("Failed to hash admin password"),
        name: "Admin".to_string(),
        role: UserRole::Admin,
        created_at: Utc::now().into(),
    };

    match store.insert_user(admin).await {
        Ok(user) => tracing::info!("Admin account created: {}", user.email),
        Err(StoreError::Conflict(_)) => tracing::debug!("Admin account already exists"),
        Err(e) => panic!("Failed to create admin: {}", e),
    }
}
