use axum::{routing::get, Router};
use hushroom::{db, home, rooms, storage::{self, Storage}, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().init();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(30)));

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(dotenv::var("DATABASE_URL").expect("DATABASE_URL is not set").as_str())
        .await
        .expect("could not open database");
    db::init(&db_pool).await.expect("could not create schema");

    let storage = Storage::new(dotenv::var("FILES_DIR").unwrap_or_else(|_| "files".to_owned()));

    let app_state = AppState {
        db_pool,
        tx: broadcast::channel(64).0,
        storage,
    };

    let app = Router::new()
        .route("/", get(home::home))
        .route("/new", get(home::new_room))
        .route("/join", get(home::join_room))
        .route("/files/{*path}", get(storage::serve))

        .nest("/chat", rooms::router())

        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::permissive());

    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("could not bind");
    tracing::info!("listening on {addr}");
    axum::serve(listener, app).await.expect("server exited");
}
