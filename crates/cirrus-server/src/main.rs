use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cirrus_api::auth::{self, AppState, AppStateInner};
use cirrus_api::middleware::require_auth;
use cirrus_api::{files, folders, invites, profiles};
use cirrus_gateway::connection;
use cirrus_gateway::dispatcher::Dispatcher;
use cirrus_storage::{Storage, signing::UrlSigner};

#[derive(Clone)]
struct ServerState {
    dispatcher: Dispatcher,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cirrus=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("CIRRUS_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let url_secret = std::env::var("CIRRUS_URL_SECRET").unwrap_or_else(|_| jwt_secret.clone());
    let db_path = std::env::var("CIRRUS_DB_PATH").unwrap_or_else(|_| "cirrus.db".into());
    let data_dir = std::env::var("CIRRUS_DATA_DIR").unwrap_or_else(|_| "./objects".into());
    let host = std::env::var("CIRRUS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CIRRUS_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and object storage
    let db = cirrus_db::Database::open(&PathBuf::from(&db_path))?;
    let storage = Storage::new(PathBuf::from(&data_dir)).await?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        signer: UrlSigner::new(&url_secret),
        dispatcher: dispatcher.clone(),
        jwt_secret: jwt_secret.clone(),
    });

    let ws_state = ServerState {
        dispatcher,
        jwt_secret,
    };

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/download/{*key}", get(files::download))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/auth/session", get(auth::session))
        .route("/profiles", get(profiles::list_profiles))
        .route("/profiles/{profile_id}", get(profiles::get_profile))
        .route("/folders", post(folders::create_folder))
        .route("/folders", get(folders::list_folders))
        .route("/folders/{folder_id}", delete(folders::delete_folder))
        .route("/folders/{folder_id}/files", post(files::upload_file))
        .route("/folders/{folder_id}/files", get(files::list_files))
        .route("/files/{file_id}", delete(files::delete_file))
        .route("/files/{file_id}/url", get(files::create_signed_url))
        .route("/invites", post(invites::send_invite))
        .route("/invites/pending", get(invites::list_pending))
        .route("/invites/pending/count", get(invites::count_pending))
        .route("/invites/{invite_id}/resolve", post(invites::resolve_invite))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(ws_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Cirrus server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(
    State(state): State<ServerState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.jwt_secret)
    })
}
