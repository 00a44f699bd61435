use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
    time::Instant,
};

use axum::{routing::get, Json};
use boombox_core::Coordinator;
use log::info;
use tokio::{net::TcpListener, spawn, task::spawn_blocking};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

mod context;
mod errors;
mod gateway;
mod logging;
mod rooms;
mod schemas;
mod serialized;

pub use context::ServerContext;
pub use gateway::Gateway;
pub use logging::init_logger;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 3000;

pub type Router = axum::Router<ServerContext>;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "boombox API",
        description = "Read-only queries against boombox listening rooms"
    ),
    paths(
        rooms::room_summary,
        rooms::room_exists,
        rooms::room_playlist,
        rooms::health
    ),
    components(schemas(
        serialized::RoomSummary,
        serialized::Track,
        serialized::RoomExists,
        serialized::Playlist,
        serialized::Health
    ))
)]
struct ApiDoc;

/// Starts the boombox server: the gateway socket, the query surface, the
/// event pump, and the inactivity sweeper.
pub async fn run_server(coordinator: Arc<Coordinator>) {
    let port = env::var("BOOMBOX_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let context = ServerContext {
        coordinator: coordinator.clone(),
        gateway: Arc::new(Gateway::new()),
    };

    spawn(check_events(context.clone()));
    spawn(run_sweeper(coordinator));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", rooms::router())
        .route("/gateway", get(gateway::ws_route))
        .route("/api.json", get(serve_api))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {}", port);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server runs");
}

async fn serve_api() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Forwards coordinator events to the gateway. Events leave the coordinator
/// in emit order, so every connection observes a room's history sequentially.
async fn check_events(context: ServerContext) {
    loop {
        let coordinator = context.coordinator.clone();

        let event = spawn_blocking(move || coordinator.wait_for_event())
            .await
            .expect("event pump task");

        context.gateway.deliver(event);
    }
}

/// Periodically deletes rooms whose last activity is past the configured
/// threshold.
async fn run_sweeper(coordinator: Arc<Coordinator>) {
    let mut interval = tokio::time::interval(coordinator.config().sweep_interval);

    loop {
        interval.tick().await;

        let removed = coordinator.sweep(Instant::now());

        if removed > 0 {
            info!("Swept {} inactive room(s)", removed);
        }
    }
}
