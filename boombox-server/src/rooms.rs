use axum::{
    extract::{Path, State},
    routing::get,
    Json,
};
use chrono::Utc;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    serialized::{Health, Playlist, RoomExists, RoomSummary, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/api/rooms/{id}",
    tag = "rooms",
    responses(
        (status = 200, body = RoomSummary),
        (status = 404, description = "Room does not exist")
    )
)]
pub(crate) async fn room_summary(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<RoomSummary>> {
    let summary = context.coordinator.room_summary(&id)?;

    Ok(Json(summary.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{id}/exists",
    tag = "rooms",
    responses(
        (status = 200, body = RoomExists)
    )
)]
pub(crate) async fn room_exists(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
) -> Json<RoomExists> {
    Json(RoomExists {
        exists: context.coordinator.room_exists(&id),
    })
}

#[utoipa::path(
    get,
    path = "/api/rooms/{id}/playlist",
    tag = "rooms",
    responses(
        (status = 200, body = Playlist),
        (status = 404, description = "Room does not exist")
    )
)]
pub(crate) async fn room_playlist(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<Playlist>> {
    let playlist = context.coordinator.playlist(&id)?;

    Ok(Json(Playlist {
        playlist: playlist.to_serialized(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, body = Health)
    )
)]
pub(crate) async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/rooms/:id", get(room_summary))
        .route("/rooms/:id/exists", get(room_exists))
        .route("/rooms/:id/playlist", get(room_playlist))
        .route("/health", get(health))
}
