use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::GatewayError;
use crate::gateway::{
    CatalogGateway, ChartsParams, CreatePlaylist, CreatedPlaylist, LibraryParams, SearchParams,
    SearchResults, WatchPlaylistParams,
};
use crate::pipeline::AcquisitionPipeline;

type ApiResult<T> = Result<T, GatewayError>;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<CatalogGateway>,
    pub pipeline: Arc<AcquisitionPipeline>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/artist/:id", get(get_artist))
        .route("/album/:id", get(get_album))
        .route("/song/:id", get(get_song))
        .route("/playlist/create", post(create_playlist))
        .route("/playlist/:id", get(get_playlist))
        .route("/playlist/:id/items", post(add_playlist_items))
        .route("/playlist/:id/items/remove", delete(remove_playlist_items))
        .route("/playlist/:id/delete", delete(delete_playlist))
        .route("/watch-playlist", get(get_watch_playlist))
        .route("/lyrics/:id", get(get_lyrics))
        .route("/library/playlists", get(get_library_playlists))
        .route("/charts", get(get_charts))
        .route("/download/song", post(download_song))
        .route("/download/playlist", post(download_playlist))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Parse a JSON request body. An empty body is treated as `{}` so missing
/// fields surface as validation errors rather than extractor rejections.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::invalid(format!("Malformed JSON body: {}", e)))
}

#[derive(Debug, Default, Deserialize)]
struct VideoIdsBody {
    #[serde(default)]
    video_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DownloadSongBody {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DownloadPlaylistBody {
    playlist_id: Option<String>,
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "ytm-api" }))
}

// ========== CATALOG ENDPOINTS ==========

/// Search for songs, artists, albums, etc.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResults>> {
    let results = state.gateway.search(&params).await?;
    Ok(Json(results))
}

async fn get_artist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.gateway.artist(&id).await?))
}

async fn get_album(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    Ok(Json(state.gateway.album(&id).await?))
}

async fn get_song(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    Ok(Json(state.gateway.song(&id).await?))
}

async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.gateway.playlist(&id).await?))
}

/// Up-next queue for a video (radio / shuffle)
async fn get_watch_playlist(
    State(state): State<AppState>,
    Query(params): Query<WatchPlaylistParams>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.gateway.watch_playlist(&params).await?))
}

async fn get_lyrics(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    Ok(Json(state.gateway.lyrics(&id).await?))
}

async fn get_library_playlists(
    State(state): State<AppState>,
    Query(params): Query<LibraryParams>,
) -> ApiResult<Json<Value>> {
    let playlists = state.gateway.library_playlists(&params).await?;
    Ok(Json(json!({ "playlists": playlists })))
}

async fn get_charts(
    State(state): State<AppState>,
    Query(params): Query<ChartsParams>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.gateway.charts(&params).await?))
}

// ========== PLAYLIST ENDPOINTS ==========

async fn create_playlist(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CreatedPlaylist>)> {
    let request: CreatePlaylist = parse_body(&body)?;
    let created = state.gateway.create_playlist(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn add_playlist_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body: VideoIdsBody = parse_body(&body)?;
    let added = state.gateway.add_playlist_items(&id, &body.video_ids).await?;
    Ok(Json(json!({
        "status": "success",
        "playlist_id": id,
        "added_items": added,
    })))
}

async fn remove_playlist_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body: VideoIdsBody = parse_body(&body)?;
    state
        .gateway
        .remove_playlist_items(&id, &body.video_ids)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "playlist_id": id,
        "message": "Items removed successfully",
    })))
}

async fn delete_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.gateway.delete_playlist(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Playlist deleted successfully",
    })))
}

// ========== DOWNLOAD ENDPOINTS ==========

/// Download a single song into the library and import it
async fn download_song(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let body: DownloadSongBody = parse_body(&body)?;
    let video_id = body.video_id.unwrap_or_default();
    tracing::debug!("Download requested for video {}", video_id);

    let report = state.pipeline.clone().acquire_track(&video_id).await?;
    Ok(Json(json!({
        "status": "success",
        "video_id": report.source_id,
        "message": "Song downloaded successfully",
        "warnings": report.warnings,
    })))
}

/// Download every entry of a playlist into the library and import them
async fn download_playlist(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body: DownloadPlaylistBody = parse_body(&body)?;
    let playlist_id = body.playlist_id.unwrap_or_default();
    tracing::debug!("Download requested for playlist {}", playlist_id);

    let report = state.pipeline.clone().acquire_collection(&playlist_id).await?;
    Ok(Json(json!({
        "status": "success",
        "playlist_id": report.source_id,
        "message": "Songs downloaded successfully",
        "warnings": report.warnings,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_empty_is_default() {
        let body: VideoIdsBody = parse_body(&Bytes::from_static(b"  \n")).unwrap();
        assert!(body.video_ids.is_empty());
    }

    #[test]
    fn test_parse_body_malformed() {
        let err = parse_body::<VideoIdsBody>(&Bytes::from_static(b"{video_ids")).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[test]
    fn test_parse_body_fields() {
        let body: DownloadSongBody =
            parse_body(&Bytes::from_static(br#"{"video_id": "abc123"}"#)).unwrap();
        assert_eq!(body.video_id.as_deref(), Some("abc123"));
    }
}
