//! Music catalog access
//!
//! The gateway talks to the catalog through the [`CatalogClient`] trait and
//! obtains clients from an injected [`ClientFactory`], so the backing service
//! can be swapped (or mocked) without touching request handling.

pub mod ytmusic_provider;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use ytmusic_provider::{YtMusicCatalog, YtMusicClientFactory};
pub use ytmusic_rs::{PrivacyStatus, SearchFilter};

/// Capability set of a music catalog service.
///
/// Results are the service's native JSON, returned to callers unchanged.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Returns the name of the backing service (e.g. "ytmusic")
    fn name(&self) -> &str;

    async fn search(&self, query: &str, filter: Option<SearchFilter>, limit: usize)
    -> Result<Value>;

    async fn get_artist(&self, artist_id: &str) -> Result<Value>;

    async fn get_album(&self, album_id: &str) -> Result<Value>;

    async fn get_song(&self, video_id: &str) -> Result<Value>;

    async fn get_playlist(&self, playlist_id: &str) -> Result<Value>;

    /// Create an empty playlist and return its identifier
    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy_status: PrivacyStatus,
    ) -> Result<Value>;

    async fn add_playlist_items(&self, playlist_id: &str, video_ids: &[String]) -> Result<Value>;

    async fn remove_playlist_items(&self, playlist_id: &str, video_ids: &[String])
    -> Result<Value>;

    async fn delete_playlist(&self, playlist_id: &str) -> Result<Value>;

    async fn get_watch_playlist(&self, video_id: &str, playlist_id: Option<&str>)
    -> Result<Value>;

    async fn get_lyrics(&self, id: &str) -> Result<Value>;

    async fn get_library_playlists(&self, limit: usize) -> Result<Value>;

    async fn get_charts(&self, country: Option<&str>) -> Result<Value>;
}

/// Hands out catalog clients to the gateway.
///
/// Implementations decide the client lifetime: one shared instance for the
/// whole process or a fresh one per call.
pub trait ClientFactory: Send + Sync {
    fn client(&self) -> Result<Arc<dyn CatalogClient>>;
}
