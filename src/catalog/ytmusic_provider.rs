use super::{CatalogClient, ClientFactory, PrivacyStatus, SearchFilter};
use crate::config::ClientMode;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use ytmusic_rs::YtMusicApi;

/// Catalog backed by YouTube Music
pub struct YtMusicCatalog {
    api: YtMusicApi,
}

impl YtMusicCatalog {
    pub fn new(auth_file: &std::path::Path) -> Result<Self> {
        let api = YtMusicApi::from_auth_file(auth_file)
            .context("Failed to create YouTube Music API client")?;
        Ok(Self { api })
    }
}

#[async_trait]
impl CatalogClient for YtMusicCatalog {
    fn name(&self) -> &str {
        "ytmusic"
    }

    async fn search(
        &self,
        query: &str,
        filter: Option<SearchFilter>,
        limit: usize,
    ) -> Result<Value> {
        tracing::debug!("YouTube Music search: {} ({:?}, limit {})", query, filter, limit);
        let items = self.api.search(query, filter, limit).await?;
        Ok(Value::Array(items))
    }

    async fn get_artist(&self, artist_id: &str) -> Result<Value> {
        Ok(self.api.get_artist(artist_id).await?)
    }

    async fn get_album(&self, album_id: &str) -> Result<Value> {
        Ok(self.api.get_album(album_id).await?)
    }

    async fn get_song(&self, video_id: &str) -> Result<Value> {
        Ok(self.api.get_song(video_id).await?)
    }

    async fn get_playlist(&self, playlist_id: &str) -> Result<Value> {
        Ok(self.api.get_playlist(playlist_id).await?)
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy_status: PrivacyStatus,
    ) -> Result<Value> {
        Ok(self
            .api
            .create_playlist(title, description, privacy_status)
            .await?)
    }

    async fn add_playlist_items(&self, playlist_id: &str, video_ids: &[String]) -> Result<Value> {
        Ok(self.api.add_playlist_items(playlist_id, video_ids).await?)
    }

    async fn remove_playlist_items(
        &self,
        playlist_id: &str,
        video_ids: &[String],
    ) -> Result<Value> {
        Ok(self.api.remove_playlist_items(playlist_id, video_ids).await?)
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<Value> {
        Ok(self.api.delete_playlist(playlist_id).await?)
    }

    async fn get_watch_playlist(
        &self,
        video_id: &str,
        playlist_id: Option<&str>,
    ) -> Result<Value> {
        Ok(self.api.get_watch_playlist(video_id, playlist_id).await?)
    }

    async fn get_lyrics(&self, id: &str) -> Result<Value> {
        Ok(self.api.get_lyrics(id).await?)
    }

    async fn get_library_playlists(&self, limit: usize) -> Result<Value> {
        let playlists = self.api.get_library_playlists(limit).await?;
        Ok(Value::Array(playlists))
    }

    async fn get_charts(&self, country: Option<&str>) -> Result<Value> {
        Ok(self.api.get_charts(country).await?)
    }
}

/// Builds [`YtMusicCatalog`] clients from a credential file
pub struct YtMusicClientFactory {
    auth_file: PathBuf,
    shared: Option<Arc<dyn CatalogClient>>,
}

impl YtMusicClientFactory {
    pub fn new(auth_file: impl Into<PathBuf>, mode: ClientMode) -> Result<Self> {
        let auth_file = auth_file.into();
        let shared = match mode {
            ClientMode::Shared => {
                tracing::info!("Using a shared YouTube Music client");
                let client: Arc<dyn CatalogClient> = Arc::new(YtMusicCatalog::new(&auth_file)?);
                Some(client)
            }
            ClientMode::PerRequest => {
                tracing::info!("Building a YouTube Music client per request");
                None
            }
        };

        Ok(Self { auth_file, shared })
    }
}

impl ClientFactory for YtMusicClientFactory {
    fn client(&self) -> Result<Arc<dyn CatalogClient>> {
        match &self.shared {
            Some(client) => Ok(Arc::clone(client)),
            None => Ok(Arc::new(YtMusicCatalog::new(&self.auth_file)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_factory_reuses_client() {
        let dir = tempfile::tempdir().unwrap();
        let factory =
            YtMusicClientFactory::new(dir.path().join("oauth.json"), ClientMode::Shared).unwrap();

        let first = factory.client().unwrap();
        let second = factory.client().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "ytmusic");
    }

    #[test]
    fn test_per_request_factory_builds_fresh_clients() {
        let dir = tempfile::tempdir().unwrap();
        let factory =
            YtMusicClientFactory::new(dir.path().join("oauth.json"), ClientMode::PerRequest)
                .unwrap();

        let first = factory.client().unwrap();
        let second = factory.client().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_malformed_auth_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oauth.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(YtMusicClientFactory::new(&path, ClientMode::Shared).is_err());

        let lazy = YtMusicClientFactory::new(&path, ClientMode::PerRequest).unwrap();
        assert!(lazy.client().is_err());
    }
}
