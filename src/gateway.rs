//! Catalog gateway
//!
//! Stateless translation from request parameters to a single catalog client
//! call. Required parameters are checked before a client is even obtained,
//! and every client error is reported as an upstream failure carrying the
//! original message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::catalog::{CatalogClient, ClientFactory, PrivacyStatus, SearchFilter};
use crate::error::{GatewayError, Result};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const DEFAULT_LIBRARY_LIMIT: usize = 25;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub filter: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WatchPlaylistParams {
    pub video_id: Option<String>,
    pub playlist_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LibraryParams {
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartsParams {
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePlaylist {
    pub title: Option<String>,
    pub description: Option<String>,
    pub privacy_status: Option<String>,
    #[serde(default)]
    pub video_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub results: Value,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedPlaylist {
    pub playlist_id: Value,
    pub title: String,
    pub message: String,
}

pub struct CatalogGateway {
    factory: Arc<dyn ClientFactory>,
}

impl CatalogGateway {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    fn client(&self) -> Result<Arc<dyn CatalogClient>> {
        self.factory
            .client()
            .map_err(|e| GatewayError::UpstreamFailure(format!("{:#}", e)))
    }

    pub async fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        let query = required(params.q.as_deref(), "Query parameter \"q\" is required")?;
        let filter = params
            .filter
            .as_deref()
            .filter(|f| !f.is_empty())
            .map(|f| {
                f.parse::<SearchFilter>()
                    .map_err(|e| GatewayError::invalid(e.to_string()))
            })
            .transpose()?;
        let limit = parse_limit(params.limit.as_deref(), DEFAULT_SEARCH_LIMIT)?;

        tracing::debug!("Searching '{}' (filter {:?}, limit {})", query, filter, limit);
        let results = self
            .client()?
            .search(query, filter, limit)
            .await
            .map_err(upstream)?;

        Ok(SearchResults {
            results,
            query: query.to_string(),
        })
    }

    pub async fn artist(&self, artist_id: &str) -> Result<Value> {
        let artist_id = required(Some(artist_id), "artist_id is required")?;
        tracing::debug!("Fetching artist: {}", artist_id);
        self.client()?.get_artist(artist_id).await.map_err(upstream)
    }

    pub async fn album(&self, album_id: &str) -> Result<Value> {
        let album_id = required(Some(album_id), "album_id is required")?;
        tracing::debug!("Fetching album: {}", album_id);
        self.client()?.get_album(album_id).await.map_err(upstream)
    }

    pub async fn song(&self, video_id: &str) -> Result<Value> {
        let video_id = required(Some(video_id), "video_id is required")?;
        tracing::debug!("Fetching song: {}", video_id);
        self.client()?.get_song(video_id).await.map_err(upstream)
    }

    pub async fn playlist(&self, playlist_id: &str) -> Result<Value> {
        let playlist_id = required(Some(playlist_id), "playlist_id is required")?;
        tracing::debug!("Fetching playlist: {}", playlist_id);
        self.client()?
            .get_playlist(playlist_id)
            .await
            .map_err(upstream)
    }

    /// Create a playlist, then add the initial videos in a second call.
    pub async fn create_playlist(&self, request: CreatePlaylist) -> Result<CreatedPlaylist> {
        let title = required(request.title.as_deref(), "Title is required")?;
        let description = request.description.as_deref().unwrap_or("");
        let privacy_status = match request.privacy_status.as_deref() {
            Some(status) if !status.is_empty() => status
                .parse::<PrivacyStatus>()
                .map_err(|e| GatewayError::invalid(e.to_string()))?,
            _ => PrivacyStatus::default(),
        };

        tracing::debug!("Creating playlist: {}", title);
        let client = self.client()?;
        let playlist_id = client
            .create_playlist(title, description, privacy_status)
            .await
            .map_err(upstream)?;

        if !request.video_ids.is_empty() {
            let id = playlist_id.as_str().ok_or_else(|| {
                GatewayError::UpstreamFailure(format!(
                    "Playlist was created but no playlist id was returned: {}",
                    playlist_id
                ))
            })?;
            tracing::debug!("Adding {} items to new playlist {}", request.video_ids.len(), id);
            client
                .add_playlist_items(id, &request.video_ids)
                .await
                .map_err(upstream)?;
        }

        tracing::debug!("Successfully created playlist: {}", playlist_id);
        Ok(CreatedPlaylist {
            playlist_id,
            title: title.to_string(),
            message: "Playlist created successfully".to_string(),
        })
    }

    pub async fn add_playlist_items(&self, playlist_id: &str, video_ids: &[String]) -> Result<Value> {
        let playlist_id = required(Some(playlist_id), "playlist_id is required")?;
        require_video_ids(video_ids)?;
        tracing::debug!("Adding {} items to playlist {}", video_ids.len(), playlist_id);
        self.client()?
            .add_playlist_items(playlist_id, video_ids)
            .await
            .map_err(upstream)
    }

    pub async fn remove_playlist_items(
        &self,
        playlist_id: &str,
        video_ids: &[String],
    ) -> Result<Value> {
        let playlist_id = required(Some(playlist_id), "playlist_id is required")?;
        require_video_ids(video_ids)?;
        tracing::debug!("Removing {} items from playlist {}", video_ids.len(), playlist_id);
        self.client()?
            .remove_playlist_items(playlist_id, video_ids)
            .await
            .map_err(upstream)
    }

    pub async fn delete_playlist(&self, playlist_id: &str) -> Result<Value> {
        let playlist_id = required(Some(playlist_id), "playlist_id is required")?;
        tracing::debug!("Deleting playlist: {}", playlist_id);
        self.client()?
            .delete_playlist(playlist_id)
            .await
            .map_err(upstream)
    }

    pub async fn watch_playlist(&self, params: &WatchPlaylistParams) -> Result<Value> {
        let video_id = required(
            params.video_id.as_deref(),
            "video_id parameter is required",
        )?;
        let playlist_id = params.playlist_id.as_deref().filter(|id| !id.is_empty());
        tracing::debug!("Fetching watch playlist for {} ({:?})", video_id, playlist_id);
        self.client()?
            .get_watch_playlist(video_id, playlist_id)
            .await
            .map_err(upstream)
    }

    pub async fn lyrics(&self, id: &str) -> Result<Value> {
        let id = required(Some(id), "video_id is required")?;
        tracing::debug!("Fetching lyrics: {}", id);
        self.client()?.get_lyrics(id).await.map_err(upstream)
    }

    pub async fn library_playlists(&self, params: &LibraryParams) -> Result<Value> {
        let limit = parse_limit(params.limit.as_deref(), DEFAULT_LIBRARY_LIMIT)?;
        tracing::debug!("Fetching up to {} library playlists", limit);
        self.client()?
            .get_library_playlists(limit)
            .await
            .map_err(upstream)
    }

    pub async fn charts(&self, params: &ChartsParams) -> Result<Value> {
        let country = params.country.as_deref().filter(|c| !c.is_empty());
        tracing::debug!("Fetching charts for {:?}", country);
        self.client()?.get_charts(country).await.map_err(upstream)
    }
}

fn upstream(err: anyhow::Error) -> GatewayError {
    GatewayError::UpstreamFailure(err.to_string())
}

/// Treats absent, empty and whitespace-only values as missing.
fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(GatewayError::invalid(message)),
    }
}

fn require_video_ids(video_ids: &[String]) -> Result<()> {
    if video_ids.is_empty() || video_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(GatewayError::invalid("video_ids array is required"));
    }
    Ok(())
}

fn parse_limit(value: Option<&str>, default: usize) -> Result<usize> {
    match value {
        None | Some("") => Ok(default),
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            GatewayError::invalid(format!(
                "Parameter \"limit\" must be a non-negative integer, got '{}'",
                raw
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every call; fails all of them when `fail_with` is set.
    #[derive(Default)]
    struct RecordingCatalog {
        calls: Mutex<Vec<String>>,
        fail_with: Option<String>,
    }

    impl RecordingCatalog {
        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Default::default()
            }
        }

        fn record(&self, call: String) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(call);
            match &self.fail_with {
                Some(message) => anyhow::bail!("{}", message),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogClient for RecordingCatalog {
        fn name(&self) -> &str {
            "recording"
        }

        async fn search(
            &self,
            query: &str,
            filter: Option<SearchFilter>,
            limit: usize,
        ) -> anyhow::Result<Value> {
            self.record(format!("search:{}:{:?}:{}", query, filter, limit))?;
            Ok(json!([{"title": query}]))
        }

        async fn get_artist(&self, artist_id: &str) -> anyhow::Result<Value> {
            self.record(format!("artist:{}", artist_id))?;
            Ok(json!({"name": "Artist"}))
        }

        async fn get_album(&self, album_id: &str) -> anyhow::Result<Value> {
            self.record(format!("album:{}", album_id))?;
            Ok(json!({"title": "Album"}))
        }

        async fn get_song(&self, video_id: &str) -> anyhow::Result<Value> {
            self.record(format!("song:{}", video_id))?;
            Ok(json!({"videoDetails": {"videoId": video_id}}))
        }

        async fn get_playlist(&self, playlist_id: &str) -> anyhow::Result<Value> {
            self.record(format!("playlist:{}", playlist_id))?;
            Ok(json!({"id": playlist_id}))
        }

        async fn create_playlist(
            &self,
            title: &str,
            _description: &str,
            privacy_status: PrivacyStatus,
        ) -> anyhow::Result<Value> {
            self.record(format!("create:{}:{}", title, privacy_status.as_str()))?;
            Ok(json!("PLnew"))
        }

        async fn add_playlist_items(
            &self,
            playlist_id: &str,
            video_ids: &[String],
        ) -> anyhow::Result<Value> {
            self.record(format!("add:{}:{}", playlist_id, video_ids.join(",")))?;
            Ok(json!({"status": "STATUS_SUCCEEDED"}))
        }

        async fn remove_playlist_items(
            &self,
            playlist_id: &str,
            video_ids: &[String],
        ) -> anyhow::Result<Value> {
            self.record(format!("remove:{}:{}", playlist_id, video_ids.join(",")))?;
            Ok(json!({"status": "STATUS_SUCCEEDED"}))
        }

        async fn delete_playlist(&self, playlist_id: &str) -> anyhow::Result<Value> {
            self.record(format!("delete:{}", playlist_id))?;
            Ok(json!({}))
        }

        async fn get_watch_playlist(
            &self,
            video_id: &str,
            playlist_id: Option<&str>,
        ) -> anyhow::Result<Value> {
            self.record(format!("watch:{}:{:?}", video_id, playlist_id))?;
            Ok(json!({"tracks": []}))
        }

        async fn get_lyrics(&self, id: &str) -> anyhow::Result<Value> {
            self.record(format!("lyrics:{}", id))?;
            Ok(json!({"lyrics": "la la"}))
        }

        async fn get_library_playlists(&self, limit: usize) -> anyhow::Result<Value> {
            self.record(format!("library:{}", limit))?;
            Ok(json!([]))
        }

        async fn get_charts(&self, country: Option<&str>) -> anyhow::Result<Value> {
            self.record(format!("charts:{:?}", country))?;
            Ok(json!({"countries": {}}))
        }
    }

    struct FixedFactory(Arc<RecordingCatalog>);

    impl ClientFactory for FixedFactory {
        fn client(&self) -> anyhow::Result<Arc<dyn CatalogClient>> {
            Ok(self.0.clone())
        }
    }

    fn gateway_with(catalog: RecordingCatalog) -> (CatalogGateway, Arc<RecordingCatalog>) {
        let catalog = Arc::new(catalog);
        let gateway = CatalogGateway::new(Arc::new(FixedFactory(catalog.clone())));
        (gateway, catalog)
    }

    #[tokio::test]
    async fn test_search_defaults() {
        let (gateway, catalog) = gateway_with(RecordingCatalog::default());
        let params = SearchParams {
            q: Some("daft punk".to_string()),
            ..Default::default()
        };

        let results = gateway.search(&params).await.unwrap();
        assert_eq!(results.query, "daft punk");
        assert_eq!(results.results, json!([{"title": "daft punk"}]));
        assert_eq!(catalog.calls(), vec!["search:daft punk:None:20"]);
    }

    #[tokio::test]
    async fn test_search_with_filter_and_limit() {
        let (gateway, catalog) = gateway_with(RecordingCatalog::default());
        let params = SearchParams {
            q: Some("x".to_string()),
            filter: Some("songs".to_string()),
            limit: Some("5".to_string()),
        };

        gateway.search(&params).await.unwrap();
        assert_eq!(catalog.calls(), vec!["search:x:Some(Songs):5"]);
    }

    #[tokio::test]
    async fn test_missing_parameters_make_no_calls() {
        let (gateway, catalog) = gateway_with(RecordingCatalog::default());

        let empty_query = SearchParams {
            q: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            gateway.search(&empty_query).await,
            Err(GatewayError::InvalidRequest(_))
        ));

        let bad_limit = SearchParams {
            q: Some("x".to_string()),
            limit: Some("ten".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            gateway.search(&bad_limit).await,
            Err(GatewayError::InvalidRequest(_))
        ));

        let bad_filter = SearchParams {
            q: Some("x".to_string()),
            filter: Some("tracks".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            gateway.search(&bad_filter).await,
            Err(GatewayError::InvalidRequest(_))
        ));

        assert!(matches!(
            gateway.create_playlist(CreatePlaylist::default()).await,
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            gateway.add_playlist_items("PL1", &[]).await,
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            gateway.remove_playlist_items("PL1", &[]).await,
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            gateway.watch_playlist(&WatchPlaylistParams::default()).await,
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            gateway.artist("  ").await,
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            gateway
                .library_playlists(&LibraryParams {
                    limit: Some("-1".to_string())
                })
                .await,
            Err(GatewayError::InvalidRequest(_))
        ));

        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_message_passed_through() {
        let (gateway, _catalog) =
            gateway_with(RecordingCatalog::failing("Server returned HTTP 404: Not Found."));

        let err = gateway.album("MPREb_missing").await.unwrap_err();
        match err {
            GatewayError::UpstreamFailure(message) => {
                assert_eq!(message, "Server returned HTTP 404: Not Found.")
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = gateway.charts(&ChartsParams::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Server returned HTTP 404: Not Found.");
    }

    #[tokio::test]
    async fn test_factory_failure_is_upstream() {
        struct BrokenFactory;

        impl ClientFactory for BrokenFactory {
            fn client(&self) -> anyhow::Result<Arc<dyn CatalogClient>> {
                anyhow::bail!("auth file unreadable")
            }
        }

        let gateway = CatalogGateway::new(Arc::new(BrokenFactory));
        let err = gateway.song("abc").await.unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamFailure(ref m) if m.contains("auth file unreadable")));
    }

    #[tokio::test]
    async fn test_create_playlist_then_add_items() {
        let (gateway, catalog) = gateway_with(RecordingCatalog::default());
        let created = gateway
            .create_playlist(CreatePlaylist {
                title: Some("Road Trip".to_string()),
                video_ids: vec!["a".to_string(), "b".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.playlist_id, json!("PLnew"));
        assert_eq!(created.title, "Road Trip");
        assert_eq!(created.message, "Playlist created successfully");
        assert_eq!(
            catalog.calls(),
            vec!["create:Road Trip:PRIVATE", "add:PLnew:a,b"]
        );
    }

    #[tokio::test]
    async fn test_create_playlist_without_items_skips_add() {
        let (gateway, catalog) = gateway_with(RecordingCatalog::default());
        gateway
            .create_playlist(CreatePlaylist {
                title: Some("Empty".to_string()),
                privacy_status: Some("public".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(catalog.calls(), vec!["create:Empty:PUBLIC"]);
    }

    #[tokio::test]
    async fn test_watch_playlist_optional_playlist() {
        let (gateway, catalog) = gateway_with(RecordingCatalog::default());
        gateway
            .watch_playlist(&WatchPlaylistParams {
                video_id: Some("v1".to_string()),
                playlist_id: Some(String::new()),
            })
            .await
            .unwrap();
        gateway
            .watch_playlist(&WatchPlaylistParams {
                video_id: Some("v1".to_string()),
                playlist_id: Some("PL9".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(
            catalog.calls(),
            vec!["watch:v1:None", "watch:v1:Some(\"PL9\")"]
        );
    }
}
