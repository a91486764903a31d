use crate::auth::Credentials;
use crate::error::{Result, YtMusicError};
use crate::models::*;
use crate::parse;
use reqwest::Client;
use serde_json::{json, Value};
use std::path::Path;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

const YTM_DOMAIN: &str = "https://music.youtube.com";
const YTM_BASE_API: &str = "https://music.youtube.com/youtubei/v1/";
const YTM_PARAMS: &str = "?alt=json";
const YTM_LANGUAGE: &str = "en";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:88.0) Gecko/20100101 Firefox/88.0";

pub struct YtMusicApi {
    client: Client,
    credentials: Credentials,
    visitor_id: OnceCell<Option<String>>,
}

impl YtMusicApi {
    pub fn new(credentials: Credentials) -> Result<Self> {
        info!(
            "Initializing YouTube Music client ({} access)",
            credentials.kind()
        );

        Ok(Self {
            client: Client::builder().user_agent(USER_AGENT).build()?,
            credentials,
            visitor_id: OnceCell::new(),
        })
    }

    /// Build a client from a credential file; a missing file means anonymous access.
    pub fn from_auth_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(Credentials::from_file(path)?)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    /// Search the catalog, returning at most `limit` flattened result items
    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn search(
        &self,
        query: &str,
        filter: Option<SearchFilter>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        info!("Searching for '{}' with filter {:?}", query, filter);
        let mut body = json!({ "query": query });
        if let Some(filter) = filter {
            body["params"] = json!(filter.params());
        }

        let response = self.send_request("search", body).await?;
        let items = parse::search_items(&response, limit);
        info!("Search returned {} items", items.len());
        Ok(items)
    }

    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn get_artist(&self, artist_id: &str) -> Result<Value> {
        info!("Fetching artist: {}", artist_id);
        self.browse(channel_id(artist_id)).await
    }

    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn get_album(&self, browse_id: &str) -> Result<Value> {
        info!("Fetching album: {}", browse_id);
        self.browse(browse_id).await
    }

    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn get_song(&self, video_id: &str) -> Result<Value> {
        info!("Fetching song: {}", video_id);
        let body = json!({
            "video_id": video_id,
            "videoId": video_id,
        });
        self.send_request("player", body).await
    }

    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn get_playlist(&self, playlist_id: &str) -> Result<Value> {
        info!("Fetching playlist: {}", playlist_id);
        self.browse(&browse_playlist_id(playlist_id)).await
    }

    /// Create a playlist. Returns the new playlist id, or the raw response
    /// when the server did not report one.
    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy_status: PrivacyStatus,
    ) -> Result<Value> {
        self.require_auth()?;
        info!("Creating playlist '{}' ({})", title, privacy_status.as_str());

        let body = json!({
            "title": title,
            "description": description.replace(['<', '>'], ""),
            "privacyStatus": privacy_status.as_str(),
        });

        let response = self.send_request("playlist/create", body).await?;
        match response.get("playlistId") {
            Some(id) if id.is_string() => Ok(id.clone()),
            _ => {
                warn!("Playlist creation response carried no playlistId");
                Ok(response)
            }
        }
    }

    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn add_playlist_items(&self, playlist_id: &str, video_ids: &[String]) -> Result<Value> {
        self.require_auth()?;
        info!("Adding {} items to playlist {}", video_ids.len(), playlist_id);

        let actions: Vec<Value> = video_ids
            .iter()
            .map(|video_id| {
                json!({
                    "action": "ACTION_ADD_VIDEO",
                    "addedVideoId": video_id,
                    "dedupeOption": "DEDUPE_OPTION_SKIP",
                })
            })
            .collect();

        self.edit_playlist(playlist_id, actions).await
    }

    /// Remove videos from a playlist. Entries are addressed by their
    /// `setVideoId`, which is looked up from the playlist contents first.
    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn remove_playlist_items(
        &self,
        playlist_id: &str,
        video_ids: &[String],
    ) -> Result<Value> {
        self.require_auth()?;
        info!("Removing {} items from playlist {}", video_ids.len(), playlist_id);

        let playlist = self.get_playlist(playlist_id).await?;
        let actions: Vec<Value> = parse::set_video_ids(&playlist, video_ids)
            .into_iter()
            .filter_map(|(video_id, set_id)| match set_id {
                Some(set_id) => Some(json!({
                    "action": "ACTION_REMOVE_VIDEO",
                    "removedVideoId": video_id,
                    "setVideoId": set_id,
                })),
                None => {
                    warn!("Video {} is not in playlist {}", video_id, playlist_id);
                    None
                }
            })
            .collect();

        if actions.is_empty() {
            return Err(YtMusicError::NotFound(format!(
                "None of the given videos are in playlist {}",
                playlist_id
            )));
        }

        self.edit_playlist(playlist_id, actions).await
    }

    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn delete_playlist(&self, playlist_id: &str) -> Result<Value> {
        self.require_auth()?;
        info!("Deleting playlist: {}", playlist_id);
        let body = json!({ "playlistId": bare_playlist_id(playlist_id) });
        self.send_request("playlist/delete", body).await
    }

    /// Up-next queue for a video, optionally within a playlist
    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn get_watch_playlist(
        &self,
        video_id: &str,
        playlist_id: Option<&str>,
    ) -> Result<Value> {
        info!("Fetching watch playlist for {}", video_id);
        let playlist_id = playlist_id
            .map(|id| bare_playlist_id(id).to_string())
            .unwrap_or_else(|| format!("RDAMVM{}", video_id));

        let body = json!({
            "enablePersistentPlaylistPanel": true,
            "isAudioOnly": true,
            "tunerSettingValue": "AUTOMIX_SETTING_NORMAL",
            "videoId": video_id,
            "playlistId": playlist_id,
        });
        self.send_request("next", body).await
    }

    /// Lyrics by lyrics browse id (`MPLY...`) or by video id
    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn get_lyrics(&self, id: &str) -> Result<Value> {
        let browse_id = if id.starts_with("MPLY") {
            id.to_string()
        } else {
            debug!("Resolving lyrics browse id for video {}", id);
            let watch = self.get_watch_playlist(id, None).await?;
            parse::lyrics_browse_id(&watch).ok_or_else(|| {
                YtMusicError::NotFound(format!("Lyrics not available for {}", id))
            })?
        };

        info!("Fetching lyrics: {}", browse_id);
        self.browse(&browse_id).await
    }

    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn get_library_playlists(&self, limit: usize) -> Result<Vec<Value>> {
        self.require_auth()?;
        info!("Fetching up to {} library playlists", limit);
        let response = self.browse("FEmusic_liked_playlists").await?;
        Ok(parse::grid_items(&response, limit))
    }

    #[instrument(skip(self), fields(service = "ytmusic"))]
    pub async fn get_charts(&self, country: Option<&str>) -> Result<Value> {
        info!("Fetching charts for {:?}", country);
        let mut body = json!({ "browseId": "FEmusic_charts" });
        if let Some(country) = country {
            body["formData"] = json!({ "selectedValues": [country] });
        }
        self.send_request("browse", body).await
    }

    async fn browse(&self, browse_id: &str) -> Result<Value> {
        self.send_request("browse", json!({ "browseId": browse_id }))
            .await
    }

    async fn edit_playlist(&self, playlist_id: &str, actions: Vec<Value>) -> Result<Value> {
        let body = json!({
            "playlistId": bare_playlist_id(playlist_id),
            "actions": actions,
        });
        self.send_request("browse/edit_playlist", body).await
    }

    fn require_auth(&self) -> Result<()> {
        if self.credentials.is_authenticated() {
            Ok(())
        } else {
            Err(YtMusicError::RequiresLogin)
        }
    }

    fn context(&self) -> Value {
        json!({
            "client": {
                "clientName": "WEB_REMIX",
                "clientVersion": client_version(),
                "hl": YTM_LANGUAGE,
            },
            "user": {},
        })
    }

    async fn visitor_id(&self) -> Option<String> {
        self.visitor_id
            .get_or_init(|| async {
                match self.fetch_visitor_id().await {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("Failed to fetch visitor id: {}", e);
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn fetch_visitor_id(&self) -> Result<Option<String>> {
        debug!("Fetching visitor id from {}", YTM_DOMAIN);
        let html = self.client.get(YTM_DOMAIN).send().await?.text().await?;
        Ok(parse::visitor_data(&html))
    }

    async fn send_request(&self, endpoint: &str, mut body: Value) -> Result<Value> {
        let url = format!("{}{}{}", YTM_BASE_API, endpoint, YTM_PARAMS);
        debug!("POST request to: {}", url);
        body["context"] = self.context();

        let mut req = self
            .client
            .post(&url)
            .header("accept", "*/*")
            .header("content-type", "application/json")
            .header("origin", YTM_DOMAIN)
            .header("x-origin", YTM_DOMAIN)
            .header("x-goog-authuser", "0")
            .json(&body);

        for (name, value) in self.credentials.headers() {
            req = req.header(name, value);
        }

        if !self.credentials.is_authenticated() {
            if let Some(visitor_id) = self.visitor_id().await {
                req = req.header("x-goog-visitor-id", visitor_id);
            }
        }

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!("Response received ({}), length: {} bytes", status, text.len());

        if !status.is_success() {
            let message = api_error_message(&text).unwrap_or_else(|| text.clone());
            error!("{} failed with {}: {}", endpoint, status, message);
            return Err(YtMusicError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// `WEB_REMIX` client version stamped with today's date
fn client_version() -> String {
    format!("1.{}.01.00", chrono::Utc::now().format("%Y%m%d"))
}

fn api_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}
