use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ytmusic_rs::parse::find_all;

#[derive(Debug, Deserialize)]
struct SearchResults {
    results: Vec<Value>,
    query: String,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    message: String,
    #[serde(default)]
    warnings: Vec<Warning>,
}

#[derive(Debug, Deserialize)]
struct Warning {
    stage: String,
    diagnostic: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    stage: Option<String>,
}

#[derive(Debug, Serialize)]
struct PlaylistCreate {
    title: String,
    description: String,
    privacy_status: String,
    video_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct VideoIds {
    video_ids: Vec<String>,
}

#[derive(Parser)]
#[command(name = "ytm-client")]
#[command(about = "YTM Station CLI Client", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(short, long, default_value = "http://localhost:8000")]
    server: String,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Parser)]
enum Command {
    /// Check that the server is up
    Health,
    /// Search the catalog
    Search {
        query: String,
        /// songs, videos, albums, artists, playlists, ...
        #[arg(short, long)]
        filter: Option<String>,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show artist details
    Artist { id: String },
    /// Show album details
    Album { id: String },
    /// Show song details
    Song { id: String },
    /// Up-next queue for a video
    Watch {
        video_id: String,
        #[arg(short, long)]
        playlist_id: Option<String>,
    },
    /// Show lyrics for a video
    Lyrics { video_id: String },
    /// List playlists in the signed-in library
    Library {
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show charts
    Charts {
        #[arg(short, long)]
        country: Option<String>,
    },
    /// Playlist management commands
    #[command(subcommand)]
    Playlist(PlaylistCommand),
    /// Download into the library
    #[command(subcommand)]
    Download(DownloadCommand),
}

#[derive(Parser)]
enum PlaylistCommand {
    /// Show playlist details
    Info {
        /// Playlist ID
        id: String,
    },
    /// Create a new playlist
    Create {
        /// Playlist title
        title: String,
        /// Playlist description
        #[arg(short, long, default_value = "")]
        description: String,
        /// PUBLIC, PRIVATE or UNLISTED
        #[arg(short, long, default_value = "PRIVATE")]
        privacy: String,
        /// Videos to add right away
        video_ids: Vec<String>,
    },
    /// Add videos to a playlist
    Add {
        /// Playlist ID
        playlist_id: String,
        /// Video IDs to add
        video_ids: Vec<String>,
    },
    /// Remove videos from a playlist
    Remove {
        /// Playlist ID
        playlist_id: String,
        /// Video IDs to remove
        video_ids: Vec<String>,
    },
    /// Delete a playlist
    Delete {
        /// Playlist ID
        id: String,
    },
}

#[derive(Parser)]
enum DownloadCommand {
    /// Download one song
    Song { video_id: String },
    /// Download every song of a playlist
    Playlist { playlist_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let server = cli.server.trim_end_matches('/');

    match cli.command.unwrap_or(Command::Health) {
        Command::Health => health(&client, server).await?,
        Command::Search {
            query,
            filter,
            limit,
        } => search(&client, server, &query, filter, limit).await?,
        Command::Artist { id } => show(&client, server, &format!("artist/{}", id), &[]).await?,
        Command::Album { id } => show(&client, server, &format!("album/{}", id), &[]).await?,
        Command::Song { id } => show(&client, server, &format!("song/{}", id), &[]).await?,
        Command::Watch {
            video_id,
            playlist_id,
        } => {
            let mut query = vec![("video_id", video_id)];
            if let Some(playlist_id) = playlist_id {
                query.push(("playlist_id", playlist_id));
            }
            show(&client, server, "watch-playlist", &query).await?
        }
        Command::Lyrics { video_id } => {
            show(&client, server, &format!("lyrics/{}", video_id), &[]).await?
        }
        Command::Library { limit } => {
            let query: Vec<_> = limit.map(|l| ("limit", l.to_string())).into_iter().collect();
            show(&client, server, "library/playlists", &query).await?
        }
        Command::Charts { country } => {
            let query: Vec<_> = country.map(|c| ("country", c)).into_iter().collect();
            show(&client, server, "charts", &query).await?
        }
        Command::Playlist(playlist_cmd) => {
            handle_playlist_command(&client, server, playlist_cmd).await?
        }
        Command::Download(download_cmd) => {
            handle_download_command(&client, server, download_cmd).await?
        }
    }

    Ok(())
}

/// Turn a non-success response into an error carrying the server's message
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            error,
            stage: Some(stage),
        }) => anyhow::bail!("Server returned {} during {}: {}", status, stage, error),
        Ok(ErrorBody { error, .. }) => anyhow::bail!("Server returned {}: {}", status, error),
        Err(_) => anyhow::bail!("Server returned error: {}", status),
    }
}

async fn health(client: &reqwest::Client, server: &str) -> Result<()> {
    let response = client
        .get(format!("{}/health", server))
        .send()
        .await
        .context("Failed to connect to server")?;
    let body: Value = check(response)
        .await?
        .json()
        .await
        .context("Failed to parse response")?;

    println!(
        "✓ {} is {}",
        body["service"].as_str().unwrap_or("server"),
        body["status"].as_str().unwrap_or("unknown")
    );
    Ok(())
}

async fn search(
    client: &reqwest::Client,
    server: &str,
    query: &str,
    filter: Option<String>,
    limit: Option<u32>,
) -> Result<()> {
    let mut params = vec![("q", query.to_string())];
    if let Some(filter) = filter {
        params.push(("filter", filter));
    }
    if let Some(limit) = limit {
        params.push(("limit", limit.to_string()));
    }

    let response = client
        .get(format!("{}/search", server))
        .query(&params)
        .send()
        .await
        .context("Failed to connect to server")?;
    let results: SearchResults = check(response)
        .await?
        .json()
        .await
        .context("Failed to parse response")?;

    if results.results.is_empty() {
        println!("No results for '{}'.", results.query);
        return Ok(());
    }

    println!("Results for '{}' ({}):", results.query, results.results.len());
    println!("{:-<80}", "");

    for (idx, item) in results.results.iter().enumerate() {
        let hit = SearchHit::from_item(item);
        println!(
            "{}. {}",
            idx + 1,
            hit.title.as_deref().unwrap_or("Unknown Title")
        );
        if !hit.subtitle.is_empty() {
            println!("   {}", hit.subtitle);
        }
        if let Some(video_id) = &hit.video_id {
            println!("   videoId: {}", video_id);
        }
        if let Some(browse_id) = &hit.browse_id {
            println!("   browseId: {}", browse_id);
        }
        println!();
    }

    Ok(())
}

/// Display fields of one raw search result: a list row or the top-result card
#[derive(Debug, Default, PartialEq)]
struct SearchHit {
    title: Option<String>,
    subtitle: String,
    video_id: Option<String>,
    browse_id: Option<String>,
}

impl SearchHit {
    fn from_item(item: &Value) -> Self {
        if let Some(row) = item.get("musicResponsiveListItemRenderer") {
            let columns: Vec<String> = row["flexColumns"]
                .as_array()
                .map(|columns| {
                    columns
                        .iter()
                        .map(|c| runs_text(&c["musicResponsiveListItemFlexColumnRenderer"]["text"]))
                        .filter(|text| !text.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            let video_id = row["playlistItemData"]["videoId"]
                .as_str()
                .or_else(|| find_all(row, "videoId").into_iter().find_map(Value::as_str));

            SearchHit {
                title: columns.first().cloned(),
                subtitle: columns.get(1..).unwrap_or_default().join(" "),
                video_id: video_id.map(str::to_string),
                browse_id: browse_endpoint_id(&row["navigationEndpoint"]),
            }
        } else if let Some(card) = item.get("musicCardShelfRenderer") {
            let title_run = &card["title"]["runs"][0];
            SearchHit {
                title: Some(runs_text(&card["title"])).filter(|t| !t.is_empty()),
                subtitle: runs_text(&card["subtitle"]),
                video_id: title_run["navigationEndpoint"]["watchEndpoint"]["videoId"]
                    .as_str()
                    .map(str::to_string),
                browse_id: browse_endpoint_id(&title_run["navigationEndpoint"]),
            }
        } else {
            SearchHit::default()
        }
    }
}

fn runs_text(text: &Value) -> String {
    text["runs"]
        .as_array()
        .map(|runs| runs.iter().filter_map(|r| r["text"].as_str()).collect())
        .unwrap_or_default()
}

fn browse_endpoint_id(endpoint: &Value) -> Option<String> {
    endpoint["browseEndpoint"]["browseId"]
        .as_str()
        .map(str::to_string)
}

/// Fetch a catalog resource and pretty-print it
async fn show(
    client: &reqwest::Client,
    server: &str,
    path: &str,
    query: &[(&str, String)],
) -> Result<()> {
    let response = client
        .get(format!("{}/{}", server, path))
        .query(query)
        .send()
        .await
        .context("Failed to connect to server")?;
    let body: Value = check(response)
        .await?
        .json()
        .await
        .context("Failed to parse response")?;

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn handle_playlist_command(
    client: &reqwest::Client,
    server: &str,
    cmd: PlaylistCommand,
) -> Result<()> {
    match cmd {
        PlaylistCommand::Info { id } => {
            show(client, server, &format!("playlist/{}", id), &[]).await
        }
        PlaylistCommand::Create {
            title,
            description,
            privacy,
            video_ids,
        } => {
            let body = PlaylistCreate {
                title,
                description,
                privacy_status: privacy,
                video_ids,
            };
            let response = client
                .post(format!("{}/playlist/create", server))
                .json(&body)
                .send()
                .await
                .context("Failed to connect to server")?;
            let created: Value = check(response)
                .await?
                .json()
                .await
                .context("Failed to parse response")?;

            println!("✓ Playlist created successfully!");
            println!("ID:    {}", created["playlist_id"]);
            println!("Title: {}", created["title"]);
            Ok(())
        }
        PlaylistCommand::Add {
            playlist_id,
            video_ids,
        } => {
            let count = video_ids.len();
            let response = client
                .post(format!("{}/playlist/{}/items", server, playlist_id))
                .json(&VideoIds { video_ids })
                .send()
                .await
                .context("Failed to connect to server")?;
            check(response).await?;

            println!("✓ Added {} video(s) to playlist!", count);
            Ok(())
        }
        PlaylistCommand::Remove {
            playlist_id,
            video_ids,
        } => {
            let count = video_ids.len();
            let response = client
                .delete(format!("{}/playlist/{}/items/remove", server, playlist_id))
                .json(&VideoIds { video_ids })
                .send()
                .await
                .context("Failed to connect to server")?;
            check(response).await?;

            println!("✓ Removed {} video(s) from playlist!", count);
            Ok(())
        }
        PlaylistCommand::Delete { id } => {
            let response = client
                .delete(format!("{}/playlist/{}/delete", server, id))
                .send()
                .await
                .context("Failed to connect to server")?;
            check(response).await?;

            println!("✓ Playlist deleted successfully!");
            Ok(())
        }
    }
}

async fn handle_download_command(
    client: &reqwest::Client,
    server: &str,
    cmd: DownloadCommand,
) -> Result<()> {
    let (url, body) = match cmd {
        DownloadCommand::Song { video_id } => (
            format!("{}/download/song", server),
            serde_json::json!({ "video_id": video_id }),
        ),
        DownloadCommand::Playlist { playlist_id } => (
            format!("{}/download/playlist", server),
            serde_json::json!({ "playlist_id": playlist_id }),
        ),
    };

    println!("Downloading... this can take a while");

    // Downloads run to completion before the server answers.
    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .context("Failed to connect to server")?;
    let result: DownloadResponse = check(response)
        .await?
        .json()
        .await
        .context("Failed to parse response")?;

    println!("✓ {}", result.message);
    for warning in &result.warnings {
        println!("  ⚠️  {}: {}", warning.stage, warning.diagnostic);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn column(runs: Value) -> Value {
        json!({ "musicResponsiveListItemFlexColumnRenderer": { "text": { "runs": runs } } })
    }

    #[test]
    fn test_song_row() {
        let item = json!({ "musicResponsiveListItemRenderer": {
            "flexColumns": [
                column(json!([{ "text": "Bohemian Rhapsody",
                    "navigationEndpoint": { "watchEndpoint": { "videoId": "fJ9rUzIMcZQ" } } }])),
                column(json!([
                    { "text": "Song" }, { "text": " • " },
                    { "text": "Queen", "navigationEndpoint": {
                        "browseEndpoint": { "browseId": "UCiMhD4jzUqG-IgPzUmmytRQ" } } }
                ])),
            ],
            "playlistItemData": { "videoId": "fJ9rUzIMcZQ" }
        }});

        let hit = SearchHit::from_item(&item);
        assert_eq!(hit.title.as_deref(), Some("Bohemian Rhapsody"));
        assert_eq!(hit.subtitle, "Song • Queen");
        assert_eq!(hit.video_id.as_deref(), Some("fJ9rUzIMcZQ"));
        assert_eq!(hit.browse_id, None);
    }

    #[test]
    fn test_album_row() {
        let item = json!({ "musicResponsiveListItemRenderer": {
            "flexColumns": [column(json!([{ "text": "A Night at the Opera" }]))],
            "navigationEndpoint": { "browseEndpoint": { "browseId": "MPREb_abc" } }
        }});

        let hit = SearchHit::from_item(&item);
        assert_eq!(hit.title.as_deref(), Some("A Night at the Opera"));
        assert_eq!(hit.video_id, None);
        assert_eq!(hit.browse_id.as_deref(), Some("MPREb_abc"));
    }

    #[test]
    fn test_top_result_card() {
        let item = json!({ "musicCardShelfRenderer": {
            "title": { "runs": [{ "text": "Queen", "navigationEndpoint": {
                "browseEndpoint": { "browseId": "UCiMhD4jzUqG-IgPzUmmytRQ" } } }] },
            "subtitle": { "runs": [{ "text": "Artist" }] }
        }});

        let hit = SearchHit::from_item(&item);
        assert_eq!(hit.title.as_deref(), Some("Queen"));
        assert_eq!(hit.subtitle, "Artist");
        assert_eq!(hit.browse_id.as_deref(), Some("UCiMhD4jzUqG-IgPzUmmytRQ"));
    }

    #[test]
    fn test_unknown_shape() {
        assert_eq!(SearchHit::from_item(&json!({ "title": "x" })), SearchHit::default());
    }
}
