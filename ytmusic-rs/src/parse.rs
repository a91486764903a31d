//! The handful of response extractions the client performs itself.
//! Everything else is handed back as raw innertube JSON.

use regex::Regex;
use serde_json::Value;

/// Collect every value stored under `key`, depth first.
pub fn find_all<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut found = Vec::new();
    collect(value, key, &mut found);
    found
}

fn collect<'a>(value: &'a Value, key: &str, found: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    found.push(v);
                }
                collect(v, key, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, key, found);
            }
        }
        _ => {}
    }
}

/// Flatten the result shelves of a search response, top result card first.
pub fn search_items(response: &Value, limit: usize) -> Vec<Value> {
    let mut items: Vec<Value> = find_all(response, "musicCardShelfRenderer")
        .into_iter()
        .cloned()
        .collect();

    for shelf in find_all(response, "musicShelfRenderer") {
        if let Some(contents) = shelf["contents"].as_array() {
            items.extend(contents.iter().cloned());
        }
    }

    items.truncate(limit);
    items
}

/// Items of the first grid in a browse response (library pages).
pub fn grid_items(response: &Value, limit: usize) -> Vec<Value> {
    let mut items: Vec<Value> = find_all(response, "gridRenderer")
        .first()
        .and_then(|grid| grid["items"].as_array())
        .cloned()
        .unwrap_or_default();

    items.truncate(limit);
    items
}

/// Map each requested video id to the `setVideoId` of its playlist entry.
pub fn set_video_ids(playlist: &Value, video_ids: &[String]) -> Vec<(String, Option<String>)> {
    let entries: Vec<(&str, &str)> = find_all(playlist, "playlistItemData")
        .into_iter()
        .filter_map(|data| {
            Some((
                data["videoId"].as_str()?,
                data["playlistSetVideoId"].as_str()?,
            ))
        })
        .collect();

    video_ids
        .iter()
        .map(|video_id| {
            let set_id = entries
                .iter()
                .find(|(id, _)| id == video_id)
                .map(|(_, set_id)| set_id.to_string());
            (video_id.clone(), set_id)
        })
        .collect()
}

/// Lyrics live behind a `MPLY` browse id linked from the watch panel.
pub fn lyrics_browse_id(watch: &Value) -> Option<String> {
    find_all(watch, "browseId")
        .into_iter()
        .filter_map(Value::as_str)
        .find(|id| id.starts_with("MPLY"))
        .map(str::to_string)
}

/// Pull `VISITOR_DATA` out of the music.youtube.com bootstrap page.
pub fn visitor_data(html: &str) -> Option<String> {
    let re = Regex::new(r#""VISITOR_DATA"\s*:\s*"([^"]+)""#).ok()?;
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
