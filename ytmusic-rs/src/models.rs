use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::YtMusicError;

/// Result category to restrict a search to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFilter {
    Songs,
    Videos,
    Albums,
    Artists,
    Playlists,
    CommunityPlaylists,
    FeaturedPlaylists,
    Profiles,
    Podcasts,
    Episodes,
}

impl SearchFilter {
    pub const ALL: [SearchFilter; 10] = [
        SearchFilter::Songs,
        SearchFilter::Videos,
        SearchFilter::Albums,
        SearchFilter::Artists,
        SearchFilter::Playlists,
        SearchFilter::CommunityPlaylists,
        SearchFilter::FeaturedPlaylists,
        SearchFilter::Profiles,
        SearchFilter::Podcasts,
        SearchFilter::Episodes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchFilter::Songs => "songs",
            SearchFilter::Videos => "videos",
            SearchFilter::Albums => "albums",
            SearchFilter::Artists => "artists",
            SearchFilter::Playlists => "playlists",
            SearchFilter::CommunityPlaylists => "community_playlists",
            SearchFilter::FeaturedPlaylists => "featured_playlists",
            SearchFilter::Profiles => "profiles",
            SearchFilter::Podcasts => "podcasts",
            SearchFilter::Episodes => "episodes",
        }
    }

    /// Encoded `params` value the web client sends for this filter.
    pub fn params(&self) -> String {
        const FILTERED: &str = "EgWKAQ";
        const SPELLING: &str = "AWoMEA4QChADEAQQCRAF";
        const PLAYLIST_PREFIX: &str = "EgeKAQQoA";
        const PLAYLIST_SPELLING: &str = "BagwQDhAKEAMQBBAJEAU%3D";

        match self {
            SearchFilter::Playlists => "Eg-KAQwIABAAGAAgACgBMABqChAEEAMQCRAFEAo%3D".to_string(),
            SearchFilter::CommunityPlaylists => {
                format!("{}EA{}", PLAYLIST_PREFIX, PLAYLIST_SPELLING)
            }
            SearchFilter::FeaturedPlaylists => {
                format!("{}Dg{}", PLAYLIST_PREFIX, PLAYLIST_SPELLING)
            }
            SearchFilter::Songs => format!("{}II{}", FILTERED, SPELLING),
            SearchFilter::Videos => format!("{}IQ{}", FILTERED, SPELLING),
            SearchFilter::Albums => format!("{}IY{}", FILTERED, SPELLING),
            SearchFilter::Artists => format!("{}Ig{}", FILTERED, SPELLING),
            SearchFilter::Profiles => format!("{}JY{}", FILTERED, SPELLING),
            SearchFilter::Podcasts => format!("{}JQ{}", FILTERED, SPELLING),
            SearchFilter::Episodes => format!("{}JI{}", FILTERED, SPELLING),
        }
    }
}

impl FromStr for SearchFilter {
    type Err = YtMusicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchFilter::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                let allowed: Vec<&str> = SearchFilter::ALL.iter().map(|f| f.as_str()).collect();
                YtMusicError::InvalidArgument(format!(
                    "Invalid filter '{}', must be one of: {}",
                    s,
                    allowed.join(", ")
                ))
            })
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility of a newly created playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrivacyStatus {
    Public,
    #[default]
    Private,
    Unlisted,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "PUBLIC",
            PrivacyStatus::Private => "PRIVATE",
            PrivacyStatus::Unlisted => "UNLISTED",
        }
    }
}

impl FromStr for PrivacyStatus {
    type Err = YtMusicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PUBLIC" => Ok(PrivacyStatus::Public),
            "PRIVATE" => Ok(PrivacyStatus::Private),
            "UNLISTED" => Ok(PrivacyStatus::Unlisted),
            _ => Err(YtMusicError::InvalidArgument(format!(
                "Invalid privacy status '{}', must be one of: PUBLIC, PRIVATE, UNLISTED",
                s
            ))),
        }
    }
}

/// Playlist id in the form `browse` expects (`VL` prefixed)
pub fn browse_playlist_id(playlist_id: &str) -> String {
    if playlist_id.starts_with("VL") {
        playlist_id.to_string()
    } else {
        format!("VL{}", playlist_id)
    }
}

/// Playlist id in the form the mutation endpoints expect (no `VL` prefix)
pub fn bare_playlist_id(playlist_id: &str) -> &str {
    playlist_id.strip_prefix("VL").unwrap_or(playlist_id)
}

/// Artist pages linked from albums use an `MPLA` prefixed id
pub fn channel_id(artist_id: &str) -> &str {
    artist_id.strip_prefix("MPLA").unwrap_or(artist_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_str() {
        assert_eq!("songs".parse::<SearchFilter>().unwrap(), SearchFilter::Songs);
        assert_eq!("ALBUMS".parse::<SearchFilter>().unwrap(), SearchFilter::Albums);
        assert_eq!(
            "community_playlists".parse::<SearchFilter>().unwrap(),
            SearchFilter::CommunityPlaylists
        );
        assert!("tracks".parse::<SearchFilter>().is_err());
    }

    #[test]
    fn test_filter_params() {
        assert_eq!(SearchFilter::Songs.params(), "EgWKAQIIAWoMEA4QChADEAQQCRAF");
        assert_eq!(SearchFilter::Artists.params(), "EgWKAQIgAWoMEA4QChADEAQQCRAF");
        assert_eq!(
            SearchFilter::CommunityPlaylists.params(),
            "EgeKAQQoAEABagwQDhAKEAMQBBAJEAU%3D"
        );
        assert_eq!(
            SearchFilter::FeaturedPlaylists.params(),
            "EgeKAQQoADgBagwQDhAKEAMQBBAJEAU%3D"
        );
    }

    #[test]
    fn test_privacy_status() {
        assert_eq!(PrivacyStatus::default(), PrivacyStatus::Private);
        assert_eq!("unlisted".parse::<PrivacyStatus>().unwrap(), PrivacyStatus::Unlisted);
        assert!("SECRET".parse::<PrivacyStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&PrivacyStatus::Public).unwrap(),
            "\"PUBLIC\""
        );
    }

    #[test]
    fn test_id_normalisation() {
        assert_eq!(browse_playlist_id("PLabc"), "VLPLabc");
        assert_eq!(browse_playlist_id("VLPLabc"), "VLPLabc");
        assert_eq!(bare_playlist_id("VLPLabc"), "PLabc");
        assert_eq!(bare_playlist_id("PLabc"), "PLabc");
        assert_eq!(channel_id("MPLAUCxyz"), "UCxyz");
        assert_eq!(channel_id("UCxyz"), "UCxyz");
    }
}
