//! Credential file handling.
//!
//! Two file layouts are accepted: an OAuth token file (anything with an
//! `access_token` key) or a flat map of browser request headers copied from
//! an authenticated music.youtube.com session. Browser sessions are
//! re-signed on every request with a fresh `SAPISIDHASH` derived from the
//! `SAPISID` cookie.

use crate::error::{Result, YtMusicError};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

const DEFAULT_ORIGIN: &str = "https://music.youtube.com";

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Clone, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    OAuth(OAuthToken),
    Browser(BTreeMap<String, String>),
}

impl Credentials {
    /// Load credentials from `path`. A missing file yields anonymous access.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "Auth file {} not found, using anonymous access (limited functionality)",
                path.display()
            );
            return Ok(Credentials::Anonymous);
        }

        let raw = std::fs::read_to_string(path)?;
        let credentials = Self::from_json(&raw)?;
        info!("Loaded {} credentials from {}", credentials.kind(), path.display());
        Ok(credentials)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let object = value
            .as_object()
            .ok_or_else(|| YtMusicError::Auth("expected a JSON object".to_string()))?;

        if object.contains_key("access_token") {
            let token: OAuthToken = serde_json::from_value(value.clone())?;
            if let Some(expires_at) = token.expires_at {
                if expires_at < chrono::Utc::now().timestamp() {
                    warn!("OAuth access token expired at {}", expires_at);
                }
            }
            return Ok(Credentials::OAuth(token));
        }

        let mut headers = BTreeMap::new();
        for (name, value) in object {
            let value = value.as_str().ok_or_else(|| {
                YtMusicError::Auth(format!("header '{}' must be a string", name))
            })?;
            headers.insert(name.to_lowercase(), value.to_string());
        }

        if !headers.contains_key("cookie") {
            return Err(YtMusicError::Auth(
                "browser headers must include a cookie".to_string(),
            ));
        }
        debug!("Parsed {} browser headers", headers.len());
        Ok(Credentials::Browser(headers))
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Credentials::Anonymous)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::Anonymous => "anonymous",
            Credentials::OAuth(_) => "oauth",
            Credentials::Browser(_) => "browser",
        }
    }

    /// Extra headers to attach to every innertube request
    pub fn headers(&self) -> Vec<(String, String)> {
        match self {
            Credentials::Anonymous => Vec::new(),
            Credentials::OAuth(token) => vec![(
                "authorization".to_string(),
                format!("{} {}", token.token_type, token.access_token),
            )],
            Credentials::Browser(headers) => {
                let authorization = sapisid(headers).map(|cookie_value| {
                    let origin = headers
                        .get("x-origin")
                        .or_else(|| headers.get("origin"))
                        .map(String::as_str)
                        .unwrap_or(DEFAULT_ORIGIN);
                    sapisid_hash(cookie_value, origin, chrono::Utc::now().timestamp())
                });
                if authorization.is_none() {
                    debug!("No SAPISID cookie found, sending stored authorization header");
                }

                let mut out: Vec<(String, String)> = headers
                    .iter()
                    .filter(|(name, _)| !matches!(name.as_str(), "content-length" | "host"))
                    .filter(|(name, _)| authorization.is_none() || name.as_str() != "authorization")
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                if let Some(authorization) = authorization {
                    out.push(("authorization".to_string(), authorization));
                }
                out
            }
        }
    }
}

/// `SAPISID` (or its `__Secure-3PAPISID` twin) from the stored cookie header
fn sapisid(headers: &BTreeMap<String, String>) -> Option<&str> {
    let cookie = headers.get("cookie")?;
    let mut secure = None;
    for pair in cookie.split(';') {
        match pair.trim().split_once('=') {
            Some(("SAPISID", value)) => return Some(value),
            Some(("__Secure-3PAPISID", value)) => secure = Some(value),
            _ => {}
        }
    }
    secure
}

/// Authorization value YouTube expects from a signed-in browser:
/// `SAPISIDHASH <ts>_<sha1("<ts> <sapisid> <origin>")>`.
pub fn sapisid_hash(sapisid: &str, origin: &str, timestamp: i64) -> String {
    let digest = Sha1::digest(format!("{} {} {}", timestamp, sapisid, origin).as_bytes());
    format!("SAPISIDHASH {}_{}", timestamp, hex::encode(digest))
}
