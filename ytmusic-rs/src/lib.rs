//! YouTube Music client
//!
//! A small async client for the innertube API that music.youtube.com uses.
//! Responses are returned as raw JSON; only search and library results are
//! flattened so callers can apply a result limit.

pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod parse;

pub use api::YtMusicApi;
pub use auth::{Credentials, OAuthToken};
pub use error::{Result, YtMusicError};
pub use models::*;
