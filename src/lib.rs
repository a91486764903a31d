//! YTM Station - an HTTP facade over YouTube Music and a local music library
//!
//! Catalog endpoints forward to a music-catalog client through the
//! [`gateway`]; download endpoints run the [`pipeline`] that fetches media
//! with yt-dlp and files it into a beets-managed library.

pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod server;
