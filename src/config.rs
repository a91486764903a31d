use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// How the catalog client is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ClientMode {
    /// Build one client at startup and reuse it
    #[default]
    Shared,
    /// Build a fresh client for every gateway call
    PerRequest,
}

/// Settings for the download-and-ingest pipeline
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Directory the downloader writes into and the importer scans
    pub library_dir: PathBuf,
    /// Media downloader executable (yt-dlp or a platform build of it)
    pub downloader: String,
    /// Library importer executable (beets)
    pub importer: String,
    /// Target audio codec passed to the downloader
    pub audio_format: String,
    /// Upper bound for any single stage
    pub stage_timeout: Duration,
    pub reindex_tracks: bool,
    pub reindex_collections: bool,
}

impl AcquisitionConfig {
    pub fn new(library_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
            downloader: "yt-dlp".to_string(),
            importer: "beet".to_string(),
            audio_format: "opus".to_string(),
            stage_timeout: Duration::from_secs(900),
            reindex_tracks: true,
            reindex_collections: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.library_dir.exists() {
            anyhow::bail!(
                "Library path does not exist: {}",
                self.library_dir.display()
            );
        }

        if !self.library_dir.is_dir() {
            anyhow::bail!(
                "Library path is not a directory: {}",
                self.library_dir.display()
            );
        }

        if self.stage_timeout.is_zero() {
            anyhow::bail!("Stage timeout must be greater than zero");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AcquisitionConfig::new("/music");
        assert_eq!(config.downloader, "yt-dlp");
        assert_eq!(config.importer, "beet");
        assert_eq!(config.audio_format, "opus");
        assert!(config.reindex_tracks);
        assert!(!config.reindex_collections);
    }

    #[test]
    fn test_validate_library_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AcquisitionConfig::new(dir.path()).validate().is_ok());

        let missing = AcquisitionConfig::new(dir.path().join("missing"));
        assert!(missing.validate().is_err());

        let file = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
        let not_dir = AcquisitionConfig::new(file.path());
        assert!(not_dir.validate().is_err());
    }
}
