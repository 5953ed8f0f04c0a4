//! Season downloads from football-data.co.uk
//!
//! Each season file lands in the cache directory as `{league}_{season}.csv`
//! and is only fetched again when `refresh` is requested.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::csv_source::{load_csv, CsvOptions};
use crate::{FootyError, MatchRecord, Result, SourceConfig};

const MAX_ATTEMPTS: u32 = 3;

/// Retry an operation with exponential backoff
pub fn with_retry<T, F>(mut operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last_error = None;
    for attempt in 0..max_attempts {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                log::warn!("Attempt {} failed: {}", attempt + 1, e);
                last_error = Some(e);
                if attempt + 1 < max_attempts {
                    std::thread::sleep(Duration::from_millis(100 * 2u64.pow(attempt)));
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| FootyError::Config("max_attempts must be at least 1".into())))
}

/// Blocking downloader for season result files
pub struct SeasonDownloader {
    client: reqwest::blocking::Client,
    base_url: String,
    league: String,
    cache_dir: PathBuf,
}

impl SeasonDownloader {
    pub fn new(source: &SourceConfig, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("footy/0.1")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(SeasonDownloader {
            client,
            base_url: source.base_url.trim_end_matches('/').to_string(),
            league: source.league.clone(),
            cache_dir: cache_dir.into(),
        })
    }

    pub fn season_url(&self, season: &str) -> String {
        format!("{}/{}/{}.csv", self.base_url, season, self.league)
    }

    pub fn cache_path(&self, season: &str) -> PathBuf {
        self.cache_dir.join(format!("{}_{}.csv", self.league, season))
    }

    /// Make sure the season file is on disk, returning its path
    pub fn fetch_season(&self, season: &str, refresh: bool) -> Result<PathBuf> {
        let path = self.cache_path(season);
        if path.exists() && !refresh {
            log::debug!("Using cached {}", path.display());
            return Ok(path);
        }

        let url = self.season_url(season);
        log::info!("Downloading {}", url);
        let body = with_retry(|| self.get_bytes(&url), MAX_ATTEMPTS)?;

        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::write(&path, &body)?;
        log::info!("Saved {} bytes to {}", body.len(), path.display());
        Ok(path)
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    /// Download (or reuse) and parse every configured season
    ///
    /// A season that fails to download is logged and skipped so one missing
    /// file does not abort the sync.
    pub fn fetch_all(&self, seasons: &[String], options: &CsvOptions, refresh: bool) -> Vec<MatchRecord> {
        let mut all_matches = Vec::new();
        for season in seasons {
            let loaded = self
                .fetch_season(season, refresh)
                .and_then(|path| load_season(&path, season, options));
            match loaded {
                Ok(matches) => all_matches.extend(matches),
                Err(e) => log::warn!("Failed to load season {}: {}", season, e),
            }
        }
        all_matches
    }
}

/// Parse a season file, tagging rows with the season code
pub fn load_season(path: &Path, season: &str, options: &CsvOptions) -> Result<Vec<MatchRecord>> {
    let options = CsvOptions {
        season: Some(season.to_string()),
        ..options.clone()
    };
    load_csv(path, &options)
}
