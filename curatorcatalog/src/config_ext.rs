//! Catalog settings stored in curatorconfig
//!
//! ```rust,ignore
//! use curatorconfig::get_config;
//! use curatorcatalog::CatalogConfigExt;
//!
//! let config = get_config();
//! let client = config.catalog_client()?;
//! let settings = config.catalog_settings();
//! ```

use std::time::Duration;

use anyhow::Result;
use curatorconfig::Config;

use crate::catalog::CatalogSettings;
use crate::client::{ClientBuilder, CuratorClient, DEFAULT_API_KEY, DEFAULT_SEARCH_URL};
use crate::track::DEFAULT_ALBUM_ART;

const SEARCH_URL: &[&str] = &["catalog", "search", "url"];
const API_KEY: &[&str] = &["catalog", "search", "api_key"];
const SEARCH_LIMIT: &[&str] = &["catalog", "search", "limit"];
const FUZZY_THRESHOLD: &[&str] = &["catalog", "search", "fuzzy_ranking_threshold"];
const REQUEST_TIMEOUT: &[&str] = &["catalog", "search", "request_timeout_secs"];
const SUGGESTION_LIMIT: &[&str] = &["catalog", "suggestions", "limit"];
const SUGGESTION_SAMPLE: &[&str] = &["catalog", "suggestions", "sample_size"];
const SHUFFLE_POOL_LIMIT: &[&str] = &["catalog", "shuffle", "pool_limit"];
const SHUFFLE_PAGE_SIZE: &[&str] = &["catalog", "shuffle", "page_size"];
const MIN_LOADING_MS: &[&str] = &["catalog", "ux", "min_loading_ms"];
const EMPTY_RESULT_DELAY_MS: &[&str] = &["catalog", "ux", "empty_result_delay_ms"];
const DEFAULT_ART: &[&str] = &["catalog", "tracks", "default_album_art"];

/// Typed access to the `catalog` section of the configuration
pub trait CatalogConfigExt {
    fn get_search_url(&self) -> String;
    fn set_search_url(&self, url: String) -> Result<()>;

    fn get_search_api_key(&self) -> String;
    fn set_search_api_key(&self, key: String) -> Result<()>;

    /// Result bound of both search passes (default: 20)
    fn get_search_limit(&self) -> usize;
    fn set_search_limit(&self, limit: usize) -> Result<()>;

    /// Ranking-score floor of the fuzzy pass (default: 0.3)
    fn get_fuzzy_threshold(&self) -> f64;
    fn set_fuzzy_threshold(&self, threshold: f64) -> Result<()>;

    /// Client-wide request timeout (default: 15 s)
    fn get_request_timeout(&self) -> Duration;
    fn set_request_timeout_secs(&self, secs: usize) -> Result<()>;

    fn get_suggestion_limit(&self) -> usize;
    fn get_suggestion_sample_size(&self) -> usize;
    fn get_shuffle_pool_limit(&self) -> usize;
    fn get_shuffle_page_size(&self) -> usize;
    fn set_shuffle_page_size(&self, size: usize) -> Result<()>;

    fn get_min_loading(&self) -> Duration;
    fn get_empty_result_delay(&self) -> Duration;

    fn get_default_album_art(&self) -> String;

    /// Every catalog tunable at once
    fn catalog_settings(&self) -> CatalogSettings;

    /// Client configured with the search URL, key and timeout
    fn catalog_client(&self) -> Result<CuratorClient>;
}

impl CatalogConfigExt for Config {
    fn get_search_url(&self) -> String {
        self.get_string(SEARCH_URL, DEFAULT_SEARCH_URL)
    }

    fn set_search_url(&self, url: String) -> Result<()> {
        self.set_string(SEARCH_URL, url)
    }

    fn get_search_api_key(&self) -> String {
        self.get_string(API_KEY, DEFAULT_API_KEY)
    }

    fn set_search_api_key(&self, key: String) -> Result<()> {
        self.set_string(API_KEY, key)
    }

    fn get_search_limit(&self) -> usize {
        self.get_usize(SEARCH_LIMIT, 20)
    }

    fn set_search_limit(&self, limit: usize) -> Result<()> {
        self.set_usize(SEARCH_LIMIT, limit)
    }

    fn get_fuzzy_threshold(&self) -> f64 {
        self.get_f64(FUZZY_THRESHOLD, 0.3)
    }

    fn set_fuzzy_threshold(&self, threshold: f64) -> Result<()> {
        self.set_f64(FUZZY_THRESHOLD, threshold)
    }

    fn get_request_timeout(&self) -> Duration {
        Duration::from_secs(self.get_usize(REQUEST_TIMEOUT, 15) as u64)
    }

    fn set_request_timeout_secs(&self, secs: usize) -> Result<()> {
        self.set_usize(REQUEST_TIMEOUT, secs)
    }

    fn get_suggestion_limit(&self) -> usize {
        self.get_usize(SUGGESTION_LIMIT, 10)
    }

    fn get_suggestion_sample_size(&self) -> usize {
        self.get_usize(SUGGESTION_SAMPLE, 3)
    }

    fn get_shuffle_pool_limit(&self) -> usize {
        self.get_usize(SHUFFLE_POOL_LIMIT, 1000)
    }

    fn get_shuffle_page_size(&self) -> usize {
        self.get_usize(SHUFFLE_PAGE_SIZE, 3)
    }

    fn set_shuffle_page_size(&self, size: usize) -> Result<()> {
        self.set_usize(SHUFFLE_PAGE_SIZE, size)
    }

    fn get_min_loading(&self) -> Duration {
        Duration::from_millis(self.get_usize(MIN_LOADING_MS, 1000) as u64)
    }

    fn get_empty_result_delay(&self) -> Duration {
        Duration::from_millis(self.get_usize(EMPTY_RESULT_DELAY_MS, 500) as u64)
    }

    fn get_default_album_art(&self) -> String {
        self.get_string(DEFAULT_ART, DEFAULT_ALBUM_ART)
    }

    fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            search_limit: self.get_search_limit(),
            fuzzy_threshold: self.get_fuzzy_threshold(),
            suggestion_limit: self.get_suggestion_limit(),
            suggestion_sample: self.get_suggestion_sample_size(),
            shuffle_pool_limit: self.get_shuffle_pool_limit(),
            shuffle_page_size: self.get_shuffle_page_size().max(1),
            min_loading: self.get_min_loading(),
            empty_result_delay: self.get_empty_result_delay(),
            default_album_art: self.get_default_album_art(),
        }
    }

    fn catalog_client(&self) -> Result<CuratorClient> {
        let client = ClientBuilder::new()
            .search_url(self.get_search_url())
            .api_key(self.get_search_api_key())
            .timeout(self.get_request_timeout())
            .build()?;
        Ok(client)
    }
}
