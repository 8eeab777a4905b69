use std::env;
use std::time::Duration;

// TCGCSV category 3 is the Pokemon catalog.
const DEFAULT_SOURCE_BASE_URL: &str = "https://tcgcsv.com/tcgplayer/3";

#[derive(Debug, Clone)]
pub struct Config {
    pub source_base_url: String,
    pub webhook_url: Option<String>,
    pub data_dir: String,
    pub refresh_interval: Duration,
    pub http_timeout: Duration,
    pub max_sets: usize,
    pub max_groups_per_refresh: usize,
    pub fetch_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let source_base_url = env::var("SOURCE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_SOURCE_BASE_URL.to_string());

        let webhook_url = env::var("DISCORD_WEBHOOK_URL").ok().filter(|url| !url.is_empty());

        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

        let refresh_interval_secs: u64 = env::var("REFRESH_INTERVAL_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse()?;

        let http_timeout_secs: u64 = env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;

        let max_sets: usize = env::var("MAX_SETS")
            .unwrap_or_else(|_| "50".to_string())
            .parse()?;

        let max_groups_per_refresh: usize = env::var("MAX_GROUPS_PER_REFRESH")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;

        let fetch_concurrency: usize = env::var("FETCH_CONCURRENCY")
            .unwrap_or_else(|_| "4".to_string())
            .parse()?;

        if fetch_concurrency == 0 {
            return Err("FETCH_CONCURRENCY must be at least 1".into());
        }

        Ok(Config {
            source_base_url,
            webhook_url,
            data_dir,
            refresh_interval: Duration::from_secs(refresh_interval_secs),
            http_timeout: Duration::from_secs(http_timeout_secs),
            max_sets,
            max_groups_per_refresh,
            fetch_concurrency,
        })
    }
}
