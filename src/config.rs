use std::{env, path::PathBuf, str::FromStr, time::Duration};

use ::config::{Config as config_config, File as config_file};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::{
    declare::{self, TickerEntry},
    logging,
    util::http::{self, ClientOptions},
};

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub site: Site,
    #[serde(default)]
    pub crawl: Crawl,
    #[serde(default = "declare::default_watchlist")]
    pub watchlist: Vec<TickerEntry>,
}

impl Default for App {
    fn default() -> Self {
        App {
            site: Default::default(),
            crawl: Default::default(),
            watchlist: declare::default_watchlist(),
        }
    }
}

const QUOTE_SITE_HOST: &str = "QUOTE_SITE_HOST";
const QUOTE_SITE_USER_AGENT: &str = "QUOTE_SITE_USER_AGENT";

/// 報價網站
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Site {
    pub host: String,
    pub quote_path: String,
    pub user_agent: String,
}

impl Default for Site {
    fn default() -> Self {
        Site {
            host: "www.google.com".to_string(),
            quote_path: "finance/quote".to_string(),
            user_agent: http::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

const CRAWL_PAUSE_MS: &str = "CRAWL_PAUSE_MS";
const CRAWL_TIMEOUT_SECS: &str = "CRAWL_TIMEOUT_SECS";
const CRAWL_CONNECT_TIMEOUT_SECS: &str = "CRAWL_CONNECT_TIMEOUT_SECS";

/// 抓取節奏
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Crawl {
    /// Pause after every ticker, in milliseconds.
    pub pause_ms: u64,
    /// Total request deadline. Unset leaves the client without one.
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

impl Default for Crawl {
    fn default() -> Self {
        Crawl {
            pause_ms: 1000,
            timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

impl Crawl {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl App {
    /// Loads `app.json` when present, falls back to the defaults otherwise,
    /// then applies the environment overrides.
    pub fn get() -> Result<Self> {
        let config_path = config_path();
        let app = if config_path.exists() {
            config_config::builder()
                .add_source(config_file::from(config_path))
                .build()
                .and_then(|c| c.try_deserialize::<App>())
                .map_err(|why| anyhow!("Failed to read {} because {:?}", CONFIG_PATH, why))?
        } else {
            App::default()
        };

        Ok(app.ensure_watchlist().override_with_env())
    }

    /// Options for the shared HTTP client.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            user_agent: self.site.user_agent.clone(),
            timeout: self.crawl.timeout_secs.map(Duration::from_secs),
            connect_timeout: self.crawl.connect_timeout_secs.map(Duration::from_secs),
        }
    }

    /// 空的追蹤清單視同未設定
    fn ensure_watchlist(mut self) -> Self {
        if self.watchlist.is_empty() {
            self.watchlist = declare::default_watchlist();
        }

        self
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(host) = env::var(QUOTE_SITE_HOST) {
            self.site.host = host;
        }

        if let Ok(user_agent) = env::var(QUOTE_SITE_USER_AGENT) {
            self.site.user_agent = user_agent;
        }

        if let Some(pause_ms) = env_u64(CRAWL_PAUSE_MS) {
            self.crawl.pause_ms = pause_ms;
        }

        if let Some(timeout) = env_u64(CRAWL_TIMEOUT_SECS) {
            self.crawl.timeout_secs = Some(timeout);
        }

        if let Some(timeout) = env_u64(CRAWL_CONNECT_TIMEOUT_SECS) {
            self.crawl.connect_timeout_secs = Some(timeout);
        }

        self
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let value = env::var(key).ok()?;
    match u64::from_str(value.trim()) {
        Ok(v) => Some(v),
        Err(why) => {
            logging::warn_file_async(format!(
                "Ignoring {}={} because {:?}",
                key, value, why
            ));
            None
        }
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
