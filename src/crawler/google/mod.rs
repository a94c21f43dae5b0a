//! # Google 財經採集模組
//!
//! - 來源域名：`www.google.com/finance`
//! - 抓取技術：HTTP GET 搭配 CSS Selector 解析。

use concat_string::concat_string;

use crate::{config::Site, declare::TickerEntry};

/// 前日收盤價
pub mod price;

/// Google Finance quote pages, `https://{host}/{quote_path}/{SYMBOL}:{EXCHANGE}`.
#[derive(Debug, Clone)]
pub struct Google {
    host: String,
    quote_path: String,
}

impl Google {
    pub fn new(site: &Site) -> Self {
        Google {
            host: site.host.trim_end_matches('/').to_string(),
            quote_path: site.quote_path.trim_matches('/').to_string(),
        }
    }

    pub fn quote_url(&self, entry: &TickerEntry) -> String {
        concat_string!(
            "https://",
            self.host,
            "/",
            self.quote_path,
            "/",
            urlencoding::encode(&entry.symbol),
            ":",
            entry.exchange.code()
        )
    }
}

impl Default for Google {
    fn default() -> Self {
        Google::new(&Site::default())
    }
}
