use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// 交易所
///
/// Market codes as the quote site spells them in its URLs (`AAPL:NASDAQ`).
#[derive(
    Serialize, Deserialize, AsRefStr, Display, EnumString, Debug, Copy, Clone, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Exchange {
    /// Nasdaq Stock Market
    Nasdaq,
    /// New York Stock Exchange
    Nyse,
    /// NYSE Arca
    NyseArca,
    /// NYSE American
    NyseAmerican,
}

impl Exchange {
    /// Returns the upper-case market code, e.g. `NASDAQ`.
    pub fn code(&self) -> &str {
        self.as_ref()
    }
}

/// A security to price, identified by its symbol and the market it trades on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TickerEntry {
    pub symbol: String,
    pub exchange: Exchange,
}

impl TickerEntry {
    pub fn new(symbol: impl Into<String>, exchange: Exchange) -> Self {
        TickerEntry {
            symbol: symbol.into(),
            exchange,
        }
    }

    /// `SYMBOL:EXCHANGE`, the form used by the quote site and in log lines.
    pub fn key(&self) -> String {
        format!("{}:{}", self.symbol, self.exchange.code())
    }
}

/// 預設追蹤清單
const DEFAULT_WATCHLIST: [(&str, Exchange); 25] = [
    // NASDAQ
    ("AAPL", Exchange::Nasdaq),
    ("NVDA", Exchange::Nasdaq),
    ("MSFT", Exchange::Nasdaq),
    ("GOOG", Exchange::Nasdaq),
    ("AMZN", Exchange::Nasdaq),
    ("META", Exchange::Nasdaq),
    ("TSLA", Exchange::Nasdaq),
    ("AVGO", Exchange::Nasdaq),
    ("COST", Exchange::Nasdaq),
    ("NFLX", Exchange::Nasdaq),
    // NYSE
    ("BRK.B", Exchange::Nyse),
    ("WMT", Exchange::Nyse),
    ("JPM", Exchange::Nyse),
    ("LLY", Exchange::Nyse),
    ("V", Exchange::Nyse),
    ("UNH", Exchange::Nyse),
    ("XOM", Exchange::Nyse),
    ("MA", Exchange::Nyse),
    ("ORCL", Exchange::Nyse),
    ("HD", Exchange::Nyse),
    ("PG", Exchange::Nyse),
    ("BAC", Exchange::Nyse),
    ("JNJ", Exchange::Nyse),
    ("CRM", Exchange::Nyse),
    ("ABBV", Exchange::Nyse),
];

/// The built-in watchlist, in report order.
pub fn default_watchlist() -> Vec<TickerEntry> {
    DEFAULT_WATCHLIST
        .iter()
        .map(|(symbol, exchange)| TickerEntry::new(*symbol, *exchange))
        .collect()
}
