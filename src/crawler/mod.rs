use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::declare::TickerEntry;

/// Google 財經
pub mod google;

/// A site that publishes the previous close of a security.
///
/// Fetching and extracting are kept apart so that a failed download and a
/// page without a usable price can be told apart in the logs.
#[async_trait]
pub trait PreviousClose: Send + Sync {
    /// Human readable name of the site, used in the report header.
    fn name(&self) -> &str;

    /// Downloads the quote page of `entry`.
    async fn fetch(&self, entry: &TickerEntry) -> Result<String>;

    /// Pulls the previous close out of a page returned by `fetch`.
    fn extract(&self, page: &str) -> Option<Decimal>;
}
