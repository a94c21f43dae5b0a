use std::{io::Write, time::Duration};

use anyhow::Result;
use chrono::Local;
use rust_decimal::Decimal;
use tokio::time;

use crate::{crawler::PreviousClose, declare::TickerEntry, logging, util::text};

/// Running totals of one pass over the watchlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    /// Sum of every previous close that was obtained.
    pub total: Decimal,
    /// Tickers with a price.
    pub succeeded: usize,
    /// Tickers tried so far.
    pub attempted: usize,
}

impl Tally {
    pub fn record(&mut self, quote: Option<Decimal>) {
        self.attempted += 1;
        if let Some(price) = quote {
            self.total += price;
            self.succeeded += 1;
        }
    }

    pub fn unavailable(&self) -> usize {
        self.attempted - self.succeeded
    }

    pub fn is_complete(&self) -> bool {
        self.succeeded == self.attempted
    }
}

/// 逐檔抓取前日收盤價並輸出報表
///
/// Tickers are visited strictly one after another, in watchlist order, and
/// `pause` is slept after each of them. A ticker without a price is logged,
/// reported as unavailable and left out of the total; it never stops the run.
pub async fn execute<S, W>(
    source: &S,
    watchlist: &[TickerEntry],
    pause: Duration,
    out: &mut W,
) -> Result<Tally>
where
    S: PreviousClose + ?Sized,
    W: Write,
{
    writeln!(
        out,
        "\nFetching stock prices from {} as of {}\n",
        source.name(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;

    let mut tally = Tally::default();

    for entry in watchlist {
        let quote = fetch_previous_close(source, entry).await;
        tally.record(quote);
        writeln!(out, "{}", format_quote_line(entry, quote))?;
        out.flush()?;

        time::sleep(pause).await;
    }

    write_summary(out, &tally)?;
    logging::info_file_async(format!(
        "previous close: {} of {} tickers, {} unavailable, total {}",
        tally.succeeded,
        tally.attempted,
        tally.unavailable(),
        tally.total
    ));

    Ok(tally)
}

async fn fetch_previous_close<S>(source: &S, entry: &TickerEntry) -> Option<Decimal>
where
    S: PreviousClose + ?Sized,
{
    let page = match source.fetch(entry).await {
        Ok(page) => page,
        Err(why) => {
            let msg = fetch_error_message(entry, &why);
            logging::error_console(msg.clone());
            logging::error_file_async(msg);
            return None;
        }
    };

    let quote = source.extract(&page);
    if quote.is_none() {
        logging::warn_file_async(format!(
            "No previous close found in the page of {} ({} bytes)",
            entry.key(),
            page.len()
        ));
    }

    quote
}

/// The ticker identity followed by the whole cause chain on one line.
fn fetch_error_message(entry: &TickerEntry, why: &anyhow::Error) -> String {
    format!("Error fetching data for {}: {:#}", entry.key(), why)
}

/// `AAPL   (NASDAQ) Previous Close: $233.28`
pub fn format_quote_line(entry: &TickerEntry, quote: Option<Decimal>) -> String {
    let value = match quote {
        Some(price) => format!("${}", text::format_thousands(price, 2)),
        None => "Data unavailable".to_string(),
    };

    format!(
        "{:<6} ({:<6}) Previous Close: {}",
        entry.symbol,
        entry.exchange.code(),
        value
    )
}

fn write_summary<W: Write>(out: &mut W, tally: &Tally) -> Result<()> {
    writeln!(out, "\nSummary:")?;
    writeln!(
        out,
        "Total sum of previous close prices: ${}",
        text::format_thousands(tally.total, 2)
    )?;
    writeln!(
        out,
        "Number of stocks with valid prices: {} out of {}",
        tally.succeeded, tally.attempted
    )?;
    if !tally.is_complete() {
        writeln!(
            out,
            "Note: Some stock prices were unavailable and not included in the total."
        )?;
    }
    out.flush()?;

    Ok(())
}
