use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html};

use crate::{
    crawler::{google::Google, PreviousClose},
    declare::TickerEntry,
    logging,
    util::{
        self,
        http::element::{find_descendant, find_in_document, find_parent, single_string},
        text,
    },
};

/// Text of the label cell next to the value.
const LABEL: &str = "Previous close";
/// Classes the site has used for the value cell.
const VALUE_SELECTOR: &str = "div.YMlKec, div.fxKbKc";

#[async_trait]
impl PreviousClose for Google {
    fn name(&self) -> &str {
        "Google Finance"
    }

    async fn fetch(&self, entry: &TickerEntry) -> Result<String> {
        util::http::get(&self.quote_url(entry), None).await
    }

    fn extract(&self, page: &str) -> Option<Decimal> {
        parse_previous_close(page)
    }
}

/// Finds the previous close in a quote page.
///
/// Returns `None` when the label is missing, when no value cell sits next
/// to it, or when the cell does not hold a number.
pub fn parse_previous_close(page: &str) -> Option<Decimal> {
    let document = Html::parse_document(page);
    let value = find_previous_close_text(&document)?;

    match text::parse_decimal(&value, None) {
        Ok(price) => Some(price),
        Err(why) => {
            logging::debug_file_async(format!("Failed to parse previous close because {:#}", why));
            None
        }
    }
}

/// Locates the label, then looks inside its enclosing `div` for the value:
/// first by the known value classes, then for any cell quoting a `$` amount.
fn find_previous_close_text(document: &Html) -> Option<String> {
    let label = find_in_document(document, "div", |e| {
        single_string(e).is_some_and(|s| s.trim() == LABEL)
    })?;
    let container = find_parent(&label, "div")?;

    find_by_value_class(&container)
        .or_else(|| find_by_currency_symbol(&container))
        .map(|e| e.text().collect::<String>())
}

fn find_by_value_class<'a>(container: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    find_descendant(container, VALUE_SELECTOR, |_| true)
}

fn find_by_currency_symbol<'a>(container: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    find_descendant(container, "div", |e| {
        single_string(e).is_some_and(|s| s.contains('$'))
    })
}
