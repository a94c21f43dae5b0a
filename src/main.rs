#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::io;

use anyhow::Result;

use crate::crawler::google::Google;

pub mod config;
pub mod crawler;
pub mod declare;
pub mod event;
pub mod logging;
pub mod util;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let settings = config::App::get()?;
    util::http::init(&settings.client_options())?;
    logging::info_file_async(format!(
        "start: {} tickers from {}, pause {} ms",
        settings.watchlist.len(),
        settings.site.host,
        settings.crawl.pause_ms
    ));

    let google = Google::new(&settings.site);
    let mut stdout = io::stdout().lock();
    let result = event::previous_close::execute(
        &google,
        &settings.watchlist,
        settings.crawl.pause(),
        &mut stdout,
    )
    .await;

    // 結束前寫完尚在佇列中的 log
    logging::flush_all().await;

    result.map(|_| ())
}
