use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, Method, Response};

use crate::logging::Logger;

pub mod element;

/// Browser identity sent with every request; the quote site tends to serve
/// a consent page or nothing at all to clients that look like scripts.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// Settings the shared client is built with.
///
/// A `None` timeout leaves reqwest's own behaviour in place, which is no
/// deadline at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            connect_timeout: None,
        }
    }
}

/// Builds the shared client from `options`.
///
/// Must run before the first request; afterwards the client is fixed for the
/// lifetime of the process and a second call is an error.
pub fn init(options: &ClientOptions) -> Result<()> {
    let client = build_client(options)?;
    CLIENT
        .set(client)
        .map_err(|_| anyhow!("The http client has already been initialised"))
}

/// Returns the reqwest client singleton instance or creates one with the
/// default options if `init` was never called.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| build_client(&ClientOptions::default()))
}

fn build_client(options: &ClientOptions) -> Result<Client> {
    // reqwest 只帶 rustls-no-provider，需先指定加密實作
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut builder = Client::builder()
        // ===== 壓縮 =====
        .brotli(true)
        .gzip(true)
        .zstd(true)
        .tcp_nodelay(true)
        // ===== Cookie 和重定向 =====
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(5))
        // ===== Headers =====
        .referer(true)
        .user_agent(options.user_agent.as_str());

    // ===== 超時設置 =====
    if let Some(timeout) = options.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }

    if let Some(timeout) = options.timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .context("Failed to create reqwest client")
}

/// Performs an HTTP GET request and returns the response as text.
///
/// Any status outside 2xx is an error.
pub async fn get(url: &str, headers: Option<header::HeaderMap>) -> Result<String> {
    get_response(url, headers)
        .await?
        .text()
        .await
        .context("Error parsing response text")
}

pub async fn get_response(url: &str, headers: Option<header::HeaderMap>) -> Result<Response> {
    send(Method::GET, url, headers).await
}

/// Sends one request. There is no retry: a failure is final for the caller.
async fn send(method: Method, url: &str, headers: Option<header::HeaderMap>) -> Result<Response> {
    let visit_log = format!("{method}:{url}");
    let client = get_client()?;
    let mut rb = client.request(method, url);

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    match res.and_then(Response::error_for_status) {
        Ok(response) => {
            LOGGER.info(format!("{} {} {} ms", visit_log, response.status(), elapsed));
            Ok(response)
        }
        Err(why) => {
            let why = anyhow::Error::new(why).context(format!("Failed to send request to {url}"));
            LOGGER.error(format!("{} failed because {:#}. {} ms", visit_log, why, elapsed));
            Err(why)
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        sync::oneshot,
    };

    use super::*;
    use crate::logging;

    /// Serves one raw HTTP/1.1 response on a local port and hands back the
    /// request head it received.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }

            let response = format!(
                "{status_line}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            let _ = tx.send(String::from_utf8_lossy(&request).to_string());
        });

        (format!("http://{addr}/finance/quote/AAPL:NASDAQ"), rx)
    }

    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.user_agent, DEFAULT_USER_AGENT);
        assert!(options.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(options.timeout, None);
        assert_eq!(options.connect_timeout, None);
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(&ClientOptions::default()).is_ok());
        assert!(build_client(&ClientOptions {
            timeout: Some(Duration::from_secs(15)),
            connect_timeout: Some(Duration::from_secs(8)),
            ..ClientOptions::default()
        })
        .is_ok());
    }

    #[tokio::test]
    async fn test_get_ok_sends_browser_user_agent() {
        let (url, request) = serve_once("HTTP/1.1 200 OK", "<div>Previous close</div>").await;

        let body = get(&url, None).await.unwrap();
        assert_eq!(body, "<div>Previous close</div>");

        let request = request.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /finance/quote/aapl:nasdaq "));
        assert!(request.contains("user-agent: mozilla/5.0 (windows nt 10.0; win64; x64)"));
    }

    #[tokio::test]
    async fn test_get_error_status_discards_body() {
        let (url, _request) = serve_once(
            "HTTP/1.1 404 Not Found",
            "<div><div>Previous close</div><div>$1.00</div></div>",
        )
        .await;

        let why = get(&url, None).await.unwrap_err();
        let message = format!("{:#}", why);
        assert!(message.starts_with("Failed to send request to http://127.0.0.1:"));
        assert!(message.contains("404"));
    }

    #[tokio::test]
    async fn test_get_connection_refused_keeps_cause() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let why = get(&format!("http://{addr}/"), None).await.unwrap_err();
        assert!(why.chain().count() > 2);

        let message = format!("{:#}", why).to_lowercase();
        assert!(message.contains("refused"), "{}", message);
        assert!(!format!("{}", why).contains("refused"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_get() {
        dotenv::dotenv().ok();
        match get("https://www.google.com/finance/quote/AAPL:NASDAQ", None).await {
            Ok(text) => {
                logging::debug_file_async(format!("body length: {}", text.len()));
            }
            Err(why) => {
                logging::error_file_async(format!("Failed to get because {:#}", why));
            }
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_get_not_found() {
        let result = get("https://www.google.com/finance/this-page-does-not-exist", None).await;
        assert!(result.is_err());
    }
}
