//! Resilient page fetching
//!
//! Every bracket page goes out through the egress proxy. A fetch retries with
//! exponential backoff and degrades to an empty body once attempts run out;
//! callers treat empty markup as "nothing scraped".

use crate::extract::Site;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Proxy header asking it to hold the response until a selector is rendered
pub const WAIT_FOR_HEADER: &str = "Spb-Wait_For";

/// Something that turns a URL into page markup
///
/// Implementations never fail: an empty string means nothing could be fetched.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = String> + Send;
}

/// Retry and transport settings for live fetches
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub proxy_url: Option<String>,
    pub timeout: Duration,
    pub attempts: u32,
    /// Delay before the second attempt, doubled for every later one
    pub backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            timeout: Duration::from_secs(300),
            attempts: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Live fetcher going through the egress proxy
pub struct ProxyFetcher {
    client: reqwest::Client,
    attempts: u32,
    backoff: Duration,
}

impl ProxyFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        // The proxy re-signs upstream TLS with a certificate we cannot verify
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(config.timeout);

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .with_context(|| format!("Invalid proxy URL: {}", proxy_url))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            attempts: config.attempts.max(1),
            backoff: config.backoff,
        })
    }

    async fn attempt(&self, url: &str, wait_for: Option<&str>) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(selector) = wait_for {
            request = request.header(WAIT_FOR_HEADER, selector);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            bail!("HTTP {}", status.as_u16());
        }

        Ok(response.text().await?)
    }
}

impl Fetcher for ProxyFetcher {
    async fn fetch(&self, url: &str) -> String {
        let wait_for = Site::from_url(url).and_then(Site::wait_for);
        let mut delays = backoff_schedule(self.backoff, self.attempts).into_iter();

        for attempt in 1..=self.attempts {
            info!(url, attempt, "visiting");

            match self.attempt(url, wait_for).await {
                Ok(body) => {
                    info!(url, attempt, bytes = body.len(), "finished scraping");
                    return body;
                }
                Err(e) => warn!(url, attempt, error = %e, "fetch attempt failed"),
            }

            if let Some(delay) = delays.next() {
                tokio::time::sleep(delay).await;
            }
        }

        error!(url, attempts = self.attempts, "giving up, nothing scraped");
        String::new()
    }
}

/// Sleeps between consecutive attempts, doubling from `first`
///
/// Nothing is slept after the last attempt, so there is one delay fewer than
/// attempts.
pub fn backoff_schedule(first: Duration, attempts: u32) -> Vec<Duration> {
    (0..attempts.saturating_sub(1))
        .map(|i| first * 2u32.pow(i))
        .collect()
}

/// Serves previously saved pages, one file per site
pub struct FixtureFetcher {
    dir: PathBuf,
}

impl FixtureFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Fetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> String {
        let Some(site) = Site::from_url(url) else {
            warn!(url, "no saved page for unknown site");
            return String::new();
        };

        let path = fixture_path(&self.dir, site);
        match tokio::fs::read_to_string(&path).await {
            Ok(html) => {
                info!(url, path = %path.display(), "read saved page");
                html
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read saved page");
                String::new()
            }
        }
    }
}

/// Live fetcher that also saves each page for later fixture runs
pub struct RecordingFetcher {
    inner: ProxyFetcher,
    dir: PathBuf,
}

impl RecordingFetcher {
    pub fn new(inner: ProxyFetcher, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }
}

impl Fetcher for RecordingFetcher {
    async fn fetch(&self, url: &str) -> String {
        let html = self.inner.fetch(url).await;

        if let Some(site) = Site::from_url(url) {
            let path = fixture_path(&self.dir, site);
            if let Err(e) = save_page(&path, &html).await {
                error!(path = %path.display(), error = %e, "failed to save page");
            }
        }

        html
    }
}

async fn save_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, html).await?;
    Ok(())
}

pub fn fixture_path(dir: &Path, site: Site) -> PathBuf {
    dir.join(format!("{}.html", site))
}

/// How pages are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetchMode {
    /// Fetch through the proxy
    Live,
    /// Fetch through the proxy and save every page
    Record,
    /// Read saved pages, no network
    Fixture,
}

/// Fetch strategy picked at start-up
pub enum AnyFetcher {
    Live(ProxyFetcher),
    Record(RecordingFetcher),
    Fixture(FixtureFetcher),
}

impl AnyFetcher {
    pub fn new(mode: FetchMode, config: &FetchConfig, fixture_dir: &Path) -> Result<Self> {
        Ok(match mode {
            FetchMode::Live => AnyFetcher::Live(ProxyFetcher::new(config)?),
            FetchMode::Record => {
                AnyFetcher::Record(RecordingFetcher::new(ProxyFetcher::new(config)?, fixture_dir))
            }
            FetchMode::Fixture => AnyFetcher::Fixture(FixtureFetcher::new(fixture_dir)),
        })
    }
}

impl Fetcher for AnyFetcher {
    async fn fetch(&self, url: &str) -> String {
        match self {
            AnyFetcher::Live(f) => f.fetch(url).await,
            AnyFetcher::Record(f) => f.fetch(url).await,
            AnyFetcher::Fixture(f) => f.fetch(url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config() -> FetchConfig {
        FetchConfig {
            proxy_url: None,
            timeout: Duration::from_secs(5),
            attempts: 5,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_fetch_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/draws"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>draw</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = ProxyFetcher::new(&fast_config()).unwrap();
        let body = fetcher.fetch(&format!("{}/draws", server.uri())).await;
        assert_eq!(body, "<html>draw</html>");
    }

    #[tokio::test]
    async fn test_fetch_retries_until_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("third time"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = ProxyFetcher::new(&fast_config()).unwrap();
        assert_eq!(fetcher.fetch(&server.uri()).await, "third time");
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_five_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&server)
            .await;

        let fetcher = ProxyFetcher::new(&fast_config()).unwrap();
        assert_eq!(fetcher.fetch(&server.uri()).await, "");
    }

    #[tokio::test]
    async fn test_non_200_success_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let config = FetchConfig {
            attempts: 2,
            ..fast_config()
        };
        let fetcher = ProxyFetcher::new(&config).unwrap();
        assert_eq!(fetcher.fetch(&server.uri()).await, "");
    }

    #[tokio::test]
    async fn test_unknown_site_has_no_wait_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header(WAIT_FOR_HEADER, ".match-table__score-cell"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain"))
            .mount(&server)
            .await;

        let fetcher = ProxyFetcher::new(&fast_config()).unwrap();
        assert_eq!(fetcher.fetch(&server.uri()).await, "plain");
    }

    #[tokio::test]
    async fn test_wta_goes_through_proxy_with_wait_header() {
        let proxy = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header(WAIT_FOR_HEADER, crate::extract::wta::SCORE_CELL))
            .respond_with(ResponseTemplate::new(200).set_body_string("wta draw"))
            .expect(1)
            .mount(&proxy)
            .await;

        let config = FetchConfig {
            proxy_url: Some(proxy.uri()),
            ..fast_config()
        };
        let fetcher = ProxyFetcher::new(&config).unwrap();
        let body = fetcher
            .fetch("http://www.wtatennis.com/tournaments/wimbledon/draws")
            .await;
        assert_eq!(body, "wta draw");
    }

    #[tokio::test]
    async fn test_atp_goes_through_proxy_without_wait_header() {
        let proxy = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists(WAIT_FOR_HEADER))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&proxy)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("atp draw"))
            .expect(1)
            .mount(&proxy)
            .await;

        let config = FetchConfig {
            proxy_url: Some(proxy.uri()),
            ..fast_config()
        };
        let fetcher = ProxyFetcher::new(&config).unwrap();
        let body = fetcher
            .fetch("http://www.atptour.com/en/scores/current/wimbledon/540/draws")
            .await;
        assert_eq!(body, "atp draw");
    }

    #[tokio::test]
    async fn test_recording_fetcher_saves_page() {
        let proxy = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<table>wta</table>"))
            .mount(&proxy)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let saved = dir.path().join("pages");
        let config = FetchConfig {
            proxy_url: Some(proxy.uri()),
            ..fast_config()
        };
        let fetcher = RecordingFetcher::new(ProxyFetcher::new(&config).unwrap(), &saved);

        let body = fetcher
            .fetch("http://www.wtatennis.com/tournaments/wimbledon/draws")
            .await;
        assert_eq!(body, "<table>wta</table>");
        assert_eq!(
            std::fs::read_to_string(saved.join("wta.html")).unwrap(),
            "<table>wta</table>"
        );

        // A recorded page replays through the fixture fetcher
        let replay = FixtureFetcher::new(&saved);
        assert_eq!(
            replay
                .fetch("https://www.wtatennis.com/tournaments/wimbledon/draws")
                .await,
            "<table>wta</table>"
        );
    }

    #[test]
    fn test_backoff_schedule() {
        let config = FetchConfig::default();
        let secs: Vec<u64> = backoff_schedule(config.backoff, config.attempts)
            .iter()
            .map(Duration::as_secs)
            .collect();
        assert_eq!(secs, vec![1, 2, 4, 8]);

        assert!(backoff_schedule(Duration::from_secs(1), 1).is_empty());
        assert!(backoff_schedule(Duration::from_secs(1), 0).is_empty());
    }

    #[tokio::test]
    async fn test_retries_wait_out_the_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let config = FetchConfig {
            backoff: Duration::from_millis(40),
            ..fast_config()
        };
        let fetcher = ProxyFetcher::new(&config).unwrap();

        let start = std::time::Instant::now();
        assert_eq!(fetcher.fetch(&server.uri()).await, "ok");
        // Two failures sleep 40ms then 80ms before the third attempt
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_bad_proxy_url() {
        let config = FetchConfig {
            proxy_url: Some("not a url".to_string()),
            ..FetchConfig::default()
        };
        assert!(ProxyFetcher::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_fixture_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wta.html"), "<table></table>").unwrap();

        let fetcher = FixtureFetcher::new(dir.path());
        assert_eq!(
            fetcher
                .fetch("https://www.wtatennis.com/tournaments/wimbledon/draws")
                .await,
            "<table></table>"
        );
        // Missing file and unknown site both degrade to empty
        assert_eq!(
            fetcher
                .fetch("https://www.atptour.com/en/scores/current/x/1/draws")
                .await,
            ""
        );
        assert_eq!(fetcher.fetch("https://example.com").await, "");
    }

    #[test]
    fn test_fixture_path() {
        let p = fixture_path(Path::new("scraped_pages"), Site::Atp);
        assert_eq!(p, PathBuf::from("scraped_pages/atp.html"));
    }
}
