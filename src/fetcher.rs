use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use scraper::{Html, Node, Selector};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::{Result, ScrapeError};
use crate::settings::Settings;
use crate::store::Store;

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Separator between text nodes. The extractor splits on newlines, so every
/// block of page text must land on its own line.
const NODE_SEPARATOR: &str = "\n\n";

/// Where tool pages come from.
pub trait PageSource: Send + Sync + 'static {
    fn fetch_tool(&self, tool: &str) -> impl Future<Output = Result<String>> + Send;
}

/// HTTP client for the directory site.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    base_url: String,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.request_timeout())
            .build()
            .map_err(|source| ScrapeError::Request {
                url: settings.base_url.clone(),
                source,
            })?;
        Ok(Fetcher {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tool_url(&self, tool: &str) -> String {
        format!("{}/tool/{}", self.base_url, tool)
    }

    /// GET a page and return its HTML. Non-2xx answers are errors.
    pub async fn get_html(&self, url: &str) -> Result<String> {
        let request_err = |source| ScrapeError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status,
            });
        }
        response.text().await.map_err(request_err)
    }
}

impl PageSource for Fetcher {
    async fn fetch_tool(&self, tool: &str) -> Result<String> {
        let url = self.tool_url(tool);
        let html = self.get_html(&url).await?;
        Ok(page_text(&html))
    }
}

/// Visible text of `<body>`: every text node, scripts and styles excluded,
/// joined with a blank line. The HTML parser always supplies a body, so a
/// page without one reads as empty text.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Some(body) = document.select(&BODY).next() else {
        return String::new();
    };

    let parts: Vec<&str> = body
        .descendants()
        .filter_map(|node| {
            let Node::Text(text) = node.value() else {
                return None;
            };
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element())
                .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript" | "template"));
            if hidden {
                None
            } else {
                Some(&**text)
            }
        })
        .collect();

    parts.join(NODE_SEPARATOR)
}

/// Ceiling for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// `base_ms * 2^attempt`, saturating and capped at `MAX_BACKOFF`.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(attempt))).min(MAX_BACKOFF)
}

/// Retry transient failures with exponential backoff.
pub async fn fetch_with_retry<S: PageSource>(
    source: &S,
    tool: &str,
    max_retries: u32,
    base_backoff_ms: u64,
) -> Result<String> {
    let mut attempt = 0;
    loop {
        match source.fetch_tool(tool).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_transient() && attempt < max_retries => {
                let backoff = backoff_delay(base_backoff_ms, attempt);
                warn!(
                    "{} on {} (attempt {}/{}), backing off {:.1}s",
                    e,
                    tool,
                    attempt + 1,
                    max_retries,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Batch outcome. Failed tools are listed with their last error.
#[derive(Debug, Default)]
pub struct FetchStats {
    pub total: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub failures: Vec<(String, String)>,
    pub interrupted: bool,
}

/// Fetch every tool not already in the store. Up to `settings.concurrency`
/// requests run at once; each worker keeps its slot through the politeness
/// delay. Results are written as they arrive, failures are logged and the
/// batch carries on. The batch stops early when `shutdown` resolves.
pub async fn fetch_all<S, F>(
    store: &Store,
    source: Arc<S>,
    tools: Vec<String>,
    settings: &Settings,
    shutdown: F,
) -> Result<FetchStats>
where
    S: PageSource,
    F: Future<Output = ()>,
{
    let mut stats = FetchStats {
        total: tools.len(),
        ..FetchStats::default()
    };

    let mut pending = Vec::new();
    for tool in tools {
        if store.has_raw(&tool) {
            info!("Skipping {}", tool);
            stats.skipped += 1;
        } else {
            pending.push(tool);
        }
    }
    if pending.is_empty() {
        return Ok(stats);
    }

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .map_err(|e| ScrapeError::Config(e.to_string()))?
            .progress_chars("=> "),
    );

    let semaphore = Arc::new(Semaphore::new(settings.concurrency));
    let (tx, mut rx) = mpsc::channel::<(String, Result<String>)>(settings.concurrency * 2);
    let mut tasks = JoinSet::new();

    for tool in pending {
        let source = Arc::clone(&source);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let delay = settings.fetch_delay();
        let (max_retries, backoff) = (settings.max_retries, settings.base_backoff_ms);

        tasks.spawn(async move {
            let Ok(_permit) = sem.acquire_owned().await else {
                return;
            };
            info!("Fetching {} webpage", tool);
            let result = fetch_with_retry(source.as_ref(), &tool, max_retries, backoff).await;
            let _ = tx.send((tool, result)).await;
            drop(tx);
            tokio::time::sleep(delay).await;
        });
    }

    // rx closes once every worker has dropped its sender
    drop(tx);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some((tool, result)) = received else { break };
                match result {
                    Ok(text) => match store.write_raw(&tool, &text) {
                        Ok(()) => stats.fetched += 1,
                        Err(e) => {
                            warn!("Failed to save {}: {}", tool, e);
                            stats.failures.push((tool, e.to_string()));
                        }
                    },
                    Err(e) => {
                        warn!("Failed to fetch {}: {}", tool, e);
                        stats.failures.push((tool, e.to_string()));
                    }
                }
                pb.inc(1);
            }
            _ = &mut shutdown => {
                warn!("Interrupted; {} tools already saved", stats.fetched);
                tasks.abort_all();
                stats.interrupted = true;
                break;
            }
        }
    }

    pb.finish_and_clear();
    info!(
        "Fetched {} of {} tools ({} skipped, {} failed)",
        stats.fetched,
        stats.total,
        stats.skipped,
        stats.failures.len()
    );
    Ok(stats)
}
