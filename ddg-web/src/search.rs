use crate::delay::{DelayPolicy, RandomDelay};
use crate::extract::{is_blocked, parse_page};
use crate::progress::{NoProgress, ProgressSink};
use crate::types::{SearchResponse, TimeRange};
use async_trait::async_trait;
use ddg_http::{Form, HttpError, Transport, Url};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

const QUERY_LOG_CHARS: usize = 160;

/// Stopping conditions and filters for one query.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Upper bound on fetched pages; `None` or `Some(0)` keeps going until
    /// the site stops.
    pub max_pages: Option<u32>,
    /// Upper bound on returned results.
    pub max_results: Option<usize>,
    /// Region code sent as `kl`.
    pub region: Option<String>,
    pub time_range: Option<TimeRange>,
    pub cancel: Option<CancellationToken>,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Anti-bot detection triggered on first request. Try again later.")]
    Blocked,
    #[error("The operation was aborted")]
    Cancelled,
    #[error(transparent)]
    Transport(HttpError),
}

impl From<HttpError> for SearchError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Cancelled => SearchError::Cancelled,
            other => SearchError::Transport(other),
        }
    }
}

/// Anything that can answer a query with an aggregated response.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<SearchResponse, SearchError>;
}

// ==============================
// Pagination engine
// ==============================

/// Drives page fetches against the HTML endpoint, following the "Next" form
/// until a stopping condition holds.
///
/// ```
/// use ddg_http::HttpClient;
/// use ddg_web::{NoDelay, Searcher};
/// use std::sync::Arc;
///
/// let client = HttpClient::new("https://html.duckduckgo.com/html/").unwrap();
/// let searcher = Searcher::new(client.base().clone(), Arc::new(client))
///     .with_delay(Arc::new(NoDelay));
/// let url = searcher.first_page_url("rust", &Default::default());
/// assert_eq!(url.as_str(), "https://html.duckduckgo.com/html/?q=rust");
/// ```
#[derive(Clone)]
pub struct Searcher {
    base_url: Url,
    transport: Arc<dyn Transport>,
    delay: Arc<dyn DelayPolicy>,
    progress: Arc<dyn ProgressSink>,
}

impl Searcher {
    /// Starts with the default random delay and no progress output.
    pub fn new(base_url: Url, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url,
            transport,
            delay: Arc::new(RandomDelay::default()),
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_delay(mut self, delay: Arc<dyn DelayPolicy>) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET target for page one: `q`, then `kl` and `df` when set.
    pub fn first_page_url(&self, query: &str, opts: &SearchOptions) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            if let Some(region) = opts.region.as_deref().filter(|r| !r.is_empty()) {
                pairs.append_pair("kl", region);
            }
            if let Some(range) = opts.time_range {
                pairs.append_pair("df", range.as_param());
            }
        }
        url
    }

    pub async fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();
        let cancel = opts.cancel.as_ref();
        let query_snippet: String = query.chars().take(QUERY_LOG_CHARS).collect();
        tracing::info!(
            target: "web.ddg",
            query = %query_snippet,
            max_pages = ?opts.max_pages,
            max_results = ?opts.max_results,
            "search.start"
        );

        let first_url = self.first_page_url(query, opts);
        let html = self.fetch(&first_url, None, cancel).await?;
        if is_blocked(&html) {
            tracing::warn!(target: "web.ddg", query = %query_snippet, "search.blocked");
            return Err(SearchError::Blocked);
        }

        let first = parse_page(&html);
        let mut results = first.results;
        let spelling = first.spelling;
        let zero_click = first.zero_click;
        let mut continuation = first.continuation;
        let mut no_more_results = first.no_more_results;
        let mut pages_scraped = 1usize;

        tracing::debug!(
            target: "web.ddg",
            page = pages_scraped,
            page_results = results.len(),
            total = results.len(),
            "search.page"
        );
        self.progress.page(pages_scraped, results.len(), results.len());

        while !no_more_results
            && within_page_budget(pages_scraped, opts.max_pages)
            && below_result_cap(results.len(), opts.max_results)
        {
            let Some(form) = continuation.take() else {
                break;
            };

            self.delay.wait().await;

            let html = self.fetch(&self.base_url, Some(&form), cancel).await?;
            if is_blocked(&html) {
                tracing::warn!(
                    target: "web.ddg",
                    page = pages_scraped + 1,
                    total = results.len(),
                    "search.soft_block"
                );
                self.progress.soft_block();
                break;
            }

            let page = parse_page(&html);
            pages_scraped += 1;
            if page.spelling.is_some() || page.zero_click.is_some() {
                tracing::debug!(
                    target: "web.ddg",
                    page = pages_scraped,
                    "search.later_page_panels_ignored"
                );
            }

            let page_results = page.results.len();
            results.extend(page.results);
            continuation = page.continuation;
            no_more_results = page.no_more_results;

            tracing::debug!(
                target: "web.ddg",
                page = pages_scraped,
                page_results,
                total = results.len(),
                "search.page"
            );
            self.progress.page(pages_scraped, page_results, results.len());
        }

        self.progress.finish();

        if let Some(cap) = opts.max_results {
            results.truncate(cap);
        }

        tracing::info!(
            target: "web.ddg",
            pages_scraped,
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search.done"
        );

        Ok(SearchResponse {
            query: query.to_string(),
            results,
            spelling,
            zero_click,
            pages_scraped,
        })
    }

    async fn fetch(
        &self,
        url: &Url,
        form: Option<&Form>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, SearchError> {
        self.transport.fetch(url, form, cancel).await.map_err(|err| {
            tracing::warn!(target: "web.ddg", url = %url, error = %err, "search.fetch_failed");
            SearchError::from(err)
        })
    }
}

#[async_trait]
impl SearchService for Searcher {
    async fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<SearchResponse, SearchError> {
        Searcher::search(self, query, opts).await
    }
}

fn within_page_budget(fetched: usize, max_pages: Option<u32>) -> bool {
    max_pages.is_none_or(|max| max == 0 || fetched < max as usize)
}

fn below_result_cap(collected: usize, max_results: Option<usize>) -> bool {
    max_results.is_none_or(|cap| collected < cap)
}
