mod common;

use std::sync::{Arc, Mutex};

use common::{BLOCKED, ScriptedTransport, last_page, page};
use ddg_http::{HttpError, StatusCode, Url};
use ddg_web::{
    CancellationToken, NoDelay, ProgressSink, SearchError, SearchOptions, SearchService, Searcher,
    TimeRange,
};

const BASE: &str = "https://html.duckduckgo.com/html/";

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn page(&self, page: usize, page_results: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("page {page} {page_results} {total}"));
    }
    fn soft_block(&self) {
        self.events.lock().unwrap().push("soft_block".into());
    }
    fn finish(&self) {
        self.events.lock().unwrap().push("finish".into());
    }
}

fn searcher(transport: Arc<ScriptedTransport>) -> Searcher {
    common::init_test_tracing();
    Searcher::new(Url::parse(BASE).unwrap(), transport).with_delay(Arc::new(NoDelay))
}

#[tokio::test]
async fn follows_next_forms_until_no_more_results() {
    let transport = Arc::new(ScriptedTransport::pages(vec![
        page(1, 10, Some(10)),
        page(11, 10, Some(20)),
        last_page(21, 3),
    ]));
    let progress = Arc::new(RecordingProgress::default());
    let searcher = searcher(transport.clone()).with_progress(progress.clone());

    let resp = searcher
        .search("rust", &SearchOptions::default())
        .await
        .expect("search ok");

    assert_eq!(resp.query, "rust");
    assert_eq!(resp.pages_scraped, 3);
    assert_eq!(resp.results.len(), 23);
    assert_eq!(resp.results[0].title, "Title 1");
    assert_eq!(resp.results[22].url, "https://example.com/23");
    assert_eq!(transport.calls().len(), 3);
    assert_eq!(
        progress.events(),
        vec!["page 1 10 10", "page 2 10 20", "page 3 3 23", "finish"]
    );
}

#[tokio::test]
async fn first_request_is_a_get_with_region_and_time() {
    let transport = Arc::new(ScriptedTransport::pages(vec![page(1, 2, None)]));
    let opts = SearchOptions {
        region: Some("us-en".into()),
        time_range: Some(TimeRange::Week),
        ..SearchOptions::default()
    };

    searcher(transport.clone())
        .search("rust lang", &opts)
        .await
        .expect("search ok");

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].form.is_none());
    let pairs: Vec<(String, String)> = calls[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("q".to_string(), "rust lang".to_string()),
            ("kl".to_string(), "us-en".to_string()),
            ("df".to_string(), "w".to_string()),
        ]
    );
}

#[tokio::test]
async fn empty_region_is_not_sent() {
    let transport = Arc::new(ScriptedTransport::pages(vec![page(1, 1, None)]));
    let opts = SearchOptions {
        region: Some(String::new()),
        ..SearchOptions::default()
    };

    searcher(transport.clone()).search("rust", &opts).await.unwrap();

    assert_eq!(
        transport.calls()[0].url.as_str(),
        "https://html.duckduckgo.com/html/?q=rust"
    );
}

#[tokio::test]
async fn later_pages_post_the_continuation_to_the_base_url() {
    let transport = Arc::new(ScriptedTransport::pages(vec![
        page(1, 10, Some(10)),
        page(11, 1, None),
    ]));

    searcher(transport.clone())
        .search("rust", &SearchOptions::default())
        .await
        .unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].url.as_str(), BASE);
    let form = calls[1].form.as_ref().expect("POST body");
    assert_eq!(form.get("s").map(String::as_str), Some("10"));
    assert_eq!(form.get("q").map(String::as_str), Some("rust"));
    assert_eq!(form.get("vqd").map(String::as_str), Some("4-123"));
}

#[tokio::test]
async fn max_pages_caps_the_number_of_fetches() {
    let transport = Arc::new(ScriptedTransport::pages(vec![
        page(1, 10, Some(10)),
        page(11, 10, Some(20)),
        page(21, 10, Some(30)),
    ]));
    let opts = SearchOptions {
        max_pages: Some(2),
        ..SearchOptions::default()
    };

    let resp = searcher(transport.clone()).search("rust", &opts).await.unwrap();

    assert_eq!(transport.calls().len(), 2);
    assert_eq!(resp.pages_scraped, 2);
    assert_eq!(resp.results.len(), 20);
}

#[tokio::test]
async fn zero_max_pages_is_unbounded() {
    let transport = Arc::new(ScriptedTransport::pages(vec![
        page(1, 10, Some(10)),
        page(11, 10, Some(20)),
        last_page(21, 10),
    ]));
    let opts = SearchOptions {
        max_pages: Some(0),
        ..SearchOptions::default()
    };

    let resp = searcher(transport.clone()).search("rust", &opts).await.unwrap();

    assert_eq!(transport.calls().len(), 3);
    assert_eq!(resp.pages_scraped, 3);
    assert_eq!(resp.results.len(), 30);
}

#[tokio::test]
async fn reaching_max_results_stops_before_the_next_fetch() {
    let transport = Arc::new(ScriptedTransport::pages(vec![page(1, 10, Some(10))]));
    let opts = SearchOptions {
        max_results: Some(10),
        ..SearchOptions::default()
    };

    let resp = searcher(transport.clone()).search("rust", &opts).await.unwrap();

    assert_eq!(transport.calls().len(), 1);
    assert_eq!(resp.results.len(), 10);
}

#[tokio::test]
async fn results_are_truncated_to_max_results() {
    let transport = Arc::new(ScriptedTransport::pages(vec![page(1, 3, Some(3))]));
    let opts = SearchOptions {
        max_results: Some(1),
        ..SearchOptions::default()
    };

    let resp = searcher(transport.clone()).search("rust", &opts).await.unwrap();

    assert_eq!(resp.results.len(), 1);
    assert_eq!(resp.results[0].title, "Title 1");
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn truncation_applies_across_pages() {
    let transport = Arc::new(ScriptedTransport::pages(vec![
        page(1, 10, Some(10)),
        page(11, 10, Some(20)),
    ]));
    let opts = SearchOptions {
        max_results: Some(15),
        ..SearchOptions::default()
    };

    let resp = searcher(transport.clone()).search("rust", &opts).await.unwrap();

    assert_eq!(transport.calls().len(), 2);
    assert_eq!(resp.results.len(), 15);
    assert_eq!(resp.results[14].title, "Title 15");
}

#[tokio::test]
async fn block_on_first_page_is_an_error() {
    let transport = Arc::new(ScriptedTransport::pages(vec![BLOCKED.to_string()]));

    let err = searcher(transport.clone())
        .search("rust", &SearchOptions::default())
        .await
        .expect_err("hard block");

    assert!(matches!(err, SearchError::Blocked));
    assert_eq!(
        err.to_string(),
        "Anti-bot detection triggered on first request. Try again later."
    );
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn block_on_later_page_returns_what_was_collected() {
    let transport = Arc::new(ScriptedTransport::pages(vec![
        page(1, 10, Some(10)),
        BLOCKED.to_string(),
    ]));
    let progress = Arc::new(RecordingProgress::default());

    let resp = searcher(transport.clone())
        .with_progress(progress.clone())
        .search("rust", &SearchOptions::default())
        .await
        .expect("soft block is not an error");

    assert_eq!(resp.pages_scraped, 1);
    assert_eq!(resp.results.len(), 10);
    assert_eq!(resp.results[9].title, "Title 10");
    assert_eq!(
        progress.events(),
        vec!["page 1 10 10", "soft_block", "finish"]
    );
}

#[tokio::test]
async fn spelling_and_zero_click_come_from_the_first_page_only() {
    let first = format!(
        r#"<div id="did_you_mean"><a>rust</a><a>"rsut"</a></div>{}"#,
        page(1, 2, Some(2))
    );
    let second = format!(
        r#"<div id="did_you_mean"><a>other</a></div>
           <div class="zci-wrapper"><div class="zci">
             <h1 class="zci__heading"><a href="https://en.wikipedia.org/wiki/Rust">Rust</a></h1>
             <div id="zero_click_abstract">Late panel</div>
           </div></div>{}"#,
        last_page(3, 2)
    );
    let transport = Arc::new(ScriptedTransport::pages(vec![first, second]));

    let resp = searcher(transport)
        .search("rsut", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(resp.pages_scraped, 2);
    let spelling = resp.spelling.expect("first page spelling");
    assert_eq!(spelling.corrected, "rust");
    assert_eq!(spelling.original.as_deref(), Some("rsut"));
    assert!(resp.zero_click.is_none());
}

#[tokio::test]
async fn transport_failure_on_a_later_page_propagates() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(page(1, 10, Some(10))),
        Err(HttpError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            status_text: "Internal Server Error".into(),
        }),
    ]));

    let err = searcher(transport)
        .search("rust", &SearchOptions::default())
        .await
        .expect_err("500 propagates");

    assert!(matches!(err, SearchError::Transport(_)));
    assert_eq!(err.to_string(), "HTTP 500 Internal Server Error");
}

#[tokio::test]
async fn cancellation_fails_without_partial_results() {
    let token = CancellationToken::new();
    token.cancel();
    let transport = Arc::new(ScriptedTransport::pages(vec![page(1, 10, None)]));
    let opts = SearchOptions {
        cancel: Some(token),
        ..SearchOptions::default()
    };

    let err = searcher(transport.clone())
        .search("rust", &opts)
        .await
        .expect_err("cancelled");

    assert!(matches!(err, SearchError::Cancelled));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn cancellation_after_the_first_page_discards_collected_results() {
    let token = CancellationToken::new();
    let transport = Arc::new(
        ScriptedTransport::pages(vec![page(1, 10, Some(10)), page(11, 10, None)])
            .cancelling_after(1, token.clone()),
    );
    let progress = Arc::new(RecordingProgress::default());
    let opts = SearchOptions {
        cancel: Some(token),
        ..SearchOptions::default()
    };

    let outcome = searcher(transport.clone())
        .with_progress(progress.clone())
        .search("rust", &opts)
        .await;

    assert!(matches!(outcome, Err(SearchError::Cancelled)));
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(progress.events(), vec!["page 1 10 10"]);
}

#[tokio::test]
async fn works_behind_the_service_trait() {
    let transport = Arc::new(ScriptedTransport::pages(vec![page(1, 4, None)]));
    let service: Arc<dyn SearchService> = Arc::new(searcher(transport));

    let resp = service
        .search("rust", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(resp.pages_scraped, 1);
    assert_eq!(resp.results.len(), 4);
}
