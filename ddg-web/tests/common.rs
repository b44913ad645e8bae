#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use ddg_common::observability::{LogConfig, LogFormat};
use ddg_http::{Form, HttpError, Transport, Url};
use tokio_util::sync::CancellationToken;

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "ddg-search-tests",
            emit_stderr: true,
            format: if std::env::var("DDG_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
            ..LogConfig::default()
        };

        ddg_common::observability::init_logging(config)
            .ok()
            .flatten()
            .unwrap_or_default()
    });
}

// ==============================
// Markup builders
// ==============================

pub fn result_block(n: usize) -> String {
    format!(
        r#"<div class="result web-result">
             <a class="result__a" href="https://example.com/{n}">Title {n}</a>
             <div class="result__snippet">Snippet {n}</div>
             <span class="result__url">example.com/{n}</span>
           </div>"#
    )
}

pub fn next_form(offset: usize) -> String {
    format!(
        r#"<div class="nav-link">
             <form action="/html/" method="post">
               <input type="hidden" name="q" value="rust" />
               <input type="hidden" name="s" value="{offset}" />
               <input type="hidden" name="vqd" value="4-123" />
               <input type="submit" value="Next" />
             </form>
           </div>"#
    )
}

/// Results numbered `first..first + count`, with a "Next" form when `next` is set.
pub fn page(first: usize, count: usize, next: Option<usize>) -> String {
    let mut html = String::from("<html><body>");
    for n in first..first + count {
        html.push_str(&result_block(n));
    }
    if let Some(offset) = next {
        html.push_str(&next_form(offset));
    }
    html.push_str("</body></html>");
    html
}

pub fn last_page(first: usize, count: usize) -> String {
    let mut html = page(first, count, Some(first + count));
    html.push_str(r#"<div class="result result--no-result">No more results.</div>"#);
    html
}

pub const BLOCKED: &str =
    r#"<html><body><div class="anomaly-modal"><form id="challenge-form"></form></div></body></html>"#;

// ==============================
// Fake transport
// ==============================

#[derive(Debug, Clone)]
pub struct Call {
    pub url: Url,
    pub form: Option<Form>,
}

/// Serves canned bodies in order and records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<String, HttpError>>>,
    calls: Mutex<Vec<Call>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<String, HttpError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }

    /// Fire `token` once the `served`-th reply has been handed out.
    pub fn cancelling_after(mut self, served: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((served, token));
        self
    }

    pub fn pages(pages: Vec<String>) -> Self {
        Self::new(pages.into_iter().map(Ok).collect())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(
        &self,
        url: &Url,
        form: Option<&Form>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, HttpError> {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(HttpError::Cancelled);
        }
        let served = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                url: url.clone(),
                form: form.cloned(),
            });
            calls.len()
        };
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected fetch #{served}"));
        if let Some((after, token)) = &self.cancel_after {
            if served == *after {
                token.cancel();
            }
        }
        reply
    }
}
