//! DuckDuckGo HTML search: extraction and pagination.
//!
//! - Page extraction over the HTML-only results endpoint (`extract`)
//! - Multi-page search driving a [`ddg_http::Transport`] (`search`)
//! - Politeness delay between page fetches (`delay`)
//! - Terminal progress reporting (`progress`)

pub mod delay;
pub mod extract;
pub mod progress;
pub mod search;
pub mod types;

pub use delay::{DelayPolicy, NoDelay, RandomDelay};
pub use extract::{is_blocked, parse_page};
pub use progress::{NoProgress, ProgressSink, TerminalProgress};
pub use search::{SearchError, SearchOptions, SearchService, Searcher};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    ParsedPage, SearchResponse, SearchResult, SpellingCorrection, TimeRange, ZeroClickAnswer,
};
