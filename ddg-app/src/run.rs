use crate::cli::Invocation;
use anyhow::{Context, Result};
use ddg_common::observability::{LogConfig, LogFormat, init_logging};
use ddg_config::{DdgConfig, DdgConfigLoader, LoggingSection};
use ddg_http::HttpClient;
use ddg_web::{CancellationToken, RandomDelay, SearchService, Searcher, TerminalProgress};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ==============================
// Wiring
// ==============================

/// Default file when present, or the explicit `--config` file which must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<DdgConfig> {
    let loader = match explicit {
        Some(path) => DdgConfigLoader::new().with_file(path),
        None => DdgConfigLoader::new().with_default_file(),
    };
    loader.load().context("failed to load configuration")
}

pub fn log_config(section: &LoggingSection) -> LogConfig {
    LogConfig {
        log_dir: section.dir.clone(),
        emit_stderr: section.stderr,
        format: if section.json {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        default_filter: section.filter.clone(),
        ..LogConfig::default()
    }
}

/// Start logging without ever failing the search.
///
/// An init error is reported as one stderr line and the run carries on with
/// no file sink.
pub fn start_logging(section: &LoggingSection) -> Option<PathBuf> {
    match init_logging(log_config(section)) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    }
}

/// Searcher backed by the real HTTP client, random delay and terminal progress.
pub fn build_searcher(cfg: &DdgConfig) -> Result<Searcher> {
    let mut client = HttpClient::new(&cfg.http.base_url)
        .with_context(|| format!("invalid base URL: {}", cfg.http.base_url))?
        .with_timeout(Duration::from_secs(cfg.http.timeout_secs))
        .with_retries(cfg.http.retries);
    if !cfg.http.user_agent.is_empty() {
        client = client.with_user_agent(cfg.http.user_agent.clone());
    }

    let base = client.base().clone();
    Ok(Searcher::new(base, Arc::new(client))
        .with_delay(Arc::new(RandomDelay::from_millis(
            cfg.delay.min_ms,
            cfg.delay.max_ms,
        )))
        .with_progress(Arc::new(TerminalProgress::stderr())))
}

// ==============================
// Execution
// ==============================

/// Run the search and write the rendered output plus a newline to `out`.
pub async fn execute<W: Write>(
    inv: &Invocation,
    service: &dyn SearchService,
    cancel: Option<CancellationToken>,
    out: &mut W,
) -> Result<()> {
    let opts = inv.search_options(cancel);
    let response = service.search(&inv.query, &opts).await?;
    tracing::debug!(
        target: "app",
        format = %inv.format,
        results = response.results.len(),
        "app.render"
    );

    let rendered = inv.format.render(&response);
    writeln!(out, "{rendered}").context("failed to write results")?;
    out.flush().context("failed to flush stdout")?;
    Ok(())
}
