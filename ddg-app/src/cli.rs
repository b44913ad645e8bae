use crate::format::OutputFormat;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use ddg_config::SearchSection;
use ddg_web::{CancellationToken, SearchOptions, TimeRange};
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

pub const USAGE: &str = r#"Usage: ddg-search [options] <query>

Search DuckDuckGo and output results in structured formats.

Options:
  -f, --format <fmt>       Output format (default: json). See formats below.
  -p, --pages <n>          Maximum pages to scrape, 0 for unlimited (default: 5)
  -n, --max-results <n>    Maximum number of results to return
  -r, --region <code>      Region code, e.g. us-en, uk-en (default: all regions)
  -t, --time <range>       Time filter: d (day), w (week), m (month), y (year)
  -c, --config <path>      Config file (default: ~/.config/ddg-search/config.yaml)
  -h, --help               Show this help message

Formats:
  json        OpenSearch 1.1 response conventions in JSON
  jsonl       One JSON object per result line (streaming-friendly)
  csv         CSV with headers
  opensearch  OpenSearch 1.1 Atom XML
  markdown    Numbered markdown list (AI/LLM-friendly)
  compact     Minimal token format for LLM context windows

  Results are written to stdout; progress is written to stderr.

Examples:
  ddg-search "node.js tutorial"
  ddg-search -f csv -p 3 "linux kernel"
  ddg-search -f opensearch "rust programming" > results.xml
  ddg-search -f compact "api docs" | llm "summarize these results"
  ddg-search -p 0 "scrape everything"
  ddg-search -r us-en -t w "recent news"
  ddg-search "rust programming" | jq '.items[].link'"#;

const PAGES_MSG: &str = "--pages must be a non-negative integer (0 for unlimited)";
const MAX_RESULTS_MSG: &str = "--max-results must be a positive integer";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// Help requested or no query given; the caller prints [`USAGE`].
    #[error("{}", USAGE)]
    Usage,
    /// A flag value failed validation.
    #[error("{0}")]
    Invalid(String),
    /// The command line itself could not be parsed.
    #[error("Error: {0}")]
    Parse(String),
}

/// Raw command line, before configuration defaults are applied.
#[derive(Parser, Debug)]
#[command(name = "ddg-search", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    #[arg(short = 'f', long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    #[arg(short = 'p', long, allow_negative_numbers = true, value_parser = parse_pages)]
    pub pages: Option<u32>,

    #[arg(
        short = 'n',
        long = "max-results",
        allow_negative_numbers = true,
        value_parser = parse_max_results
    )]
    pub max_results: Option<usize>,

    #[arg(short = 'r', long)]
    pub region: Option<String>,

    #[arg(short = 't', long, value_parser = parse_time)]
    pub time: Option<TimeRange>,

    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    #[arg(short = 'h', long, action = ArgAction::SetTrue)]
    pub help: bool,

    #[arg(value_name = "QUERY")]
    pub query: Vec<String>,
}

impl Cli {
    /// Parse a full argv, program name first.
    pub fn try_parse_args<I, T>(argv: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::try_parse_from(argv).map_err(from_clap)?;
        if cli.help || cli.query.is_empty() {
            return Err(CliError::Usage);
        }
        Ok(cli)
    }

    /// Fill unset flags from the `search` config section.
    pub fn resolve(self, defaults: &SearchSection) -> Result<Invocation, CliError> {
        let format = match self.format {
            Some(f) => f,
            None => defaults.format.parse().map_err(CliError::Invalid)?,
        };
        let time_range = match self.time {
            Some(t) => Some(t),
            None => match defaults.time.as_deref().map(str::trim) {
                Some(raw) if !raw.is_empty() => Some(raw.parse().map_err(CliError::Invalid)?),
                _ => None,
            },
        };
        let pages = self.pages.unwrap_or(defaults.pages);
        let region = self
            .region
            .or_else(|| defaults.region.clone())
            .filter(|r| !r.is_empty());

        Ok(Invocation {
            query: self.query.join(" "),
            format,
            max_pages: (pages != 0).then_some(pages),
            max_results: self.max_results,
            region,
            time_range,
        })
    }
}

/// A validated request ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub query: String,
    pub format: OutputFormat,
    /// `None` means unlimited.
    pub max_pages: Option<u32>,
    pub max_results: Option<usize>,
    pub region: Option<String>,
    pub time_range: Option<TimeRange>,
}

impl Invocation {
    pub fn search_options(&self, cancel: Option<CancellationToken>) -> SearchOptions {
        SearchOptions {
            max_pages: self.max_pages,
            max_results: self.max_results,
            region: self.region.clone(),
            time_range: self.time_range,
            cancel,
        }
    }
}

fn parse_format(raw: &str) -> Result<OutputFormat, String> {
    raw.parse()
}

fn parse_pages(raw: &str) -> Result<u32, String> {
    raw.trim().parse::<u32>().map_err(|_| PAGES_MSG.to_string())
}

fn parse_max_results(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(MAX_RESULTS_MSG.to_string()),
    }
}

fn parse_time(raw: &str) -> Result<TimeRange, String> {
    raw.parse()
}

fn from_clap(err: clap::Error) -> CliError {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            CliError::Usage
        }
        ErrorKind::ValueValidation => match std::error::Error::source(&err) {
            Some(inner) => CliError::Invalid(inner.to_string()),
            None => CliError::Parse(first_line(&err)),
        },
        _ => CliError::Parse(first_line(&err)),
    }
}

fn first_line(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}
