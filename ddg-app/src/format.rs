//! Renderers from an aggregated [`SearchResponse`] to text.
//!
//! Every renderer is a pure function; the caller appends the trailing newline
//! when writing to stdout.

use chrono::{DateTime, SecondsFormat, Utc};
use ddg_config::DEFAULT_BASE_URL;
use ddg_web::{SearchResponse, SpellingCorrection, ZeroClickAnswer};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Csv,
    OpenSearch,
    Markdown,
    Compact,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Json,
        OutputFormat::Jsonl,
        OutputFormat::Csv,
        OutputFormat::OpenSearch,
        OutputFormat::Markdown,
        OutputFormat::Compact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Csv => "csv",
            OutputFormat::OpenSearch => "opensearch",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Compact => "compact",
        }
    }

    pub fn render(self, data: &SearchResponse) -> String {
        match self {
            OutputFormat::Json => format_json(data),
            OutputFormat::Jsonl => format_jsonl(data),
            OutputFormat::Csv => format_csv(data),
            OutputFormat::OpenSearch => format_opensearch(data),
            OutputFormat::Markdown => format_markdown(data),
            OutputFormat::Compact => format_compact(data),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                let supported: Vec<&str> = OutputFormat::ALL.iter().map(|f| f.as_str()).collect();
                format!("Unknown format: {s}. Supported: {}", supported.join(", "))
            })
    }
}

// ==============================
// Escaping
// ==============================

/// Quote a CSV field when it holds a quote, comma or newline.
///
/// ```
/// use ddg_app::format::escape_csv;
///
/// assert_eq!(escape_csv("plain"), "plain");
/// assert_eq!(escape_csv(r#"say "hi", ok"#), r#""say ""hi"", ok""#);
/// ```
pub fn escape_csv(field: &str) -> String {
    if field.contains(['"', ',', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

// ==============================
// JSON
// ==============================

#[derive(Serialize)]
struct QueryEcho<'a> {
    role: &'static str,
    #[serde(rename = "searchTerms")]
    search_terms: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonItem<'a> {
    position: usize,
    title: &'a str,
    link: &'a str,
    description: &'a str,
    display_url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonEnvelope<'a> {
    #[serde(rename = "opensearch:totalResults")]
    total_results: usize,
    #[serde(rename = "opensearch:startIndex")]
    start_index: usize,
    #[serde(rename = "opensearch:itemsPerPage")]
    items_per_page: usize,
    #[serde(rename = "opensearch:Query")]
    query: QueryEcho<'a>,
    pages_scraped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    spelling: Option<&'a SpellingCorrection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zero_click: Option<&'a ZeroClickAnswer>,
    items: Vec<JsonItem<'a>>,
}

/// OpenSearch-flavoured JSON envelope, pretty printed with two-space indent.
pub fn format_json(data: &SearchResponse) -> String {
    let envelope = JsonEnvelope {
        total_results: data.results.len(),
        start_index: 1,
        items_per_page: data.results.len(),
        query: QueryEcho {
            role: "request",
            search_terms: &data.query,
        },
        pages_scraped: data.pages_scraped,
        spelling: data.spelling.as_ref(),
        zero_click: data.zero_click.as_ref(),
        items: data
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| JsonItem {
                position: i + 1,
                title: &r.title,
                link: &r.url,
                description: &r.description,
                display_url: &r.display_url,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&envelope).unwrap_or_default()
}

#[derive(Serialize)]
struct JsonlZeroClick<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    answer: &'a ZeroClickAnswer,
}

#[derive(Serialize)]
struct JsonlItem<'a> {
    position: usize,
    title: &'a str,
    link: &'a str,
    description: &'a str,
}

/// One JSON object per line; a zero-click answer, when present, comes first.
pub fn format_jsonl(data: &SearchResponse) -> String {
    let mut lines = Vec::with_capacity(data.results.len() + 1);
    if let Some(answer) = &data.zero_click {
        let line = JsonlZeroClick {
            kind: "zeroClick",
            answer,
        };
        lines.push(serde_json::to_string(&line).unwrap_or_default());
    }
    for (i, r) in data.results.iter().enumerate() {
        let item = JsonlItem {
            position: i + 1,
            title: &r.title,
            link: &r.url,
            description: &r.description,
        };
        lines.push(serde_json::to_string(&item).unwrap_or_default());
    }
    lines.join("\n")
}

// ==============================
// Tabular and feed formats
// ==============================

pub fn format_csv(data: &SearchResponse) -> String {
    let mut lines = vec!["position,title,link,description".to_string()];
    for (i, r) in data.results.iter().enumerate() {
        lines.push(format!(
            "{},{},{},{}",
            i + 1,
            escape_csv(&r.title),
            escape_csv(&r.url),
            escape_csv(&r.description)
        ));
    }
    lines.join("\n")
}

/// URL of the first results page for `query`, as linked from the Atom feed.
pub fn search_url(query: &str) -> String {
    format!("{DEFAULT_BASE_URL}?q={}", urlencoding::encode(query))
}

pub fn format_opensearch(data: &SearchResponse) -> String {
    format_opensearch_at(data, Utc::now())
}

/// OpenSearch 1.1 Atom feed stamped with `now`.
pub fn format_opensearch_at(data: &SearchResponse, now: DateTime<Utc>) -> String {
    let updated = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let url = escape_xml(&search_url(&data.query));
    let query = escape_xml(&data.query);
    let count = data.results.len();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<feed xmlns=\"http://www.w3.org/2005/Atom\"\n");
    xml.push_str("      xmlns:opensearch=\"http://a9.com/-/spec/opensearch/1.1/\">\n");
    xml.push_str(&format!("  <title>DuckDuckGo: {query}</title>\n"));
    xml.push_str(&format!("  <link href=\"{url}\"/>\n"));
    xml.push_str(&format!("  <updated>{updated}</updated>\n"));
    xml.push_str(&format!("  <id>{url}</id>\n"));
    xml.push_str(&format!(
        "  <opensearch:totalResults>{count}</opensearch:totalResults>\n"
    ));
    xml.push_str("  <opensearch:startIndex>1</opensearch:startIndex>\n");
    xml.push_str(&format!(
        "  <opensearch:itemsPerPage>{count}</opensearch:itemsPerPage>\n"
    ));
    xml.push_str(&format!(
        "  <opensearch:Query role=\"request\" searchTerms=\"{query}\"/>\n"
    ));

    if let Some(zc) = &data.zero_click {
        let link = escape_xml(&zc.url);
        xml.push_str("  <entry>\n");
        xml.push_str(&format!(
            "    <title type=\"text\">{}</title>\n",
            escape_xml(&zc.heading)
        ));
        xml.push_str(&format!("    <link href=\"{link}\"/>\n"));
        xml.push_str(&format!("    <id>{link}</id>\n"));
        xml.push_str(&format!(
            "    <summary>{}</summary>\n",
            escape_xml(&zc.abstract_text)
        ));
        xml.push_str("    <category term=\"zeroClick\"/>\n");
        xml.push_str("  </entry>\n");
    }

    for r in &data.results {
        let link = escape_xml(&r.url);
        xml.push_str("  <entry>\n");
        xml.push_str(&format!("    <title>{}</title>\n", escape_xml(&r.title)));
        xml.push_str(&format!("    <link href=\"{link}\"/>\n"));
        xml.push_str(&format!("    <id>{link}</id>\n"));
        xml.push_str(&format!(
            "    <summary>{}</summary>\n",
            escape_xml(&r.description)
        ));
        xml.push_str("  </entry>\n");
    }

    xml.push_str("</feed>");
    xml
}

// ==============================
// Human and LLM oriented text
// ==============================

pub fn format_markdown(data: &SearchResponse) -> String {
    let mut lines = vec![
        format!("# Search: {}", data.query),
        format!(
            "{} results from {} page(s)\n",
            data.results.len(),
            data.pages_scraped
        ),
    ];

    if let Some(spelling) = &data.spelling {
        lines.push(format!("> **Did you mean:** {}\n", spelling.corrected));
    }

    if let Some(zc) = &data.zero_click {
        lines.push(format!("> **{}** — {}", zc.heading, zc.abstract_text));
        let suffix = zc
            .source
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!(" ({s})"))
            .unwrap_or_default();
        lines.push(format!("> [Read more]({}){suffix}\n", zc.url));
    }

    for (i, r) in data.results.iter().enumerate() {
        lines.push(format!("{}. [{}]({})", i + 1, r.title, r.url));
        if !r.description.is_empty() {
            lines.push(format!("   {}", r.description));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Minimal-token rendering for model context windows.
pub fn format_compact(data: &SearchResponse) -> String {
    let mut lines = vec![
        format!("query: {}", data.query),
        format!("results: {}", data.results.len()),
    ];
    if let Some(spelling) = &data.spelling {
        lines.push(format!("did_you_mean: {}", spelling.corrected));
    }
    if let Some(zc) = &data.zero_click {
        lines.push(format!("zero_click: {}", zc.heading));
        lines.push(format!("    {}", zc.url));
        lines.push(format!("    {}", zc.abstract_text));
    }
    lines.push("---".to_string());

    for (i, r) in data.results.iter().enumerate() {
        lines.push(format!("[{}] {}", i + 1, r.title));
        lines.push(format!("    {}", r.url));
        if !r.description.is_empty() {
            lines.push(format!("    {}", r.description));
        }
    }

    lines.join("\n")
}
