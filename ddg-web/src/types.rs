use ddg_http::Form;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One organic listing. `title` and `url` are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub description: String,
    pub display_url: String,
}

/// Direct-answer panel shown above the organic results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZeroClickAnswer {
    pub heading: String,
    pub url: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// "Did you mean" suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellingCorrection {
    pub corrected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

/// Everything extracted from a single results page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPage {
    pub results: Vec<SearchResult>,
    pub spelling: Option<SpellingCorrection>,
    pub zero_click: Option<ZeroClickAnswer>,
    /// The page rendered a "no results" placeholder.
    pub no_more_results: bool,
    /// Hidden fields of the "Next" form; `None` when no further page is reachable.
    pub continuation: Option<Form>,
}

/// Aggregate of every page fetched for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub spelling: Option<SpellingCorrection>,
    pub zero_click: Option<ZeroClickAnswer>,
    pub pages_scraped: usize,
}

/// Recency filter sent as the `df` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
}

impl TimeRange {
    pub fn as_param(self) -> &'static str {
        match self {
            TimeRange::Day => "d",
            TimeRange::Week => "w",
            TimeRange::Month => "m",
            TimeRange::Year => "y",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    /// Accepts the site's single-letter codes and their long names.
    ///
    /// ```
    /// use ddg_web::TimeRange;
    ///
    /// assert_eq!("w".parse::<TimeRange>(), Ok(TimeRange::Week));
    /// assert_eq!("Year".parse::<TimeRange>(), Ok(TimeRange::Year));
    /// assert!("z".parse::<TimeRange>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "day" => Ok(TimeRange::Day),
            "w" | "week" => Ok(TimeRange::Week),
            "m" | "month" => Ok(TimeRange::Month),
            "y" | "year" => Ok(TimeRange::Year),
            _ => Err("Unknown time range: d, w, m, y".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_camel_case() {
        let resp = SearchResponse {
            query: "rust".into(),
            results: vec![SearchResult {
                title: "Rust".into(),
                url: "https://www.rust-lang.org/".into(),
                description: String::new(),
                display_url: "www.rust-lang.org".into(),
            }],
            spelling: None,
            zero_click: Some(ZeroClickAnswer {
                heading: "Rust".into(),
                url: "https://en.wikipedia.org/wiki/Rust".into(),
                abstract_text: "A language.".into(),
                image: None,
                source: None,
            }),
            pages_scraped: 1,
        };

        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["pagesScraped"], 1);
        assert_eq!(value["results"][0]["displayUrl"], "www.rust-lang.org");
        assert_eq!(value["zeroClick"]["abstract"], "A language.");
        assert!(value["zeroClick"].get("image").is_none());
    }

    #[test]
    fn time_range_maps_to_query_letters() {
        let all = [
            (TimeRange::Day, "d"),
            (TimeRange::Week, "w"),
            (TimeRange::Month, "m"),
            (TimeRange::Year, "y"),
        ];
        for (range, letter) in all {
            assert_eq!(range.as_param(), letter);
            assert_eq!(letter.parse::<TimeRange>(), Ok(range));
        }
        assert_eq!(
            "fortnight".parse::<TimeRange>().unwrap_err(),
            "Unknown time range: d, w, m, y"
        );
    }
}
