//! HTML results page extraction.
//!
//! Pure functions over the markup served by the HTML-only results endpoint.
//! Nothing here fails: missing structure yields empty or `None` fields.

use crate::types::{ParsedPage, SearchResult, SpellingCorrection, ZeroClickAnswer};
use ddg_http::Form;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Label of the submit button on the pagination form.
pub const NEXT_PAGE_LABEL: &str = "Next";

/// Substrings only present on the anti-automation interstitial.
const BLOCK_MARKERS: [&str; 2] = ["anomaly-modal", "challenge-form"];

struct Selectors {
    did_you_mean: Selector,
    anchor: Selector,
    zero_click: Selector,
    zero_click_heading: Selector,
    zero_click_abstract: Selector,
    zero_click_image: Selector,
    zero_click_source: Selector,
    organic: Selector,
    title: Selector,
    snippet: Selector,
    display_url: Selector,
    no_result: Selector,
    nav_link: Selector,
    form: Selector,
    submit: Selector,
    hidden: Selector,
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    did_you_mean: sel("#did_you_mean"),
    anchor: sel("a"),
    zero_click: sel(".zci-wrapper .zci"),
    zero_click_heading: sel(".zci__heading a"),
    zero_click_abstract: sel("#zero_click_abstract"),
    zero_click_image: sel(".zci__image"),
    zero_click_source: sel("a q"),
    organic: sel(".result.web-result:not(.result--ad):not(.result--no-result)"),
    title: sel(".result__a"),
    snippet: sel(".result__snippet"),
    display_url: sel(".result__url"),
    no_result: sel(".result--no-result"),
    nav_link: sel(".nav-link"),
    form: sel("form"),
    submit: sel(r#"input[type="submit"]"#),
    hidden: sel(r#"input[type="hidden"]"#),
});

/// True when the markup is the bot-challenge page rather than results.
///
/// ```
/// assert!(ddg_web::is_blocked(r#"<div class="anomaly-modal">x</div>"#));
/// assert!(!ddg_web::is_blocked("<html><body>No issues</body></html>"));
/// ```
pub fn is_blocked(html: &str) -> bool {
    BLOCK_MARKERS.iter().any(|m| html.contains(m))
}

/// Extract results, panels and the continuation form from one page.
pub fn parse_page(html: &str) -> ParsedPage {
    let doc = Html::parse_document(html);
    let s = &*SELECTORS;

    ParsedPage {
        results: organic_results(&doc, s),
        spelling: spelling(&doc, s),
        zero_click: zero_click(&doc, s),
        no_more_results: doc.select(&s.no_result).next().is_some(),
        continuation: continuation(&doc, s),
    }
}

fn spelling(doc: &Html, s: &Selectors) -> Option<SpellingCorrection> {
    let region = doc.select(&s.did_you_mean).next()?;
    let mut anchors = region.select(&s.anchor);
    let corrected = text_of(anchors.next()?);
    let original = anchors.next().map(|a| strip_quotes(&text_of(a)).to_string());
    Some(SpellingCorrection {
        corrected,
        original,
    })
}

/// Drop one leading and one trailing `"`.
fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}

fn zero_click(doc: &Html, s: &Selectors) -> Option<ZeroClickAnswer> {
    // The site renders at most one panel; later matches are ignored.
    let panel = doc.select(&s.zero_click).next()?;
    let heading_anchor = panel.select(&s.zero_click_heading).next();
    let heading = heading_anchor.map(text_of).unwrap_or_default();
    if heading.is_empty() {
        return None;
    }
    let url = heading_anchor
        .and_then(|a| a.value().attr("href"))
        .unwrap_or_default()
        .to_string();

    let abstract_el = panel.select(&s.zero_click_abstract).next();
    let abstract_text = abstract_el.map(text_without_anchors).unwrap_or_default();
    let image = abstract_el
        .and_then(|el| el.select(&s.zero_click_image).next())
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(str::to_string);
    let source = abstract_el
        .and_then(|el| el.select(&s.zero_click_source).next())
        .map(text_of)
        .filter(|name| !name.is_empty());

    Some(ZeroClickAnswer {
        heading,
        url,
        abstract_text,
        image,
        source,
    })
}

fn organic_results(doc: &Html, s: &Selectors) -> Vec<SearchResult> {
    doc.select(&s.organic)
        .filter_map(|el| {
            let title_el = el.select(&s.title).next()?;
            let title = text_of(title_el);
            let url = title_el.value().attr("href").unwrap_or_default().to_string();
            if title.is_empty() || url.is_empty() {
                return None;
            }
            Some(SearchResult {
                title,
                url,
                description: first_text(el, &s.snippet),
                display_url: first_text(el, &s.display_url),
            })
        })
        .collect()
}

/// First `.nav-link` whose form submits with the "Next" label wins.
fn continuation(doc: &Html, s: &Selectors) -> Option<Form> {
    for nav in doc.select(&s.nav_link) {
        // Only the first form of a nav-link is read; each carries one.
        let Some(form) = nav.select(&s.form).next() else {
            continue;
        };
        let is_next = form
            .select(&s.submit)
            .next()
            .and_then(|btn| btn.value().attr("value"))
            == Some(NEXT_PAGE_LABEL);
        if !is_next {
            continue;
        }

        let fields = form
            .select(&s.hidden)
            .filter_map(|input| {
                let el = input.value();
                let name = el.attr("name").filter(|n| !n.is_empty())?;
                Some((name.to_string(), el.attr("value").unwrap_or_default().to_string()))
            })
            .collect();
        return Some(fields);
    }
    None
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(el: ElementRef<'_>, selector: &Selector) -> String {
    el.select(selector).next().map(text_of).unwrap_or_default()
}

/// Text of `root` ignoring everything nested inside an `<a>`.
fn text_without_anchors(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_anchor = node
            .ancestors()
            .take_while(|a| a.id() != root.id())
            .any(|a| a.value().as_element().is_some_and(|e| e.name() == "a"));
        if !inside_anchor {
            out.push_str(text);
        }
    }
    out.trim().to_string()
}
