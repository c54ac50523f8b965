use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use rand::Rng;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::fetcher::Fetcher;
use crate::settings::Settings;
use crate::utils::{dedup_preserving_order, tool_from_url};

static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d[\d,]*)\s*\+").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Text that identifies the heading carrying the category size,
/// e.g. "Browse 139+ Best AI Tools for Human Resources".
const COUNT_HEADING: &str = "Best AI";

/// A category listing that reveals more tools each time it is scrolled.
pub trait ListingSource {
    /// Number of tools the listing claims to hold.
    fn expected_count(&mut self) -> impl Future<Output = Result<usize>>;
    /// Perform scroll number `step` (0-based) and return the links it revealed.
    fn scroll(&mut self, step: usize) -> impl Future<Output = Result<Vec<String>>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
    Complete(Vec<String>),
    /// Scrolling stopped before the advertised count was reached.
    Incomplete { tools: Vec<String>, expected: usize },
}

impl Collection {
    pub fn tools(&self) -> &[String] {
        match self {
            Collection::Complete(tools) | Collection::Incomplete { tools, .. } => tools,
        }
    }
}

/// Digits before the first `+`, thousands separators allowed.
pub fn parse_tool_count(text: &str) -> Result<usize> {
    COUNT_RE
        .captures(text)
        .and_then(|caps| caps[1].replace(',', "").parse().ok())
        .ok_or_else(|| ScrapeError::ToolCount {
            text: text.to_string(),
        })
}

/// Tool identifier for an on-site `/tool/<id>` link.
pub fn tool_from_link(href: &str, site_host: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let host = url.host_str()?.trim_start_matches("www.");
    if host != site_host {
        return None;
    }
    tool_from_url(url.as_str())
}

/// Scroll until the listing yields as many distinct tools as it advertises.
/// Gives up after `max_scroll_attempts` scrolls, or after
/// `max_stalled_scrolls` scrolls in a row that reveal nothing new.
pub async fn collect<L: ListingSource>(source: &mut L, settings: &Settings) -> Result<Collection> {
    let expected = source.expected_count().await?;
    info!("Number of tools: {}", expected);

    let site_host = settings.site_host();
    let mut links: Vec<String> = Vec::new();
    let mut tools: Vec<String> = Vec::new();
    let mut stalled = 0;

    for step in 0..settings.max_scroll_attempts {
        if step > 0 {
            tokio::time::sleep(scroll_delay(settings)).await;
        }

        links.extend(source.scroll(step).await?);
        let before = tools.len();
        tools = dedup_preserving_order(
            links.iter().filter_map(|href| tool_from_link(href, &site_host)),
        );
        info!("{} links found so far", tools.len());
        debug!("{:?}", tools);

        if tools.len() >= expected {
            return Ok(Collection::Complete(tools));
        }

        if tools.len() == before {
            stalled += 1;
            if stalled >= settings.max_stalled_scrolls {
                warn!("No new tools after {} scrolls, stopping", stalled);
                break;
            }
        } else {
            stalled = 0;
        }
    }

    Ok(Collection::Incomplete { tools, expected })
}

/// Random pause in the configured range between two scrolls.
fn scroll_delay(settings: &Settings) -> Duration {
    let (min, max) = (settings.scroll_delay_min_secs, settings.scroll_delay_max_secs);
    if max <= min {
        return Duration::from_secs_f64(min);
    }
    Duration::from_secs_f64(rand::rng().random_range(min..=max))
}

/// Category listing served page by page over HTTP. Scroll step `n`
/// loads `?page=n+1`.
pub struct HttpListing {
    fetcher: Fetcher,
    listing_url: String,
    first_page: Option<String>,
}

impl HttpListing {
    pub fn new(fetcher: Fetcher, category: &str) -> Self {
        let listing_url = format!("{}/ai-tools/{}", fetcher.base_url(), category);
        HttpListing {
            fetcher,
            listing_url,
            first_page: None,
        }
    }

    fn page_url(&self, step: usize) -> String {
        format!("{}?page={}", self.listing_url, step + 1)
    }

    async fn first_page(&mut self) -> Result<String> {
        if let Some(html) = &self.first_page {
            return Ok(html.clone());
        }
        let html = self.fetcher.get_html(&self.page_url(0)).await?;
        self.first_page = Some(html.clone());
        Ok(html)
    }
}

impl ListingSource for HttpListing {
    async fn expected_count(&mut self) -> Result<usize> {
        let html = self.first_page().await?;
        let heading = count_heading(&html).ok_or_else(|| ScrapeError::ToolCount {
            text: format!("{} (no \"{}\" heading)", self.listing_url, COUNT_HEADING),
        })?;
        parse_tool_count(&heading)
    }

    async fn scroll(&mut self, step: usize) -> Result<Vec<String>> {
        let html = if step == 0 {
            self.first_page().await?
        } else {
            self.fetcher.get_html(&self.page_url(step)).await?
        };
        Ok(page_links(&html, &self.listing_url))
    }
}

/// Full text of the element whose own text mentions "Best AI".
pub fn count_heading(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document.root_element().descendants().find_map(|node| {
        let Node::Text(text) = node.value() else {
            return None;
        };
        if !text.contains(COUNT_HEADING) {
            return None;
        }
        let parent = ElementRef::wrap(node.parent()?)?;
        Some(parent.text().collect::<String>().trim().to_string())
    })
}

/// Every anchor target on the page, resolved against `base`.
pub fn page_links(html: &str, base: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://www.futurepedia.io";

    struct FakeListing {
        count: usize,
        pages: Vec<Vec<String>>,
        scrolls: usize,
    }

    impl FakeListing {
        fn new(count: usize, pages: &[&[&str]]) -> Self {
            FakeListing {
                count,
                pages: pages
                    .iter()
                    .map(|p| p.iter().map(|id| format!("{}/tool/{}", SITE, id)).collect())
                    .collect(),
                scrolls: 0,
            }
        }
    }

    impl ListingSource for FakeListing {
        async fn expected_count(&mut self) -> Result<usize> {
            Ok(self.count)
        }

        async fn scroll(&mut self, step: usize) -> Result<Vec<String>> {
            self.scrolls += 1;
            let mut links = vec![format!("{}/ai-tools/copywriting", SITE)];
            links.extend(self.pages.get(step).cloned().unwrap_or_default());
            Ok(links)
        }
    }

    #[test]
    fn count_from_heading() {
        assert_eq!(
            parse_tool_count("Browse 139+ Best AI Tools for Human Resources").unwrap(),
            139
        );
        assert_eq!(parse_tool_count("1,024+ Best AI Tools").unwrap(), 1024);
        assert!(matches!(
            parse_tool_count("Best AI Tools"),
            Err(ScrapeError::ToolCount { .. })
        ));
    }

    #[test]
    fn links_must_be_on_site_tool_pages() {
        let host = "futurepedia.io";
        assert_eq!(
            tool_from_link("https://www.futurepedia.io/tool/chatgpt", host),
            Some("chatgpt".into())
        );
        assert_eq!(
            tool_from_link("https://futurepedia.io/tool/jasper?utm=x", host),
            Some("jasper".into())
        );
        assert_eq!(tool_from_link("https://www.futurepedia.io/ai-tools/video", host), None);
        assert_eq!(tool_from_link("https://example.com/tool/chatgpt", host), None);
        assert_eq!(tool_from_link("https://www.futurepedia.io/tool/", host), None);
        assert_eq!(tool_from_link("/tool/relative", host), None);
    }

    #[test]
    fn heading_and_links_from_html() {
        let html = r#"<html><body>
            <h1>Browse <span>139</span>+ Best AI Tools for Human Resources</h1>
            <a href="/tool/chatgpt">ChatGPT</a>
            <a href="https://www.futurepedia.io/tool/jasper">Jasper</a>
            <a>no target</a>
        </body></html>"#;
        let heading = count_heading(html).unwrap();
        assert_eq!(parse_tool_count(&heading).unwrap(), 139);
        assert_eq!(
            page_links(html, "https://www.futurepedia.io/ai-tools/human-resources"),
            vec![
                "https://www.futurepedia.io/tool/chatgpt",
                "https://www.futurepedia.io/tool/jasper"
            ]
        );
    }

    #[tokio::test]
    async fn collects_until_count_reached() {
        let mut listing = FakeListing::new(
            4,
            &[&["a", "b"], &["b", "c"], &["a", "d"], &["e"]],
        );
        let collection = collect(&mut listing, &Settings::without_delays()).await.unwrap();
        assert_eq!(
            collection,
            Collection::Complete(vec!["a".into(), "b".into(), "c".into(), "d".into()])
        );
        assert_eq!(listing.scrolls, 3);
    }

    #[tokio::test]
    async fn stalled_listing_returns_partial_result() {
        let mut listing = FakeListing::new(10, &[&["a", "b"], &["b"]]);
        let settings = Settings {
            max_stalled_scrolls: 3,
            ..Settings::without_delays()
        };
        let collection = collect(&mut listing, &settings).await.unwrap();
        assert_eq!(
            collection,
            Collection::Incomplete {
                tools: vec!["a".into(), "b".into()],
                expected: 10
            }
        );
        assert_eq!(listing.scrolls, 4);
    }

    #[tokio::test]
    async fn scroll_attempts_are_bounded() {
        let pages: Vec<Vec<String>> = (0..100).map(|i| vec![format!("tool-{}", i)]).collect();
        let page_refs: Vec<Vec<&str>> = pages
            .iter()
            .map(|p| p.iter().map(String::as_str).collect())
            .collect();
        let slices: Vec<&[&str]> = page_refs.iter().map(Vec::as_slice).collect();
        let mut listing = FakeListing::new(1000, &slices);
        let settings = Settings {
            max_scroll_attempts: 7,
            ..Settings::without_delays()
        };
        let collection = collect(&mut listing, &settings).await.unwrap();
        assert!(matches!(collection, Collection::Incomplete { .. }));
        assert_eq!(collection.tools().len(), 7);
        assert_eq!(listing.scrolls, 7);
    }
}
