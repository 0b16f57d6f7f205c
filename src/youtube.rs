#![forbid(unsafe_code)]

//! Client for the external video search provider.
//!
//! YouTube's results page embeds everything we need as a `ytInitialData` JSON
//! blob, so the client fetches the page like a browser would and walks the
//! blob down to the `videoRenderer` nodes. The walk is defensive throughout:
//! a renderer that does not look like a video is skipped, never an error.
//! Only a transport failure or a page without the blob fails the call.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;

use crate::videos::{RawBylineText, RawLength, RawSearchItem, RawThumbnailSet};

const RESULTS_URL: &str = "https://www.youtube.com/results";
// Pretend to be a desktop browser; the mobile page ships a different blob.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const INITIAL_DATA_MARKER: &str = "var ytInitialData = ";

/// Result-type restriction passed to the provider, mapped to the `sp`
/// parameter of the results page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    Videos,
}

impl SearchFilter {
    fn sp_param(self) -> &'static str {
        match self {
            // Pre-encoded protobuf for "type: video".
            SearchFilter::Videos => "EgIQAQ%3D%3D",
        }
    }
}

/// The single seam between the discovery pipeline and the outside world.
///
/// Mirrors the provider's keyword-search call: an augmented query, a playlist
/// flag, a result cap and an optional result-type filter, yielding raw items
/// for the normalizer. Implementations must not retry on failure; the
/// pipeline treats any error as fatal for the request.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn list_by_keyword(
        &self,
        query: &str,
        with_playlist: bool,
        limit: usize,
        filter: Option<SearchFilter>,
    ) -> Result<Vec<RawSearchItem>>;
}

/// Scraping client against the public YouTube results page.
pub struct YoutubeSearchClient {
    http: reqwest::Client,
}

impl YoutubeSearchClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building HTTP client")?;
        Ok(Self { http })
    }

    async fn fetch_results_page(&self, query: &str, filter: Option<SearchFilter>) -> Result<String> {
        let mut url = reqwest::Url::parse(RESULTS_URL).context("parsing results URL")?;
        url.query_pairs_mut().append_pair("search_query", query);
        if let Some(filter) = filter {
            // The sp value is already percent-encoded; appending it through
            // query_pairs_mut would double-encode the padding.
            let with_sp = format!("{}&sp={}", url.as_str(), filter.sp_param());
            url = reqwest::Url::parse(&with_sp).context("parsing filtered results URL")?;
        }

        let response = self
            .http
            .get(url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .context("requesting search results")?;
        if !response.status().is_success() {
            bail!("search results request failed with status {}", response.status());
        }
        response.text().await.context("reading search results body")
    }
}

#[async_trait]
impl SearchProvider for YoutubeSearchClient {
    async fn list_by_keyword(
        &self,
        query: &str,
        with_playlist: bool,
        limit: usize,
        filter: Option<SearchFilter>,
    ) -> Result<Vec<RawSearchItem>> {
        let html = self.fetch_results_page(query, filter).await?;
        let data = extract_initial_data(&html)?;
        Ok(collect_raw_items(&data, with_playlist, limit))
    }
}

/// Pulls the `ytInitialData` JSON out of the results page HTML.
fn extract_initial_data(html: &str) -> Result<Value> {
    let start = html
        .find(INITIAL_DATA_MARKER)
        .map(|index| index + INITIAL_DATA_MARKER.len())
        .context("ytInitialData not found in results page")?;
    let tail = &html[start..];
    let end = tail
        .find("</script>")
        .context("unterminated ytInitialData script")?;
    let raw = tail[..end].trim().trim_end_matches(';');
    serde_json::from_str(raw).context("parsing ytInitialData")
}

/// Walks the initial data down to the result renderers and maps each one.
///
/// Layout: `twoColumnSearchResultsRenderer → primaryContents →
/// sectionListRenderer → itemSectionRenderer → contents[]`. Sections also
/// contain shelves and ad slots; those simply do not decode to an item here.
fn collect_raw_items(data: &Value, with_playlist: bool, limit: usize) -> Vec<RawSearchItem> {
    let sections = data["contents"]["twoColumnSearchResultsRenderer"]["primaryContents"]
        ["sectionListRenderer"]["contents"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut items = Vec::new();
    for section in sections {
        let Some(contents) = section["itemSectionRenderer"]["contents"].as_array() else {
            continue;
        };
        for entry in contents {
            if items.len() >= limit {
                return items;
            }
            if let Some(renderer) = entry.get("videoRenderer") {
                if let Some(item) = raw_item_from_video_renderer(renderer) {
                    items.push(item);
                }
            } else if with_playlist
                && let Some(renderer) = entry.get("playlistRenderer")
                && let Some(item) = raw_item_from_playlist_renderer(renderer)
            {
                items.push(item);
            }
        }
    }
    items
}

/// Maps one `videoRenderer` node into the raw item shape the normalizer
/// expects. Subtrees that fail to decode degrade to absent fields.
fn raw_item_from_video_renderer(renderer: &Value) -> Option<RawSearchItem> {
    let id = renderer["videoId"].as_str()?.to_string();

    let title = text_of(&renderer["title"]);
    let channel_title = text_of(&renderer["ownerText"]).or_else(|| text_of(&renderer["shortBylineText"]));

    let short_byline_text: Option<RawBylineText> =
        serde_json::from_value(renderer["shortBylineText"].clone()).ok();
    let thumbnail: Option<RawThumbnailSet> =
        serde_json::from_value(renderer["thumbnail"].clone()).ok();
    let length: Option<RawLength> = serde_json::from_value(renderer["lengthText"].clone()).ok();

    Some(RawSearchItem {
        id: Some(id),
        kind: Some("video".to_string()),
        title,
        channel_title,
        short_byline_text,
        thumbnail,
        length,
        is_live: Some(has_live_badge(renderer)),
    })
}

fn raw_item_from_playlist_renderer(renderer: &Value) -> Option<RawSearchItem> {
    let id = renderer["playlistId"].as_str()?.to_string();
    Some(RawSearchItem {
        id: Some(id),
        kind: Some("playlist".to_string()),
        title: text_of(&renderer["title"]),
        channel_title: text_of(&renderer["shortBylineText"]),
        short_byline_text: serde_json::from_value(renderer["shortBylineText"].clone()).ok(),
        thumbnail: None,
        length: None,
        is_live: Some(false),
    })
}

/// Reads a YouTube text node, which is either `{"simpleText": ...}` or
/// `{"runs": [{"text": ...}, ...]}`.
fn text_of(node: &Value) -> Option<String> {
    if let Some(simple) = node["simpleText"].as_str() {
        return Some(simple.to_string());
    }
    node["runs"][0]["text"].as_str().map(str::to_string)
}

fn has_live_badge(renderer: &Value) -> bool {
    renderer["badges"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .any(|badge| {
            badge["metadataBadgeRenderer"]["style"].as_str()
                == Some("BADGE_STYLE_TYPE_LIVE_NOW")
        })
}
