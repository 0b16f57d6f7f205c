#![forbid(unsafe_code)]

//! Normalized video records and the defensive mapping from raw provider items.
//!
//! The search provider returns loosely shaped, optional-field-heavy JSON.
//! Every struct in the raw model therefore treats every field as absent by
//! default, and normalization degrades to `None`/placeholder values instead of
//! failing a whole search because one record looked odd. That noise is
//! expected in third-party data and is deliberately not logged.

use serde::{Deserialize, Serialize};

/// Placeholder title when the provider omits one.
pub const UNTITLED_PLACEHOLDER: &str = "Untitled";
/// Placeholder channel name when the provider omits one.
pub const UNKNOWN_CREATOR_PLACEHOLDER: &str = "Unknown creator";

/// A video as exposed by the API after normalization.
///
/// Records are immutable once built; the discovery pipeline only ever selects
/// subsets of them, it never edits them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub channel_title: String,
    pub channel_id: Option<String>,
    pub channel_url: Option<String>,
    pub thumbnail: Option<String>,
    pub duration_label: Option<String>,
    pub duration_seconds: Option<i64>,
    pub is_live: bool,
}

/// One unvalidated search result as handed over by the provider.
///
/// Non-video results (playlists, channels, ads) share this shape; `kind`
/// distinguishes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSearchItem {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub short_byline_text: Option<RawBylineText>,
    pub thumbnail: Option<RawThumbnailSet>,
    pub length: Option<RawLength>,
    pub is_live: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawBylineText {
    pub runs: Vec<RawBylineRun>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawBylineRun {
    pub text: Option<String>,
    pub navigation_endpoint: Option<RawNavigationEndpoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNavigationEndpoint {
    pub browse_endpoint: Option<RawBrowseEndpoint>,
    pub command_metadata: Option<RawCommandMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawBrowseEndpoint {
    pub browse_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCommandMetadata {
    pub web_command_metadata: Option<RawWebCommandMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawWebCommandMetadata {
    pub url: Option<String>,
}

/// Thumbnail candidates, ordered by ascending resolution (provider convention).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawThumbnailSet {
    pub thumbnails: Vec<RawThumbnail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawThumbnail {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLength {
    pub simple_text: Option<String>,
}

/// Converts a human-readable duration label ("3:45", "1:02:03") to seconds.
///
/// Every colon-separated segment must parse as a base-10 integer; segments are
/// folded most-significant-first (`acc * 60 + segment`), which handles one,
/// two and three segment labels alike. Malformed labels yield `None` rather
/// than an error, and so do labels whose fold overflows `i64`. Out-of-range
/// segments such as "99:99" are folded as-is; the provider never emits them
/// but tightening here would change observed behavior for no gain.
pub fn parse_duration_label(label: Option<&str>) -> Option<i64> {
    let label = label?;
    label.split(':').try_fold(0i64, |acc, segment| {
        acc.checked_mul(60)?
            .checked_add(segment.parse::<i64>().ok()?)
    })
}

/// Maps one raw provider item into a [`VideoRecord`].
///
/// Returns `None` for anything that is not a displayable video: missing id,
/// or a non-video `kind` (playlists, channels, ads). Those are silently
/// skipped, never treated as request failures.
pub fn normalize_item(item: &RawSearchItem) -> Option<VideoRecord> {
    if item.kind.as_deref() != Some("video") {
        return None;
    }
    let id = item.id.as_deref()?.to_string();
    if id.is_empty() {
        return None;
    }

    // Only the first byline run carries the canonical channel link; later
    // runs are badges and separators.
    let primary_run = item
        .short_byline_text
        .as_ref()
        .and_then(|byline| byline.runs.first());
    let channel_id = primary_run
        .and_then(|run| run.navigation_endpoint.as_ref())
        .and_then(|endpoint| endpoint.browse_endpoint.as_ref())
        .and_then(|browse| browse.browse_id.clone());
    let channel_url = primary_run
        .and_then(|run| run.navigation_endpoint.as_ref())
        .and_then(|endpoint| endpoint.command_metadata.as_ref())
        .and_then(|metadata| metadata.web_command_metadata.as_ref())
        .and_then(|web| web.url.clone());

    // Thumbnails arrive in ascending resolution; the last one is the best.
    let thumbnail = item
        .thumbnail
        .as_ref()
        .and_then(|set| set.thumbnails.last())
        .and_then(|thumb| thumb.url.clone());

    let duration_label = item
        .length
        .as_ref()
        .and_then(|length| length.simple_text.clone());
    let duration_seconds = parse_duration_label(duration_label.as_deref());

    Some(VideoRecord {
        id,
        title: item
            .title
            .clone()
            .unwrap_or_else(|| UNTITLED_PLACEHOLDER.to_string()),
        channel_title: item
            .channel_title
            .clone()
            .unwrap_or_else(|| UNKNOWN_CREATOR_PLACEHOLDER.to_string()),
        channel_id,
        channel_url,
        thumbnail,
        duration_label,
        duration_seconds,
        is_live: item.is_live.unwrap_or(false),
    })
}
