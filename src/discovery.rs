#![forbid(unsafe_code)]

//! The discovery pipeline: query augmentation, tutorial/short classification
//! and the per-request orchestration around the search provider.
//!
//! Each request flows strictly forward: augment the query, make exactly one
//! provider call, normalize every raw item, filter by mode, respond. Nothing
//! is cached or retried and no state survives the request.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::videos::{VideoRecord, normalize_item};
use crate::youtube::{SearchFilter, SearchProvider};

/// Fixed cap on raw results requested from the provider per search.
pub const MAX_RESULTS: usize = 30;
/// Upper bound, in seconds, for a record to count as short-form.
pub const SHORTS_MAX_SECONDS: i64 = 90;

/// The two supported discovery intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Tutorials,
    Shorts,
}

impl Mode {
    /// Resolves the `type` query parameter. Exactly the literal `"shorts"`
    /// selects shorts; anything else, including absence, means tutorials.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("shorts") => Mode::Shorts,
            _ => Mode::Tutorials,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Tutorials => "tutorials",
            Mode::Shorts => "shorts",
        }
    }
}

/// Derives the provider-facing search string for a trimmed, non-empty query.
///
/// Shorts searches always get the vertical-video bias. Tutorial searches only
/// get the editing bias when the user has not already signaled intent with
/// "edit" or "tutorial" somewhere in the query.
pub fn augment_query(query: &str, mode: Mode) -> String {
    match mode {
        Mode::Shorts => format!("{query} vertical video"),
        Mode::Tutorials => {
            let normalized = query.to_lowercase();
            if normalized.contains("edit") || normalized.contains("tutorial") {
                query.to_string()
            } else {
                format!("{query} editing tutorial")
            }
        }
    }
}

/// Keeps the records matching the requested mode, preserving provider order.
///
/// Tutorials may be of any length, but live sessions are not pre-produced
/// tutorials and are dropped. Shorts additionally require a known duration of
/// at most [`SHORTS_MAX_SECONDS`]; an unknown duration cannot be verified as
/// short-form, so those records are excluded rather than guessed at.
pub fn filter_records(records: Vec<VideoRecord>, mode: Mode) -> Vec<VideoRecord> {
    match mode {
        Mode::Tutorials => records.into_iter().filter(|record| !record.is_live).collect(),
        Mode::Shorts => records
            .into_iter()
            .filter(|record| {
                !record.is_live
                    && record
                        .duration_seconds
                        .is_some_and(|seconds| seconds <= SHORTS_MAX_SECONDS)
            })
            .collect(),
    }
}

/// Payload returned by `/api/search`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResponse {
    pub query: String,
    #[serde(rename = "type")]
    pub mode: Mode,
    pub total: usize,
    pub results: Vec<VideoRecord>,
}

/// Runs one discovery request end to end.
///
/// The caller validates and trims the query first. Provider failures abort
/// the whole request; individual malformed records are absorbed silently by
/// the normalizer. The filter uses the caller's mode, not the augmented
/// query.
pub async fn discover(
    provider: &dyn SearchProvider,
    query: &str,
    mode: Mode,
) -> Result<DiscoveryResponse> {
    let search_query = augment_query(query, mode);
    let raw_items = provider
        .list_by_keyword(&search_query, false, MAX_RESULTS, Some(SearchFilter::Videos))
        .await?;

    let normalized: Vec<VideoRecord> = raw_items.iter().filter_map(normalize_item).collect();
    let results = filter_records(normalized, mode);

    Ok(DiscoveryResponse {
        query: query.to_string(),
        mode,
        total: results.len(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::videos::RawSearchItem;
    use anyhow::bail;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    fn record(id: &str, duration_seconds: Option<i64>, is_live: bool) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            title: format!("Video {id}"),
            channel_title: "Channel".to_string(),
            channel_id: None,
            channel_url: None,
            thumbnail: None,
            duration_label: duration_seconds.map(|seconds| format!("0:{seconds:02}")),
            duration_seconds,
            is_live,
        }
    }

    fn raw_video(id: &str, label: Option<&str>, is_live: bool) -> RawSearchItem {
        let mut value = json!({ "id": id, "type": "video", "isLive": is_live });
        if let Some(label) = label {
            value["length"] = json!({ "simpleText": label });
        }
        serde_json::from_value(value).unwrap()
    }

    /// Provider stub that records the queries it saw and replays fixtures.
    struct StubProvider {
        items: Vec<RawSearchItem>,
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    impl StubProvider {
        fn with_items(items: Vec<RawSearchItem>) -> Self {
            Self {
                items,
                queries: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                items: Vec::new(),
                queries: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl SearchProvider for StubProvider {
        async fn list_by_keyword(
            &self,
            query: &str,
            _with_playlist: bool,
            limit: usize,
            _filter: Option<SearchFilter>,
        ) -> Result<Vec<RawSearchItem>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                bail!("search backend unreachable");
            }
            Ok(self.items.iter().take(limit).cloned().collect())
        }
    }

    #[test]
    fn mode_from_param_requires_exact_literal() {
        assert_eq!(Mode::from_param(Some("shorts")), Mode::Shorts);
        assert_eq!(Mode::from_param(Some("Shorts")), Mode::Tutorials);
        assert_eq!(Mode::from_param(Some("tutorials")), Mode::Tutorials);
        assert_eq!(Mode::from_param(Some("")), Mode::Tutorials);
        assert_eq!(Mode::from_param(None), Mode::Tutorials);
    }

    #[test]
    fn augment_appends_editing_keywords_for_tutorials() {
        assert_eq!(
            augment_query("capcut transition", Mode::Tutorials),
            "capcut transition editing tutorial"
        );
    }

    #[test]
    fn augment_passes_through_when_intent_already_present() {
        assert_eq!(augment_query("color edit tricks", Mode::Tutorials), "color edit tricks");
        assert_eq!(
            augment_query("premiere TUTORIAL basics", Mode::Tutorials),
            "premiere TUTORIAL basics"
        );
        // "editor" contains "edit" and counts as signaled intent too.
        assert_eq!(augment_query("best video editor", Mode::Tutorials), "best video editor");
    }

    #[test]
    fn augment_always_biases_shorts() {
        assert_eq!(augment_query("vlog tips", Mode::Shorts), "vlog tips vertical video");
        // Unconditional for shorts, even when editing intent is present.
        assert_eq!(
            augment_query("edit hacks", Mode::Shorts),
            "edit hacks vertical video"
        );
    }

    #[test]
    fn tutorials_filter_drops_only_live_records() {
        let records = vec![
            record("a", Some(30), false),
            record("b", None, false),
            record("c", Some(7200), true),
            record("d", Some(7200), false),
        ];
        let kept = filter_records(records, Mode::Tutorials);
        let ids: Vec<&str> = kept.iter().map(|record| record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "d"]);
    }

    #[test]
    fn shorts_filter_requires_known_short_duration() {
        let records = vec![
            record("a", Some(60), false),
            record("b", Some(90), false),
            record("c", Some(91), false),
            record("d", None, false),
            record("e", Some(45), true),
        ];
        let kept = filter_records(records, Mode::Shorts);
        let ids: Vec<&str> = kept.iter().map(|record| record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn filters_preserve_input_order() {
        let records = vec![
            record("z", Some(10), false),
            record("m", Some(20), false),
            record("a", Some(30), false),
        ];
        let kept = filter_records(records.clone(), Mode::Tutorials);
        assert_eq!(kept, records);
    }

    #[tokio::test]
    async fn discover_sends_augmented_tutorial_query() {
        let provider = StubProvider::with_items(vec![raw_video("a", Some("10:00"), false)]);
        let response = discover(&provider, "capcut transition", Mode::Tutorials)
            .await
            .unwrap();
        assert_eq!(
            provider.queries.lock().unwrap().as_slice(),
            ["capcut transition editing tutorial"]
        );
        assert_eq!(response.query, "capcut transition");
        assert_eq!(response.mode, Mode::Tutorials);
        assert_eq!(response.total, 1);
    }

    #[tokio::test]
    async fn discover_filters_shorts_by_duration() {
        let provider = StubProvider::with_items(vec![
            raw_video("long", Some("1:45"), false),
            raw_video("short", Some("1:00"), false),
            raw_video("live", Some("0:30"), true),
            raw_video("unknown", None, false),
        ]);
        let response = discover(&provider, "vlog tips", Mode::Shorts).await.unwrap();
        assert_eq!(
            provider.queries.lock().unwrap().as_slice(),
            ["vlog tips vertical video"]
        );
        assert_eq!(response.total, 1);
        assert_eq!(response.results[0].id, "short");
    }

    #[tokio::test]
    async fn discover_skips_non_video_items_silently() {
        let playlist: RawSearchItem =
            serde_json::from_value(json!({ "id": "p1", "type": "playlist" })).unwrap();
        let provider =
            StubProvider::with_items(vec![playlist, raw_video("v1", Some("2:00"), false)]);
        let response = discover(&provider, "timeline basics", Mode::Tutorials)
            .await
            .unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.results[0].id, "v1");
    }

    #[tokio::test]
    async fn discover_propagates_provider_failure() {
        let provider = StubProvider::failing();
        let err = discover(&provider, "vlog tips", Mode::Shorts).await.unwrap_err();
        assert!(err.to_string().contains("search backend unreachable"));
    }

    #[test]
    fn response_serializes_mode_as_type() {
        let response = DiscoveryResponse {
            query: "q".into(),
            mode: Mode::Shorts,
            total: 0,
            results: Vec::new(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "shorts");
        assert_eq!(value["total"], 0);
        assert!(value["results"].as_array().unwrap().is_empty());
    }
}
