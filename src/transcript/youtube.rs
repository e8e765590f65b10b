//! Caption retrieval from YouTube's player API.

use super::{CaptionSegment, CaptionSource};
use crate::error::{Result, TubechatError};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

/// A caption track advertised by the player response.
#[derive(Debug, Clone)]
struct CaptionTrack {
    language_code: String,
    base_url: String,
    generated: bool,
}

/// `json3` timed-text payload.
#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Fetches captions the way the watch page does: scrape the innertube key,
/// ask the player endpoint for caption tracks, then download the chosen track.
pub struct YoutubeCaptionSource {
    client: reqwest::Client,
    base_url: Url,
    api_key_regex: Regex,
}

impl YoutubeCaptionSource {
    /// Create a source talking to youtube.com.
    pub fn new() -> Result<Self> {
        Self::with_base_url("https://www.youtube.com")
    }

    /// Create a source against a different host (used for mirrors and tests).
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TubechatError::Config(format!("Invalid YouTube base URL '{}': {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("tubechat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let api_key_regex =
            Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("Invalid regex");

        Ok(Self {
            client,
            base_url,
            api_key_regex,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TubechatError::Config(format!("Invalid YouTube endpoint '{}': {}", path, e)))
    }

    /// Map rate limiting to a readable error, everything else to HTTP errors.
    fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TubechatError::TranscriptUnavailable(
                "YouTube is rate limiting requests from this IP".to_string(),
            ));
        }
        Ok(response.error_for_status()?)
    }

    async fn fetch_api_key(&self, video_id: &str) -> Result<String> {
        let mut url = self.endpoint("watch")?;
        url.query_pairs_mut().append_pair("v", video_id);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US")
            .send()
            .await?;
        let html = Self::check_status(response)?.text().await?;

        if html.contains(r#"action="https://consent.youtube.com/s""#) {
            return Err(TubechatError::TranscriptUnavailable(
                "YouTube requires cookie consent for this request".to_string(),
            ));
        }

        self.api_key_regex
            .captures(&html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                TubechatError::TranscriptUnavailable(format!(
                    "Could not find the player API key on the watch page of {}",
                    video_id
                ))
            })
    }

    async fn fetch_player(&self, video_id: &str, api_key: &str) -> Result<Value> {
        let mut url = self.endpoint("youtubei/v1/player")?;
        url.query_pairs_mut().append_pair("key", api_key);

        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self.client.post(url).json(&body).send().await?;
        Ok(Self::check_status(response)?.json().await?)
    }

    /// Extract caption tracks from a player response.
    fn caption_tracks(video_id: &str, player: &Value) -> Result<Vec<CaptionTrack>> {
        let playability = &player["playabilityStatus"];
        let status = playability["status"].as_str().unwrap_or("OK");
        if status != "OK" {
            let reason = playability["reason"].as_str().unwrap_or("no reason given");
            return Err(TubechatError::TranscriptUnavailable(format!(
                "Video {} is not playable ({}): {}",
                video_id, status, reason
            )));
        }

        let tracks = player["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"]
            .as_array()
            .ok_or_else(|| TubechatError::TranscriptsDisabled(video_id.to_string()))?;

        let tracks: Vec<CaptionTrack> = tracks
            .iter()
            .filter_map(|t| {
                Some(CaptionTrack {
                    language_code: t["languageCode"].as_str()?.to_string(),
                    base_url: t["baseUrl"].as_str()?.to_string(),
                    generated: t["kind"].as_str() == Some("asr"),
                })
            })
            .collect();

        if tracks.is_empty() {
            return Err(TubechatError::TranscriptsDisabled(video_id.to_string()));
        }

        Ok(tracks)
    }

    /// Pick a track for the first language that has one, preferring manual captions.
    fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[&str]) -> Option<&'a CaptionTrack> {
        languages.iter().find_map(|lang| {
            tracks
                .iter()
                .find(|t| t.language_code == *lang && !t.generated)
                .or_else(|| tracks.iter().find(|t| t.language_code == *lang))
        })
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<CaptionSegment>> {
        if track.base_url.contains("&exp=xpe") {
            return Err(TubechatError::TranscriptUnavailable(
                "Caption track requires a proof-of-origin token".to_string(),
            ));
        }

        let mut url = Url::parse(&track.base_url)
            .or_else(|_| self.base_url.join(&track.base_url))
            .map_err(|e| TubechatError::TranscriptUnavailable(format!("Invalid caption URL: {}", e)))?;

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "fmt")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs).append_pair("fmt", "json3");

        let response = self.client.get(url).send().await?;
        let body = Self::check_status(response)?.text().await?;
        Self::parse_timed_text(&body)
    }

    fn parse_timed_text(body: &str) -> Result<Vec<CaptionSegment>> {
        let timed_text: TimedText = serde_json::from_str(body)?;

        Ok(timed_text
            .events
            .into_iter()
            .filter_map(|event| {
                let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
                let text = text.replace('\n', " ").trim().to_string();
                if text.is_empty() {
                    return None;
                }
                Some(CaptionSegment {
                    text,
                    start: event.t_start_ms as f64 / 1000.0,
                    duration: event.d_duration_ms as f64 / 1000.0,
                })
            })
            .collect())
    }
}

#[async_trait]
impl CaptionSource for YoutubeCaptionSource {
    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str, languages: &[&str]) -> Result<Vec<CaptionSegment>> {
        let api_key = self.fetch_api_key(video_id).await?;
        let player = self.fetch_player(video_id, &api_key).await?;
        let tracks = Self::caption_tracks(video_id, &player)?;

        debug!(
            "Video {} has caption tracks: {:?}",
            video_id,
            tracks.iter().map(|t| t.language_code.as_str()).collect::<Vec<_>>()
        );

        let track = Self::select_track(&tracks, languages).ok_or_else(|| TubechatError::NoTranscriptFound {
            video_id: video_id.to_string(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
        })?;

        debug!(
            "Using {} caption track '{}'",
            if track.generated { "generated" } else { "manual" },
            track.language_code
        );

        self.fetch_track(track).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VIDEO_ID: &str = "dQw4w9WgXcQ";

    async fn mount_watch_page(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", VIDEO_ID))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><script>var cfg = {"INNERTUBE_API_KEY": "test_key-123"};</script></html>"#,
            ))
            .mount(server)
            .await;
    }

    async fn mount_player(server: &MockServer, player: Value) {
        Mock::given(method("POST"))
            .and(path("/youtubei/v1/player"))
            .and(query_param("key", "test_key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(player))
            .mount(server)
            .await;
    }

    fn player_with_tracks(server: &MockServer) -> Value {
        json!({
            "playabilityStatus": { "status": "OK" },
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        {
                            "languageCode": "hi",
                            "kind": "asr",
                            "baseUrl": format!("{}/api/timedtext?v={}&lang=hi&fmt=srv3", server.uri(), VIDEO_ID)
                        },
                        {
                            "languageCode": "en",
                            "kind": "asr",
                            "baseUrl": format!("{}/api/timedtext?v={}&lang=en&kind=asr", server.uri(), VIDEO_ID)
                        },
                        {
                            "languageCode": "en",
                            "baseUrl": format!("{}/api/timedtext?v={}&lang=en", server.uri(), VIDEO_ID)
                        }
                    ]
                }
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_prefers_manual_track() {
        let server = MockServer::start().await;
        mount_watch_page(&server).await;
        mount_player(&server, player_with_tracks(&server)).await;

        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("lang", "en"))
            .and(query_param("fmt", "json3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [
                    { "tStartMs": 0, "dDurationMs": 1500, "segs": [{ "utf8": "Never gonna" }, { "utf8": " give you up" }] },
                    { "tStartMs": 1500, "dDurationMs": 500 },
                    { "tStartMs": 2000, "dDurationMs": 2000, "segs": [{ "utf8": "never gonna\nlet you down" }] }
                ]
            })))
            .mount(&server)
            .await;

        let source = YoutubeCaptionSource::with_base_url(&server.uri()).unwrap();
        let segments = source.fetch(VIDEO_ID, &["en"]).await.unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Never gonna give you up");
        assert_eq!(segments[1].text, "never gonna let you down");
        assert_eq!(segments[1].start, 2.0);
        assert_eq!(segments[1].duration, 2.0);

        let requests = server.received_requests().await.unwrap();
        let caption_request = requests
            .iter()
            .find(|r| r.url.path() == "/api/timedtext")
            .unwrap();
        assert!(!caption_request.url.query().unwrap_or_default().contains("kind=asr"));
    }

    #[tokio::test]
    async fn test_fetch_missing_language() {
        let server = MockServer::start().await;
        mount_watch_page(&server).await;
        mount_player(&server, player_with_tracks(&server)).await;

        let source = YoutubeCaptionSource::with_base_url(&server.uri()).unwrap();
        let err = source.fetch(VIDEO_ID, &["de", "fr"]).await.unwrap_err();

        match err {
            TubechatError::NoTranscriptFound { video_id, languages } => {
                assert_eq!(video_id, VIDEO_ID);
                assert_eq!(languages, vec!["de".to_string(), "fr".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_captions_disabled() {
        let server = MockServer::start().await;
        mount_watch_page(&server).await;
        mount_player(&server, json!({ "playabilityStatus": { "status": "OK" } })).await;

        let source = YoutubeCaptionSource::with_base_url(&server.uri()).unwrap();
        let err = source.fetch(VIDEO_ID, &["en"]).await.unwrap_err();
        assert!(matches!(err, TubechatError::TranscriptsDisabled(id) if id == VIDEO_ID));
    }

    #[tokio::test]
    async fn test_fetch_unplayable_video() {
        let server = MockServer::start().await;
        mount_watch_page(&server).await;
        mount_player(
            &server,
            json!({ "playabilityStatus": { "status": "ERROR", "reason": "Video unavailable" } }),
        )
        .await;

        let source = YoutubeCaptionSource::with_base_url(&server.uri()).unwrap();
        let err = source.fetch(VIDEO_ID, &["en"]).await.unwrap_err();
        assert!(err.to_string().contains("Video unavailable"));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let source = YoutubeCaptionSource::with_base_url(&server.uri()).unwrap();
        let err = source.fetch(VIDEO_ID, &["en"]).await.unwrap_err();
        assert!(err.is_caption_error());
    }

    #[test]
    fn test_select_track_language_order() {
        let tracks = vec![
            CaptionTrack {
                language_code: "hi".to_string(),
                base_url: "a".to_string(),
                generated: true,
            },
            CaptionTrack {
                language_code: "en".to_string(),
                base_url: "b".to_string(),
                generated: true,
            },
        ];

        let track = YoutubeCaptionSource::select_track(&tracks, &["fr", "en", "hi"]).unwrap();
        assert_eq!(track.base_url, "b");
        assert!(YoutubeCaptionSource::select_track(&tracks, &["fr"]).is_none());
    }
}
