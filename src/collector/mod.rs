//! Media harvesting
//!
//! Two time-overlapping harvests merged into one [`MediaBundle`]:
//!
//! 1. a one-shot DOM harvest of `<img>`/`<video>` sources, and
//! 2. an event-driven network harvest that watches completed responses for
//!    the note/detail API and pulls media URLs out of its JSON payload.
//!
//! The network listener goes in before the DOM harvest so responses landing
//! mid-harvest are kept. Parsed media flows through an explicit channel the
//! collector drains after the grace window, rather than a shared accumulator
//! mutated behind the page's back. Responses arriving after the grace window
//! are lost; that is the documented completeness trade-off bounding
//! per-request latency.

pub mod js_scripts;

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::{
    EventResponseReceived, GetResponseBodyParams,
};
use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use self::js_scripts::{IMAGE_SOURCES_SCRIPT, VIDEO_SOURCES_SCRIPT};

/// DOM image sources must carry a known image extension on their path.
static IMAGE_EXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpe?g|png)$").expect("image extension pattern"));

/// Media URLs discovered on one article page.
///
/// Insertion order is discovery order: DOM-sourced entries first, network
/// entries appended as their responses arrived. Duplicates are tolerated by
/// design; callers wanting sets can dedupe themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaBundle {
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

impl MediaBundle {
    /// True when neither harvest found anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty()
    }
}

/// Media pulled out of one intercepted note/detail payload.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NotePayloadMedia {
    pub images: Vec<String>,
    pub video: Option<String>,
}

/// True when `src`'s path (query/fragment stripped) ends in a known image
/// extension.
#[must_use]
pub fn is_image_url(src: &str) -> bool {
    let path = src
        .split_once(['?', '#'])
        .map_or(src, |(path, _)| path);
    IMAGE_EXT_RE.is_match(path)
}

/// Extract media from a note/detail API body: `data.note.images_list`
/// (items as plain strings or objects carrying a `url` field) and
/// `data.note.video.url`. Returns `None` for malformed or unrelated JSON;
/// most responses are irrelevant and that is not an error.
#[must_use]
pub fn parse_note_payload(body: &str) -> Option<NotePayloadMedia> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let note = value.get("data")?.get("note")?;

    let images: Vec<String> = note
        .get("images_list")
        .and_then(|list| list.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.as_str()
                        .or_else(|| item.get("url").and_then(|u| u.as_str()))
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default();

    let video = note
        .get("video")
        .and_then(|v| v.get("url"))
        .and_then(|u| u.as_str())
        .map(str::to_string);

    if images.is_empty() && video.is_none() {
        return None;
    }
    Some(NotePayloadMedia { images, video })
}

/// Harvests media from a settled page.
pub struct MediaCollector {
    api_fragment: String,
    grace_window: Duration,
}

impl MediaCollector {
    #[must_use]
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            api_fragment: config.note_api_fragment.clone(),
            grace_window: config.grace_window,
        }
    }

    /// Run both harvests against a settled page and merge the results.
    pub async fn collect(
        &self,
        page: &Page,
        cancel: &CancellationToken,
    ) -> ScrapeResult<MediaBundle> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let harvest = self.spawn_network_harvest(page, tx).await?;

        let mut bundle = MediaBundle::default();
        if let Err(e) = dom_harvest(page, &mut bundle).await {
            harvest.abort();
            return Err(e);
        }
        debug!(
            images = bundle.images.len(),
            videos = bundle.videos.len(),
            "DOM harvest complete"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.grace_window) => {}
            _ = cancel.cancelled() => {
                harvest.abort();
                return Err(ScrapeError::Cancelled);
            }
        }
        harvest.abort();

        // Drain whatever the listener forwarded before it stopped; network
        // entries land after the DOM entries, in arrival order.
        while let Ok(media) = rx.try_recv() {
            bundle.images.extend(media.images);
            if let Some(video) = media.video {
                bundle.videos.push(video);
            }
        }

        debug!(
            images = bundle.images.len(),
            videos = bundle.videos.len(),
            "media harvest complete"
        );
        Ok(bundle)
    }

    /// Install the response listener and spawn the task that matches the
    /// note/detail API, fetches bodies and forwards parsed media.
    async fn spawn_network_harvest(
        &self,
        page: &Page,
        tx: mpsc::UnboundedSender<NotePayloadMedia>,
    ) -> ScrapeResult<JoinHandle<()>> {
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| ScrapeError::Scrape(format!("failed to install response listener: {e}")))?;

        let page = page.clone();
        let fragment = self.api_fragment.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                if !event.response.url.contains(&fragment) {
                    continue;
                }
                trace!(url = %event.response.url, "note API response intercepted");

                let params = GetResponseBodyParams::new(event.request_id.clone());
                let body = match page.execute(params).await {
                    Ok(reply) => {
                        if reply.result.base64_encoded {
                            match BASE64_STANDARD.decode(reply.result.body.as_bytes()) {
                                Ok(raw) => String::from_utf8(raw).unwrap_or_default(),
                                Err(_) => continue,
                            }
                        } else {
                            reply.result.body.clone()
                        }
                    }
                    // Bodies can be evicted before we ask; skip, never fail.
                    Err(e) => {
                        trace!(error = %e, "response body unavailable");
                        continue;
                    }
                };

                if let Some(media) = parse_note_payload(&body) {
                    debug!(
                        images = media.images.len(),
                        has_video = media.video.is_some(),
                        "media extracted from note payload"
                    );
                    if tx.send(media).is_err() {
                        break;
                    }
                }
            }
        }))
    }
}

/// One-shot DOM harvest: image sources filtered by extension, non-empty
/// video sources.
async fn dom_harvest(page: &Page, bundle: &mut MediaBundle) -> ScrapeResult<()> {
    let images: Vec<String> = page
        .evaluate(IMAGE_SOURCES_SCRIPT)
        .await
        .map_err(|e| ScrapeError::Scrape(format!("image harvest script failed: {e}")))?
        .into_value()
        .map_err(|e| ScrapeError::Scrape(format!("image harvest returned bad value: {e}")))?;
    bundle
        .images
        .extend(images.into_iter().filter(|src| is_image_url(src)));

    let videos: Vec<String> = page
        .evaluate(VIDEO_SOURCES_SCRIPT)
        .await
        .map_err(|e| ScrapeError::Scrape(format!("video harvest script failed: {e}")))?
        .into_value()
        .map_err(|e| ScrapeError::Scrape(format!("video harvest returned bad value: {e}")))?;
    bundle.videos.extend(videos);

    Ok(())
}
