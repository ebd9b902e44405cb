//! Inbound HTTP interface
//!
//! `GET /parse_xiaohongshu?url=<short-link>` validates the short-link
//! fragment, consults the result cache, then runs the pipeline: resolve,
//! validate the canonical host, and scrape under the single-flight
//! scheduler. Cache behavior is never fatal to a request.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::collector::MediaBundle;
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::resolver::LinkResolver;
use crate::scheduler::ScrapeScheduler;
use crate::scraper::MediaScraper;
use crate::utils::url_utils;

/// Shared application state, constructed once at startup and injected into
/// the handler. The scheduler in particular must not be lazily created
/// behind a guard.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ScrapeConfig>,
    pub resolver: Arc<LinkResolver>,
    pub scheduler: Arc<ScrapeScheduler>,
    pub scraper: Arc<MediaScraper>,
    pub cache: Arc<ResultCache>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ScrapeConfig) -> ScrapeResult<Self> {
        let resolver = Arc::new(LinkResolver::new(&config)?);
        let config = Arc::new(config);
        Ok(Self {
            resolver,
            scheduler: Arc::new(ScrapeScheduler::new(config.concurrency)),
            scraper: Arc::new(MediaScraper::new(&config)),
            cache: Arc::new(ResultCache::new(config.cache_capacity, config.cache_ttl)),
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token cancelling in-flight scrapes on graceful shutdown.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/parse_xiaohongshu", get(parse_xiaohongshu))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ParseQuery {
    pub url: Option<String>,
}

/// Success response body in the fixed wire shape.
#[must_use]
pub fn success_body(resolved_url: &str, media: &MediaBundle) -> Value {
    json!({
        "status": "success",
        "data": {
            "resolvedUrl": resolved_url,
            "media": media,
        }
    })
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn parse_xiaohongshu(
    State(state): State<AppState>,
    Query(query): Query<ParseQuery>,
) -> Response {
    let Some(short_url) = query
        .url
        .filter(|url| url_utils::contains_short_link_fragment(url))
    else {
        return error_response(StatusCode::BAD_REQUEST, "invalid xiaohongshu short link");
    };

    let cache_key = ResultCache::cache_key(&short_url);
    if let Some(body) = state.cache.get(&cache_key).await {
        return (StatusCode::OK, Json(body)).into_response();
    }

    info!(%short_url, "scrape request admitted");
    match run_pipeline(&state, &short_url).await {
        Ok(body) => {
            state.cache.insert(cache_key, body.clone()).await;
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            warn!(%short_url, error = %err, "scrape pipeline failed");
            let status = StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, &err.to_string())
        }
    }
}

async fn run_pipeline(state: &AppState, short_url: &str) -> ScrapeResult<Value> {
    let resolved = state.resolver.resolve(short_url).await?;
    if !url_utils::is_canonical_url(&resolved.canonical_url) {
        return Err(ScrapeError::InvalidHost(resolved.canonical_url));
    }
    debug!(canonical_url = %resolved.canonical_url, "short link validated");

    let cancel = state.shutdown.child_token();
    let scraper = Arc::clone(&state.scraper);
    let canonical_url = resolved.canonical_url.clone();
    let media = state
        .scheduler
        .run(move || async move { scraper.scrape(&canonical_url, &cancel).await })
        .await?;

    Ok(success_body(&resolved.canonical_url, &media))
}
