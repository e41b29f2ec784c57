//! Multi-source FX acquisition.
//!
//! Sources are tried in priority order, each with bounded retries,
//! exponential backoff and a per-attempt deadline. The first table that
//! parses wins and is cached under the requested base for the configured
//! TTL. When every source is exhausted the configured fallback table is
//! served; only with no fallback does the fetch fail hard.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FxError;
use crate::fx::adapter::SourceFormat;
use crate::fx::cache::FxCache;
use crate::fx::FxTable;

/// One upstream rate feed. Priority is positional: sources are attempted in
/// the order they appear in [`FxProviderOptions::sources`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxSource {
    pub id: String,

    /// Base URL; the provider appends `/<base>` (or `/<YYYY-MM-DD>` for
    /// historical lookups).
    pub endpoint: String,

    /// Sent as an `X-API-Key` header when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub format: SourceFormat,

    /// Minimum spacing between requests to this source. A source asked again
    /// too soon is skipped for that acquisition, not waited on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_interval: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct FxProviderOptions {
    pub sources: Vec<FxSource>,
    pub fallback: Option<FxTable>,
    pub cache: bool,
    pub cache_ttl: Duration,
    /// Extra attempts per source after the first one.
    pub retries: u32,
    /// Per-attempt deadline.
    pub timeout: Duration,
}

impl Default for FxProviderOptions {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            fallback: None,
            cache: true,
            cache_ttl: Duration::from_secs(60 * 60),
            retries: 2,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FxOrigin {
    Live,
    Fallback,
}

/// A fetched table plus where it came from, for the explain record.
#[derive(Clone, Debug)]
pub struct FxAcquisition {
    pub table: FxTable,
    pub origin: FxOrigin,
    pub source_id: Option<String>,
    pub cached: bool,
}

pub struct FxProvider {
    client: reqwest::Client,
    options: FxProviderOptions,
    cache: FxCache,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl FxProvider {
    pub fn new(options: FxProviderOptions) -> Self {
        let cache = FxCache::new(options.cache_ttl);
        Self {
            client: reqwest::Client::new(),
            options,
            cache,
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the latest table for `base`.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, base: &str) -> Result<FxAcquisition, FxError> {
        self.acquire(base, None, None).await
    }

    /// Fetch a point-in-time table. Same adapters, `<endpoint>/<date>` URL.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_historical(
        &self,
        base: &str,
        date: NaiveDate,
    ) -> Result<FxAcquisition, FxError> {
        self.acquire(base, Some(date), None).await
    }

    /// Fetch with cooperative cancellation: an in-flight attempt aborted by
    /// `cancel` counts as a source failure and the acquisition falls through
    /// to the fallback table.
    pub async fn fetch_with_cancel(
        &self,
        base: &str,
        cancel: &CancellationToken,
    ) -> Result<FxAcquisition, FxError> {
        self.acquire(base, None, Some(cancel)).await
    }

    /// Fetch several bases concurrently.
    pub async fn fetch_many(&self, bases: &[&str]) -> Vec<Result<FxAcquisition, FxError>> {
        join_all(bases.iter().map(|base| self.fetch(base))).await
    }

    async fn acquire(
        &self,
        base: &str,
        date: Option<NaiveDate>,
        cancel: Option<&CancellationToken>,
    ) -> Result<FxAcquisition, FxError> {
        let base = base.to_uppercase();
        let cache_key = match date {
            Some(d) => format!("{base}@{d}"),
            None => base.clone(),
        };

        if self.options.cache {
            if let Some(table) = self.cache.get(&cache_key) {
                debug!(%base, "fx cache hit");
                return Ok(FxAcquisition {
                    table,
                    origin: FxOrigin::Live,
                    source_id: None,
                    cached: true,
                });
            }
        }

        let mut cancelled = false;
        for source in &self.options.sources {
            if cancelled {
                break;
            }
            if self.rate_limited(source) {
                debug!(source = %source.id, "skipping rate-limited fx source");
                continue;
            }

            match self.try_source(source, &base, date, cancel).await {
                Ok(table) => {
                    info!(source = %source.id, %base, rates = table.rates.len(), "fx table acquired");
                    if self.options.cache {
                        self.cache.insert(cache_key, table.clone());
                    }
                    return Ok(FxAcquisition {
                        table,
                        origin: FxOrigin::Live,
                        source_id: Some(source.id.clone()),
                        cached: false,
                    });
                }
                Err(FxError::Cancelled) => {
                    warn!(source = %source.id, "fx fetch cancelled mid-flight");
                    cancelled = true;
                }
                Err(e) => {
                    warn!(source = %source.id, error = %e, "fx source failed");
                }
            }
        }

        if let Some(fallback) = &self.options.fallback {
            info!(%base, "serving fallback fx table");
            return Ok(FxAcquisition {
                table: fallback.clone(),
                origin: FxOrigin::Fallback,
                source_id: None,
                cached: false,
            });
        }

        Err(FxError::Unavailable {
            attempted: self.options.sources.len(),
        })
    }

    /// One source, `1 + retries` attempts, `2^attempt` seconds of backoff
    /// before each retry, each attempt bounded by the per-attempt deadline.
    async fn try_source(
        &self,
        source: &FxSource,
        base: &str,
        date: Option<NaiveDate>,
        cancel: Option<&CancellationToken>,
    ) -> Result<FxTable, FxError> {
        let url = match date {
            Some(d) => format!("{}/{}", source.endpoint.trim_end_matches('/'), d),
            None => format!("{}/{}", source.endpoint.trim_end_matches('/'), base),
        };

        let mut last_error = FxError::SourceFailure {
            source_id: source.id.clone(),
            reason: "no attempt made".to_string(),
        };

        for attempt in 0..=self.options.retries {
            if attempt > 0 {
                let backoff = Duration::from_secs(1 << attempt.min(6));
                debug!(source = %source.id, attempt, ?backoff, "retrying fx source");
                tokio::time::sleep(backoff).await;
            }
            self.mark_request(source);

            let request = self.request_body(source, &url);
            let outcome = match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return Err(FxError::Cancelled),
                        r = tokio::time::timeout(self.options.timeout, request) => r,
                    }
                }
                None => tokio::time::timeout(self.options.timeout, request).await,
            };

            match outcome {
                Ok(Ok(body)) => return source.format.parse_table(&body, &source.id),
                Ok(Err(e)) => last_error = e,
                Err(_) => {
                    last_error = FxError::SourceFailure {
                        source_id: source.id.clone(),
                        reason: format!("attempt timed out after {:?}", self.options.timeout),
                    };
                }
            }
        }

        Err(last_error)
    }

    async fn request_body(
        &self,
        source: &FxSource,
        url: &str,
    ) -> Result<serde_json::Value, FxError> {
        let mut request = self.client.get(url);
        if let Some(key) = &source.api_key {
            request = request.header("X-API-Key", key);
        }

        let source_failure = |reason: String| FxError::SourceFailure {
            source_id: source.id.clone(),
            reason,
        };

        let response = request
            .send()
            .await
            .map_err(|e| source_failure(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| source_failure(e.to_string()))?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| source_failure(format!("invalid JSON body: {e}")))
    }

    fn rate_limited(&self, source: &FxSource) -> bool {
        let Some(min_interval) = source.min_interval else {
            return false;
        };
        let last = self.last_request.lock().expect("fx limiter poisoned");
        last.get(&source.id)
            .is_some_and(|at| at.elapsed() < min_interval)
    }

    fn mark_request(&self, source: &FxSource) {
        self.last_request
            .lock()
            .expect("fx limiter poisoned")
            .insert(source.id.clone(), Instant::now());
    }
}
