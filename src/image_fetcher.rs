//! Remote image download with bounded retries and fallback artwork.
//!
//! `ImageFetcher::fetch` never fails: it yields a fetched image, a fallback
//! image, or the `Unavailable` sentinel once transient failures exhaust the
//! attempt budget.

use std::io::Read;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use governor::state::NotKeyed;
use governor::{Quota, RateLimiter};
use image::DynamicImage;
use log::{debug, warn};

use crate::config::{Config, MAX_FETCH_ATTEMPTS};
use crate::fallback::{ArtworkKind, FallbackPolicy};
use crate::image_pipeline::decode_image_from_memory_with_fallback;

const MAX_IMAGE_BYTES: u64 = 32 * 1024 * 1024;
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const RATE_LIMIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Raw HTTP response handed back by a transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Network-level failure: timeout, reset, DNS, truncated body.
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new().user_agent(user_agent).build();
        Self { agent }
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let response = match self.agent.get(url).timeout(timeout).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Ok(HttpResponse {
                    status,
                    body: Vec::new(),
                })
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(TransportError(transport.to_string()))
            }
        };

        let status = response.status();
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES + 1)
            .read_to_end(&mut body)
            .map_err(|error| TransportError(format!("Failed to read response: {error}")))?;
        if body.len() as u64 > MAX_IMAGE_BYTES {
            warn!(
                "ImageFetcher: {} exceeds {} bytes, discarding body",
                url, MAX_IMAGE_BYTES
            );
            body.clear();
        }
        Ok(HttpResponse { status, body })
    }
}

/// One fetch: which slot it is for, where to get it, and an optional image to
/// prefer over the kind's bundled default.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub kind: ArtworkKind,
    pub url: Option<&'a str>,
    pub fallback_override: Option<&'a Path>,
}

impl<'a> FetchRequest<'a> {
    pub fn new(kind: ArtworkKind, url: Option<&'a str>) -> Self {
        Self {
            kind,
            url,
            fallback_override: None,
        }
    }

    pub fn with_fallback_override(mut self, path: Option<&'a Path>) -> Self {
        self.fallback_override = path;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoUrl,
    NotFound,
    Undecodable,
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fetched(DynamicImage),
    Fallback {
        image: DynamicImage,
        reason: FallbackReason,
    },
    /// Every attempt failed without a definitive answer from the remote.
    Unavailable { attempts: u32 },
}

impl FetchOutcome {
    pub fn into_image(self) -> Option<DynamicImage> {
        match self {
            FetchOutcome::Fetched(image) | FetchOutcome::Fallback { image, .. } => Some(image),
            FetchOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FetchOutcome::Fallback { .. })
    }
}

/// Sleep before retry `retry_index` (0-based): `unit * (i + 1)^i`, i.e. 1, 2, 9
/// units, capped at one minute.
pub fn backoff_delay(unit: Duration, retry_index: u32) -> Duration {
    let multiplier = (retry_index + 1)
        .checked_pow(retry_index)
        .unwrap_or(u32::MAX);
    unit.checked_mul(multiplier)
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}

pub struct ImageFetcher {
    transport: Arc<dyn HttpTransport>,
    fallback: FallbackPolicy,
    timeout: Duration,
    max_attempts: u32,
    backoff_unit: Duration,
    limiter: Option<
        RateLimiter<NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>,
    >,
}

impl ImageFetcher {
    pub fn new(config: &Config) -> Self {
        let transport = Arc::new(UreqTransport::new(&config.fetch.user_agent));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: &Config, transport: Arc<dyn HttpTransport>) -> Self {
        let limiter = NonZeroU32::new(config.fetch.max_requests_per_second)
            .map(|per_second| RateLimiter::direct(Quota::per_second(per_second)));
        Self {
            transport,
            fallback: FallbackPolicy::new(&config.application.app_root),
            timeout: Duration::from_secs(config.fetch.timeout_secs.max(1)),
            max_attempts: config.fetch.max_attempts.clamp(1, MAX_FETCH_ATTEMPTS),
            backoff_unit: Duration::from_millis(config.fetch.backoff_unit_ms),
            limiter,
        }
    }

    pub fn fallback_policy(&self) -> &FallbackPolicy {
        &self.fallback
    }

    fn fallback(&self, request: &FetchRequest<'_>, reason: FallbackReason) -> FetchOutcome {
        FetchOutcome::Fallback {
            image: self.fallback.resolve(request.kind, request.fallback_override),
            reason,
        }
    }

    fn wait_for_rate_limit_slot(&self) {
        let Some(limiter) = self.limiter.as_ref() else {
            return;
        };
        while limiter.check().is_err() {
            std::thread::sleep(RATE_LIMIT_POLL_INTERVAL);
        }
    }

    pub fn fetch(&self, request: FetchRequest<'_>) -> FetchOutcome {
        let url = match request.url.map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => return self.fallback(&request, FallbackReason::NoUrl),
        };

        for attempt in 0..self.max_attempts {
            self.wait_for_rate_limit_slot();
            match self.transport.get(url, self.timeout) {
                Ok(response) if (200..300).contains(&response.status) => {
                    return match decode_image_from_memory_with_fallback(&response.body) {
                        Some(image) => {
                            debug!("ImageFetcher: fetched {} artwork from {}", request.kind, url);
                            FetchOutcome::Fetched(image)
                        }
                        None => {
                            warn!("ImageFetcher: failed to open thumbnail: {}", url);
                            self.fallback(&request, FallbackReason::Undecodable)
                        }
                    };
                }
                Ok(response) if response.status == 404 => {
                    debug!("ImageFetcher: {} returned 404, using fallback", url);
                    return self.fallback(&request, FallbackReason::NotFound);
                }
                Ok(response) => {
                    warn!(
                        "ImageFetcher: attempt {} for {} returned status {}",
                        attempt + 1,
                        url,
                        response.status
                    );
                }
                Err(TransportError(message)) => {
                    warn!(
                        "ImageFetcher: attempt {} for {} failed: {}",
                        attempt + 1,
                        url,
                        message
                    );
                }
            }

            if attempt + 1 < self.max_attempts {
                let delay = backoff_delay(self.backoff_unit, attempt);
                debug!("ImageFetcher: retrying {} in {:?}", url, delay);
                std::thread::sleep(delay);
            }
        }

        warn!(
            "ImageFetcher: giving up on {} after {} attempts",
            url, self.max_attempts
        );
        FetchOutcome::Unavailable {
            attempts: self.max_attempts,
        }
    }
}
