//! Per-client request rate limiting.
//!
//! [`RateLimiter`] keeps a sliding window of request instants per client IP.
//! It is created once during server wiring and shared by every worker through
//! the [`RateLimit`] middleware, so the limit applies process-wide.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderValue, RETRY_AFTER};
use actix_web::{Error, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::warn;

/// Paths under this prefix are never limited.
const EXEMPT_PREFIX: &str = "/health";

/// Client count above which idle entries are swept on the next check.
const SWEEP_THRESHOLD: usize = 4096;

/// Sliding-window limiter keyed by client address.
///
/// # Examples
/// ```
/// use std::net::{IpAddr, Ipv4Addr};
/// use std::time::{Duration, Instant};
/// use pramana::middleware::RateLimiter;
///
/// let limiter = RateLimiter::new(2, Duration::from_secs(60));
/// let client = IpAddr::V4(Ipv4Addr::LOCALHOST);
/// let now = Instant::now();
/// assert!(limiter.check(client, now));
/// assert!(limiter.check(client, now));
/// assert!(!limiter.check(client, now));
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// A limiter allowing `max_requests` per `window` for each client.
    ///
    /// `max_requests` is clamped to at least one.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request from `client` at `now`.
    ///
    /// Returns `false` without recording when the client already made
    /// `max_requests` requests within the trailing window.
    pub fn check(&self, client: IpAddr, now: Instant) -> bool {
        let mut clients = self.lock();
        if clients.len() > SWEEP_THRESHOLD {
            clients.retain(|_, hits| {
                self.prune(hits, now);
                !hits.is_empty()
            });
        }

        let hits = clients.entry(client).or_default();
        self.prune(hits, now);
        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }

    fn prune(&self, hits: &mut VecDeque<Instant>, now: Instant) {
        while hits
            .front()
            .is_some_and(|hit| now.saturating_duration_since(*hit) >= self.window)
        {
            hits.pop_front();
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IpAddr, VecDeque<Instant>>> {
        // A panic while holding the lock leaves only stale timestamps behind.
        self.clients
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Middleware rejecting over-limit clients with `429 Too Many Requests`.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use actix_web::App;
/// use pramana::middleware::{RateLimit, RateLimiter};
///
/// let limiter = Arc::new(RateLimiter::new(60, Duration::from_secs(60)));
/// let app = App::new().wrap(RateLimit::new(limiter));
/// ```
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service,
            limiter: Arc::clone(&self.limiter),
        }))
    }
}

/// Service produced by [`RateLimit`]; not used directly.
pub struct RateLimitMiddleware<S> {
    service: S,
    limiter: Arc<RateLimiter>,
}

fn client_ip(req: &ServiceRequest) -> IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let exempt = req.path().starts_with(EXEMPT_PREFIX);
        let client = client_ip(&req);
        if exempt || self.limiter.check(client, Instant::now()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let retry_after = self.limiter.window().as_secs().max(1);
        Box::pin(async move {
            warn!(client = %client, path = %req.path(), "rate limit exceeded");
            let mut response =
                crate::domain::Error::too_many_requests("Rate limit exceeded").error_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
            Ok(req.into_response(response).map_into_right_body())
        })
    }
}
