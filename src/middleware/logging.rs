use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use log::{debug, info, warn};
use reqwest::{Request, Response, Url};
use tower::{Layer, Service};

const REDACTED: &str = "***";

/// Query parameters whose values never reach the log.
const SENSITIVE_FIELDS: &[&str] = &[
    "access_token",
    "secret",
    "corpsecret",
    "appsecret",
    "ticket",
    "jsapi_ticket",
    "key",
    "sign",
];

/// Logs method, redacted URL, status and latency of every request.
///
/// Plug it in with `WechatBuilder::with_middleware`. Lines go through the
/// `log` facade at `info` level, or `debug` when [`verbose`](Self::verbose)
/// is set; transport failures are logged at `warn`.
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    verbose: bool,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl<S> Layer<S> for LoggingMiddleware
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Service = LoggingMiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingMiddlewareService {
            inner,
            verbose: self.verbose,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingMiddlewareService<S> {
    inner: S,
    verbose: bool,
}

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_FIELDS.iter().any(|s| key.eq_ignore_ascii_case(s))
}

/// Replace the values of credential-bearing query parameters.
pub(crate) fn redact_url(url: &Url) -> String {
    if url.query().is_none() || !url.query_pairs().any(|(k, _)| is_sensitive(&k)) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if is_sensitive(&k) {
                REDACTED.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

impl<S> Service<Request> for LoggingMiddlewareService<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send,
    S::Error: std::fmt::Display + Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let method = req.method().clone();
        let safe_url = redact_url(req.url());
        let verbose = self.verbose;
        // The instance that was polled ready handles this request.
        let ready = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, ready);

        Box::pin(async move {
            if verbose {
                debug!("[Wechat] >>> {} {}", method, safe_url);
            }

            let start = Instant::now();
            let result = inner.call(req).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(response) => {
                    let status = response.status();
                    if verbose {
                        debug!(
                            "[Wechat] <<< {} {} ({:?})",
                            status.as_u16(),
                            status.canonical_reason().unwrap_or(""),
                            elapsed
                        );
                    } else {
                        info!(
                            "[Wechat] {} {} -> {} ({:?})",
                            method,
                            safe_url,
                            status.as_u16(),
                            elapsed
                        );
                    }
                }
                Err(err) => {
                    warn!("[Wechat] {} {} failed after {:?}: {}", method, safe_url, elapsed, err);
                }
            }

            result
        })
    }
}
