use crate::config::Config;
use crate::errors::ProxyError;
use crate::headers::{insert_identity, insert_service_key, strip_caller_identity};
use crate::http::{ProxyBody, UpstreamClient, json_error_response, send_to_upstream};
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT, UPSTREAM_ERRORS};
use crate::router::Router;
use crate::upstreams::Upstreams;
use http::StatusCode;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service as HyperService;
use hyper::{Request, Response};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use identity::Authenticator;
use shared::{counter, gauge, histogram};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

const NO_ROUTE: &str = "none";

struct GatewayInner {
    router: Router,
    upstreams: Upstreams,
    authenticator: Authenticator,
    client: UpstreamClient,
    upstream_timeout_secs: u64,
}

/// Authenticates requests per route and forwards them to upstreams.
#[derive(Clone)]
pub struct GatewayService {
    inner: Arc<GatewayInner>,
}

impl GatewayService {
    pub fn new(config: &Config, authenticator: Authenticator) -> Self {
        let client: UpstreamClient = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            inner: Arc::new(GatewayInner {
                router: Router::new(config.routes.clone()),
                upstreams: Upstreams::new(config.upstreams.clone()),
                authenticator,
                client,
                upstream_timeout_secs: config.upstream_timeout_secs,
            }),
        }
    }

    pub async fn handle(&self, request: Request<ProxyBody>) -> Response<ProxyBody> {
        let start = Instant::now();
        let inflight = InflightGuard::new();

        let (upstream, response) = self.dispatch(request).await;

        drop(inflight);
        histogram!(
            REQUEST_DURATION,
            "status" => response.status().as_str().to_owned(),
            "upstream" => upstream
        )
        .record(start.elapsed().as_secs_f64());

        response
    }

    async fn dispatch(&self, mut request: Request<ProxyBody>) -> (String, Response<ProxyBody>) {
        let inner = &self.inner;
        let path = request.uri().path().to_owned();

        let Some(route) = inner.router.find(request.method(), &path) else {
            tracing::debug!(method = %request.method(), path = %path, "No route matched");
            return (
                NO_ROUTE.to_owned(),
                json_error_response(StatusCode::NOT_FOUND, "Not found"),
            );
        };
        let upstream_name = route.upstream.clone();

        let identity = match route
            .auth
            .run(&inner.authenticator, &path, request.headers())
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                tracing::info!(path = %path, status = %e.status(), error = %e, "Request rejected");
                return (upstream_name, json_error_response(e.status(), &e.to_string()));
            }
        };

        let Some(upstream) = inner.upstreams.get(&route.upstream) else {
            tracing::error!(upstream = %route.upstream, "Route references unknown upstream");
            return (
                upstream_name,
                json_error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
            );
        };

        let path_and_query = route.upstream_path_and_query(request.uri());

        if let Err(e) = prepare_headers(&mut request, identity, upstream.api_key.as_deref()) {
            tracing::error!(path = %path, error = %e, "Could not forward identity headers");
            return (
                upstream_name,
                json_error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
            );
        }

        let response = match send_to_upstream(
            &inner.client,
            upstream,
            request,
            &path_and_query,
            inner.upstream_timeout_secs,
        )
        .await
        {
            Ok(response) => response,
            Err(ProxyError::UpstreamTimeout(name)) => {
                tracing::warn!(upstream = %name, path = %path, "Upstream timed out");
                counter!(UPSTREAM_ERRORS, "upstream" => name, "reason" => "timeout").increment(1);
                json_error_response(StatusCode::GATEWAY_TIMEOUT, "Upstream timed out")
            }
            Err(e) => {
                tracing::error!(upstream = %upstream.name, path = %path, error = %e, "Upstream request failed");
                counter!(UPSTREAM_ERRORS, "upstream" => upstream.name.clone(), "reason" => "request_failed")
                    .increment(1);
                json_error_response(StatusCode::BAD_GATEWAY, "Upstream request failed")
            }
        };

        (upstream_name, response)
    }
}

/// Counts a request in `REQUESTS_INFLIGHT` until dropped, including when the
/// request future is cancelled by a client disconnect.
struct InflightGuard;

impl InflightGuard {
    fn new() -> Self {
        gauge!(REQUESTS_INFLIGHT).increment(1.0);
        InflightGuard
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        gauge!(REQUESTS_INFLIGHT).decrement(1.0);
    }
}

/// Replaces caller identity headers with the resolved identity and attaches the
/// context to the request extensions.
fn prepare_headers(
    request: &mut Request<ProxyBody>,
    identity: Option<identity::IdentityContext>,
    api_key: Option<&str>,
) -> Result<(), ProxyError> {
    let headers = request.headers_mut();
    strip_caller_identity(headers);
    insert_service_key(headers, api_key)?;

    if let Some(context) = identity {
        insert_identity(request.headers_mut(), &context)?;
        request.extensions_mut().insert(context);
    }

    Ok(())
}

impl HyperService<Request<Incoming>> for GatewayService {
    type Response = Response<ProxyBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req.map(|body| body.boxed())).await) })
    }
}
