use crate::errors::ProxyError;
use crate::upstreams::Upstream;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{StatusCode, Version};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, Response};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use shared::http::{add_via_header, filter_hop_by_hop};
use std::time::Duration;
use tokio::time::timeout;

pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

pub type UpstreamClient = Client<HttpConnector, ProxyBody>;

/// Forwards a request to an upstream and returns its streaming response.
///
/// Hop-by-hop headers are filtered and a Via header is added in both
/// directions. The timeout covers connecting, sending the request and
/// receiving the response headers; the body is streamed back to the caller
/// as it arrives.
pub async fn send_to_upstream(
    client: &UpstreamClient,
    upstream: &Upstream,
    request: Request<ProxyBody>,
    path_and_query: &str,
    timeout_secs: u64,
) -> Result<Response<ProxyBody>, ProxyError> {
    let uri = upstream.uri_for(path_and_query)?;

    let (mut parts, body) = request.into_parts();
    let request_version = parts.version;
    filter_hop_by_hop(&mut parts.headers, request_version);
    add_via_header(&mut parts.headers, request_version);
    parts.uri = uri;
    // The upstream connection pool speaks HTTP/1.1 regardless of the caller's version.
    parts.version = Version::HTTP_11;

    let upstream_request = Request::from_parts(parts, body);

    let response = timeout(
        Duration::from_secs(timeout_secs),
        client.request(upstream_request),
    )
    .await
    .map_err(|_| ProxyError::UpstreamTimeout(upstream.name.clone()))?
    .map_err(|e| ProxyError::UpstreamRequestFailed(upstream.name.clone(), e.to_string()))?;

    let (mut parts, body) = response.into_parts();
    let response_version = parts.version;
    filter_hop_by_hop(&mut parts.headers, response_version);
    add_via_header(&mut parts.headers, response_version);

    Ok(Response::from_parts(parts, body.boxed()))
}

/// Builds a `{"error": "<message>"}` response.
pub fn json_error_response(status: StatusCode, message: &str) -> Response<ProxyBody> {
    let body = serde_json::json!({ "error": message }).to_string();

    let mut response = Response::new(
        Full::new(Bytes::from(body))
            .map_err(|never| match never {})
            .boxed(),
    );
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_error_response() {
        let response = json_error_response(StatusCode::UNAUTHORIZED, "Missing authentication");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({"error": "Missing authentication"}));
    }
}
