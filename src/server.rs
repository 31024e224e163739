//! Server-side enforcement.
//!
//! [`BasicAuthLayer`] is a tower middleware for the tonic server stack.
//! tonic request interceptors cannot observe the called method, so the
//! per-method skip decision lives at the tower seam, where the
//! fully-qualified method (`/package.Service/Method`) is the request URI
//! path. One layer covers unary and streaming calls alike.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, Response};
use tonic::body::Body;
use tonic::Status;
use tower::{Layer, Service};
use tracing::debug;

use crate::config::{BasicAuthConfig, BasicAuthOption};

/// Tower layer that verifies the `authorization` metadata of every inbound
/// call before the service sees it.
#[derive(Clone)]
pub struct BasicAuthLayer {
    config: Arc<BasicAuthConfig>,
}

impl BasicAuthLayer {
    /// Builds the configuration from the credential pair and `options` and
    /// freezes it for the lifetime of the layer.
    pub fn new<U, P, I>(username: U, password: P, options: I) -> Self
    where
        U: Into<String>,
        P: Into<String>,
        I: IntoIterator<Item = BasicAuthOption>,
    {
        Self::from_config(BasicAuthConfig::build(username, password, options))
    }

    /// Wraps an already-built configuration.
    pub fn from_config(config: BasicAuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for BasicAuthLayer {
    type Service = BasicAuth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BasicAuth {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Service produced by [`BasicAuthLayer`].
#[derive(Clone)]
pub struct BasicAuth<S> {
    inner: S,
    config: Arc<BasicAuthConfig>,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

impl<S, ReqBody> Service<Request<ReqBody>> for BasicAuth<S>
where
    S: Service<Request<ReqBody>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // Take the readied instance; the clone left behind must be polled
        // again before its next call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if !self.config.should_authenticate(request.uri().path()) {
            return Box::pin(async move { inner.call(request).await });
        }

        match self.config.verify_headers(request.headers()) {
            Ok(()) => Box::pin(async move { inner.call(request).await }),
            Err(err) => {
                debug!(
                    method = request.uri().path(),
                    error = ?err,
                    "rejecting unauthenticated call"
                );
                let response = reject(Status::from(err));
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

/// Trailers-only gRPC response terminating the call at the middleware; the
/// inner service is never invoked.
fn reject(status: Status) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/grpc"));
    headers.insert("grpc-status", HeaderValue::from(status.code() as i32));
    if let Ok(message) = HeaderValue::from_str(status.message()) {
        headers.insert("grpc-message", message);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{with_skipped_methods, AUTHORIZATION_KEY};
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    const HANDLER_MARKER: &str = "x-handler";

    fn guarded(
        layer: BasicAuthLayer,
    ) -> impl Service<Request<Body>, Response = Response<Body>, Error = Infallible> {
        layer.layer(service_fn(|_request: Request<Body>| async {
            let mut response = Response::new(Body::empty());
            response
                .headers_mut()
                .insert(HANDLER_MARKER, HeaderValue::from_static("reached"));
            Ok::<_, Infallible>(response)
        }))
    }

    fn request(method: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(method);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION_KEY, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn reached_handler(response: &Response<Body>) -> bool {
        response.headers().contains_key(HANDLER_MARKER)
    }

    fn grpc_status(response: &Response<Body>) -> Option<&str> {
        response
            .headers()
            .get("grpc-status")
            .map(|v| v.to_str().unwrap())
    }

    #[tokio::test]
    async fn valid_credential_reaches_the_handler() {
        let service = guarded(BasicAuthLayer::new("foo", "bar", []));
        let response = service
            .oneshot(request("/pkg.Service/Method", Some("basic Zm9vOmJhcg==")))
            .await
            .unwrap();
        assert!(reached_handler(&response));
        assert_eq!(grpc_status(&response), None);
    }

    #[tokio::test]
    async fn missing_credential_is_rejected_before_the_handler() {
        let service = guarded(BasicAuthLayer::new("foo", "bar", []));
        let response = service
            .oneshot(request("/pkg.Service/Method", None))
            .await
            .unwrap();
        assert!(!reached_handler(&response));
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/grpc"
        );
        assert_eq!(grpc_status(&response), Some("16"));
        assert_eq!(
            response.headers().get("grpc-message").unwrap(),
            "request unauthenticated with basic"
        );
    }

    #[tokio::test]
    async fn wrong_credential_is_rejected_uniformly() {
        let service = guarded(BasicAuthLayer::new("foo", "bar", []));
        let response = service
            .oneshot(request("/pkg.Service/Method", Some("basic d3Jvbmc=")))
            .await
            .unwrap();
        assert!(!reached_handler(&response));
        assert_eq!(grpc_status(&response), Some("16"));
        assert_eq!(
            response.headers().get("grpc-message").unwrap(),
            "invalid username or password"
        );
    }

    #[tokio::test]
    async fn foreign_scheme_is_rejected() {
        let service = guarded(BasicAuthLayer::new("foo", "bar", []));
        let response = service
            .oneshot(request("/pkg.Service/Method", Some("bearer Zm9vOmJhcg==")))
            .await
            .unwrap();
        assert!(!reached_handler(&response));
        assert_eq!(grpc_status(&response), Some("16"));
    }

    #[tokio::test]
    async fn skipped_method_bypasses_authentication() {
        let layer = BasicAuthLayer::new(
            "foo",
            "bar",
            [with_skipped_methods(["/pkg.Service/Health"])],
        );
        let response = guarded(layer.clone())
            .oneshot(request("/pkg.Service/Health", None))
            .await
            .unwrap();
        assert!(reached_handler(&response));

        let response = guarded(layer)
            .oneshot(request("/pkg.Service/Other", None))
            .await
            .unwrap();
        assert!(!reached_handler(&response));
        assert_eq!(grpc_status(&response), Some("16"));
    }

    #[tokio::test]
    async fn disabled_pair_lets_every_call_through() {
        let service = guarded(BasicAuthLayer::new("", "", []));
        let response = service
            .oneshot(request("/pkg.Service/Method", None))
            .await
            .unwrap();
        assert!(reached_handler(&response));
    }
}
