//! Tower middleware that instruments every call through a service.

use std::fmt;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use serde::Serialize;
use tower::{Layer, Service};

use crate::audit::record::Args;
use crate::intercept::interceptor::Interceptor;
use crate::policy::CallSite;

/// Wraps a service so each request is audited under one call site.
#[derive(Clone, Debug)]
pub struct AuditLayer {
    interceptor: Interceptor,
    site: CallSite,
}

impl AuditLayer {
    pub fn new(interceptor: Interceptor, site: CallSite) -> Self {
        Self { interceptor, site }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditService {
            inner,
            interceptor: self.interceptor.clone(),
            site: self.site.clone(),
        }
    }
}

/// Service produced by [`AuditLayer`]. The request is recorded as `request`.
#[derive(Clone, Debug)]
pub struct AuditService<S> {
    inner: S,
    interceptor: Interceptor,
    site: CallSite,
}

impl<S, Req> Service<Req> for AuditService<S>
where
    S: Service<Req>,
    S::Future: Send + 'static,
    S::Response: Serialize + Clone + Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    Req: Serialize + Clone + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Req) -> Self::Future {
        let args = Args::new().with("request", request.clone());
        let call = self.inner.call(request);
        Box::pin(self.interceptor.intercept_async(&self.site, args, call))
    }
}
