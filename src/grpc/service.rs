//! Rate limit service implementation.

use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info, instrument, warn};

use super::proto::slidegate::v1::{
    rate_limit_service_server::RateLimitService, EvaluateRequest, EvaluateResponse,
};
use crate::error::SlidegateError;
use crate::ratelimit::{RateLimitOutcome, RateLimiter};

/// Implementation of the `slidegate.v1.RateLimitService` gRPC interface.
pub struct RateLimitServiceImpl {
    /// The rate limiter instance
    rate_limiter: Arc<RateLimiter>,
}

impl RateLimitServiceImpl {
    pub fn new(rate_limiter: Arc<RateLimiter>) -> Self {
        Self { rate_limiter }
    }
}

impl From<RateLimitOutcome> for EvaluateResponse {
    fn from(outcome: RateLimitOutcome) -> Self {
        EvaluateResponse {
            request_count: outcome.request_count,
            rate_limit: outcome.rate_limit,
            rate_limited: outcome.rate_limited,
            error_code: outcome
                .error_code
                .map(|code| code.as_str().to_string())
                .unwrap_or_default(),
            status: outcome.status.map(u32::from).unwrap_or_default(),
            error_message: outcome.error_message.unwrap_or_default(),
        }
    }
}

fn to_status(err: SlidegateError) -> Status {
    match err {
        SlidegateError::InvalidArgument(msg) => Status::invalid_argument(msg),
        SlidegateError::Store(_) | SlidegateError::Backend(_) => {
            error!(error = %err, "Counter store failure");
            Status::unavailable(err.to_string())
        }
        other => {
            error!(error = %other, "Rate limit evaluation failed");
            Status::internal(other.to_string())
        }
    }
}

#[tonic::async_trait]
impl RateLimitService for RateLimitServiceImpl {
    /// Record usage for the caller and report whether it is over its limit.
    #[instrument(
        skip(self, request),
        fields(
            scope = %request.get_ref().scope,
            identity = %request.get_ref().identity,
            increment = request.get_ref().increment
        )
    )]
    async fn evaluate(
        &self,
        request: Request<EvaluateRequest>,
    ) -> Result<Response<EvaluateResponse>, Status> {
        let req = request.into_inner();

        debug!(
            scope = %req.scope,
            identity = %req.identity,
            limit_per_second = ?req.limit_per_second,
            "Processing rate limit request"
        );

        if req.scope.is_empty() {
            warn!("Received rate limit request with empty scope");
            return Err(Status::invalid_argument("scope is required"));
        }

        if req.identity.is_empty() {
            warn!("Received rate limit request with empty identity");
            return Err(Status::invalid_argument("identity is required"));
        }

        let increment = if req.increment == 0 { 1 } else { req.increment };

        let outcome = self
            .rate_limiter
            .check(&req.scope, &req.identity, req.limit_per_second, increment)
            .await
            .map_err(to_status)?;

        info!(
            scope = %req.scope,
            request_count = outcome.request_count,
            rate_limited = outcome.rate_limited,
            "Rate limit decision made"
        );

        Ok(Response::new(outcome.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::RecordingStore;
    use crate::store::MemoryStore;

    fn service() -> RateLimitServiceImpl {
        let rate_limiter = Arc::new(RateLimiter::new(Arc::new(MemoryStore::new())));
        RateLimitServiceImpl::new(rate_limiter)
    }

    fn request(
        scope: &str,
        identity: &str,
        limit: Option<u64>,
        increment: u64,
    ) -> Request<EvaluateRequest> {
        Request::new(EvaluateRequest {
            scope: scope.to_string(),
            identity: identity.to_string(),
            limit_per_second: limit,
            increment,
        })
    }

    #[tokio::test]
    async fn test_empty_scope_rejected() {
        let result = service().evaluate(request("", "1", Some(1), 1)).await;
        assert_eq!(result.unwrap_err().code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_empty_identity_rejected() {
        let result = service().evaluate(request("storage", "", Some(1), 1)).await;
        assert_eq!(result.unwrap_err().code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_scope_with_colon_rejected() {
        let result = service().evaluate(request("a:b", "1", Some(1), 1)).await;
        assert_eq!(result.unwrap_err().code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_zero_increment_counts_as_one() {
        let response = service()
            .evaluate(request("storage", "1", Some(10), 0))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.request_count, 1);
        assert_eq!(response.rate_limit, 100);
        assert!(!response.rate_limited);
        assert!(response.error_code.is_empty());
        assert_eq!(response.status, 0);
    }

    #[tokio::test]
    async fn test_over_limit_response() {
        let service = service();
        service
            .evaluate(request("storage", "1", Some(1), 10))
            .await
            .unwrap();

        let response = service
            .evaluate(request("storage", "1", Some(1), 1))
            .await
            .unwrap()
            .into_inner();

        assert!(response.rate_limited);
        assert_eq!(response.request_count, 11);
        assert_eq!(response.error_code, "RATE_LIMIT_EXCEEDED");
        assert_eq!(response.status, 429);
        assert!(response.error_message.contains("storage"));
    }

    #[tokio::test]
    async fn test_store_failure_is_unavailable() {
        let rate_limiter = Arc::new(RateLimiter::new(Arc::new(RecordingStore::failing())));
        let service = RateLimitServiceImpl::new(rate_limiter);

        let result = service.evaluate(request("storage", "1", Some(1), 1)).await;
        assert_eq!(result.unwrap_err().code(), tonic::Code::Unavailable);
    }
}
