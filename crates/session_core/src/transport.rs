use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{QueryReply, QueryRequest},
};
use url::Url;

use crate::{error::ResolveError, resolver::QueryResolver};

/// Resolver backed by a remote data service: one JSON POST per query.
pub struct HttpQueryResolver {
    http: Client,
    endpoint: Url,
}

impl HttpQueryResolver {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn code_for_status(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorCode::Validation,
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimited,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ErrorCode::Unavailable
        }
        _ => ErrorCode::Internal,
    }
}

fn backend_error(status: StatusCode, body: &str) -> ResolveError {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api) => ResolveError::Backend {
            code: api.code,
            message: api.message,
        },
        Err(_) => ResolveError::Backend {
            code: code_for_status(status),
            message: if body.trim().is_empty() {
                format!("status {status}")
            } else {
                format!("status {status}: {}", body.trim())
            },
        },
    }
}

#[async_trait]
impl QueryResolver for HttpQueryResolver {
    async fn resolve(&self, query: &str) -> Result<QueryReply, ResolveError> {
        let res = self
            .http
            .post(self.endpoint.clone())
            .json(&QueryRequest {
                query: query.to_string(),
            })
            .send()
            .await
            .map_err(|err| ResolveError::Unreachable(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(%status, endpoint = %self.endpoint, "query backend returned an error status");
            return Err(backend_error(status, &body));
        }

        let reply: QueryReply = res
            .json()
            .await
            .map_err(|err| ResolveError::InvalidResponse(err.to_string()))?;
        if reply.content.trim().is_empty() {
            return Err(ResolveError::InvalidResponse(
                "reply content is empty".to_string(),
            ));
        }
        Ok(reply)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
