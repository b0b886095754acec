//! HTTP clients for the labeling and suggestion services.
//!
//! Both clients resolve to `Ok(None)` when their [`CancelToken`] fires -
//! user cancellation is silent, never an error toast - while a timeout on
//! the suggestion path surfaces as [`ServiceError::Timeout`]. Malformed
//! response bodies degrade to an empty result set with a warning; non-2xx
//! statuses carry the status code up to the UI.

use crate::cancel::CancelToken;
use crate::error::{ServiceError, ServiceResult};
use crate::payload::{
    validate_label_payload, validate_suggestion_payload, LabelRequest, LabelResponse,
    SuggestionRequest, SuggestionResponse,
};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Deadline for a suggestion fetch, distinct from user cancellation.
pub const SUGGESTION_TIMEOUT: Duration = Duration::from_millis(3000);

/// Client for the span labeling service.
pub struct LabelingClient {
    client: reqwest::Client,
    base_url: String,
}

impl LabelingClient {
    /// Create a client for the given base URL (no trailing slash needed).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// POST the prompt for labeling.
    ///
    /// `Ok(None)` means the token was cancelled mid-flight; the caller drops
    /// the operation silently.
    pub async fn fetch_spans(
        &self,
        request: &LabelRequest,
        cancel: &CancelToken,
    ) -> ServiceResult<Option<LabelResponse>> {
        let url = format!("{}/api/labels", self.base_url);
        debug!(url = %url, text_len = request.text.len(), "requesting span labels");

        let fetch = async {
            let resp = self.client.post(&url).json(request).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ServiceError::Http {
                    status: status.as_u16(),
                    body,
                });
            }
            let value: serde_json::Value = resp.json().await?;
            match validate_label_payload(value, &request.text) {
                Ok(response) => {
                    debug!(count = response.spans.len(), "labels received");
                    Ok(response)
                }
                Err(err) => {
                    warn!(error = %err, "label payload failed validation; treating as empty");
                    Ok(LabelResponse::empty())
                }
            }
        };

        run_cancellable(fetch, cancel).await
    }
}

/// Client for the span suggestion service.
pub struct SuggestionClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SuggestionClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: SUGGESTION_TIMEOUT,
        }
    }

    /// Override the suggestion deadline (tests, slow backends).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch replacement suggestions for a highlighted span.
    ///
    /// `Ok(None)` means cancelled; [`ServiceError::Timeout`] means the
    /// deadline elapsed - the same operation ends either way, but only the
    /// timeout is reported to the user.
    pub async fn fetch_suggestions(
        &self,
        request: &SuggestionRequest,
        cancel: &CancelToken,
    ) -> ServiceResult<Option<SuggestionResponse>> {
        let url = format!("{}/api/suggestions", self.base_url);
        debug!(url = %url, highlighted = %request.highlighted_text, "requesting suggestions");

        let fetch = async {
            let resp = self.client.post(&url).json(request).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ServiceError::Http {
                    status: status.as_u16(),
                    body,
                });
            }
            let value: serde_json::Value = resp.json().await?;
            match validate_suggestion_payload(value) {
                Ok(response) => Ok(response),
                Err(err) => {
                    warn!(error = %err, "suggestion payload failed validation; treating as empty");
                    Ok(SuggestionResponse::default())
                }
            }
        };

        run_cancellable(run_with_deadline(fetch, self.timeout), cancel).await
    }
}

/// Race `work` against the cancel token: cancellation wins silently.
async fn run_cancellable<T, F>(work: F, cancel: &CancelToken) -> ServiceResult<Option<T>>
where
    F: Future<Output = ServiceResult<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("fetch cancelled by caller");
            Ok(None)
        }
        result = work => result.map(Some),
    }
}

/// Race `work` against a deadline: the deadline is a reportable error.
async fn run_with_deadline<T, F>(work: F, deadline: Duration) -> ServiceResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout),
    }
}
