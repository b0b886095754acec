//! Wire types and shape validation for the service boundaries.
//!
//! Responses are validated at the deserialization boundary into typed
//! values or a structured error - nothing partially-trusted flows
//! downstream. Individual malformed spans are dropped with a warning so one
//! bad span never sinks the batch; a malformed envelope degrades to an
//! empty result set at the client.

use crate::error::ServiceError;
use prompt_anchor::{cache_key, offsets, CacheKeyParams, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Policy knobs sent to the labeling service.
///
/// A sorted map so serialization and cache-key flattening are
/// deterministic regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPolicy(pub BTreeMap<String, String>);

impl LabelPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Deterministic `k=v;k=v` flattening, sorted by key.
    pub fn serialize_compact(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Request body for the labeling service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRequest {
    pub text: String,
    pub max_spans: usize,
    pub min_confidence: f64,
    pub policy: LabelPolicy,
    pub template_version: String,
}

impl LabelRequest {
    /// Cache key for this request per the `::`-tuple contract.
    pub fn cache_key(&self, text_id: Option<&str>) -> String {
        cache_key(&CacheKeyParams {
            max_spans: self.max_spans,
            min_confidence: self.min_confidence,
            template_version: &self.template_version,
            policy: &self.policy.0,
            text: &self.text,
            text_id,
        })
    }
}

/// Metadata echoed back by the labeling service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelMeta {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub template_version: Option<String>,
}

/// Validated labeling response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelResponse {
    pub spans: Vec<Span>,
    #[serde(default)]
    pub meta: LabelMeta,
}

impl LabelResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Validate a labeling payload against the expected shape.
///
/// The envelope must be an object with a `spans` array; each span is
/// deserialized individually so one malformed entry is dropped (with a
/// warning) instead of rejecting its siblings. Structural validation stamps
/// `validator_pass`: offsets in bounds against `normalized_text` and the
/// quote matching the recorded slice.
pub fn validate_label_payload(
    value: serde_json::Value,
    normalized_text: &str,
) -> Result<LabelResponse, ServiceError> {
    let object = value
        .as_object()
        .ok_or_else(|| ServiceError::Malformed("payload is not an object".to_string()))?;
    let raw_spans = object
        .get("spans")
        .and_then(|spans| spans.as_array())
        .ok_or_else(|| ServiceError::Malformed("payload has no spans array".to_string()))?;

    let meta = object
        .get("meta")
        .cloned()
        .and_then(|meta| serde_json::from_value(meta).ok())
        .unwrap_or_default();

    let total = offsets::char_len(normalized_text);
    let mut spans = Vec::with_capacity(raw_spans.len());
    for (idx, raw) in raw_spans.iter().enumerate() {
        let mut span: Span = match serde_json::from_value(raw.clone()) {
            Ok(span) => span,
            Err(err) => {
                warn!(index = idx, error = %err, "dropping malformed span");
                continue;
            }
        };
        if span.id.is_empty() || span.quote.trim().is_empty() {
            warn!(index = idx, "dropping span with empty id or quote");
            continue;
        }
        span.confidence = span.confidence.clamp(0.0, 1.0);
        // offsets are hints; out-of-bounds just fails validation, the
        // locator re-derives before anything acts on them
        span.validator_pass =
            span.start < span.end && span.end <= total && span.offsets_hold(normalized_text);
        if span.idempotency_key.is_empty() {
            span.idempotency_key =
                prompt_anchor::derive_idempotency_key(&span.quote, span.start, span.end);
        }
        if span.left_ctx.is_empty() && span.right_ctx.is_empty() && span.validator_pass {
            let (left, right) = prompt_anchor::capture_context(normalized_text, span.start, span.end);
            span.left_ctx = left;
            span.right_ctx = right;
        }
        spans.push(span);
    }

    Ok(LabelResponse { spans, meta })
}

/// Request body for the suggestion service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub highlighted_text: String,
    pub context_before: String,
    pub context_after: String,
    pub full_prompt: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Validated suggestion response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub is_placeholder: bool,
}

/// Validate a suggestion payload: an object with a string array under
/// `suggestions`. Non-string entries are dropped with a warning.
pub fn validate_suggestion_payload(
    value: serde_json::Value,
) -> Result<SuggestionResponse, ServiceError> {
    let object = value
        .as_object()
        .ok_or_else(|| ServiceError::Malformed("payload is not an object".to_string()))?;
    let raw = object
        .get("suggestions")
        .and_then(|s| s.as_array())
        .ok_or_else(|| ServiceError::Malformed("payload has no suggestions array".to_string()))?;

    let mut suggestions = Vec::with_capacity(raw.len());
    for (idx, entry) in raw.iter().enumerate() {
        match entry.as_str() {
            Some(text) => suggestions.push(text.to_string()),
            None => warn!(index = idx, "dropping non-string suggestion"),
        }
    }

    let is_placeholder = object
        .get("isPlaceholder")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    Ok(SuggestionResponse {
        suggestions,
        is_placeholder,
    })
}
