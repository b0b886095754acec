//! Memoized locator results.
//!
//! Re-renders look up the same (text, quote) pairs over and over; the
//! [`PositionCache`] memoizes both hits and misses so a render pass never
//! re-scans the document for a span it already resolved. The cache is an
//! explicitly-owned object - the editor session holds one and clears it when
//! the prompt or template version changes - never a process-wide singleton.
//!
//! Keys embed a content hash of the text, so two different texts can never
//! collide and an edit invalidates stale entries without a manual bust.

use crate::locate::{locate, LocateOptions, QuoteMatch};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Hex prefix of the SHA-256 of `text`, used as a content id in cache keys.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Inputs that shape a labeling request, flattened into a cache key.
#[derive(Debug, Clone)]
pub struct CacheKeyParams<'a> {
    pub max_spans: usize,
    pub min_confidence: f64,
    pub template_version: &'a str,
    /// Policy knobs; a `BTreeMap` so flattening is sorted-key deterministic.
    pub policy: &'a BTreeMap<String, String>,
    pub text: &'a str,
    /// Optional caller-supplied id combined with the text hash.
    pub text_id: Option<&'a str>,
}

/// Build the `::`-joined cache key:
/// `[maxSpans, minConfidence, templateVersion, policy, derivedTextId]`.
///
/// Identical effective parameters produce identical keys; any difference
/// (including a text edit) produces a different key.
pub fn cache_key(params: &CacheKeyParams<'_>) -> String {
    let policy = params
        .policy
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(";");
    let text_hash = content_hash(params.text);
    let text_id = match params.text_id {
        Some(id) => format!("{}-{}", id, text_hash),
        None => text_hash,
    };
    format!(
        "{}::{}::{}::{}::{}",
        params.max_spans, params.min_confidence, params.template_version, policy, text_id
    )
}

/// A memoized locator outcome. `None` records a miss.
pub type CachedLookup = Option<QuoteMatch>;

/// Diagnostic counters exposed for tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Memoizes locator results per (text, quote, options) key.
///
/// No eviction: the working set is bounded by spans-per-document, and the
/// owner clears the whole cache on prompt or version change.
#[derive(Debug, Default)]
pub struct PositionCache {
    entries: HashMap<String, CachedLookup>,
    hits: u64,
    misses: u64,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a memoized result. Counts a hit or miss.
    pub fn get(&mut self, key: &str) -> Option<CachedLookup> {
        match self.entries.get(key) {
            Some(cached) => {
                self.hits += 1;
                Some(*cached)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Memoize a locator outcome (including a miss).
    pub fn set(&mut self, key: String, result: CachedLookup) {
        self.entries.insert(key, result);
    }

    /// Drop all entries. Counters survive so telemetry spans a session.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Locate with memoization: repeated lookups during re-render hit the cache
/// instead of re-scanning the haystack.
pub fn locate_cached(
    cache: &mut PositionCache,
    haystack: &str,
    quote: &str,
    opts: &LocateOptions<'_>,
) -> Option<QuoteMatch> {
    let key = lookup_key(haystack, quote, opts);
    if let Some(cached) = cache.get(&key) {
        return cached;
    }
    let result = locate(haystack, quote, opts);
    cache.set(key, result);
    result
}

fn lookup_key(haystack: &str, quote: &str, opts: &LocateOptions<'_>) -> String {
    format!(
        "{}::{}::{}::{}::{}",
        content_hash(haystack),
        content_hash(quote),
        opts.prefer_index
            .map(|idx| idx.to_string())
            .unwrap_or_default(),
        content_hash(opts.left_ctx.unwrap_or("")),
        content_hash(opts.right_ctx.unwrap_or("")),
    )
}
