//! Session orchestration for prompt-anchor.
//!
//! Everything time- or I/O-shaped lives here, on tokio: the progressive
//! reveal scheduler, the debounced validation trigger, cancellable HTTP
//! clients for the labeling and suggestion services, and the
//! [`EditorSession`] that owns the position cache and guards against stale
//! async results with an epoch counter.
//!
//! ## Error model
//!
//! Network failures and timeouts are [`ServiceError`]s the UI reports;
//! user cancellation is *not* an error - cancelled fetches resolve to
//! `Ok(None)` and stay silent.

mod cancel;
mod client;
mod debounce;
mod error;
mod payload;
mod reveal;
mod session;

pub use cancel::CancelToken;

pub use client::{LabelingClient, SuggestionClient, SUGGESTION_TIMEOUT};

pub use debounce::{DebouncePhase, Debouncer};

pub use error::{ServiceError, ServiceResult};

pub use payload::{
    validate_label_payload,
    validate_suggestion_payload,
    LabelMeta,
    LabelPolicy,
    LabelRequest,
    LabelResponse,
    SuggestionRequest,
    SuggestionResponse,
};

pub use reveal::{
    plan_reveal,
    ProgressiveReveal,
    RevealBatch,
    RevealDelays,
    RevealEvent,
};

pub use session::{EditorSession, SessionConfig};
