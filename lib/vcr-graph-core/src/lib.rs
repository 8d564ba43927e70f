//! # vcr-graph-core
//!
//! Scrub Graph API credentials (access tokens, app-secret proofs, client
//! secrets) out of recorded HTTP fixtures so cassettes can be committed and
//! replayed without leaking live credentials.
//!
//! The crate plugs into a VCR-style recording framework through two hook
//! stages: [`GraphScrubber::before_record`] sanitizes outgoing requests and
//! [`GraphScrubber::before_record_response`] sanitizes responses, both right
//! before persistence. Secrets are *elided*, replaced by a deterministic,
//! prefix-tagged placeholder, so the same token always maps to the same
//! value and cross-request continuity (pagination links, batch sub-requests)
//! survives the rewrite. Re-running the scrub over an already-sanitized
//! fixture is a no-op.
//!
//! ## Quick start
//!
//! ```rust
//! use vcr_graph_core::{GraphScrubber, Headers, Request};
//!
//! let scrubber = GraphScrubber::builder()
//!     .with_elider_prefix("XXX-")
//!     .build();
//!
//! let request = Request {
//!     method: "GET".to_string(),
//!     url: "https://graph.facebook.com/v2.4/me?access_token=AAAAAAAAAAAAAAAAAAAAAAAAAAAA"
//!         .to_string(),
//!     headers: Headers::new(),
//!     body: Vec::new(),
//! };
//!
//! let scrubbed = scrubber.before_record(request);
//! assert_eq!(
//!     scrubbed.url,
//!     "https://graph.facebook.com/v2.4/me?access_token=XXX-35ea99843da5ff0639992be381c5b77a"
//! );
//! ```
//!
//! ## Composing with existing hooks
//!
//! When the host framework already has hooks installed, wrap them so the
//! scrub runs first and the prior hook sees only sanitized traffic:
//!
//! ```rust
//! use vcr_graph_core::{GraphScrubber, wrap_before_record, wrap_before_record_response};
//!
//! let scrubber = GraphScrubber::builder().build();
//! let before_record = wrap_before_record(scrubber.clone(), std::convert::identity);
//! let before_record_response =
//!     wrap_before_record_response(scrubber, std::convert::identity);
//! ```
//!
//! ## Failure policy
//!
//! Redaction never fails a recording. Payloads the structural parsers cannot
//! make sense of (a body that is not a query string, a non-multipart upload,
//! a `batch` parameter that is not JSON) pass through byte-for-byte. Requests
//! against other hosts and responses without the Graph version header are
//! returned untouched. The parsers in [`parse`] are public for callers that
//! want strict behavior instead.

mod elide;
mod error;
mod filter;
pub mod parse;
mod record;

pub use self::elide::{
    Elider, FieldResolver, ProofResolver, Resolution, TokenResolver, elide_token,
    fallback_digest,
};
pub use self::error::ParseError;
pub use self::filter::{
    filter_batch_relative_urls, filter_multipart, filter_query, filter_url,
};
pub use self::record::{
    DEFAULT_ELIDER_PREFIX, GraphScrubber, GraphScrubberBuilder, Headers, Request, Response,
    ResponseBody, wrap_before_record, wrap_before_record_response,
};
