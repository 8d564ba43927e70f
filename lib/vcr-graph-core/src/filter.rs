//! Parse → transform → re-serialize combinators.
//!
//! Every combinator attempts a structural parse of its input and, when the
//! parse fails, returns the input unchanged. This is the recovery policy for
//! the whole crate: redaction must never fail a recording, so anything the
//! parsers cannot make sense of passes through byte-for-byte.

use tracing::debug;

use crate::parse::{Batch, MultipartBody, QueryString, RelativeUrl};

/// Applies `transform` to a parsed query string, or returns `raw` unchanged.
pub fn filter_query(raw: &str, transform: impl FnOnce(&mut QueryString)) -> String {
    match QueryString::parse(raw) {
        Ok(mut query) => {
            transform(&mut query);
            query.to_string()
        }
        Err(error) => {
            debug!(%error, "leaving unparsable query untouched");
            raw.to_string()
        }
    }
}

/// Applies `transform` to the query portion of a URL, or returns `raw` unchanged.
pub fn filter_url(raw: &str, transform: impl FnOnce(&mut QueryString)) -> String {
    match RelativeUrl::parse(raw) {
        Ok(mut url) => {
            transform(url.query_mut());
            url.to_string()
        }
        Err(error) => {
            debug!(%error, "leaving unparsable url untouched");
            raw.to_string()
        }
    }
}

/// Applies `transform` to a parsed multipart body, or returns `raw` unchanged.
pub fn filter_multipart(raw: &[u8], transform: impl FnOnce(&mut MultipartBody)) -> Vec<u8> {
    match MultipartBody::parse(raw) {
        Ok(mut body) => {
            transform(&mut body);
            body.to_bytes()
        }
        Err(error) => {
            debug!(%error, "leaving non-multipart body untouched");
            raw.to_vec()
        }
    }
}

/// Drills into the `batch` query parameter and filters each sub-request URL.
///
/// The nesting is query → batch JSON → per-entry relative URL, and each layer
/// re-serializes deterministically (ordered pairs, sorted compact JSON), so the
/// outer bytes are stable no matter how many nested fields were rewritten.
/// Inputs without a parsable query or without a `batch` field pass through.
pub fn filter_batch_relative_urls(raw: &str, transform: impl Fn(&mut QueryString)) -> String {
    use crate::parse::FormFields as _;

    let Ok(mut query) = QueryString::parse(raw) else {
        return raw.to_string();
    };
    let Some(batch_raw) = query.get("batch") else {
        return raw.to_string();
    };
    match Batch::parse(&batch_raw) {
        Ok(mut batch) => {
            for relative_url in batch.relative_urls_mut() {
                *relative_url = filter_url(relative_url, &transform);
            }
            query.set("batch", &batch.to_string());
        }
        Err(error) => {
            debug!(%error, "leaving unparsable batch parameter untouched");
        }
    }
    query.to_string()
}
